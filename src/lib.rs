pub mod error;
pub mod plugin;

pub mod sim {
    pub mod audio;
    pub mod density;
    pub mod device;
    pub mod driver;
    pub mod force;
    pub mod heightfield;
    pub mod integrate;
    pub mod kernels;
    pub mod params;
    pub mod pointer;
    pub mod simulation;
    pub mod spatial;
    pub mod store;
}

pub mod gpu {
    pub mod ffi;
    pub mod buffers;
}

pub use error::FluidError;
pub use plugin::{FluidSet, FluidSim, FluidSimPlugin};
pub use sim::driver::SimulationDriver;
pub use sim::params::{ParamName, Tunables};
pub use sim::simulation::{InitialLayout, Simulation, SimulationConfig};
