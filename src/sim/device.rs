//! Data-parallel executor standing in for the compute device.
//!
//! A dispatch runs one kernel over every element of an output slice on the
//! compute task pool and only returns once every element has been written,
//! so consecutive dispatches are separated by a full barrier.

use bevy::tasks::{ComputeTaskPool, TaskPool};

use crate::error::DeviceError;

const DEFAULT_CHUNK: usize = 256; // elements per task, like a workgroup

#[derive(Clone, Copy)]
pub struct Device {
    pool: &'static TaskPool,
    chunk: usize,
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("threads", &self.pool.thread_num())
            .field("chunk", &self.chunk)
            .finish()
    }
}

impl Device {
    /// Uses the shared compute pool, creating it when running outside an App.
    pub fn acquire() -> Result<Self, DeviceError> {
        let pool: &'static TaskPool = ComputeTaskPool::get_or_init(TaskPool::default);
        if pool.thread_num() == 0 {
            return Err(DeviceError::NoWorkers);
        }
        Ok(Self {
            pool,
            chunk: DEFAULT_CHUNK,
        })
    }

    pub fn with_chunk_size(mut self, chunk: usize) -> Self {
        self.chunk = chunk.max(1);
        self
    }

    pub fn threads(&self) -> usize {
        self.pool.thread_num()
    }

    /// Runs `kernel(i, &mut out[i])` for every `i`. Elements are visited in
    /// no particular order; the call is the barrier.
    pub fn dispatch<T, F>(&self, out: &mut [T], kernel: F)
    where
        T: Send,
        F: Fn(usize, &mut T) + Sync,
    {
        let chunk = self.chunk;
        if out.len() <= chunk {
            for (i, slot) in out.iter_mut().enumerate() {
                kernel(i, slot);
            }
            return;
        }

        let kernel = &kernel;
        self.pool.scope(|s| {
            for (c, part) in out.chunks_mut(chunk).enumerate() {
                s.spawn(async move {
                    let base = c * chunk;
                    for (k, slot) in part.iter_mut().enumerate() {
                        kernel(base + k, slot);
                    }
                });
            }
        });
    }
}
