use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to map {size} bytes of shared memory: {source}")]
    Allocation {
        size: usize,
        #[source]
        source: rustix::io::Errno,
    },

    #[error("failed to initialize {name} semaphore: {source}")]
    SemaphoreInit {
        name: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("failed to spawn process: {0}")]
    Spawn(#[source] io::Error),

    #[error("operation {op} failed: {source}")]
    Os {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("store is closed")]
    Closed,
}

impl StoreError {
    pub fn is_closed(&self) -> bool {
        matches!(self, StoreError::Closed)
    }
}
