use std::io;

use libc::c_int;

pub mod error;
pub mod item;
pub mod process;
pub mod ring;
pub mod shm;
pub mod store;
pub mod sync;

pub use error::StoreError;
pub use item::Item;
pub use ring::RingBuffer;
pub use store::{Store, StoreCounts};

/// Number of item slots in the store used by the demo.
pub const STORE_CAPACITY: usize = 8;
/// Size of the null padded name field, terminator included.
pub const NAME_MAX_LENGTH: usize = 50;

/// Turns a libc style return code into a [`StoreError::Os`] naming `op`.
pub trait CheckOk<R> {
    fn r(self, op: &'static str) -> Result<R, StoreError>;
}

impl CheckOk<()> for c_int {
    fn r(self, op: &'static str) -> Result<(), StoreError> {
        if self != 0 {
            return Err(StoreError::Os {
                op,
                source: io::Error::last_os_error(),
            });
        }
        Ok(())
    }
}

impl<T> CheckOk<T> for io::Result<T> {
    fn r(self, op: &'static str) -> Result<T, StoreError> {
        self.map_err(|source| StoreError::Os { op, source })
    }
}
