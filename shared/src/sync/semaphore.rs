use std::{cell::UnsafeCell, io, mem::MaybeUninit, ptr};

use libc::{c_int, sem_destroy, sem_getvalue, sem_init, sem_post, sem_t, sem_wait, EINTR};

use crate::{shm::ShmSafe, CheckOk, StoreError};

use super::INTER_PROCESS;

/// Process-shared POSIX semaphore.
///
/// A `sem_t` must not be moved once initialized, so semaphores are only ever
/// built in place through [`Semaphore::init_at`].
#[repr(C)]
#[derive(Debug)]
pub struct Semaphore {
    inner: UnsafeCell<MaybeUninit<sem_t>>,
}

impl Semaphore {
    /// Initializes the semaphore at `target` with `value` permits.
    ///
    /// # Safety
    ///
    /// `target` must be valid for writes, must not move afterwards, and must
    /// not be in use by any other context yet.
    pub unsafe fn init_at(
        target: *mut Self,
        value: u32,
        name: &'static str,
    ) -> Result<(), StoreError> {
        let sem: *mut sem_t = target.cast();
        if unsafe { sem_init(sem, INTER_PROCESS, value) } != 0 {
            return Err(StoreError::SemaphoreInit {
                name,
                source: io::Error::last_os_error(),
            });
        }
        Ok(())
    }

    /// Initializes each `(target, value, name)` in order.
    ///
    /// If one fails, the semaphores initialized before it are destroyed
    /// again before the error is returned.
    ///
    /// # Safety
    ///
    /// Every target must satisfy the contract of [`Semaphore::init_at`].
    pub unsafe fn init_all(
        semaphores: &[(*mut Self, u32, &'static str)],
    ) -> Result<(), StoreError> {
        for (done, &(target, value, name)) in semaphores.iter().enumerate() {
            if let Err(e) = unsafe { Self::init_at(target, value, name) } {
                for &(initialized, _, _) in &semaphores[..done] {
                    unsafe { ptr::drop_in_place(initialized) };
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Blocks until a permit is available and takes it.
    pub fn wait(&self) {
        loop {
            if unsafe { sem_wait(self.as_ptr()) } == 0 {
                return;
            }
            match errno() {
                EINTR => continue,
                e => panic!("failed to wait for semaphore: {}", io::Error::from_raw_os_error(e)),
            }
        }
    }

    pub fn post(&self) {
        if unsafe { sem_post(self.as_ptr()) } != 0 {
            panic!("failed to post semaphore: {}", io::Error::last_os_error());
        }
    }

    /// Current number of permits. Only meaningful at quiescent points.
    pub fn value(&self) -> i32 {
        let mut value: c_int = 0;
        if unsafe { sem_getvalue(self.as_ptr(), &raw mut value) } != 0 {
            panic!("failed to read semaphore: {}", io::Error::last_os_error());
        }
        value
    }

    fn as_ptr(&self) -> *mut sem_t {
        unsafe { (*self.inner.get()).as_mut_ptr() }
    }
}

unsafe impl Send for Semaphore {}
unsafe impl Sync for Semaphore {}

impl Drop for Semaphore {
    fn drop(&mut self) {
        if let Err(e) = unsafe { sem_destroy(self.as_ptr()) }.r("sem_destroy") {
            tracing::warn!(error = %e, "failed to destroy semaphore");
        }
    }
}

unsafe impl ShmSafe for Semaphore {}

fn errno() -> c_int {
    io::Error::last_os_error().raw_os_error().unwrap_or(0)
}
