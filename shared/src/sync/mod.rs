mod semaphore;
mod slots;

pub use semaphore::*;
pub use slots::*;

/// `pshared` argument for `sem_init`: visible to every process mapping it.
pub const INTER_PROCESS: libc::c_int = 1;
