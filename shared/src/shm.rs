use std::{
    mem,
    ptr::{self, null_mut},
};

use rustix::{
    mm::{mmap_anonymous, munmap, MapFlags, ProtFlags},
    process::{getpid, Pid},
};

use crate::StoreError;

/// Marker for types that may live in memory shared between processes.
///
/// # Safety
///
/// The type must be `repr(C)` (or plain data), hold no pointers into private
/// memory, and stay valid when accessed from several processes at once.
pub unsafe trait ShmSafe {}

/// An anonymous `MAP_SHARED` mapping holding one `T`.
///
/// The mapping is inherited by forked children, which all see the same
/// physical pages. The process that allocated the region owns its contents:
/// only that process runs `T`'s destructor, every other process merely unmaps
/// its view when the handle is dropped.
pub struct SharedRegion<T> {
    owner: Pid,
    memory: *mut T,
}

impl<T: ShmSafe> SharedRegion<T> {
    /// Maps a fresh region and lets `init` construct `T` in place.
    ///
    /// `init` runs before the region is visible to anyone else. If it fails
    /// the mapping is torn down and its error is returned.
    pub fn allocate(
        init: impl FnOnce(*mut T) -> Result<(), StoreError>,
    ) -> Result<Self, StoreError> {
        let size = size_of::<T>();

        let ptr = unsafe {
            // Safety: Ptr is null
            mmap_anonymous(
                null_mut(),
                size,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
            )
        }
        .map_err(|source| StoreError::Allocation { size, source })?;

        let memory: *mut T = ptr.cast();
        if let Err(e) = init(memory) {
            unsafe {
                let _ = munmap(ptr, size);
            }
            return Err(e);
        }

        tracing::debug!(size, addr = ?ptr, "mapped shared region");

        Ok(Self {
            owner: getpid(),
            memory,
        })
    }

    pub fn get(&self) -> &T {
        unsafe { &*self.memory }
    }

    pub fn size(&self) -> usize {
        size_of::<T>()
    }

    /// Tears the region down. Only call once every other context that
    /// touches the region has terminated.
    pub fn release(self) {
        drop(self)
    }

    /// Gives the region up without tearing it down.
    ///
    /// Neither `T`'s destructor nor `munmap` runs. Used when children may
    /// still be attached and can no longer be reaped.
    pub fn abandon(self) {
        tracing::warn!(size = size_of::<T>(), "abandoning shared region");
        mem::forget(self)
    }
}

impl<T> Drop for SharedRegion<T> {
    fn drop(&mut self) {
        let owned = getpid() == self.owner;
        unsafe {
            if owned {
                ptr::drop_in_place(self.memory);
            }
            let _ = munmap(self.memory.cast(), size_of::<T>());
        }
        if owned {
            tracing::debug!(size = size_of::<T>(), "released shared region");
        }
    }
}

unsafe impl<T: Send> Send for SharedRegion<T> {}
unsafe impl<T: Sync> Sync for SharedRegion<T> {}
