// Copyright (c) 2023-present The Bitcoin Kernel developers
// Licensed under the MIT License. See LICENSE file in the project root.

//! Ownership of engine pointers.
//!
//! Every managed type stores its engine pointer in a [`Handle`]. The handle is
//! the single owner of that pointer: it hands out borrowed raw pointers while
//! live, destroys the resource exactly once on [`Handle::release`] or drop, and
//! reports [`KernelError::UseAfterRelease`] for every access afterwards.

use std::{fmt, ptr::NonNull};

use btck_sys::btck_Error;

use crate::{take_engine_error, KernelError};

/// An engine resource type together with its destroy function.
pub trait NativeResource {
    /// Name of the managed type wrapping this resource, used in errors and logs.
    const NAME: &'static str;

    /// Frees `ptr`.
    ///
    /// # Safety
    /// `ptr` must have been produced by the engine for this resource type and
    /// must not be used afterwards.
    unsafe fn destroy(ptr: *mut Self);
}

/// Explicit release of the engine resource behind a managed object.
///
/// Releasing is idempotent: the first call frees the resource, later calls do
/// nothing. Every other operation on a released object fails with
/// [`KernelError::UseAfterRelease`]. Dropping an object releases it as well.
pub trait Release {
    fn release(&mut self);

    fn is_released(&self) -> bool;
}

pub struct Handle<T: NativeResource> {
    inner: Option<NonNull<T>>,
}

// SAFETY: engine resources are immutable after construction, or guard their
// mutable state internally, so they can be shared and moved across threads.
unsafe impl<T: NativeResource + Send + Sync> Send for Handle<T> {}
unsafe impl<T: NativeResource + Send + Sync> Sync for Handle<T> {}

impl<T: NativeResource> Handle<T> {
    /// Takes ownership of `ptr`. Returns `None` if it is null.
    ///
    /// # Safety
    /// `ptr` must be null or a pointer freshly returned by the engine that no
    /// other handle owns.
    pub unsafe fn from_raw(ptr: *mut T) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Handle { inner: Some(ptr) })
    }

    /// Calls an engine constructor and takes ownership of the result. A null
    /// result is turned into the error the engine reported.
    pub fn create<F>(construct: F) -> Result<Self, KernelError>
    where
        F: FnOnce(*mut *mut btck_Error) -> *mut T,
    {
        let mut err: *mut btck_Error = std::ptr::null_mut();
        let ptr = construct(&mut err);
        match unsafe { Self::from_raw(ptr) } {
            Some(handle) => Ok(handle),
            None => {
                let error = unsafe { take_engine_error(err, T::NAME) };
                log::debug!("failed to construct {}: {}", T::NAME, error);
                Err(error)
            }
        }
    }

    /// Returns the engine pointer for the duration of a call.
    pub fn as_ptr(&self) -> Result<*const T, KernelError> {
        self.inner
            .map(|ptr| ptr.as_ptr() as *const T)
            .ok_or(KernelError::UseAfterRelease(T::NAME))
    }

    /// Gives up ownership of the pointer without destroying it.
    pub fn into_raw(mut self) -> Result<*mut T, KernelError> {
        self.inner
            .take()
            .map(NonNull::as_ptr)
            .ok_or(KernelError::UseAfterRelease(T::NAME))
    }

    pub fn release(&mut self) {
        if let Some(ptr) = self.inner.take() {
            log::trace!("releasing {}", T::NAME);
            unsafe { T::destroy(ptr.as_ptr()) }
        }
    }

    pub fn is_released(&self) -> bool {
        self.inner.is_none()
    }
}

impl<T: NativeResource> Drop for Handle<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T: NativeResource> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(T::NAME)
            .field("released", &self.is_released())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    static DESTROYED: AtomicUsize = AtomicUsize::new(0);

    struct Counted;

    impl NativeResource for Counted {
        const NAME: &'static str = "Counted";

        unsafe fn destroy(ptr: *mut Self) {
            drop(Box::from_raw(ptr));
            DESTROYED.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counted() -> Handle<Counted> {
        unsafe { Handle::from_raw(Box::into_raw(Box::new(Counted))) }.unwrap()
    }

    #[test]
    fn test_handle_lifecycle() {
        let before = DESTROYED.load(Ordering::SeqCst);

        let mut handle = counted();
        assert!(handle.as_ptr().is_ok());
        handle.release();
        handle.release();
        assert!(handle.is_released());
        assert!(matches!(
            handle.as_ptr(),
            Err(KernelError::UseAfterRelease("Counted"))
        ));
        drop(handle);

        let moved = counted().into_raw().unwrap();
        unsafe { Counted::destroy(moved) };

        {
            let _dropped = counted();
        }

        assert_eq!(DESTROYED.load(Ordering::SeqCst) - before, 3);
        assert!(unsafe { Handle::<Counted>::from_raw(std::ptr::null_mut()) }.is_none());
    }
}
