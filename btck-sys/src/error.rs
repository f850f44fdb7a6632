// Copyright (c) 2023-present The Bitcoin Kernel developers
// Licensed under the MIT License. See LICENSE file in the project root.

use std::{
    ffi::{c_char, CString},
    panic::{self, AssertUnwindSafe},
};

use crate::{btck_ErrorCode, BTCK_ERROR_INTERNAL};

/// Error details reported through the `err` out-parameter of fallible engine
/// functions. Owned by the caller, freed with [`btck_error_destroy`].
#[derive(Debug)]
pub struct btck_Error {
    code: btck_ErrorCode,
    message: CString,
}

#[derive(Debug)]
pub(crate) struct EngineError {
    code: btck_ErrorCode,
    message: String,
}

impl EngineError {
    pub(crate) fn new(code: btck_ErrorCode, message: impl Into<String>) -> Self {
        EngineError {
            code,
            message: message.into(),
        }
    }
}

unsafe fn report(err: *mut *mut btck_Error, error: EngineError) {
    log_debug!("engine call failed with code {}: {}", error.code, error.message);
    if err.is_null() {
        return;
    }
    let message = CString::new(error.message.replace('\0', "")).unwrap_or_default();
    *err = crate::into_ptr(btck_Error {
        code: error.code,
        message,
    });
}

/// Runs an engine operation, translating failures and panics into a
/// `btck_Error` written to `err`. `failed` is returned in both cases.
pub(crate) unsafe fn wrap<R>(
    err: *mut *mut btck_Error,
    failed: R,
    operation: impl FnOnce() -> Result<R, EngineError>,
) -> R {
    match panic::catch_unwind(AssertUnwindSafe(operation)) {
        Ok(Ok(value)) => value,
        Ok(Err(error)) => {
            report(err, error);
            failed
        }
        Err(_) => {
            report(
                err,
                EngineError::new(BTCK_ERROR_INTERNAL, "engine operation panicked"),
            );
            failed
        }
    }
}

#[no_mangle]
pub unsafe extern "C" fn btck_error_code(err: *const btck_Error) -> btck_ErrorCode {
    let err = &*err;
    err.code
}

/// Returns the message of `err`. The pointer is valid until the error is
/// destroyed and is not nul-terminated from the caller's point of view; use
/// `len`.
#[no_mangle]
pub unsafe extern "C" fn btck_error_message(err: *const btck_Error, len: *mut usize) -> *const c_char {
    let err = &*err;
    let message = err.message.as_bytes();
    if !len.is_null() {
        *len = message.len();
    }
    message.as_ptr() as *const c_char
}

#[no_mangle]
pub unsafe extern "C" fn btck_error_destroy(err: *mut btck_Error) {
    crate::destroy(err)
}
