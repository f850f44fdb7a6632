// Copyright (c) 2023-present The Bitcoin Kernel developers
// Licensed under the MIT License. See LICENSE file in the project root.

//! Managed handles over the btck validation engine.
//!
//! Every type in this crate owns exactly one engine resource. Resources are
//! released explicitly through [`Release::release`] or implicitly on drop,
//! whichever comes first, and never twice. Operations on a released object
//! fail with [`KernelError::UseAfterRelease`].
//!
//! Collections (the outputs of a [`Transaction`], the transactions of a
//! [`Block`], the blocks of a [`Chain`]) are never materialized. Each indexed
//! access asks the engine for a fresh child object, and each traversal asks
//! the engine for the collection size when it starts.
//!
//! Child objects own their own engine resource and stay valid after the
//! parent they were obtained from is released.

use std::{ffi::c_void, panic};

use btck_sys::{
    btck_Error, btck_error_code, btck_error_destroy, btck_error_message,
    BTCK_ERROR_INVALID_BLOCK, BTCK_ERROR_INVALID_ENCODING, BTCK_ERROR_PARSE,
};
use thiserror::Error;

use crate::ffi::c_helpers;

pub mod core;
pub(crate) mod ffi;
pub mod log;
pub mod state;

/// Serializes data using a C callback function pattern.
///
/// Takes a C function that writes data via a callback and returns the
/// serialized bytes as a Vec<u8>.
fn c_serialize<F>(c_function: F) -> Result<Vec<u8>, KernelError>
where
    F: FnOnce(unsafe extern "C" fn(*const c_void, usize, *mut c_void) -> i32, *mut c_void) -> i32,
{
    let mut buffer = Vec::new();

    unsafe extern "C" fn write_callback(
        data: *const c_void,
        len: usize,
        user_data: *mut c_void,
    ) -> i32 {
        panic::catch_unwind(|| {
            let buffer = &mut *(user_data as *mut Vec<u8>);
            let slice = std::slice::from_raw_parts(data as *const u8, len);
            buffer.extend_from_slice(slice);
            c_helpers::to_c_result(true)
        })
        .unwrap_or_else(|_| c_helpers::to_c_result(false))
    }

    let result = c_function(write_callback, &mut buffer as *mut Vec<u8> as *mut c_void);

    if c_helpers::success(result) {
        Ok(buffer)
    } else {
        Err(KernelError::SerializationFailed)
    }
}

/// A collection of errors emitted by this library
#[derive(Debug, Error)]
pub enum KernelError {
    /// The engine rejected the bytes of a script.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),
    /// The engine could not parse the bytes of a transaction or block.
    #[error("Failed to parse {what}: {message}")]
    ParseError { what: &'static str, message: String },
    #[error("Index {index} out of range for collection of size {size}")]
    IndexOutOfRange { index: usize, size: usize },
    /// An operation was invoked on an object after it was released.
    #[error("{0} used after release")]
    UseAfterRelease(&'static str),
    /// A traversal was advanced past its last element.
    #[error("No such element")]
    NoSuchElement,
    /// The engine refused to connect a block.
    #[error("Invalid block: {0}")]
    InvalidBlock(String),
    #[error("Serialization failed")]
    SerializationFailed,
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Takes ownership of an engine error out-parameter and converts it. `what`
/// names the object the failed call was about.
pub(crate) unsafe fn take_engine_error(err: *mut btck_Error, what: &'static str) -> KernelError {
    if err.is_null() {
        return KernelError::Internal(format!("engine returned no {what} and no error"));
    }
    let code = btck_error_code(err);
    let mut len = 0;
    let message = c_helpers::to_string(btck_error_message(err, &mut len), len);
    btck_error_destroy(err);

    match code {
        BTCK_ERROR_INVALID_ENCODING => KernelError::InvalidEncoding(message),
        BTCK_ERROR_PARSE => KernelError::ParseError { what, message },
        BTCK_ERROR_INVALID_BLOCK => KernelError::InvalidBlock(message),
        _ => KernelError::Internal(message),
    }
}

pub use crate::core::{
    Block, BlockHash, Iter, OutputIter, ScriptPubkey, Transaction, TransactionIter,
    TransactionOutput, Txid,
};

pub use crate::ffi::Release;

pub use crate::log::{Log, LogLevel, Logger};

pub use crate::state::{BlockIter, Chain, ChainType, Context, ContextBuilder};

pub mod prelude {
    pub use crate::ffi::Release;
}
