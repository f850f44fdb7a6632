// Copyright (c) 2023-present The Bitcoin Kernel developers
// Licensed under the MIT License. See LICENSE file in the project root.

//! Raw interface to the btck validation engine.
//!
//! The engine owns every chain, block, transaction, output and script it hands
//! out. Callers only ever see opaque `btck_*` pointers and interact with them
//! through the `extern "C"` functions exported here. Every `*_create` and
//! `*_get_*_at` function returns a fresh pointer that must eventually be
//! passed to the matching `*_destroy` function exactly once.
//!
//! Data reachable from a pointer is immutable and internally reference
//! counted, so a pointer handed out for a sub-resource (a transaction inside a
//! block, a block inside a chain) stays valid after its parent is destroyed.

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
#![allow(clippy::missing_safety_doc)]

use std::ffi::{c_int, c_void};

#[macro_use]
mod logging;

mod block;
mod chain;
mod error;
mod script;
mod transaction;

pub use block::*;
pub use chain::*;
pub use error::*;
pub use logging::*;
pub use script::*;
pub use transaction::*;

use crate::error::EngineError;

pub type btck_ChainType = u8;
pub type btck_LogLevel = u8;
pub type btck_ErrorCode = c_int;

/// Receives serialized bytes. Returns 0 on success.
pub type btck_WriteBytes =
    Option<unsafe extern "C" fn(data: *const c_void, len: usize, user_data: *mut c_void) -> c_int>;

// Chain types
pub const BTCK_CHAIN_TYPE_MAINNET: btck_ChainType = 0;
pub const BTCK_CHAIN_TYPE_TESTNET: btck_ChainType = 1;
pub const BTCK_CHAIN_TYPE_SIGNET: btck_ChainType = 3;
pub const BTCK_CHAIN_TYPE_REGTEST: btck_ChainType = 4;

// Log levels
pub const BTCK_LOG_LEVEL_TRACE: btck_LogLevel = 0;
pub const BTCK_LOG_LEVEL_DEBUG: btck_LogLevel = 1;
pub const BTCK_LOG_LEVEL_INFO: btck_LogLevel = 2;

// Error codes
pub const BTCK_ERROR_INVALID_ENCODING: btck_ErrorCode = 1;
pub const BTCK_ERROR_PARSE: btck_ErrorCode = 2;
pub const BTCK_ERROR_INVALID_ARGUMENT: btck_ErrorCode = 3;
pub const BTCK_ERROR_INVALID_BLOCK: btck_ErrorCode = 4;
pub const BTCK_ERROR_INTERNAL: btck_ErrorCode = 5;

/// Scripts longer than this are rejected by `btck_script_pubkey_create`.
pub const MAX_SCRIPT_SIZE: usize = 10_000;

pub(crate) fn into_ptr<T>(value: T) -> *mut T {
    Box::into_raw(Box::new(value))
}

/// Frees a pointer produced by [`into_ptr`]. Null is ignored.
pub(crate) unsafe fn destroy<T>(ptr: *mut T) {
    if !ptr.is_null() {
        drop(Box::from_raw(ptr));
    }
}

pub(crate) unsafe fn raw_slice<'a>(raw: *const c_void, len: usize) -> Result<&'a [u8], EngineError> {
    if len == 0 {
        return Ok(&[]);
    }
    if raw.is_null() {
        return Err(EngineError::new(
            BTCK_ERROR_INVALID_ARGUMENT,
            "null buffer with non-zero length",
        ));
    }
    Ok(std::slice::from_raw_parts(raw as *const u8, len))
}

/// Hands `bytes` to a caller-supplied writer. Returns the writer's result, or
/// 1 if no writer was given.
pub(crate) unsafe fn write_bytes(bytes: &[u8], writer: btck_WriteBytes, user_data: *mut c_void) -> c_int {
    match writer {
        Some(write) => write(bytes.as_ptr() as *const c_void, bytes.len(), user_data),
        None => 1,
    }
}

/// Stores a zero-copy view of `bytes` into `len` and returns its start.
pub(crate) unsafe fn as_bytes(bytes: &[u8], len: *mut usize) -> *const c_void {
    if !len.is_null() {
        *len = bytes.len();
    }
    bytes.as_ptr() as *const c_void
}
