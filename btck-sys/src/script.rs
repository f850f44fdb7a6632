// Copyright (c) 2023-present The Bitcoin Kernel developers
// Licensed under the MIT License. See LICENSE file in the project root.

use std::ffi::{c_int, c_void};

use bitcoin::ScriptBuf;

use crate::{
    btck_WriteBytes,
    error::{wrap, EngineError},
    btck_Error, BTCK_ERROR_INVALID_ENCODING, MAX_SCRIPT_SIZE,
};

pub struct btck_ScriptPubkey {
    pub(crate) script: ScriptBuf,
}

#[no_mangle]
pub unsafe extern "C" fn btck_script_pubkey_create(
    raw: *const c_void,
    len: usize,
    err: *mut *mut btck_Error,
) -> *mut btck_ScriptPubkey {
    wrap(err, std::ptr::null_mut(), || {
        let bytes = crate::raw_slice(raw, len)?;
        if bytes.len() > MAX_SCRIPT_SIZE {
            return Err(EngineError::new(
                BTCK_ERROR_INVALID_ENCODING,
                format!(
                    "script of {} bytes exceeds the {} byte limit",
                    bytes.len(),
                    MAX_SCRIPT_SIZE
                ),
            ));
        }
        log_trace!("created script pubkey of {} bytes", bytes.len());
        Ok(crate::into_ptr(btck_ScriptPubkey {
            script: ScriptBuf::from_bytes(bytes.to_vec()),
        }))
    })
}

#[no_mangle]
pub unsafe extern "C" fn btck_script_pubkey_destroy(script_pubkey: *mut btck_ScriptPubkey) {
    crate::destroy(script_pubkey)
}

/// Returns 1 if both scripts are byte-for-byte identical, 0 otherwise.
#[no_mangle]
pub unsafe extern "C" fn btck_script_pubkey_equals(
    left: *const btck_ScriptPubkey,
    right: *const btck_ScriptPubkey,
) -> c_int {
    let (left, right) = (&*left, &*right);
    c_int::from(left.script == right.script)
}

#[no_mangle]
pub unsafe extern "C" fn btck_script_pubkey_to_bytes(
    script_pubkey: *const btck_ScriptPubkey,
    writer: btck_WriteBytes,
    user_data: *mut c_void,
) -> c_int {
    let script_pubkey = &*script_pubkey;
    crate::write_bytes(script_pubkey.script.as_bytes(), writer, user_data)
}
