// Copyright (c) 2023-present The Bitcoin Kernel developers
// Licensed under the MIT License. See LICENSE file in the project root.

use std::{
    ffi::{c_int, c_void},
    fmt::Write as _,
    sync::Arc,
};

use bitcoin::{
    consensus::encode::{deserialize, serialize},
    hashes::Hash,
    ScriptBuf, Transaction,
};

use crate::{
    btck_ScriptPubkey, btck_WriteBytes,
    error::{wrap, EngineError},
    btck_Error, BTCK_ERROR_INVALID_ARGUMENT, BTCK_ERROR_PARSE,
};

/// A parsed transaction together with the exact bytes it was decoded from.
pub(crate) struct TransactionData {
    pub(crate) tx: Transaction,
    pub(crate) raw: Vec<u8>,
}

impl TransactionData {
    pub(crate) fn parse(raw: &[u8]) -> Result<Self, EngineError> {
        let tx: Transaction = deserialize(raw)
            .map_err(|e| EngineError::new(BTCK_ERROR_PARSE, format!("transaction: {e}")))?;
        Ok(TransactionData {
            tx,
            raw: raw.to_vec(),
        })
    }

    pub(crate) fn from_transaction(tx: Transaction) -> Self {
        let raw = serialize(&tx);
        TransactionData { tx, raw }
    }
}

pub struct btck_Transaction {
    pub(crate) data: Arc<TransactionData>,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct btck_Txid {
    pub hash: [u8; 32],
}

pub struct btck_TransactionOutput {
    pub(crate) amount: i64,
    pub(crate) script: ScriptBuf,
}

#[no_mangle]
pub unsafe extern "C" fn btck_transaction_create(
    raw: *const c_void,
    len: usize,
    err: *mut *mut btck_Error,
) -> *mut btck_Transaction {
    wrap(err, std::ptr::null_mut(), || {
        let data = TransactionData::parse(crate::raw_slice(raw, len)?)?;
        log_trace!(
            "parsed transaction {} with {} outputs",
            data.tx.compute_txid(),
            data.tx.output.len()
        );
        Ok(crate::into_ptr(btck_Transaction {
            data: Arc::new(data),
        }))
    })
}

#[no_mangle]
pub unsafe extern "C" fn btck_transaction_destroy(transaction: *mut btck_Transaction) {
    crate::destroy(transaction)
}

#[no_mangle]
pub unsafe extern "C" fn btck_transaction_count_outputs(transaction: *const btck_Transaction) -> usize {
    let transaction = &*transaction;
    transaction.data.tx.output.len()
}

/// Returns a new output handle for the output at `index`, or null if the
/// index is out of range.
#[no_mangle]
pub unsafe extern "C" fn btck_transaction_get_output_at(
    transaction: *const btck_Transaction,
    index: usize,
) -> *mut btck_TransactionOutput {
    let transaction = &*transaction;
    match transaction.data.tx.output.get(index) {
        Some(output) => crate::into_ptr(btck_TransactionOutput {
            // Values are read as a signed 64-bit integer, as on the wire.
            amount: output.value.to_sat() as i64,
            script: output.script_pubkey.clone(),
        }),
        None => std::ptr::null_mut(),
    }
}

/// Zero-copy view of the bytes the transaction was created from. Valid until
/// `transaction` is destroyed.
#[no_mangle]
pub unsafe extern "C" fn btck_transaction_as_bytes(
    transaction: *const btck_Transaction,
    len: *mut usize,
) -> *const c_void {
    let transaction = &*transaction;
    crate::as_bytes(&transaction.data.raw, len)
}

/// Re-encodes the transaction, including witness data.
#[no_mangle]
pub unsafe extern "C" fn btck_transaction_to_bytes(
    transaction: *const btck_Transaction,
    writer: btck_WriteBytes,
    user_data: *mut c_void,
) -> c_int {
    let transaction = &*transaction;
    let encoded = serialize(&transaction.data.tx);
    crate::write_bytes(&encoded, writer, user_data)
}

#[no_mangle]
pub unsafe extern "C" fn btck_transaction_get_txid(
    transaction: *const btck_Transaction,
    out: *mut btck_Txid,
) {
    let transaction = &*transaction;
    (*out).hash = transaction.data.tx.compute_txid().to_byte_array();
}

/// Writes a human-readable description of the transaction.
#[no_mangle]
pub unsafe extern "C" fn btck_transaction_to_string(
    transaction: *const btck_Transaction,
    writer: btck_WriteBytes,
    user_data: *mut c_void,
) -> c_int {
    let transaction = &*transaction;
    let tx = &transaction.data.tx;
    let mut out = format!(
        "Transaction(txid={}, version={}, inputs={}, outputs={}, lock_time={})\n",
        tx.compute_txid(),
        tx.version.0,
        tx.input.len(),
        tx.output.len(),
        tx.lock_time.to_consensus_u32(),
    );
    for output in &tx.output {
        let _ = writeln!(
            out,
            "    Output(amount={}, script_pubkey={:x})",
            output.value.to_sat(),
            output.script_pubkey.as_script()
        );
    }
    crate::write_bytes(out.as_bytes(), writer, user_data)
}

/// Creates an output from `amount` and `script_pubkey`. The script pubkey
/// handle is consumed whether or not creation succeeds and must not be used
/// or destroyed by the caller afterwards.
#[no_mangle]
pub unsafe extern "C" fn btck_transaction_output_create(
    amount: i64,
    script_pubkey: *mut btck_ScriptPubkey,
    err: *mut *mut btck_Error,
) -> *mut btck_TransactionOutput {
    wrap(err, std::ptr::null_mut(), || {
        if script_pubkey.is_null() {
            return Err(EngineError::new(
                BTCK_ERROR_INVALID_ARGUMENT,
                "null script pubkey",
            ));
        }
        let script_pubkey = Box::from_raw(script_pubkey);
        Ok(crate::into_ptr(btck_TransactionOutput {
            amount,
            script: script_pubkey.script,
        }))
    })
}

#[no_mangle]
pub unsafe extern "C" fn btck_transaction_output_destroy(output: *mut btck_TransactionOutput) {
    crate::destroy(output)
}

#[no_mangle]
pub unsafe extern "C" fn btck_transaction_output_get_amount(output: *const btck_TransactionOutput) -> i64 {
    let output = &*output;
    output.amount
}

/// Returns a new script pubkey handle holding a copy of the output's script.
#[no_mangle]
pub unsafe extern "C" fn btck_transaction_output_get_script_pubkey(
    output: *const btck_TransactionOutput,
) -> *mut btck_ScriptPubkey {
    let output = &*output;
    crate::into_ptr(btck_ScriptPubkey {
        script: output.script.clone(),
    })
}
