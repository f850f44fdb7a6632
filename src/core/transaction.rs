// Copyright (c) 2023-present The Bitcoin Kernel developers
// Licensed under the MIT License. See LICENSE file in the project root.

use std::{
    ffi::c_void,
    fmt::{self, Display, Formatter},
};

use btck_sys::{
    btck_Transaction, btck_TransactionOutput, btck_Txid, btck_transaction_as_bytes,
    btck_transaction_count_outputs, btck_transaction_create, btck_transaction_destroy,
    btck_transaction_get_output_at, btck_transaction_get_txid, btck_transaction_output_create,
    btck_transaction_output_destroy, btck_transaction_output_get_amount,
    btck_transaction_output_get_script_pubkey, btck_transaction_to_bytes,
    btck_transaction_to_string,
};

use crate::{
    c_serialize,
    ffi::{Handle, NativeResource, Release},
    KernelError,
};

use super::{iter::Iter, script::ScriptPubkey};

impl NativeResource for btck_Transaction {
    const NAME: &'static str = "Transaction";

    unsafe fn destroy(ptr: *mut Self) {
        btck_transaction_destroy(ptr)
    }
}

impl NativeResource for btck_TransactionOutput {
    const NAME: &'static str = "TransactionOutput";

    unsafe fn destroy(ptr: *mut Self) {
        btck_transaction_output_destroy(ptr)
    }
}

/// A transaction identifier in internal byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Txid {
    pub hash: [u8; 32],
}

impl From<btck_Txid> for Txid {
    fn from(txid: btck_Txid) -> Self {
        Txid { hash: txid.hash }
    }
}

/// Displays the txid the way block explorers do, byte-reversed.
impl Display for Txid {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut reversed = self.hash;
        reversed.reverse();
        f.write_str(&hex::encode(reversed))
    }
}

/// A single transaction output: an amount in satoshis and the script that
/// locks it.
#[derive(Debug)]
pub struct TransactionOutput {
    handle: Handle<btck_TransactionOutput>,
}

impl TransactionOutput {
    /// Creates an output that takes ownership of `script_pubkey`.
    ///
    /// The script's engine resource moves into the output, so the
    /// `ScriptPubkey` value is consumed. Creating an output from a released
    /// script fails with [`KernelError::UseAfterRelease`].
    pub fn new(amount: i64, script_pubkey: ScriptPubkey) -> Result<Self, KernelError> {
        let script = script_pubkey.into_raw()?;
        log::trace!("moving ScriptPubkey into a new TransactionOutput");
        let handle = Handle::create(|err| unsafe { btck_transaction_output_create(amount, script, err) })?;
        Ok(TransactionOutput { handle })
    }

    /// Returns the amount in satoshis.
    pub fn amount(&self) -> Result<i64, KernelError> {
        let ptr = self.handle.as_ptr()?;
        Ok(unsafe { btck_transaction_output_get_amount(ptr) })
    }

    /// Returns an independently owned copy of the output's script.
    pub fn script_pubkey(&self) -> Result<ScriptPubkey, KernelError> {
        let ptr = self.handle.as_ptr()?;
        let handle = unsafe { Handle::from_raw(btck_transaction_output_get_script_pubkey(ptr)) }
            .ok_or_else(|| KernelError::Internal("engine returned no script pubkey".to_string()))?;
        Ok(ScriptPubkey::from_handle(handle))
    }
}

impl Release for TransactionOutput {
    fn release(&mut self) {
        self.handle.release()
    }

    fn is_released(&self) -> bool {
        self.handle.is_released()
    }
}

/// Traversal over the outputs of a [`Transaction`].
pub type OutputIter<'a> = Iter<'a, Transaction, TransactionOutput>;

/// A Bitcoin transaction.
#[derive(Debug)]
pub struct Transaction {
    handle: Handle<btck_Transaction>,
}

impl Transaction {
    pub fn new(transaction_bytes: &[u8]) -> Result<Self, KernelError> {
        let handle = Handle::create(|err| unsafe {
            btck_transaction_create(
                transaction_bytes.as_ptr() as *const c_void,
                transaction_bytes.len(),
                err,
            )
        })?;
        Ok(Transaction { handle })
    }

    pub(crate) fn from_handle(handle: Handle<btck_Transaction>) -> Self {
        Transaction { handle }
    }

    /// Returns the number of outputs in this transaction.
    pub fn output_count(&self) -> Result<usize, KernelError> {
        let ptr = self.handle.as_ptr()?;
        Ok(unsafe { btck_transaction_count_outputs(ptr) })
    }

    /// Returns the output at the specified index.
    ///
    /// # Errors
    /// * [`KernelError::IndexOutOfRange`] - unless `index < output_count()`
    /// * [`KernelError::UseAfterRelease`] - if the transaction was released
    pub fn output(&self, index: usize) -> Result<TransactionOutput, KernelError> {
        let size = self.output_count()?;
        if index >= size {
            return Err(KernelError::IndexOutOfRange { index, size });
        }
        let ptr = self.handle.as_ptr()?;
        let handle = unsafe { Handle::from_raw(btck_transaction_get_output_at(ptr, index)) }
            .ok_or(KernelError::IndexOutOfRange { index, size })?;
        Ok(TransactionOutput { handle })
    }

    /// Returns a lazy traversal over all outputs in this transaction.
    pub fn outputs(&self) -> Result<OutputIter<'_>, KernelError> {
        Ok(Iter::new(self, self.output_count()?, Transaction::output))
    }

    /// Borrows the bytes the transaction was parsed from, without copying.
    pub fn as_serialized_view(&self) -> Result<&[u8], KernelError> {
        let ptr = self.handle.as_ptr()?;
        let mut len = 0;
        let data = unsafe { btck_transaction_as_bytes(ptr, &mut len) };
        if data.is_null() || len == 0 {
            return Ok(&[]);
        }
        // SAFETY: the engine keeps the bytes alive until the transaction is
        // destroyed, which needs `&mut self`.
        Ok(unsafe { std::slice::from_raw_parts(data as *const u8, len) })
    }

    /// Consensus encodes the transaction to Bitcoin wire format.
    pub fn consensus_encode(&self) -> Result<Vec<u8>, KernelError> {
        let ptr = self.handle.as_ptr()?;
        c_serialize(|callback, user_data| unsafe {
            btck_transaction_to_bytes(ptr, Some(callback), user_data)
        })
    }

    pub fn txid(&self) -> Result<Txid, KernelError> {
        let ptr = self.handle.as_ptr()?;
        let mut txid = btck_Txid { hash: [0; 32] };
        unsafe { btck_transaction_get_txid(ptr, &mut txid) };
        Ok(txid.into())
    }

    /// Returns the engine's human-readable rendering of the transaction.
    pub fn describe(&self) -> Result<String, KernelError> {
        let ptr = self.handle.as_ptr()?;
        let bytes = c_serialize(|callback, user_data| unsafe {
            btck_transaction_to_string(ptr, Some(callback), user_data)
        })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl Release for Transaction {
    fn release(&mut self) {
        self.handle.release()
    }

    fn is_released(&self) -> bool {
        self.handle.is_released()
    }
}

impl TryFrom<&[u8]> for Transaction {
    type Error = KernelError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Transaction::new(bytes)
    }
}

impl TryFrom<&Transaction> for Vec<u8> {
    type Error = KernelError;

    fn try_from(transaction: &Transaction) -> Result<Self, Self::Error> {
        transaction.consensus_encode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_utils::{
        decode, test_owned_trait_requirements, P2PKH_SCRIPT, SINGLE_OUTPUT_TX,
    };

    test_owned_trait_requirements!(test_transaction_requirements, Transaction, btck_Transaction);
    test_owned_trait_requirements!(
        test_transaction_output_requirements,
        TransactionOutput,
        btck_TransactionOutput
    );

    fn single_output_tx() -> Transaction {
        Transaction::new(&decode(SINGLE_OUTPUT_TX)).unwrap()
    }

    #[test]
    fn test_transaction_output_access() {
        let tx = single_output_tx();
        assert_eq!(tx.output_count().unwrap(), 1);

        let output = tx.output(0).unwrap();
        assert_eq!(output.amount().unwrap(), 5_000_000_000);
        assert_eq!(
            output.script_pubkey().unwrap().to_bytes().unwrap(),
            decode(P2PKH_SCRIPT)
        );

        assert!(matches!(
            tx.output(1),
            Err(KernelError::IndexOutOfRange { index: 1, size: 1 })
        ));
    }

    #[test]
    fn test_serialized_view_matches_input() {
        let raw = decode(SINGLE_OUTPUT_TX);
        let tx = Transaction::new(&raw).unwrap();
        assert_eq!(tx.as_serialized_view().unwrap(), raw.as_slice());
        assert_eq!(tx.consensus_encode().unwrap(), raw);
        assert_eq!(Vec::<u8>::try_from(&tx).unwrap(), raw);
    }

    #[test]
    fn test_malformed_transaction() {
        assert!(matches!(
            Transaction::new(&[0x01, 0x00]),
            Err(KernelError::ParseError { what: "Transaction", .. })
        ));
        assert!(matches!(
            Transaction::new(&[]),
            Err(KernelError::ParseError { .. })
        ));
    }

    #[test]
    fn test_outputs_traversal_restarts() {
        let tx = single_output_tx();
        for _ in 0..2 {
            let mut outputs = tx.outputs().unwrap();
            assert!(outputs.has_next());
            assert_eq!(outputs.try_next().unwrap().amount().unwrap(), 5_000_000_000);
            assert!(!outputs.has_next());
            assert!(matches!(outputs.try_next(), Err(KernelError::NoSuchElement)));
        }
    }

    #[test]
    fn test_txid_and_describe() {
        let tx = single_output_tx();
        let txid = tx.txid().unwrap();
        assert_eq!(txid, tx.txid().unwrap());

        let description = tx.describe().unwrap();
        assert!(description.starts_with(&format!("Transaction(txid={txid}")));
        assert!(description.contains(P2PKH_SCRIPT));
    }

    #[test]
    fn test_output_takes_script_ownership() {
        let raw = decode(P2PKH_SCRIPT);
        let script = ScriptPubkey::new(&raw).unwrap();
        let output = TransactionOutput::new(42, script).unwrap();
        assert_eq!(output.amount().unwrap(), 42);

        let fresh = ScriptPubkey::new(&raw).unwrap();
        assert!(output.script_pubkey().unwrap().equals(&fresh).unwrap());

        let mut released = ScriptPubkey::new(&raw).unwrap();
        released.release();
        assert!(matches!(
            TransactionOutput::new(1, released),
            Err(KernelError::UseAfterRelease("ScriptPubkey"))
        ));
    }

    #[test]
    fn test_children_outlive_parent() {
        let mut tx = single_output_tx();
        let mut output = tx.output(0).unwrap();
        tx.release();
        assert!(matches!(tx.output_count(), Err(KernelError::UseAfterRelease(_))));
        assert!(matches!(tx.as_serialized_view(), Err(KernelError::UseAfterRelease(_))));
        assert_eq!(output.amount().unwrap(), 5_000_000_000);

        let script = output.script_pubkey().unwrap();
        output.release();
        output.release();
        assert!(matches!(output.amount(), Err(KernelError::UseAfterRelease(_))));
        assert_eq!(script.to_bytes().unwrap(), decode(P2PKH_SCRIPT));
    }
}
