// Copyright (c) 2023-present The Bitcoin Kernel developers
// Licensed under the MIT License. See LICENSE file in the project root.

use std::{
    ffi::{c_int, c_void},
    sync::Arc,
};

use bitcoin::{
    block::Header,
    consensus::encode::{deserialize, serialize, VarInt},
    hashes::Hash,
    Block, BlockHash,
};

use crate::{
    btck_Transaction, btck_WriteBytes,
    error::{wrap, EngineError},
    transaction::TransactionData,
    btck_Error, BTCK_ERROR_PARSE,
};

/// A parsed block. Transactions are shared with every transaction handle
/// handed out for them.
pub(crate) struct BlockData {
    pub(crate) header: Header,
    pub(crate) hash: BlockHash,
    pub(crate) transactions: Vec<Arc<TransactionData>>,
    pub(crate) raw: Vec<u8>,
    pub(crate) merkle_root_valid: bool,
    pub(crate) pow_valid: bool,
}

impl BlockData {
    pub(crate) fn parse(raw: &[u8]) -> Result<Self, EngineError> {
        let block: Block = deserialize(raw)
            .map_err(|e| EngineError::new(BTCK_ERROR_PARSE, format!("block: {e}")))?;
        Ok(Self::with_raw(block, raw.to_vec()))
    }

    pub(crate) fn from_block(block: Block) -> Self {
        let raw = serialize(&block);
        Self::with_raw(block, raw)
    }

    fn with_raw(block: Block, raw: Vec<u8>) -> Self {
        let merkle_root_valid = block.check_merkle_root();
        let pow_valid = block
            .header
            .validate_pow(block.header.target())
            .is_ok();
        BlockData {
            header: block.header,
            hash: block.block_hash(),
            transactions: block
                .txdata
                .into_iter()
                .map(|tx| Arc::new(TransactionData::from_transaction(tx)))
                .collect(),
            raw,
            merkle_root_valid,
            pow_valid,
        }
    }
}

pub struct btck_Block {
    pub(crate) data: Arc<BlockData>,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct btck_BlockHash {
    pub hash: [u8; 32],
}

impl From<BlockHash> for btck_BlockHash {
    fn from(hash: BlockHash) -> Self {
        btck_BlockHash {
            hash: hash.to_byte_array(),
        }
    }
}

#[no_mangle]
pub unsafe extern "C" fn btck_block_create(
    raw: *const c_void,
    len: usize,
    err: *mut *mut btck_Error,
) -> *mut btck_Block {
    wrap(err, std::ptr::null_mut(), || {
        let data = BlockData::parse(crate::raw_slice(raw, len)?)?;
        log_debug!(
            "parsed block {} with {} transactions",
            data.hash,
            data.transactions.len()
        );
        Ok(crate::into_ptr(btck_Block {
            data: Arc::new(data),
        }))
    })
}

#[no_mangle]
pub unsafe extern "C" fn btck_block_destroy(block: *mut btck_Block) {
    crate::destroy(block)
}

#[no_mangle]
pub unsafe extern "C" fn btck_block_count_transactions(block: *const btck_Block) -> usize {
    let block = &*block;
    block.data.transactions.len()
}

/// Returns a new transaction handle sharing the block's transaction, or null
/// if the index is out of range.
#[no_mangle]
pub unsafe extern "C" fn btck_block_get_transaction_at(
    block: *const btck_Block,
    index: usize,
) -> *mut btck_Transaction {
    let block = &*block;
    match block.data.transactions.get(index) {
        Some(data) => crate::into_ptr(btck_Transaction {
            data: Arc::clone(data),
        }),
        None => std::ptr::null_mut(),
    }
}

/// Zero-copy view of the bytes the block was created from. Valid until
/// `block` is destroyed.
#[no_mangle]
pub unsafe extern "C" fn btck_block_as_bytes(block: *const btck_Block, len: *mut usize) -> *const c_void {
    let block = &*block;
    crate::as_bytes(&block.data.raw, len)
}

#[no_mangle]
pub unsafe extern "C" fn btck_block_to_bytes(
    block: *const btck_Block,
    writer: btck_WriteBytes,
    user_data: *mut c_void,
) -> c_int {
    let block = &*block;
    let data = &block.data;
    let mut encoded = serialize(&data.header);
    encoded.extend(serialize(&VarInt(data.transactions.len() as u64)));
    for transaction in &data.transactions {
        encoded.extend_from_slice(&transaction.raw);
    }
    crate::write_bytes(&encoded, writer, user_data)
}

#[no_mangle]
pub unsafe extern "C" fn btck_block_get_hash(block: *const btck_Block, out: *mut btck_BlockHash) {
    let block = &*block;
    *out = block.data.hash.into();
}
