// Copyright (c) 2023-present The Bitcoin Kernel developers
// Licensed under the MIT License. See LICENSE file in the project root.

use std::{
    ffi::c_void,
    fmt::{self, Display, Formatter},
};

use btck_sys::{
    btck_Block, btck_BlockHash, btck_block_as_bytes, btck_block_count_transactions,
    btck_block_create, btck_block_destroy, btck_block_get_hash, btck_block_get_transaction_at,
    btck_block_to_bytes,
};

use crate::{
    c_serialize,
    ffi::{Handle, NativeResource, Release},
    KernelError,
};

use super::{iter::Iter, transaction::Transaction};

impl NativeResource for btck_Block {
    const NAME: &'static str = "Block";

    unsafe fn destroy(ptr: *mut Self) {
        btck_block_destroy(ptr)
    }
}

/// A type for a Block hash.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct BlockHash {
    pub hash: [u8; 32],
}

impl From<btck_BlockHash> for BlockHash {
    fn from(hash: btck_BlockHash) -> Self {
        BlockHash { hash: hash.hash }
    }
}

impl From<&BlockHash> for btck_BlockHash {
    fn from(hash: &BlockHash) -> Self {
        btck_BlockHash { hash: hash.hash }
    }
}

impl Display for BlockHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut reversed = self.hash;
        reversed.reverse();
        f.write_str(&hex::encode(reversed))
    }
}

/// Traversal over the transactions of a [`Block`].
pub type TransactionIter<'a> = Iter<'a, Block, Transaction>;

/// A Bitcoin block containing a header and transactions.
///
/// Blocks can be created from raw serialized data or retrieved from a
/// [`Chain`](crate::Chain). Transactions are handed out one at a time, each
/// as its own [`Transaction`] that stays usable after the block is released.
#[derive(Debug)]
pub struct Block {
    handle: Handle<btck_Block>,
}

impl Block {
    pub fn new(raw_block: &[u8]) -> Result<Self, KernelError> {
        let handle = Handle::create(|err| unsafe {
            btck_block_create(raw_block.as_ptr() as *const c_void, raw_block.len(), err)
        })?;
        Ok(Block { handle })
    }

    pub(crate) fn from_handle(handle: Handle<btck_Block>) -> Self {
        Block { handle }
    }

    pub(crate) fn as_ptr(&self) -> Result<*const btck_Block, KernelError> {
        self.handle.as_ptr()
    }

    /// Returns the hash of this block.
    ///
    /// This is the double SHA256 hash of the block header, which serves as
    /// the block's unique identifier.
    pub fn hash(&self) -> Result<BlockHash, KernelError> {
        let ptr = self.handle.as_ptr()?;
        let mut hash = btck_BlockHash { hash: [0; 32] };
        unsafe { btck_block_get_hash(ptr, &mut hash) };
        Ok(hash.into())
    }

    /// Returns the number of transactions in this block.
    pub fn transaction_count(&self) -> Result<usize, KernelError> {
        let ptr = self.handle.as_ptr()?;
        Ok(unsafe { btck_block_count_transactions(ptr) })
    }

    /// Returns the transaction at the specified index.
    ///
    /// # Arguments
    /// * `index` - The zero-based index of the transaction (0 is the coinbase)
    ///
    /// # Errors
    /// Returns [`KernelError::IndexOutOfRange`] if the index is invalid.
    pub fn transaction(&self, index: usize) -> Result<Transaction, KernelError> {
        let size = self.transaction_count()?;
        if index >= size {
            return Err(KernelError::IndexOutOfRange { index, size });
        }
        let ptr = self.handle.as_ptr()?;
        let handle = unsafe { Handle::from_raw(btck_block_get_transaction_at(ptr, index)) }
            .ok_or(KernelError::IndexOutOfRange { index, size })?;
        Ok(Transaction::from_handle(handle))
    }

    pub fn transactions(&self) -> Result<TransactionIter<'_>, KernelError> {
        Ok(Iter::new(self, self.transaction_count()?, Block::transaction))
    }

    /// Borrows the bytes the block was parsed from, without copying.
    pub fn as_serialized_view(&self) -> Result<&[u8], KernelError> {
        let ptr = self.handle.as_ptr()?;
        let mut len = 0;
        let data = unsafe { btck_block_as_bytes(ptr, &mut len) };
        if data.is_null() || len == 0 {
            return Ok(&[]);
        }
        // SAFETY: valid until the block is destroyed, which needs `&mut self`.
        Ok(unsafe { std::slice::from_raw_parts(data as *const u8, len) })
    }

    /// Consensus encodes the block to Bitcoin wire format.
    pub fn consensus_encode(&self) -> Result<Vec<u8>, KernelError> {
        let ptr = self.handle.as_ptr()?;
        c_serialize(|callback, user_data| unsafe {
            btck_block_to_bytes(ptr, Some(callback), user_data)
        })
    }
}

impl Release for Block {
    fn release(&mut self) {
        self.handle.release()
    }

    fn is_released(&self) -> bool {
        self.handle.is_released()
    }
}

impl TryFrom<&[u8]> for Block {
    type Error = KernelError;

    fn try_from(raw_block: &[u8]) -> Result<Self, Self::Error> {
        Block::new(raw_block)
    }
}

impl TryFrom<&Block> for Vec<u8> {
    type Error = KernelError;

    fn try_from(block: &Block) -> Result<Self, KernelError> {
        block.consensus_encode()
    }
}

#[cfg(test)]
mod tests {
    use bitcoin::{blockdata::constants::genesis_block, consensus::serialize, Network};

    use super::*;
    use crate::core::test_utils::{decode, test_owned_trait_requirements, SINGLE_OUTPUT_TX};

    test_owned_trait_requirements!(test_block_requirements, Block, btck_Block);

    const GENESIS_HASH: &str = "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f";

    fn genesis_bytes() -> Vec<u8> {
        serialize(&genesis_block(Network::Bitcoin))
    }

    #[test]
    fn test_block_hash_and_view() {
        let raw = genesis_bytes();
        let block = Block::try_from(raw.as_slice()).unwrap();
        assert_eq!(block.hash().unwrap().to_string(), GENESIS_HASH);
        assert_eq!(block.as_serialized_view().unwrap(), raw.as_slice());
        assert_eq!(Vec::<u8>::try_from(&block).unwrap(), raw);
    }

    #[test]
    fn test_block_transactions() {
        let block = Block::new(&genesis_bytes()).unwrap();
        assert_eq!(block.transaction_count().unwrap(), 1);

        let coinbase = block.transaction(0).unwrap();
        assert_eq!(coinbase.output(0).unwrap().amount().unwrap(), 5_000_000_000);
        assert!(matches!(
            block.transaction(1),
            Err(KernelError::IndexOutOfRange { index: 1, size: 1 })
        ));

        let mut transactions = block.transactions().unwrap();
        assert!(transactions.next().unwrap().is_ok());
        assert!(transactions.next().is_none());
        assert!(matches!(transactions.try_next(), Err(KernelError::NoSuchElement)));
    }

    #[test]
    fn test_block_without_transactions() {
        let mut raw = genesis_bytes()[..80].to_vec();
        raw.push(0x00);
        let block = Block::new(&raw).unwrap();
        assert_eq!(block.transaction_count().unwrap(), 0);
        assert!(!block.transactions().unwrap().has_next());
        assert!(matches!(
            block.transaction(0),
            Err(KernelError::IndexOutOfRange { index: 0, size: 0 })
        ));
    }

    #[test]
    fn test_malformed_block() {
        assert!(matches!(
            Block::new(&[0u8; 10]),
            Err(KernelError::ParseError { what: "Block", .. })
        ));
        let mut trailing = genesis_bytes();
        trailing.extend(decode(SINGLE_OUTPUT_TX));
        assert!(matches!(
            Block::new(&trailing),
            Err(KernelError::ParseError { .. })
        ));
    }

    #[test]
    fn test_transaction_outlives_block() {
        let mut block = Block::new(&genesis_bytes()).unwrap();
        let coinbase = block.transaction(0).unwrap();
        let expected = coinbase.as_serialized_view().unwrap().to_vec();

        block.release();
        block.release();
        assert!(matches!(block.hash(), Err(KernelError::UseAfterRelease("Block"))));
        assert!(matches!(block.transactions(), Err(KernelError::UseAfterRelease(_))));
        assert_eq!(coinbase.as_serialized_view().unwrap(), expected.as_slice());
        assert_eq!(coinbase.output_count().unwrap(), 1);
    }
}
