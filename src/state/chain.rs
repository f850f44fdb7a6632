// Copyright (c) 2023-present The Bitcoin Kernel developers
// Licensed under the MIT License. See LICENSE file in the project root.

//! Read-only access to the engine's best chain.
//!
//! The [`Chain`] is a view onto the chainstate of the most recently built
//! [`Context`](crate::Context). Blocks are looked up by height, from the
//! genesis block at height 0 to the tip.

use btck_sys::{
    btck_BlockHash, btck_Chain, btck_chain_count_blocks, btck_chain_create, btck_chain_destroy,
    btck_chain_find, btck_chain_get_block_at,
};

use crate::{
    core::Iter,
    ffi::{Handle, NativeResource, Release},
    Block, BlockHash, KernelError,
};

impl NativeResource for btck_Chain {
    const NAME: &'static str = "Chain";

    unsafe fn destroy(ptr: *mut Self) {
        btck_chain_destroy(ptr)
    }
}

/// Traversal over the blocks of a [`Chain`], genesis first.
///
/// The chain length is read once when the traversal starts. Blocks connected
/// while it runs are only seen by the next traversal.
pub type BlockIter<'a> = Iter<'a, Chain, Block>;

/// The best chain known to the engine.
///
/// If no [`Context`](crate::Context) was built before, the engine sets up a
/// mainnet chainstate on first use.
#[derive(Debug)]
pub struct Chain {
    handle: Handle<btck_Chain>,
}

impl Chain {
    pub fn new() -> Result<Self, KernelError> {
        let handle = Handle::create(|err| unsafe { btck_chain_create(err) })?;
        Ok(Chain { handle })
    }

    /// Returns the number of blocks on the chain, genesis included.
    ///
    /// The value is read from the engine on every call.
    pub fn block_count(&self) -> Result<usize, KernelError> {
        let ptr = self.handle.as_ptr()?;
        Ok(unsafe { btck_chain_count_blocks(ptr) })
    }

    /// Returns the block at `height`.
    pub fn block(&self, height: usize) -> Result<Block, KernelError> {
        let size = self.block_count()?;
        if height >= size {
            return Err(KernelError::IndexOutOfRange {
                index: height,
                size,
            });
        }
        let ptr = self.handle.as_ptr()?;
        let handle = unsafe { Handle::from_raw(btck_chain_get_block_at(ptr, height)) }.ok_or(
            KernelError::IndexOutOfRange {
                index: height,
                size,
            },
        )?;
        Ok(Block::from_handle(handle))
    }

    pub fn blocks(&self) -> Result<BlockIter<'_>, KernelError> {
        Ok(Iter::new(self, self.block_count()?, Chain::block))
    }

    /// Returns the height of the block with `hash`, or `None` if it is not
    /// on the chain.
    pub fn find(&self, hash: &BlockHash) -> Result<Option<usize>, KernelError> {
        let ptr = self.handle.as_ptr()?;
        let hash = btck_BlockHash::from(hash);
        let height = unsafe { btck_chain_find(ptr, &hash) };
        Ok(usize::try_from(height).ok())
    }
}

impl Release for Chain {
    fn release(&mut self) {
        self.handle.release()
    }

    fn is_released(&self) -> bool {
        self.handle.is_released()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_utils::test_owned_trait_requirements;

    test_owned_trait_requirements!(test_chain_requirements, Chain, btck_Chain);
}
