// Copyright (c) 2023-present The Bitcoin Kernel developers
// Licensed under the MIT License. See LICENSE file in the project root.

use std::{
    ffi::c_int,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard},
};

use bitcoin::{blockdata::constants::genesis_block, hashes::Hash, BlockHash, Network};

use crate::{
    block::BlockData,
    btck_Block, btck_BlockHash, btck_ChainType,
    error::{wrap, EngineError},
    btck_Error, BTCK_CHAIN_TYPE_MAINNET, BTCK_CHAIN_TYPE_REGTEST, BTCK_CHAIN_TYPE_SIGNET,
    BTCK_CHAIN_TYPE_TESTNET, BTCK_ERROR_INVALID_ARGUMENT, BTCK_ERROR_INVALID_BLOCK,
};

/// The best chain known to a context, genesis first.
pub(crate) struct Chainstate {
    network: Network,
    blocks: RwLock<Vec<Arc<BlockData>>>,
}

impl Chainstate {
    fn new(chain_type: btck_ChainType) -> Result<Self, EngineError> {
        let network = match chain_type {
            BTCK_CHAIN_TYPE_MAINNET => Network::Bitcoin,
            BTCK_CHAIN_TYPE_TESTNET => Network::Testnet,
            BTCK_CHAIN_TYPE_SIGNET => Network::Signet,
            BTCK_CHAIN_TYPE_REGTEST => Network::Regtest,
            other => {
                return Err(EngineError::new(
                    BTCK_ERROR_INVALID_ARGUMENT,
                    format!("unknown chain type {other}"),
                ))
            }
        };
        let genesis = BlockData::from_block(genesis_block(network));
        Ok(Chainstate {
            network,
            blocks: RwLock::new(vec![Arc::new(genesis)]),
        })
    }

    fn blocks(&self) -> RwLockReadGuard<'_, Vec<Arc<BlockData>>> {
        self.blocks.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `block` to the tip. Returns false if the block is already part
    /// of the chain. Log lines are emitted after the chain lock is released.
    fn process_block(&self, block: &Arc<BlockData>) -> Result<bool, EngineError> {
        match self.connect(block) {
            Ok(Some(height)) => {
                log_info!(
                    "connected block {} at height {} on {}",
                    block.hash,
                    height,
                    self.network
                );
                Ok(true)
            }
            Ok(None) => {
                log_debug!("block {} already known", block.hash);
                Ok(false)
            }
            Err(reason) => {
                log_info!("rejected block {}: {}", block.hash, reason);
                Err(EngineError::new(
                    BTCK_ERROR_INVALID_BLOCK,
                    format!("block {}: {}", block.hash, reason),
                ))
            }
        }
    }

    /// Returns the new height, `None` for a known block, or the reason the
    /// block was rejected.
    fn connect(&self, block: &Arc<BlockData>) -> Result<Option<usize>, &'static str> {
        let mut blocks = self.blocks.write().unwrap_or_else(PoisonError::into_inner);
        if blocks.iter().any(|known| known.hash == block.hash) {
            return Ok(None);
        }

        let tip = blocks.last().map(|tip| tip.hash).unwrap_or_else(BlockHash::all_zeros);
        if block.header.prev_blockhash != tip {
            return Err("does not extend the active tip");
        }
        if block.transactions.is_empty() {
            return Err("no transactions");
        }
        if !block.merkle_root_valid {
            return Err("merkle root mismatch");
        }
        if !block.pow_valid {
            return Err("proof of work does not meet the header target");
        }

        blocks.push(Arc::clone(block));
        Ok(Some(blocks.len() - 1))
    }
}

static AMBIENT: RwLock<Option<Arc<Chainstate>>> = RwLock::new(None);

fn ambient() -> Result<Arc<Chainstate>, EngineError> {
    if let Some(chainstate) = AMBIENT.read().unwrap_or_else(PoisonError::into_inner).as_ref() {
        return Ok(Arc::clone(chainstate));
    }
    let chainstate = {
        let mut slot = AMBIENT.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(chainstate) = slot.as_ref() {
            return Ok(Arc::clone(chainstate));
        }
        let chainstate = Arc::new(Chainstate::new(BTCK_CHAIN_TYPE_MAINNET)?);
        *slot = Some(Arc::clone(&chainstate));
        chainstate
    };
    log_info!("no context configured, using mainnet");
    Ok(chainstate)
}

pub struct btck_ContextOptions {
    chain_type: btck_ChainType,
}

/// Owns a chainstate. Creating a context makes its chainstate the ambient
/// one seen by `btck_chain_create`.
pub struct btck_Context {
    chainstate: Arc<Chainstate>,
}

/// A view of a chainstate's best chain. Its size follows the chainstate.
pub struct btck_Chain {
    chainstate: Arc<Chainstate>,
}

#[no_mangle]
pub extern "C" fn btck_context_options_create() -> *mut btck_ContextOptions {
    crate::into_ptr(btck_ContextOptions {
        chain_type: BTCK_CHAIN_TYPE_MAINNET,
    })
}

#[no_mangle]
pub unsafe extern "C" fn btck_context_options_set_chain_type(
    options: *mut btck_ContextOptions,
    chain_type: btck_ChainType,
) {
    let options = &mut *options;
    options.chain_type = chain_type;
}

#[no_mangle]
pub unsafe extern "C" fn btck_context_options_destroy(options: *mut btck_ContextOptions) {
    crate::destroy(options)
}

#[no_mangle]
pub unsafe extern "C" fn btck_context_create(
    options: *const btck_ContextOptions,
    err: *mut *mut btck_Error,
) -> *mut btck_Context {
    wrap(err, std::ptr::null_mut(), || {
        let chain_type = if options.is_null() {
            BTCK_CHAIN_TYPE_MAINNET
        } else {
            let options = &*options;
            options.chain_type
        };
        let chainstate = Arc::new(Chainstate::new(chain_type)?);
        *AMBIENT.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&chainstate));
        log_info!("created context for {}", chainstate.network);
        Ok(crate::into_ptr(btck_Context { chainstate }))
    })
}

#[no_mangle]
pub unsafe extern "C" fn btck_context_destroy(context: *mut btck_Context) {
    crate::destroy(context)
}

/// Tries to append `block` to the context's chain. Returns 0 on success and
/// stores whether the block was new in `new_block`.
#[no_mangle]
pub unsafe extern "C" fn btck_context_process_block(
    context: *const btck_Context,
    block: *const btck_Block,
    new_block: *mut c_int,
    err: *mut *mut btck_Error,
) -> c_int {
    wrap(err, 1, || {
        let context = &*context;
        let block = &*block;
        let accepted = context.chainstate.process_block(&block.data)?;
        if !new_block.is_null() {
            *new_block = c_int::from(accepted);
        }
        Ok(0)
    })
}

#[no_mangle]
pub unsafe extern "C" fn btck_chain_create(err: *mut *mut btck_Error) -> *mut btck_Chain {
    wrap(err, std::ptr::null_mut(), || {
        Ok(crate::into_ptr(btck_Chain {
            chainstate: ambient()?,
        }))
    })
}

#[no_mangle]
pub unsafe extern "C" fn btck_chain_destroy(chain: *mut btck_Chain) {
    crate::destroy(chain)
}

/// Number of blocks on the chain, genesis included.
#[no_mangle]
pub unsafe extern "C" fn btck_chain_count_blocks(chain: *const btck_Chain) -> usize {
    let chain = &*chain;
    chain.chainstate.blocks().len()
}

/// Returns a new block handle for the block at `height`, or null if the
/// chain is not that long.
#[no_mangle]
pub unsafe extern "C" fn btck_chain_get_block_at(chain: *const btck_Chain, height: usize) -> *mut btck_Block {
    let chain = &*chain;
    match chain.chainstate.blocks().get(height) {
        Some(data) => crate::into_ptr(btck_Block {
            data: Arc::clone(data),
        }),
        None => std::ptr::null_mut(),
    }
}

/// Returns the height of the block with `block_hash`, or -1 if it is not on
/// the chain.
#[no_mangle]
pub unsafe extern "C" fn btck_chain_find(chain: *const btck_Chain, block_hash: *const btck_BlockHash) -> isize {
    let chain = &*chain;
    let hash = BlockHash::from_byte_array((*block_hash).hash);
    chain
        .chainstate
        .blocks()
        .iter()
        .position(|block| block.hash == hash)
        .map_or(-1, |height| height as isize)
}
