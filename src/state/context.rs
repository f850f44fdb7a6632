// Copyright (c) 2023-present The Bitcoin Kernel developers
// Licensed under the MIT License. See LICENSE file in the project root.

use btck_sys::{
    btck_ChainType, btck_Context, btck_ContextOptions, btck_Error, btck_context_create,
    btck_context_destroy, btck_context_options_create, btck_context_options_destroy,
    btck_context_options_set_chain_type, btck_context_process_block, BTCK_CHAIN_TYPE_MAINNET,
    BTCK_CHAIN_TYPE_REGTEST, BTCK_CHAIN_TYPE_SIGNET, BTCK_CHAIN_TYPE_TESTNET,
};

use crate::{
    ffi::{c_helpers, Handle, NativeResource, Release},
    take_engine_error, Block, KernelError,
};

impl NativeResource for btck_Context {
    const NAME: &'static str = "Context";

    unsafe fn destroy(ptr: *mut Self) {
        btck_context_destroy(ptr)
    }
}

/// The engine context. This should be setup through the [`ContextBuilder`].
///
/// Building a context makes its chainstate the one every [`Chain`](crate::Chain)
/// created afterwards views. The chainstate starts out holding only the
/// genesis block of the configured network.
#[derive(Debug)]
pub struct Context {
    handle: Handle<btck_Context>,
}

impl Context {
    /// Appends `block` to the tip of the context's chain.
    ///
    /// Returns `Ok(true)` if the block was connected and `Ok(false)` if it
    /// was already part of the chain.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::InvalidBlock`] if the block does not build on
    /// the current tip, has no transactions, commits to the wrong merkle root
    /// or fails its own proof-of-work target.
    pub fn process_block(&self, block: &Block) -> Result<bool, KernelError> {
        let context = self.handle.as_ptr()?;
        let block_ptr = block.as_ptr()?;
        let mut new_block = 0;
        let mut err: *mut btck_Error = std::ptr::null_mut();
        let result =
            unsafe { btck_context_process_block(context, block_ptr, &mut new_block, &mut err) };
        if !c_helpers::success(result) {
            return Err(unsafe { take_engine_error(err, "Block") });
        }
        Ok(c_helpers::present(new_block))
    }
}

impl Release for Context {
    fn release(&mut self) {
        self.handle.release()
    }

    fn is_released(&self) -> bool {
        self.handle.is_released()
    }
}

/// Builder struct for the [`Context`].
///
/// The builder by default configures for mainnet.
pub struct ContextBuilder {
    inner: *mut btck_ContextOptions,
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextBuilder {
    pub fn new() -> ContextBuilder {
        ContextBuilder {
            inner: btck_context_options_create(),
        }
    }

    /// Sets the chain type
    pub fn chain_type(self, chain_type: ChainType) -> ContextBuilder {
        unsafe { btck_context_options_set_chain_type(self.inner, chain_type.into()) };
        self
    }

    /// Consumes the builder and creates a [`Context`].
    ///
    /// # Errors
    ///
    /// Returns the engine's error if the [`Context`] could not be created.
    pub fn build(self) -> Result<Context, KernelError> {
        let options = self.inner;
        let handle = Handle::create(|err| unsafe { btck_context_create(options, err) })?;
        log::debug!("built context");
        Ok(Context { handle })
    }
}

impl Drop for ContextBuilder {
    fn drop(&mut self) {
        unsafe { btck_context_options_destroy(self.inner) }
    }
}

/// Bitcoin network chain types.
///
/// Specifies which Bitcoin network the engine should operate on.
/// Each chain type has its own genesis block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ChainType {
    /// Bitcoin mainnet - the production network
    Mainnet = BTCK_CHAIN_TYPE_MAINNET,
    /// Bitcoin testnet - the original test network
    Testnet = BTCK_CHAIN_TYPE_TESTNET,
    /// Bitcoin signet - signed test network
    Signet = BTCK_CHAIN_TYPE_SIGNET,
    /// Regression test network for local development
    Regtest = BTCK_CHAIN_TYPE_REGTEST,
}

impl From<ChainType> for btck_ChainType {
    fn from(chain_type: ChainType) -> Self {
        chain_type as btck_ChainType
    }
}

impl TryFrom<btck_ChainType> for ChainType {
    type Error = KernelError;

    fn try_from(value: btck_ChainType) -> Result<Self, Self::Error> {
        match value {
            BTCK_CHAIN_TYPE_MAINNET => Ok(ChainType::Mainnet),
            BTCK_CHAIN_TYPE_TESTNET => Ok(ChainType::Testnet),
            BTCK_CHAIN_TYPE_SIGNET => Ok(ChainType::Signet),
            BTCK_CHAIN_TYPE_REGTEST => Ok(ChainType::Regtest),
            _ => Err(KernelError::Internal(format!("Unknown chain type: {value}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_type_conversions() {
        for chain_type in [
            ChainType::Mainnet,
            ChainType::Testnet,
            ChainType::Signet,
            ChainType::Regtest,
        ] {
            let raw: btck_ChainType = chain_type.into();
            assert_eq!(ChainType::try_from(raw).unwrap(), chain_type);
        }
        assert!(ChainType::try_from(2 as btck_ChainType).is_err());
    }

    #[test]
    fn test_builder_drop_without_build() {
        let _builder = ContextBuilder::new().chain_type(ChainType::Signet);
    }
}
