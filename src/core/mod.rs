// Copyright (c) 2023-present The Bitcoin Kernel developers
// Licensed under the MIT License. See LICENSE file in the project root.

pub mod block;
pub mod iter;
pub mod script;
#[cfg(test)]
pub(crate) mod test_utils;
pub mod transaction;

pub use block::{Block, BlockHash, TransactionIter};
pub use iter::Iter;
pub use script::ScriptPubkey;
pub use transaction::{OutputIter, Transaction, TransactionOutput, Txid};
