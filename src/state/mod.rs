// Copyright (c) 2023-present The Bitcoin Kernel developers
// Licensed under the MIT License. See LICENSE file in the project root.

pub mod chain;
pub mod context;

pub use chain::{BlockIter, Chain};
pub use context::{ChainType, Context, ContextBuilder};
