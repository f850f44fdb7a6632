// Copyright (c) 2023-present The Bitcoin Kernel developers
// Licensed under the MIT License. See LICENSE file in the project root.

pub mod c_helpers;
pub mod handle;

pub use handle::{Handle, NativeResource, Release};
