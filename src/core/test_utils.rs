// Copyright (c) 2023-present The Bitcoin Kernel developers
// Licensed under the MIT License. See LICENSE file in the project root.

macro_rules! test_owned_trait_requirements {
    ($test_name:ident, $owned:ty, $ffi_type:ty) => {
        #[test]
        fn $test_name() {
            use crate::ffi::{NativeResource, Release};

            fn assert_send_sync<T: Send + Sync>() {}
            fn assert_debug<T: std::fmt::Debug>() {}
            fn assert_release<T: Release>() {}
            fn assert_native<T: NativeResource>() {}

            assert_send_sync::<$owned>();
            assert_debug::<$owned>();
            assert_release::<$owned>();
            assert_native::<$ffi_type>();
        }
    };
}

pub(crate) use test_owned_trait_requirements;

/// A legacy transaction with one input and one P2PKH output of 50 BTC.
pub(crate) const SINGLE_OUTPUT_TX: &str = "0100000001000000000000000000000000000000000000000000000000\
0000000000000000ffffffff0704ffff001d0104ffffffff0100f2052a0100000019\
76a914000102030405060708090a0b0c0d0e0f1011121388ac00000000";

/// The script pubkey of the single output of [`SINGLE_OUTPUT_TX`].
pub(crate) const P2PKH_SCRIPT: &str = "76a914000102030405060708090a0b0c0d0e0f1011121388ac";

pub(crate) fn decode(hex_str: &str) -> Vec<u8> {
    hex::decode(hex_str).unwrap()
}
