// Copyright (c) 2023-present The Bitcoin Kernel developers
// Licensed under the MIT License. See LICENSE file in the project root.

#![no_main]

use btck::Block;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(block) = Block::try_from(data) else {
        return;
    };

    assert_eq!(block.as_serialized_view().unwrap(), data);

    let serialized: Vec<u8> = (&block).try_into().unwrap();
    let roundtrip =
        Block::try_from(serialized.as_slice()).expect("Serialized block should deserialize");
    let reserialized: Vec<u8> = (&roundtrip).try_into().unwrap();

    assert_eq!(
        serialized, reserialized,
        "Serialization must be stable across roundtrips"
    );
    assert_eq!(block.hash().unwrap(), roundtrip.hash().unwrap());

    let count = block.transaction_count().unwrap();
    assert_eq!(block.transactions().unwrap().count(), count);
    for transaction in block.transactions().unwrap().take(10) {
        let transaction = transaction.unwrap();
        assert!(!transaction.as_serialized_view().unwrap().is_empty());
    }
});
