// Copyright (c) 2023-present The Bitcoin Kernel developers
// Licensed under the MIT License. See LICENSE file in the project root.

#![no_main]
use btck::{KernelError, Transaction};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(transaction) = Transaction::try_from(data) else {
        return;
    };

    assert_eq!(transaction.as_serialized_view().unwrap(), data);

    let serialized: Vec<u8> = (&transaction).try_into().unwrap();

    let roundtrip = Transaction::try_from(serialized.as_slice())
        .expect("Serialized transaction should deserialize");

    let reserialized: Vec<u8> = (&roundtrip).try_into().unwrap();

    assert_eq!(
        serialized, reserialized,
        "Serialization must be stable across roundtrips"
    );
    assert_eq!(transaction.txid().unwrap(), roundtrip.txid().unwrap());

    let count = transaction.output_count().unwrap();
    assert_eq!(transaction.outputs().unwrap().count(), count);

    let mut outputs = transaction.outputs().unwrap();
    for i in 0..count.min(10) {
        let output = outputs.try_next().unwrap();
        let indexed_output = transaction.output(i).unwrap();
        assert_eq!(output.amount().unwrap(), indexed_output.amount().unwrap());
        assert!(output
            .script_pubkey()
            .unwrap()
            .equals(&indexed_output.script_pubkey().unwrap())
            .unwrap());
    }
    if count <= 10 {
        assert!(matches!(outputs.try_next(), Err(KernelError::NoSuchElement)));
    }
});
