// Copyright (c) 2023-present The Bitcoin Kernel developers
// Licensed under the MIT License. See LICENSE file in the project root.

use std::ffi::c_void;

use btck_sys::{
    btck_ScriptPubkey, btck_script_pubkey_create, btck_script_pubkey_destroy,
    btck_script_pubkey_equals, btck_script_pubkey_to_bytes,
};

use crate::{
    c_serialize,
    ffi::{c_helpers::present, Handle, NativeResource, Release},
    KernelError,
};

impl NativeResource for btck_ScriptPubkey {
    const NAME: &'static str = "ScriptPubkey";

    unsafe fn destroy(ptr: *mut Self) {
        btck_script_pubkey_destroy(ptr)
    }
}

/// A single script pubkey containing spending conditions for a transaction output.
///
/// Script pubkeys can be created from raw script bytes or retrieved from existing
/// transaction outputs.
#[derive(Debug)]
pub struct ScriptPubkey {
    handle: Handle<btck_ScriptPubkey>,
}

impl ScriptPubkey {
    pub fn new(script_bytes: &[u8]) -> Result<Self, KernelError> {
        let handle = Handle::create(|err| unsafe {
            btck_script_pubkey_create(
                script_bytes.as_ptr() as *const c_void,
                script_bytes.len(),
                err,
            )
        })?;
        Ok(ScriptPubkey { handle })
    }

    pub(crate) fn from_handle(handle: Handle<btck_ScriptPubkey>) -> Self {
        ScriptPubkey { handle }
    }

    /// Hands the engine resource over to a consuming engine call.
    pub(crate) fn into_raw(self) -> Result<*mut btck_ScriptPubkey, KernelError> {
        self.handle.into_raw()
    }

    /// Compares the two scripts inside the engine.
    pub fn equals(&self, other: &ScriptPubkey) -> Result<bool, KernelError> {
        let left = self.handle.as_ptr()?;
        let right = other.handle.as_ptr()?;
        Ok(present(unsafe { btck_script_pubkey_equals(left, right) }))
    }

    /// Serializes the script to raw bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, KernelError> {
        let ptr = self.handle.as_ptr()?;
        c_serialize(|callback, user_data| unsafe {
            btck_script_pubkey_to_bytes(ptr, Some(callback), user_data)
        })
    }
}

impl Release for ScriptPubkey {
    fn release(&mut self) {
        self.handle.release()
    }

    fn is_released(&self) -> bool {
        self.handle.is_released()
    }
}

impl TryFrom<&[u8]> for ScriptPubkey {
    type Error = KernelError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        ScriptPubkey::new(bytes)
    }
}

impl TryFrom<&ScriptPubkey> for Vec<u8> {
    type Error = KernelError;

    fn try_from(script: &ScriptPubkey) -> Result<Self, Self::Error> {
        script.to_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_utils::{decode, test_owned_trait_requirements, P2PKH_SCRIPT};

    test_owned_trait_requirements!(test_script_pubkey_requirements, ScriptPubkey, btck_ScriptPubkey);

    #[test]
    fn test_script_pubkey_roundtrip() {
        let raw = decode(P2PKH_SCRIPT);
        let script = ScriptPubkey::try_from(raw.as_slice()).unwrap();
        assert_eq!(script.to_bytes().unwrap(), raw);
        assert_eq!(Vec::<u8>::try_from(&script).unwrap(), raw);
    }

    #[test]
    fn test_empty_script_is_valid() {
        let script = ScriptPubkey::new(&[]).unwrap();
        assert!(script.to_bytes().unwrap().is_empty());
    }

    #[test]
    fn test_oversized_script_is_rejected() {
        let raw = vec![0x51; btck_sys::MAX_SCRIPT_SIZE + 1];
        assert!(matches!(
            ScriptPubkey::new(&raw),
            Err(KernelError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn test_equals() {
        let raw = decode(P2PKH_SCRIPT);
        let a = ScriptPubkey::new(&raw).unwrap();
        let b = ScriptPubkey::new(&raw).unwrap();
        let c = ScriptPubkey::new(&raw[1..]).unwrap();
        assert!(a.equals(&b).unwrap());
        assert!(a.equals(&a).unwrap());
        assert!(!a.equals(&c).unwrap());
    }

    #[test]
    fn test_use_after_release() {
        let raw = decode(P2PKH_SCRIPT);
        let mut script = ScriptPubkey::new(&raw).unwrap();
        let other = ScriptPubkey::new(&raw).unwrap();

        script.release();
        script.release();
        assert!(script.is_released());
        assert!(matches!(
            script.to_bytes(),
            Err(KernelError::UseAfterRelease("ScriptPubkey"))
        ));
        assert!(matches!(
            script.equals(&other),
            Err(KernelError::UseAfterRelease(_))
        ));
        assert!(matches!(
            other.equals(&script),
            Err(KernelError::UseAfterRelease(_))
        ));
    }
}
