// Copyright (c) 2023-present The Bitcoin Kernel developers
// Licensed under the MIT License. See LICENSE file in the project root.

use std::ffi::c_char;

/// Returns true if the C return code indicates success (0).
#[inline]
pub fn success(code: i32) -> bool {
    code == 0
}

/// Returns true if the C return code indicates a present/found state (non-zero).
#[inline]
pub fn present(code: i32) -> bool {
    code != 0
}

/// Converts success status to C result code (0 for success, 1 for failure).
#[inline]
pub fn to_c_result(success: bool) -> i32 {
    if success {
        0
    } else {
        1
    }
}

pub unsafe fn to_string(c_str: *const c_char, len: usize) -> String {
    if !c_str.is_null() {
        let slice = std::slice::from_raw_parts(c_str as *const u8, len);
        String::from_utf8_lossy(slice).into_owned()
    } else {
        "".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_codes() {
        assert!(success(0));
        assert!(!success(1));
        assert!(present(1));
        assert!(!present(0));
        assert_eq!(to_c_result(true), 0);
        assert_eq!(to_c_result(false), 1);
    }

    #[test]
    fn test_to_string() {
        let message = "connected block";
        let converted = unsafe { to_string(message.as_ptr() as *const c_char, message.len()) };
        assert_eq!(converted, message);
        assert_eq!(unsafe { to_string(std::ptr::null(), 5) }, "");
    }
}
