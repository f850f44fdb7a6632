// Copyright (c) 2023-present The Bitcoin Kernel developers
// Licensed under the MIT License. See LICENSE file in the project root.

use std::ffi::{c_char, c_void};

use btck_sys::{
    btck_LogLevel, btck_LoggingConnection, btck_logging_connection_create,
    btck_logging_connection_destroy, btck_logging_set_level, BTCK_LOG_LEVEL_DEBUG,
    BTCK_LOG_LEVEL_INFO, BTCK_LOG_LEVEL_TRACE,
};

use crate::{ffi::c_helpers, KernelError};

/// A function for handling log messages produced by the engine.
///
/// Lines may arrive from whichever thread made the engine call that logged
/// them. The engine holds none of its locks while a line is delivered, so
/// `log` may itself call into the engine.
pub trait Log {
    fn log(&self, message: &str);
}

unsafe extern "C" fn log_callback<T: Log + 'static>(
    user_data: *mut c_void,
    message: *const c_char,
    message_len: usize,
) {
    let message = unsafe { c_helpers::to_string(message, message_len) };
    let log = user_data as *mut T;
    (*log).log(&message);
}

unsafe extern "C" fn destroy_log_callback<T>(user_data: *mut c_void) {
    if !user_data.is_null() {
        let _ = Box::from_raw(user_data as *mut T);
    }
}

/// The logger object forwards engine log lines into a user-defined log
/// function. Several loggers may be connected at once; each receives every
/// line that passes the global level. Dropping the logger disconnects it.
pub struct Logger {
    inner: *mut btck_LoggingConnection,
}

impl Drop for Logger {
    fn drop(&mut self) {
        unsafe {
            btck_logging_connection_destroy(self.inner);
        }
    }
}

impl Logger {
    /// Connects `log` to the engine. It stays connected until the returned
    /// logger is dropped.
    pub fn new<T: Log + Send + Sync + 'static>(log: T) -> Result<Logger, KernelError> {
        let log_ptr = Box::into_raw(Box::new(log));

        let inner = unsafe {
            btck_logging_connection_create(
                Some(log_callback::<T>),
                log_ptr as *mut c_void,
                Some(destroy_log_callback::<T>),
            )
        };

        if inner.is_null() {
            drop(unsafe { Box::from_raw(log_ptr) });
            return Err(KernelError::Internal(
                "engine refused the logging connection".to_string(),
            ));
        }

        Ok(Logger { inner })
    }

    /// Sets the minimum level of the lines the engine emits. The level is
    /// shared by all loggers.
    pub fn set_level(&self, level: LogLevel) {
        btck_logging_set_level(level.into());
    }
}

/// Severity of an engine log line. Setting a level lets through that level
/// and everything above it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    /// Handle lifecycle and per-object construction
    Trace = BTCK_LOG_LEVEL_TRACE,
    /// Failed engine calls and parse results
    Debug = BTCK_LOG_LEVEL_DEBUG,
    /// Chain and context events
    Info = BTCK_LOG_LEVEL_INFO,
}

impl From<LogLevel> for btck_LogLevel {
    fn from(level: LogLevel) -> Self {
        level as btck_LogLevel
    }
}

impl TryFrom<btck_LogLevel> for LogLevel {
    type Error = KernelError;

    fn try_from(value: btck_LogLevel) -> Result<Self, Self::Error> {
        match value {
            BTCK_LOG_LEVEL_TRACE => Ok(LogLevel::Trace),
            BTCK_LOG_LEVEL_DEBUG => Ok(LogLevel::Debug),
            BTCK_LOG_LEVEL_INFO => Ok(LogLevel::Info),
            _ => Err(KernelError::Internal(format!("Unknown log level: {value}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_conversions() {
        for level in [LogLevel::Trace, LogLevel::Debug, LogLevel::Info] {
            let raw: btck_LogLevel = level.into();
            assert_eq!(LogLevel::try_from(raw).unwrap(), level);
        }
        assert!(LogLevel::try_from(7 as btck_LogLevel).is_err());
        assert!(LogLevel::Trace < LogLevel::Info);
    }
}
