// Copyright (c) 2023-present The Bitcoin Kernel developers
// Licensed under the MIT License. See LICENSE file in the project root.

use std::{
    ffi::{c_char, c_void},
    fmt,
    sync::{
        atomic::{AtomicU64, AtomicU8, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use crate::{btck_LogLevel, BTCK_LOG_LEVEL_DEBUG, BTCK_LOG_LEVEL_INFO, BTCK_LOG_LEVEL_TRACE};

pub type btck_LogCallback =
    Option<unsafe extern "C" fn(user_data: *mut c_void, message: *const c_char, message_len: usize)>;
pub type btck_DestroyCallback = Option<unsafe extern "C" fn(user_data: *mut c_void)>;

/// A registered log sink. Destroying it unregisters the callback and hands
/// the user data back to its destroy callback.
pub struct btck_LoggingConnection {
    id: u64,
}

struct Connection {
    id: u64,
    callback: unsafe extern "C" fn(*mut c_void, *const c_char, usize),
    user_data: *mut c_void,
    destroy: btck_DestroyCallback,
}

// Sinks registered through the facade are `Send + Sync`.
unsafe impl Send for Connection {}
unsafe impl Sync for Connection {}

/// Runs the destroy callback once the last dispatch holding the connection
/// has finished.
impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(destroy) = self.destroy {
            unsafe { destroy(self.user_data) }
        }
    }
}

static CONNECTIONS: Mutex<Vec<Arc<Connection>>> = Mutex::new(Vec::new());
static NEXT_ID: AtomicU64 = AtomicU64::new(0);
static LEVEL: AtomicU8 = AtomicU8::new(BTCK_LOG_LEVEL_INFO);

fn connections() -> MutexGuard<'static, Vec<Arc<Connection>>> {
    CONNECTIONS.lock().unwrap_or_else(PoisonError::into_inner)
}

fn level_name(level: btck_LogLevel) -> &'static str {
    match level {
        BTCK_LOG_LEVEL_TRACE => "trace",
        BTCK_LOG_LEVEL_DEBUG => "debug",
        _ => "info",
    }
}

/// Dispatches one log line to every connection. No engine lock is held
/// while callbacks run, so a callback may call back into the engine.
pub(crate) fn emit(level: btck_LogLevel, args: fmt::Arguments<'_>) {
    if level < LEVEL.load(Ordering::Relaxed) {
        return;
    }
    let connections: Vec<Arc<Connection>> = connections().clone();
    if connections.is_empty() {
        return;
    }
    let line = format!("[{}] {}", level_name(level), args);
    for connection in connections.iter() {
        unsafe {
            (connection.callback)(
                connection.user_data,
                line.as_ptr() as *const c_char,
                line.len(),
            )
        };
    }
}

macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logging::emit($crate::BTCK_LOG_LEVEL_INFO, format_args!($($arg)*))
    };
}

macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::logging::emit($crate::BTCK_LOG_LEVEL_DEBUG, format_args!($($arg)*))
    };
}

macro_rules! log_trace {
    ($($arg:tt)*) => {
        $crate::logging::emit($crate::BTCK_LOG_LEVEL_TRACE, format_args!($($arg)*))
    };
}

#[no_mangle]
pub unsafe extern "C" fn btck_logging_connection_create(
    callback: btck_LogCallback,
    user_data: *mut c_void,
    destroy: btck_DestroyCallback,
) -> *mut btck_LoggingConnection {
    let Some(callback) = callback else {
        return std::ptr::null_mut();
    };
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    connections().push(Arc::new(Connection {
        id,
        callback,
        user_data,
        destroy,
    }));
    crate::into_ptr(btck_LoggingConnection { id })
}

#[no_mangle]
pub unsafe extern "C" fn btck_logging_connection_destroy(connection: *mut btck_LoggingConnection) {
    if connection.is_null() {
        return;
    }
    let connection = Box::from_raw(connection);
    let removed = {
        let mut connections = connections();
        connections
            .iter()
            .position(|c| c.id == connection.id)
            .map(|index| connections.remove(index))
    };
    drop(removed);
}

/// Sets the minimum level a line needs to be dispatched.
#[no_mangle]
pub extern "C" fn btck_logging_set_level(level: btck_LogLevel) {
    LEVEL.store(level, Ordering::Relaxed);
}
