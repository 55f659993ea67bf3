// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 zipc project

//! Logging initialization for the ZIPC C FFI

use crate::ZipcError;

/// Log level for zipc logging
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZipcLogLevel {
    ZipcLogOff = 0,
    ZipcLogError = 1,
    ZipcLogWarn = 2,
    ZipcLogInfo = 3,
    ZipcLogDebug = 4,
    ZipcLogTrace = 5,
}

impl From<ZipcLogLevel> for log::LevelFilter {
    fn from(level: ZipcLogLevel) -> Self {
        match level {
            ZipcLogLevel::ZipcLogOff => log::LevelFilter::Off,
            ZipcLogLevel::ZipcLogError => log::LevelFilter::Error,
            ZipcLogLevel::ZipcLogWarn => log::LevelFilter::Warn,
            ZipcLogLevel::ZipcLogInfo => log::LevelFilter::Info,
            ZipcLogLevel::ZipcLogDebug => log::LevelFilter::Debug,
            ZipcLogLevel::ZipcLogTrace => log::LevelFilter::Trace,
        }
    }
}

/// Initialize zipc logging with console output
///
/// # Safety
/// Must be called from a single thread during initialization.
///
/// # Arguments
/// * `level` - Minimum log level to display
///
/// # Returns
/// `ZipcError::ZipcOk` on success, `ZipcError::ZipcOperationFailed` if
/// already initialized
///
/// # Example (C)
/// ```c
/// zipc_logging_init(ZIPC_LOG_INFO);
/// ```
#[no_mangle]
pub unsafe extern "C" fn zipc_logging_init(level: ZipcLogLevel) -> ZipcError {
    let filter: log::LevelFilter = level.into();

    match env_logger::Builder::new()
        .filter_level(filter)
        .format_timestamp_millis()
        .try_init()
    {
        Ok(()) => ZipcError::ZipcOk,
        Err(_) => ZipcError::ZipcOperationFailed, // Already initialized
    }
}

/// Initialize zipc logging with environment variable override
///
/// Reads the `RUST_LOG` environment variable if set, otherwise uses the
/// provided level.
///
/// # Safety
/// Must be called from a single thread during initialization.
///
/// # Arguments
/// * `default_level` - Default log level if `RUST_LOG` is not set
///
/// # Returns
/// `ZipcError::ZipcOk` on success
#[no_mangle]
pub unsafe extern "C" fn zipc_logging_init_env(default_level: ZipcLogLevel) -> ZipcError {
    let filter: log::LevelFilter = default_level.into();

    match env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(filter.to_string()),
    )
    .format_timestamp_millis()
    .try_init()
    {
        Ok(()) => ZipcError::ZipcOk,
        Err(_) => ZipcError::ZipcOperationFailed,
    }
}
