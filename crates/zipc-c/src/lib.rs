// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 zipc project

//! # ZIPC C FFI Bindings
//!
//! C-compatible bindings for the zipc event-notification core: condition
//! variable segments and condition capabilities.
//!
//! # Safety
//!
//! All public functions are `unsafe` and require the caller to uphold
//! the invariants documented in each function's safety comment. The two
//! read-only probes (`zipc_cond_has_triggered`,
//! `zipc_cond_is_condition_variable_attached`) are defined for null and
//! stale handles and answer `false` instead of aborting.

mod condition_ffi;
mod logging;

pub use condition_ffi::*;
pub use logging::*;

/// Opaque handle to a mapped condition variable segment
#[repr(C)]
pub struct ZipcCondVar {
    _private: [u8; 0],
}

/// Opaque handle to a condition capability
#[repr(C)]
pub struct ZipcCondition {
    _private: [u8; 0],
}

/// Status codes returned by zipc C API functions
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZipcError {
    /// Operation completed successfully
    ZipcOk = 0,
    /// Invalid argument provided (null pointer, invalid value)
    ZipcInvalidArgument = 1,
    /// Requested resource not found
    ZipcNotFound = 2,
    /// Generic operation failure
    ZipcOperationFailed = 3,
}
