// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 zipc project

//! POSIX shared memory backing for the notification core.
//!
//! The condition variable is only useful once its data lives in a
//! mapping every participating process shares. This module provides the
//! segment wrapper ([`ShmSegment`]) and a purpose-built segment holding
//! exactly one `ConditionVariableData` ([`CondVarSegment`]).
//!
//! # Naming Convention
//!
//! Segment names must start with `/` and contain no other `/`.
//! Example: `/zipc_cond_d0_events`

mod condvar;
mod segment;

pub use condvar::{condvar_segment_name, CondVarSegment};
pub use segment::ShmSegment;

use std::fmt;
use std::io;

/// Errors from shared-memory segment operations
#[derive(Debug)]
pub enum ShmError {
    /// Shared memory segment creation failed
    SegmentCreate(io::Error),

    /// Shared memory segment open failed
    SegmentOpen(io::Error),

    /// Memory mapping failed
    Mmap(io::Error),

    /// Invalid segment name
    InvalidName(String),

    /// Segment not found
    NotFound(String),
}

impl fmt::Display for ShmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SegmentCreate(e) => write!(f, "Shared memory segment creation failed: {e}"),
            Self::SegmentOpen(e) => write!(f, "Shared memory segment open failed: {e}"),
            Self::Mmap(e) => write!(f, "Memory mapping failed: {e}"),
            Self::InvalidName(name) => write!(f, "Invalid segment name: {name}"),
            Self::NotFound(name) => write!(f, "Segment not found: {name}"),
        }
    }
}

impl std::error::Error for ShmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SegmentCreate(e) | Self::SegmentOpen(e) | Self::Mmap(e) => Some(e),
            Self::InvalidName(_) | Self::NotFound(_) => None,
        }
    }
}

/// Result type for shared-memory operations
pub type Result<T> = std::result::Result<T, ShmError>;
