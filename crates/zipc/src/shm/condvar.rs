// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 zipc project

//! A shared-memory segment holding one condition variable.
//!
//! This is the piece that turns [`ConditionVariableData`] into an actual
//! cross-process primitive: the creator places the data in a named
//! segment, every other participant opens the same name, and waiter and
//! signaler operate on the identical physical page.

use super::{Result, ShmSegment};
use crate::notify::ConditionVariableData;

/// Deterministic segment name for a condition variable.
///
/// Format: `/zipc_cond_d{domain}_{name}` with the user-supplied part
/// sanitized for POSIX shm naming. Both sides can derive the name
/// independently, so no coordination channel is needed.
#[must_use]
pub fn condvar_segment_name(domain_id: u32, name: &str) -> String {
    let safe_name: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    format!("/zipc_cond_d{domain_id}_{safe_name}")
}

/// A mapped segment exactly one [`ConditionVariableData`] large.
///
/// The creator owns the name and should [`unlink`](Self::unlink) it on
/// teardown; attached processes just drop their mapping.
pub struct CondVarSegment {
    segment: ShmSegment,
}

impl CondVarSegment {
    /// Size of the backing segment.
    pub const SEGMENT_SIZE: usize = std::mem::size_of::<ConditionVariableData>();

    /// Create the segment and initialize the condition variable in it.
    ///
    /// # Errors
    ///
    /// Returns an error if segment creation or mapping fails.
    pub fn create(name: &str) -> Result<Self> {
        let segment = ShmSegment::create(name, Self::SEGMENT_SIZE)?;

        // SAFETY: the mapping is page-aligned (satisfies the 64-byte
        // alignment), at least SEGMENT_SIZE bytes, and exclusively ours
        // until this function returns.
        unsafe {
            segment
                .as_ptr()
                .cast::<ConditionVariableData>()
                .write(ConditionVariableData::new());
        }

        Ok(Self { segment })
    }

    /// Attach to a segment created by another process.
    ///
    /// # Errors
    ///
    /// Returns [`super::ShmError::NotFound`] if the creator has not set
    /// the segment up yet.
    pub fn open(name: &str) -> Result<Self> {
        let segment = ShmSegment::open(name, Self::SEGMENT_SIZE)?;
        Ok(Self { segment })
    }

    /// The condition variable living in the segment.
    #[inline]
    #[must_use]
    pub fn data(&self) -> &ConditionVariableData {
        // SAFETY: the mapping is page-aligned, at least SEGMENT_SIZE
        // bytes, and was initialized by create() (or zero-filled, which
        // is the same bit pattern as a fresh ConditionVariableData).
        unsafe { &*self.segment.as_ptr().cast::<ConditionVariableData>() }
    }

    /// The segment name
    #[must_use]
    pub fn name(&self) -> &str {
        self.segment.name()
    }

    /// Remove the segment name; idempotent.
    pub fn unlink(name: &str) -> Result<()> {
        ShmSegment::unlink(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{ConditionVariableSignaler, ConditionVariableWaiter};
    use std::time::Duration;

    fn unique_name(tag: &str) -> String {
        use std::time::{SystemTime, UNIX_EPOCH};
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        format!("/zipc_test_cv_{tag}_{ts}")
    }

    #[test]
    fn test_segment_name_sanitization() {
        let name = condvar_segment_name(0, "my/event/source");
        assert_eq!(name, "/zipc_cond_d0_my_event_source");

        let name2 = condvar_segment_name(42, "Hello World!");
        assert_eq!(name2, "/zipc_cond_d42_Hello_World_");
    }

    #[test]
    fn test_segment_size_is_one_cache_line() {
        assert_eq!(CondVarSegment::SEGMENT_SIZE, 64);
    }

    #[test]
    fn test_notify_crosses_mappings() {
        let name = unique_name("cross");

        // Two independent mappings of the same physical page stand in
        // for two processes.
        let creator = CondVarSegment::create(&name).expect("create failed");
        let attached = CondVarSegment::open(&name).expect("open failed");

        ConditionVariableSignaler::new(creator.data()).notify();

        let waiter = ConditionVariableWaiter::new(attached.data());
        assert!(waiter.timed_wait(Duration::from_secs(1)));

        CondVarSegment::unlink(&name).ok();
    }

    #[test]
    fn test_notification_set_crosses_mappings() {
        let name = unique_name("bitmap");

        let creator = CondVarSegment::create(&name).expect("create failed");
        let attached = CondVarSegment::open(&name).expect("open failed");

        ConditionVariableSignaler::with_index(creator.data(), 9).notify();

        let waiter = ConditionVariableWaiter::new(attached.data());
        assert_eq!(waiter.take_notifications(), 1 << 9);

        CondVarSegment::unlink(&name).ok();
    }

    #[test]
    fn test_open_before_create_fails() {
        let name = unique_name("missing");
        assert!(CondVarSegment::open(&name).is_err());
    }
}
