// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 zipc project

//! Event notification across process boundaries.
//!
//! Native thread-synchronization primitives assume a single address space:
//! a `std::sync::Condvar` placed in a shared-memory segment is meaningless
//! to the process on the other side of the mapping. This module builds the
//! notify/wait primitive from the only state that *is* valid everywhere -
//! atomic words in the mapped segment plus the SHARED futex syscall - and
//! layers the trigger handle abstraction on top:
//!
//! - [`ConditionVariableData`]: the mapped wake state (futex word +
//!   notification-set bitmap), bit-identical in every process.
//! - [`ConditionVariableWaiter`] / [`ConditionVariableSignaler`]: the
//!   block and wake halves over that data.
//! - [`TriggerState`] / [`Trigger`]: a type-erased, invalidatable handle
//!   binding an origin object's condition to a condition variable. This is
//!   the unit a WaitSet/Listener layer stores and deduplicates.

mod condition_variable;
mod futex;
mod trigger;

pub use condition_variable::{
    ConditionVariableData, ConditionVariableSignaler, ConditionVariableWaiter, WakePolicy,
    MAX_NOTIFIERS,
};
pub use futex::{futex_wait, futex_wake, futex_wake_all, futex_wake_one};
pub use trigger::{
    HasTriggeredCallback, ResetCallback, Trigger, TriggerState, INVALID_TRIGGER_ID,
};

/// A boolean condition that can be attached to a condition variable.
///
/// This is the capability a WaitSet/Listener layer stores and the C
/// binding's condition handle abstracts over. [`Trigger`] is the primary
/// implementation; the C crate adds a standalone guard-style one.
///
/// Both probes are non-blocking and must stay safe to call while a wait
/// on the attached condition variable is in progress elsewhere.
pub trait Condition {
    /// Current value of the condition's predicate.
    ///
    /// Returns `false` for a condition that has been invalidated or was
    /// never fully configured.
    fn has_triggered(&self) -> bool;

    /// Whether a live [`ConditionVariableData`] is currently bound.
    fn is_condition_variable_attached(&self) -> bool;
}
