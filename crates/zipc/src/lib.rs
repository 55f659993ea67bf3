// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 zipc project

//! # ZIPC - Zero-copy shared-memory IPC
//!
//! A shared-memory inter-process communication middleware for same-host,
//! low-latency messaging. This crate contains the event-notification core:
//! a condition variable that works *across process boundaries* over a
//! memory-mapped segment, and the trigger handle abstraction that lets an
//! origin object (a queue, a subscriber port, a guard flag) wake a waiter
//! in another process when its condition becomes true.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use zipc::{ConditionVariableData, ConditionVariableSignaler, ConditionVariableWaiter};
//!
//! // In production the data lives in a shared-memory segment
//! // (see `zipc::shm::CondVarSegment`); a local instance behaves the same.
//! let data = ConditionVariableData::new();
//!
//! std::thread::scope(|s| {
//!     s.spawn(|| ConditionVariableSignaler::new(&data).notify());
//!
//!     let waiter = ConditionVariableWaiter::new(&data);
//!     assert!(waiter.timed_wait(Duration::from_secs(1)));
//! });
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +------------------+               +------------------+
//! |   Process A      |    Shared     |   Process B      |
//! |   origin object  |    Memory     |   event loop     |
//! |        |         |    (mmap)     |        |         |
//! |        v         |               |        v         |
//! |   Trigger ------ + ------------- + -> Waiter        |
//! +------------------+    Futex      +------------------+
//!                         (wake)
//! ```
//!
//! The origin constructs a [`Trigger`] bound to its own `has_triggered`
//! predicate and to a [`ConditionVariableData`] placed in shared memory.
//! When the origin's state changes it calls [`Trigger::trigger`], which
//! wakes every [`ConditionVariableWaiter`] blocked on the same data. The
//! woken side then polls its registered triggers' [`Trigger::has_triggered`]
//! to find out which condition fired.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ConditionVariableData`] | Shared-memory wake state, one cache line, atomics only |
//! | [`ConditionVariableWaiter`] | Blocks until notified or timed out |
//! | [`ConditionVariableSignaler`] | Wakes waiters; callable from any thread/process |
//! | [`Trigger`] | Live binding between an origin's condition and a condition variable |
//! | [`TriggerState`] | Identity/callback snapshot a [`Trigger`] extends |
//!
//! ## Modules Overview
//!
//! - [`notify`] - condition variable, triggers, the [`Condition`] seam
//! - [`shm`] - POSIX shared-memory segments backing the condition variable

/// Event notification core (condition variable, triggers).
pub mod notify;
/// POSIX shared-memory segment management.
pub mod shm;

pub use notify::{
    Condition, ConditionVariableData, ConditionVariableSignaler, ConditionVariableWaiter,
    HasTriggeredCallback, ResetCallback, Trigger, TriggerState, WakePolicy, INVALID_TRIGGER_ID,
    MAX_NOTIFIERS,
};
pub use shm::{CondVarSegment, ShmError, ShmSegment};
