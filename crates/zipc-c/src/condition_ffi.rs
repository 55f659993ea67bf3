// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 zipc project

//! FFI bindings for condition variable segments and condition handles.
//!
//! A `ZipcCondVar` owns one mapping of a named condition variable
//! segment. A `ZipcCondition` is an opaque capability over anything
//! implementing the core `Condition` seam; the C-constructible
//! implementation is a guard-style condition (an application-controlled
//! flag optionally attached to a condition variable).

use std::ffi::CStr;
use std::os::raw::c_char;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};
use std::time::Duration;

use zipc::notify::{Condition, ConditionVariableSignaler, ConditionVariableWaiter};
use zipc::shm::CondVarSegment;
use zipc::ConditionVariableData;

use crate::{ZipcCondVar, ZipcCondition, ZipcError};

// =============================================================================
// Internal wrappers
// =============================================================================

/// Conditions reachable from C: the core `Condition` probes plus the
/// manual trigger entry point.
trait ForeignConditionOps: Condition {
    fn trigger(&self);
    fn clear(&self);
    fn detach_condition_variable(&self);
}

/// The boxed capability a `ZipcCondition` handle points at.
struct ForeignCondition {
    inner: Box<dyn ForeignConditionOps + Send + Sync>,
}

/// Guard-style condition: trigger value under application control,
/// optionally attached to a condition variable it notifies on trigger.
struct ForeignGuardCondition {
    triggered: AtomicBool,
    /// Points into the mapping of a `ZipcCondVar`; null when detached.
    cond_var: AtomicPtr<ConditionVariableData>,
}

impl Condition for ForeignGuardCondition {
    fn has_triggered(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }

    fn is_condition_variable_attached(&self) -> bool {
        !self.cond_var.load(Ordering::Acquire).is_null()
    }
}

impl ForeignConditionOps for ForeignGuardCondition {
    fn trigger(&self) {
        self.triggered.store(true, Ordering::Release);
        let data = self.cond_var.load(Ordering::Acquire);
        if !data.is_null() {
            // SAFETY: the attach contract requires the condition variable
            // handle to outlive this condition (or be detached first).
            ConditionVariableSignaler::new(unsafe { &*data }).notify();
        }
    }

    fn clear(&self) {
        self.triggered.store(false, Ordering::Release);
    }

    fn detach_condition_variable(&self) {
        self.cond_var.store(ptr::null_mut(), Ordering::Release);
    }
}

// =============================================================================
// Condition variable segment lifecycle
// =============================================================================

/// Create a named condition variable segment and map it.
///
/// Replaces any leftover segment with the same name. The returned handle
/// owns the mapping; free it with `zipc_cond_var_delete` and remove the
/// name with `zipc_cond_var_unlink`.
///
/// # Safety
///
/// - `name` must be a valid null-terminated C string (POSIX shm name,
///   e.g. `/zipc_cond_d0_events`)
#[no_mangle]
pub unsafe extern "C" fn zipc_cond_var_create(name: *const c_char) -> *mut ZipcCondVar {
    if name.is_null() {
        return ptr::null_mut();
    }
    let Ok(name_str) = CStr::from_ptr(name).to_str() else {
        return ptr::null_mut();
    };

    match CondVarSegment::create(name_str) {
        Ok(segment) => Box::into_raw(Box::new(segment)).cast::<ZipcCondVar>(),
        Err(e) => {
            log::error!("Failed to create condition variable segment '{name_str}': {e}");
            ptr::null_mut()
        }
    }
}

/// Attach to a condition variable segment created by another process.
///
/// # Safety
///
/// - `name` must be a valid null-terminated C string
#[no_mangle]
pub unsafe extern "C" fn zipc_cond_var_open(name: *const c_char) -> *mut ZipcCondVar {
    if name.is_null() {
        return ptr::null_mut();
    }
    let Ok(name_str) = CStr::from_ptr(name).to_str() else {
        return ptr::null_mut();
    };

    match CondVarSegment::open(name_str) {
        Ok(segment) => Box::into_raw(Box::new(segment)).cast::<ZipcCondVar>(),
        Err(e) => {
            log::error!("Failed to open condition variable segment '{name_str}': {e}");
            ptr::null_mut()
        }
    }
}

/// Unmap a condition variable segment and free its handle.
///
/// # Safety
///
/// - `cv` must be a pointer returned by `zipc_cond_var_create` or
///   `zipc_cond_var_open`, or NULL (no-op)
/// - Must not be called more than once with the same pointer
/// - Conditions still attached to this segment must be detached or
///   deleted first
#[no_mangle]
pub unsafe extern "C" fn zipc_cond_var_delete(cv: *mut ZipcCondVar) {
    if !cv.is_null() {
        let _ = Box::from_raw(cv.cast::<CondVarSegment>());
    }
}

/// Remove a condition variable segment name; idempotent.
///
/// The segment vanishes once every process has unmapped it.
///
/// # Safety
///
/// - `name` must be a valid null-terminated C string
#[no_mangle]
pub unsafe extern "C" fn zipc_cond_var_unlink(name: *const c_char) -> ZipcError {
    if name.is_null() {
        return ZipcError::ZipcInvalidArgument;
    }
    let Ok(name_str) = CStr::from_ptr(name).to_str() else {
        return ZipcError::ZipcInvalidArgument;
    };

    match CondVarSegment::unlink(name_str) {
        Ok(()) => ZipcError::ZipcOk,
        Err(_) => ZipcError::ZipcOperationFailed,
    }
}

// =============================================================================
// Condition variable operations
// =============================================================================

/// Publish one notification on the segment and wake waiter(s).
///
/// `notifier_index` selects the notification-set bit (< 32); pass 0 when
/// the waiting side does not attribute wake-ups to sources.
///
/// # Safety
///
/// - `cv` must be a valid pointer returned by `zipc_cond_var_create` or
///   `zipc_cond_var_open`
#[no_mangle]
pub unsafe extern "C" fn zipc_cond_var_notify(cv: *const ZipcCondVar, notifier_index: u32) -> ZipcError {
    if cv.is_null() {
        return ZipcError::ZipcInvalidArgument;
    }
    let segment = &*cv.cast::<CondVarSegment>();
    ConditionVariableSignaler::with_index(segment.data(), notifier_index % 32).notify();
    ZipcError::ZipcOk
}

/// Block until notified or `timeout_ns` nanoseconds elapse.
///
/// Returns `true` iff a notification was observed (and consumed) before
/// the deadline. A `false` return is an expected timeout, not an error.
///
/// # Safety
///
/// - `cv` must be a valid pointer returned by `zipc_cond_var_create` or
///   `zipc_cond_var_open`
#[no_mangle]
pub unsafe extern "C" fn zipc_cond_var_timed_wait(cv: *const ZipcCondVar, timeout_ns: u64) -> bool {
    if cv.is_null() {
        return false;
    }
    let segment = &*cv.cast::<CondVarSegment>();
    ConditionVariableWaiter::new(segment.data()).timed_wait(Duration::from_nanos(timeout_ns))
}

// =============================================================================
// Condition capability
// =============================================================================

/// Create a guard condition, optionally attached to a condition variable.
///
/// Pass NULL for a detached condition (pure polling). When attached,
/// `zipc_cond_trigger` also notifies the condition variable.
///
/// # Safety
///
/// - `cv` must be NULL or a valid pointer returned by
///   `zipc_cond_var_create`/`zipc_cond_var_open` that outlives the
///   returned condition (or is detached from it first)
#[no_mangle]
pub unsafe extern "C" fn zipc_guard_condition_create(cv: *const ZipcCondVar) -> *mut ZipcCondition {
    let data: *mut ConditionVariableData = if cv.is_null() {
        ptr::null_mut()
    } else {
        let segment = &*cv.cast::<CondVarSegment>();
        (segment.data() as *const ConditionVariableData).cast_mut()
    };

    let condition = ForeignCondition {
        inner: Box::new(ForeignGuardCondition {
            triggered: AtomicBool::new(false),
            cond_var: AtomicPtr::new(data),
        }),
    };

    Box::into_raw(Box::new(condition)).cast::<ZipcCondition>()
}

/// Set the condition's trigger value and notify its condition variable.
///
/// # Safety
///
/// - `cond` must be a valid pointer returned by
///   `zipc_guard_condition_create`, or NULL (returns an error)
#[no_mangle]
pub unsafe extern "C" fn zipc_cond_trigger(cond: *const ZipcCondition) -> ZipcError {
    if cond.is_null() {
        return ZipcError::ZipcInvalidArgument;
    }
    let condition = &*cond.cast::<ForeignCondition>();
    condition.inner.trigger();
    ZipcError::ZipcOk
}

/// Clear the condition's trigger value.
///
/// # Safety
///
/// - `cond` must be a valid pointer returned by
///   `zipc_guard_condition_create`, or NULL (returns an error)
#[no_mangle]
pub unsafe extern "C" fn zipc_cond_clear(cond: *const ZipcCondition) -> ZipcError {
    if cond.is_null() {
        return ZipcError::ZipcInvalidArgument;
    }
    let condition = &*cond.cast::<ForeignCondition>();
    condition.inner.clear();
    ZipcError::ZipcOk
}

/// Detach the condition from its condition variable.
///
/// After this, `zipc_cond_is_condition_variable_attached` reports
/// `false` and triggering no longer notifies. Call before deleting the
/// condition variable handle the condition was created with.
///
/// # Safety
///
/// - `cond` must be a valid pointer returned by
///   `zipc_guard_condition_create`, or NULL (returns an error)
#[no_mangle]
pub unsafe extern "C" fn zipc_cond_detach_condition_variable(cond: *const ZipcCondition) -> ZipcError {
    if cond.is_null() {
        return ZipcError::ZipcInvalidArgument;
    }
    let condition = &*cond.cast::<ForeignCondition>();
    condition.inner.detach_condition_variable();
    ZipcError::ZipcOk
}

/// Whether the condition currently reports triggered.
///
/// Non-blocking; defined for every handle state: a NULL or invalidated
/// handle answers `false`, never aborts.
///
/// # Safety
///
/// - `cond` must be NULL or a valid pointer returned by
///   `zipc_guard_condition_create`
#[no_mangle]
pub unsafe extern "C" fn zipc_cond_has_triggered(cond: *const ZipcCondition) -> bool {
    if cond.is_null() {
        return false;
    }
    let condition = &*cond.cast::<ForeignCondition>();
    condition.inner.has_triggered()
}

/// Whether the condition has a live condition variable bound.
///
/// Non-blocking; a NULL or detached handle answers `false`, never
/// aborts. Safe to call while a wait is in progress elsewhere.
///
/// # Safety
///
/// - `cond` must be NULL or a valid pointer returned by
///   `zipc_guard_condition_create`
#[no_mangle]
pub unsafe extern "C" fn zipc_cond_is_condition_variable_attached(cond: *const ZipcCondition) -> bool {
    if cond.is_null() {
        return false;
    }
    let condition = &*cond.cast::<ForeignCondition>();
    condition.inner.is_condition_variable_attached()
}

/// Delete a condition and free its resources.
///
/// # Safety
///
/// - `cond` must be a valid pointer returned by
///   `zipc_guard_condition_create`, or NULL (no-op)
/// - Must not be called more than once with the same pointer
#[no_mangle]
pub unsafe extern "C" fn zipc_cond_delete(cond: *mut ZipcCondition) {
    if !cond.is_null() {
        let _ = Box::from_raw(cond.cast::<ForeignCondition>());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detached_condition_lifecycle() {
        unsafe {
            let cond = zipc_guard_condition_create(ptr::null());
            assert!(!cond.is_null());

            assert!(!zipc_cond_has_triggered(cond));
            assert!(!zipc_cond_is_condition_variable_attached(cond));

            assert_eq!(zipc_cond_trigger(cond), ZipcError::ZipcOk);
            assert!(zipc_cond_has_triggered(cond));

            assert_eq!(zipc_cond_clear(cond), ZipcError::ZipcOk);
            assert!(!zipc_cond_has_triggered(cond));

            zipc_cond_delete(cond);
        }
    }

    #[test]
    fn test_null_safety() {
        unsafe {
            // Probes on NULL answer false, never abort
            assert!(!zipc_cond_has_triggered(ptr::null()));
            assert!(!zipc_cond_is_condition_variable_attached(ptr::null()));

            assert_eq!(zipc_cond_trigger(ptr::null()), ZipcError::ZipcInvalidArgument);
            assert_eq!(zipc_cond_clear(ptr::null()), ZipcError::ZipcInvalidArgument);
            assert_eq!(
                zipc_cond_detach_condition_variable(ptr::null()),
                ZipcError::ZipcInvalidArgument
            );
            assert_eq!(
                zipc_cond_var_notify(ptr::null(), 0),
                ZipcError::ZipcInvalidArgument
            );
            assert!(!zipc_cond_var_timed_wait(ptr::null(), 1_000_000));
            assert_eq!(
                zipc_cond_var_unlink(ptr::null()),
                ZipcError::ZipcInvalidArgument
            );

            assert!(zipc_cond_var_create(ptr::null()).is_null());
            assert!(zipc_cond_var_open(ptr::null()).is_null());

            // Delete NULL is a no-op
            zipc_cond_var_delete(ptr::null_mut());
            zipc_cond_delete(ptr::null_mut());
        }
    }
}
