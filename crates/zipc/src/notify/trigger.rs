// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 zipc project

//! Trigger handles - the unit a WaitSet/Listener layer registers.
//!
//! A [`Trigger`] binds an origin object's condition (its `has_triggered`
//! predicate) to a [`ConditionVariableData`] so that firing the trigger
//! wakes whoever waits on that data, possibly in another process. The
//! origin is held type-erased: the handle stores an opaque pointer plus a
//! runtime type tag, so a typed access with the wrong type yields `None`
//! instead of reinterpreting memory.
//!
//! All pointers in here are borrowed, never owned. The owner of the
//! origin must sever the binding with [`Trigger::reset`] or
//! [`Trigger::invalidate`] before destroying the origin; the constructors
//! are `unsafe` because they capture that outlives contract. Once bound,
//! every query degrades to a safe default (`false`, `None`) on an
//! invalidated handle rather than reporting an error - a registry holding
//! a stale trigger must not crash.

use super::condition_variable::{ConditionVariableData, ConditionVariableSignaler};
use super::Condition;
use std::any::TypeId;
use std::mem;
use std::ptr::{self, NonNull};

/// Sentinel id of a trigger that was never assigned one.
pub const INVALID_TRIGGER_ID: u64 = u64::MAX;

// Monomorphized trampolines recovering the concrete types behind the
// type-erased (target, fn) pairs below. Stored alongside the erased fn
// pointer at bind time; the bind site is the only place that knows `T`.

unsafe fn fire_trampoline<T>(origin: *const (), func: *const ()) {
    // SAFETY: `func` is the `fn(&T)` stored by the matching `new::<T>`
    // and `origin` points to the `T` the state was bound to.
    let f: fn(&T) = mem::transmute(func);
    f(&*origin.cast::<T>());
}

unsafe fn has_triggered_trampoline<T>(target: *const (), func: *const ()) -> bool {
    // SAFETY: `func`/`target` were stored together by `new::<T>`; the
    // binding contract keeps `target` alive.
    let f: fn(&T) -> bool = mem::transmute(func);
    f(&*target.cast::<T>())
}

unsafe fn reset_trampoline<T>(target: *const (), func: *const (), trigger: &Trigger) {
    // SAFETY: `func`/`target` were stored together by `new::<T>`; the
    // binding contract keeps `target` alive.
    let f: fn(&T, &Trigger) = mem::transmute(func);
    f(&*target.cast::<T>(), trigger);
}

/// Type-erased `fn(&T)` fired at the origin when the trigger fires.
///
/// Stores the user's fn pointer for identity and a monomorphized
/// trampoline that knows how to cast back.
#[derive(Clone, Copy)]
struct FireCallback {
    func: *const (),
    invoke: Option<unsafe fn(*const (), *const ())>,
}

impl FireCallback {
    const UNSET: Self = Self {
        func: ptr::null(),
        invoke: None,
    };

    fn new<T: 'static>(f: fn(&T)) -> Self {
        Self {
            func: f as *const (),
            invoke: Some(fire_trampoline::<T>),
        }
    }
}

/// A bound, side-effect-free predicate (`fn(&T) -> bool`) supplied by the
/// origin and queried repeatedly through [`Trigger::has_triggered`].
///
/// Compares equal to another callback iff both the bound target and the
/// function are identical. The bound target usually is the trigger's
/// origin but may be any object that outlives the trigger.
#[derive(Clone, Copy)]
pub struct HasTriggeredCallback {
    target: *const (),
    target_type: TypeId,
    func: *const (),
    invoke: Option<unsafe fn(*const (), *const ()) -> bool>,
}

impl HasTriggeredCallback {
    /// Bind `f` to `target`.
    ///
    /// # Safety
    ///
    /// `target` must point to a live `T` and stay valid for as long as
    /// the callback can be invoked (i.e. until the owning trigger is
    /// reset or invalidated).
    #[must_use]
    pub unsafe fn new<T: 'static>(target: *const T, f: fn(&T) -> bool) -> Self {
        Self {
            target: target.cast(),
            target_type: TypeId::of::<T>(),
            func: f as *const (),
            invoke: Some(has_triggered_trampoline::<T>),
        }
    }

    /// Whether a predicate is bound.
    #[must_use]
    pub fn is_some(&self) -> bool {
        self.invoke.is_some()
    }

    fn call(&self) -> bool {
        match self.invoke {
            // SAFETY: invariants established in `new`.
            Some(invoke) if !self.target.is_null() => unsafe { invoke(self.target, self.func) },
            _ => false,
        }
    }

    fn rebind_target(&mut self, old: *const (), new: *const (), ty: TypeId) {
        if self.invoke.is_some() && ptr::eq(self.target, old) && self.target_type == ty {
            self.target = new;
        }
    }
}

impl Default for HasTriggeredCallback {
    /// The empty callback; invoking it reports `false` without a call.
    fn default() -> Self {
        Self {
            target: ptr::null(),
            target_type: TypeId::of::<()>(),
            func: ptr::null(),
            invoke: None,
        }
    }
}

impl PartialEq for HasTriggeredCallback {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.target, other.target) && ptr::eq(self.func, other.func)
    }
}

impl Eq for HasTriggeredCallback {}

/// A bound `fn(&T, &Trigger)` invoked when the trigger transitions to
/// invalid via [`Trigger::reset`]. Receives the trigger being reset so
/// the target can tell which registration went away.
#[derive(Clone, Copy)]
pub struct ResetCallback {
    target: *const (),
    target_type: TypeId,
    func: *const (),
    invoke: Option<unsafe fn(*const (), *const (), &Trigger)>,
}

impl ResetCallback {
    /// Bind `f` to `target`.
    ///
    /// # Safety
    ///
    /// Same outlives contract as [`HasTriggeredCallback::new`].
    #[must_use]
    pub unsafe fn new<T: 'static>(target: *const T, f: fn(&T, &Trigger)) -> Self {
        Self {
            target: target.cast(),
            target_type: TypeId::of::<T>(),
            func: f as *const (),
            invoke: Some(reset_trampoline::<T>),
        }
    }

    /// Whether a callback is bound.
    #[must_use]
    pub fn is_some(&self) -> bool {
        self.invoke.is_some()
    }

    fn call(&self, trigger: &Trigger) {
        if let Some(invoke) = self.invoke {
            if !self.target.is_null() {
                // SAFETY: invariants established in `new`.
                unsafe { invoke(self.target, self.func, trigger) };
            }
        }
    }

    fn rebind_target(&mut self, old: *const (), new: *const (), ty: TypeId) {
        if self.invoke.is_some() && ptr::eq(self.target, old) && self.target_type == ty {
            self.target = new;
        }
    }
}

impl Default for ResetCallback {
    /// The empty callback; a reset through it is a pure invalidation.
    fn default() -> Self {
        Self {
            target: ptr::null(),
            target_type: TypeId::of::<()>(),
            func: ptr::null(),
            invoke: None,
        }
    }
}

/// Identity snapshot of a trigger: who owns it, its id, what fires it.
///
/// Value semantics; the default state has no origin, the
/// [`INVALID_TRIGGER_ID`] and no callback.
#[derive(Clone, Copy)]
pub struct TriggerState {
    origin: *const (),
    origin_type: TypeId,
    trigger_id: u64,
    callback: FireCallback,
}

impl TriggerState {
    /// Bind an origin, an id and an optional fire callback.
    ///
    /// # Safety
    ///
    /// `origin` must point to a live `T` (or be null for a state that is
    /// never fired) and stay valid until the state is dropped or
    /// overwritten.
    #[must_use]
    pub unsafe fn new<T: 'static>(origin: *const T, trigger_id: u64, callback: Option<fn(&T)>) -> Self {
        Self {
            origin: origin.cast(),
            origin_type: TypeId::of::<T>(),
            trigger_id,
            callback: callback.map_or(FireCallback::UNSET, FireCallback::new),
        }
    }

    /// The stored id; [`INVALID_TRIGGER_ID`] for the default state.
    #[must_use]
    pub fn trigger_id(&self) -> u64 {
        self.trigger_id
    }

    /// Exact pointer-identity check against the stored origin.
    #[must_use]
    pub fn does_originate_from<T>(&self, candidate: *const T) -> bool {
        !self.origin.is_null() && ptr::eq(self.origin, candidate.cast())
    }

    /// Typed access to the origin.
    ///
    /// `None` when no origin is set or when `T` is not the type the
    /// state was constructed with - a mismatched type is detected by the
    /// runtime tag, never reinterpreted.
    #[must_use]
    pub fn origin<T: 'static>(&self) -> Option<NonNull<T>> {
        if self.origin_type == TypeId::of::<T>() {
            NonNull::new(self.origin.cast::<T>().cast_mut())
        } else {
            None
        }
    }

    /// Invoke the fire callback with the origin.
    ///
    /// Returns `true` iff a callback was configured and called; `false`
    /// distinguishes "not configured" from "fired".
    pub fn fire(&self) -> bool {
        match self.callback.invoke {
            Some(invoke) if !self.origin.is_null() => {
                // SAFETY: invariants established in `new`.
                unsafe { invoke(self.origin, self.callback.func) };
                true
            }
            _ => false,
        }
    }
}

impl Default for TriggerState {
    fn default() -> Self {
        Self {
            origin: ptr::null(),
            origin_type: TypeId::of::<()>(),
            trigger_id: INVALID_TRIGGER_ID,
            callback: FireCallback::UNSET,
        }
    }
}

/// A live, invalidatable binding between an origin's condition and a
/// condition variable.
///
/// Valid iff an origin is bound AND a has-triggered predicate is set;
/// everything on an invalid trigger is an inert no-op. Destruction has no
/// side effects - it touches neither the origin nor the condition
/// variable.
#[derive(Default)]
pub struct Trigger {
    state: TriggerState,
    condition_variable: Option<NonNull<ConditionVariableData>>,
    has_triggered: HasTriggeredCallback,
    on_reset: ResetCallback,
}

// SAFETY: a Trigger holds only borrowed pointers whose lifetimes the
// owner manages per the construction contract (origin and condition
// variable outlive the trigger, or the origin severs the binding first).
// The shared-reference operations (trigger, has_triggered, fire and the
// probes) only read through those pointers or touch atomics in the
// condition variable; mutating operations require &mut and are therefore
// exclusive.
unsafe impl Send for Trigger {}
unsafe impl Sync for Trigger {}

impl Trigger {
    /// Bind all five pieces: origin, condition variable, has-triggered
    /// predicate, reset callback, id and fire callback.
    ///
    /// The result is valid iff `origin` is non-null and `has_triggered`
    /// is a bound callback. An empty `on_reset` is permitted and makes
    /// [`reset`](Self::reset) a pure invalidation. `condition_variable`
    /// may be null for a trigger that only participates in polling.
    ///
    /// # Safety
    ///
    /// `origin`, the callback targets and `condition_variable` must stay
    /// valid for the trigger's lifetime, or the owner must call
    /// [`invalidate`](Self::invalidate) / [`reset`](Self::reset) before
    /// any of them is destroyed. The origin must tolerate the callbacks
    /// being invoked from other threads (interior mutability via atomics
    /// where it mutates).
    #[must_use]
    pub unsafe fn new<T: 'static>(
        origin: *const T,
        condition_variable: *const ConditionVariableData,
        has_triggered: HasTriggeredCallback,
        on_reset: ResetCallback,
        trigger_id: u64,
        callback: Option<fn(&T)>,
    ) -> Self {
        Self {
            state: TriggerState::new(origin, trigger_id, callback),
            condition_variable: NonNull::new(condition_variable.cast_mut()),
            has_triggered,
            on_reset,
        }
    }

    /// Validity invariant: origin bound and predicate set.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.state.origin.is_null() && self.has_triggered.is_some()
    }

    /// Query the origin's condition; always `false` when invalid.
    #[must_use]
    pub fn has_triggered(&self) -> bool {
        self.is_valid() && self.has_triggered.call()
    }

    /// Fire the trigger: invoke the fire callback (if configured) on the
    /// origin and wake waiter(s) on the bound condition variable.
    ///
    /// Safe to call from a different thread than the one that constructed
    /// the trigger or waits on the data. No-op when invalid.
    pub fn trigger(&self) {
        if !self.is_valid() {
            return;
        }
        self.state.fire();
        if let Some(data) = self.condition_variable {
            // SAFETY: the construction contract keeps the data alive
            // while the trigger is valid.
            ConditionVariableSignaler::new(unsafe { data.as_ref() }).notify();
        }
    }

    /// Invoke the reset callback (passing this trigger), then invalidate.
    ///
    /// The callback runs exactly once, before the state is cleared, so
    /// the target can identify the registration being torn down. No-op on
    /// an already-invalid trigger.
    pub fn reset(&mut self) {
        if !self.is_valid() {
            return;
        }
        let on_reset = mem::take(&mut self.on_reset);
        on_reset.call(self);
        self.invalidate();
    }

    /// Clear every binding without invoking the reset callback.
    ///
    /// Used when the origin is being destroyed and a callback into it
    /// would be unsafe. Invalidation is permanent - nothing revalidates
    /// a trigger.
    pub fn invalidate(&mut self) {
        self.state = TriggerState::default();
        self.condition_variable = None;
        self.has_triggered = HasTriggeredCallback::default();
        self.on_reset = ResetCallback::default();
    }

    /// Rebind the origin after it moved, without re-registering.
    ///
    /// Updates the stored origin (and thereby the fire callback's
    /// argument); additionally rebinds the target of the has-triggered
    /// and reset callbacks individually, but only where that callback is
    /// currently bound to the old origin - a callback bound to some
    /// third object keeps its target. No-op on an invalid trigger or
    /// when `T` is not the bound origin type.
    ///
    /// # Safety
    ///
    /// `new_origin` must point to a live `T` with the same validity
    /// contract as the origin passed at construction.
    pub unsafe fn update_origin<T: 'static>(&mut self, new_origin: *const T) {
        if !self.is_valid() || self.state.origin_type != TypeId::of::<T>() {
            return;
        }
        let old = self.state.origin;
        let new = new_origin.cast::<()>();
        self.has_triggered.rebind_target(old, new, TypeId::of::<T>());
        self.on_reset.rebind_target(old, new, TypeId::of::<T>());
        self.state.origin = new;
    }

    /// The bound condition variable; `None` when invalid.
    #[must_use]
    pub fn condition_variable(&self) -> Option<NonNull<ConditionVariableData>> {
        if self.is_valid() {
            self.condition_variable
        } else {
            None
        }
    }

    /// Domain equality used by a registry to deduplicate and detach.
    ///
    /// Two triggers are logical-equal iff trigger id, origin,
    /// has-triggered callback (bound target and function) and condition
    /// variable are all respectively equal. The fire and reset callbacks
    /// deliberately do not participate. Reflexive and symmetric.
    #[must_use]
    pub fn is_logical_equal_to(&self, other: &Trigger) -> bool {
        self.state.trigger_id == other.state.trigger_id
            && ptr::eq(self.state.origin, other.state.origin)
            && self.has_triggered == other.has_triggered
            && self.condition_variable == other.condition_variable
    }

    // TriggerState delegation - a Trigger answers everything its identity
    // snapshot does.

    /// See [`TriggerState::trigger_id`].
    #[must_use]
    pub fn trigger_id(&self) -> u64 {
        self.state.trigger_id()
    }

    /// See [`TriggerState::does_originate_from`].
    #[must_use]
    pub fn does_originate_from<T>(&self, candidate: *const T) -> bool {
        self.state.does_originate_from(candidate)
    }

    /// See [`TriggerState::origin`].
    #[must_use]
    pub fn origin<T: 'static>(&self) -> Option<NonNull<T>> {
        self.state.origin()
    }

    /// See [`TriggerState::fire`].
    pub fn fire(&self) -> bool {
        self.state.fire()
    }
}

impl Condition for Trigger {
    fn has_triggered(&self) -> bool {
        Trigger::has_triggered(self)
    }

    fn is_condition_variable_attached(&self) -> bool {
        self.condition_variable().is_some()
    }
}
