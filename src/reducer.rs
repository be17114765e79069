//! The coordinator: owns the global state, the registry of connected local accumulators and the
//! [`Algebra`], and merges local buffers into the global state on demand.
//!
//! ## Usage pattern
//!
//! ```rust
#![doc = include_str!("../demos/sum_accumulator.rs")]
//! ````

use crate::{
    algebra::{Algebra, FnAlgebra},
    config::ReducerConfig,
    local::{LocalAccumulator, LocalSlot},
};
use std::{
    convert::Infallible,
    fmt::Debug,
    mem::take,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    vec,
};
use thread_local::ThreadLocal;

pub(crate) type DynAlgebra<O, S, E> = dyn Algebra<Op = O, State = S, Error = E> + Send + Sync;

/// Unwraps the result of an operation on a reducer whose algebra cannot fail.
pub fn into_ok<T>(res: Result<T, Infallible>) -> T {
    match res {
        Ok(t) => t,
        Err(never) => match never {},
    }
}

/// Snapshot of a reducer's bookkeeping, see [`FoldReducer::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReducerStats {
    /// Local accumulators currently in the registry.
    pub registered: usize,
    /// Connections since the last full merge.
    pub connect_count: usize,
    /// Full merges performed, explicit or forced by the cleanup threshold.
    pub sweeps: u64,
    /// Merges aborted by an algebra failure.
    pub failed_sweeps: u64,
}

/// State guarded by the reducer's lock.
struct ReducerState<S> {
    /// `None` only after a failed `reduce` consumed it; re-created from `initial_state` on next use.
    global: Option<S>,
    registry: Vec<Arc<LocalSlot<S>>>,
    connect_count: usize,
    sweeps: u64,
    failed_sweeps: u64,
}

impl<S> ReducerState<S> {
    fn new(global: S) -> Self {
        Self {
            global: Some(global),
            registry: Vec::new(),
            connect_count: 0,
            sweeps: 0,
            failed_sweeps: 0,
        }
    }

    fn take_global<O, E>(&mut self, algebra: &DynAlgebra<O, S, E>) -> Result<S, E> {
        match self.global.take() {
            Some(global) => Ok(global),
            None => algebra.initial_state(),
        }
    }

    fn global<O, E>(&mut self, algebra: &DynAlgebra<O, S, E>) -> Result<&S, E> {
        let global = self.take_global(algebra)?;
        Ok(&*self.global.insert(global))
    }

    fn merge<O, E>(&mut self, algebra: &DynAlgebra<O, S, E>, partial: S) -> Result<(), E> {
        let global = self.take_global(algebra)?;
        self.global = Some(algebra.reduce(global, partial)?);
        Ok(())
    }
}

/// Slots taken out of the registry by a sweep. Any slot not merged when this is dropped, because a hook
/// failed or panicked, is disconnected and its buffer discarded, so a failed sweep can neither leave a
/// connected slot outside the registry nor count a buffer twice.
struct Sweep<S> {
    pending: vec::IntoIter<Arc<LocalSlot<S>>>,
}

impl<S> Iterator for Sweep<S> {
    type Item = Arc<LocalSlot<S>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.pending.next()
    }
}

impl<S> Drop for Sweep<S> {
    fn drop(&mut self) {
        let discarded = self
            .pending
            .by_ref()
            .filter_map(|slot| slot.reset_state())
            .count();
        if discarded > 0 {
            log::warn!("sweep aborted, discarded {discarded} local buffers");
        }
    }
}

struct Inner<O, S, E>
where
    S: Send,
{
    algebra: Box<DynAlgebra<O, S, E>>,
    /// One slot per thread that has used this reducer.
    locals: ThreadLocal<Arc<LocalSlot<S>>>,
    state: Mutex<ReducerState<S>>,
    config: ReducerConfig,
}

/// Scalable concurrent fold/reduce accumulator.
///
/// `O` is the type of the operations folded in, `S` the type of the accumulated state and `E` the error
/// type of the [`Algebra`] hooks.
///
/// Each thread folds into its own local accumulator without taking the reducer's lock. Snapshot operations
/// ([`get_state`](Self::get_state), [`with_state`](Self::with_state), [`reset_state`](Self::reset_state))
/// take the lock, merge every registered local buffer into the global state, and clear the registry.
/// A thread that folds again after such a sweep transparently reconnects.
///
/// Operations folded by a thread before a snapshot that observes its accumulator are included in that
/// snapshot; operations folded concurrently with the snapshot may or may not be.
///
/// A snapshot may fail partway when a hook fails. The registry is still cleared, so some buffered
/// updates may be lost but none is ever counted twice and later calls behave normally.
///
/// Hooks must not call back into the same reducer.
pub struct FoldReducer<O, S, E = Infallible>
where
    S: Send,
{
    inner: Arc<Inner<O, S, E>>,
}

impl<O, S> FoldReducer<O, S>
where
    O: 'static,
    S: Send + 'static,
{
    /// Instantiates a reducer from infallible hooks, with the default [`ReducerConfig`].
    ///
    /// - `initial_state` - produces the identity state.
    /// - `fold` - merges one operation into a state.
    /// - `reduce` - merges two partial states.
    pub fn new(
        initial_state: impl Fn() -> S + Send + Sync + 'static,
        fold: impl Fn(&mut S, O) + Send + Sync + 'static,
        reduce: impl Fn(S, S) -> S + Send + Sync + 'static,
    ) -> Self {
        Self::new_with_config(ReducerConfig::default(), initial_state, fold, reduce)
    }

    /// Same as [`new`](Self::new) with an explicit configuration.
    pub fn new_with_config(
        config: ReducerConfig,
        initial_state: impl Fn() -> S + Send + Sync + 'static,
        fold: impl Fn(&mut S, O) + Send + Sync + 'static,
        reduce: impl Fn(S, S) -> S + Send + Sync + 'static,
    ) -> Self {
        let algebra = FnAlgebra::new(initial_state, fold, reduce);
        into_ok(Self::with_algebra(algebra, config))
    }
}

impl<O, S, E> FoldReducer<O, S, E>
where
    O: 'static,
    S: Send + 'static,
    E: 'static,
{
    /// Instantiates a reducer from fallible hooks, with the default [`ReducerConfig`].
    /// Returns the error of `initial_state` if the global state cannot be created.
    pub fn try_new(
        initial_state: impl Fn() -> Result<S, E> + Send + Sync + 'static,
        fold: impl Fn(&mut S, O) -> Result<(), E> + Send + Sync + 'static,
        reduce: impl Fn(S, S) -> Result<S, E> + Send + Sync + 'static,
    ) -> Result<Self, E> {
        let algebra = FnAlgebra::try_new(initial_state, fold, reduce);
        Self::with_algebra(algebra, ReducerConfig::default())
    }

    /// Instantiates a reducer from any [`Algebra`].
    /// Returns the error of `initial_state` if the global state cannot be created.
    pub fn with_algebra(
        algebra: impl Algebra<Op = O, State = S, Error = E> + Send + Sync + 'static,
        config: ReducerConfig,
    ) -> Result<Self, E> {
        let global = algebra.initial_state()?;
        Ok(Self {
            inner: Arc::new(Inner {
                algebra: Box::new(algebra),
                locals: ThreadLocal::new(),
                state: Mutex::new(ReducerState::new(global)),
                config,
            }),
        })
    }
}

impl<O, S, E> FoldReducer<O, S, E>
where
    S: Send,
{
    pub(crate) fn algebra(&self) -> &DynAlgebra<O, S, E> {
        self.inner.algebra.as_ref()
    }

    /// Acquires the reducer's lock. Sweeps keep the registry consistent even when a hook panics, so a
    /// poisoned lock is recovered rather than propagated.
    fn lock(&self) -> MutexGuard<'_, ReducerState<S>> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Configuration the reducer was built with.
    pub fn config(&self) -> &ReducerConfig {
        &self.inner.config
    }

    /// Folds `op` into the calling thread's local accumulator.
    ///
    /// Takes the reducer's lock only when the accumulator has to be created or reconnected.
    pub fn fold(&self, op: O) -> Result<(), E> {
        self.local_state()?.fold(op)
    }

    /// Returns the calling thread's local accumulator, creating and registering it on first use.
    pub fn local_state(&self) -> Result<LocalAccumulator<'_, O, S, E>, E> {
        let slot = match self.inner.locals.get() {
            Some(slot) => slot,
            None => {
                let slot = self.inner.locals.get_or(|| Arc::new(LocalSlot::new()));
                self.connect(slot)?;
                slot
            }
        };
        Ok(LocalAccumulator::new(self, slot))
    }

    /// Registers `slot` with a fresh buffer. If the cleanup threshold has been reached since the last full
    /// merge, merges and clears the registry first.
    pub(crate) fn connect(&self, slot: &Arc<LocalSlot<S>>) -> Result<(), E> {
        let mut state = self.lock();
        if slot.is_connected() {
            return Ok(());
        }

        if state.connect_count >= self.inner.config.cleanup_count() {
            log::debug!(
                "cleanup threshold of {} connections reached, forcing merge",
                state.connect_count
            );
            self.sweep(&mut state)?;
        }

        let initial = self.algebra().initial_state()?;
        slot.connect(initial);
        state.registry.push(slot.clone());
        state.connect_count += 1;
        log::trace!(
            "connected local accumulator on {:?}, registry size={}",
            std::thread::current().id(),
            state.registry.len()
        );
        Ok(())
    }

    /// Merges every registered buffer into the global state, in registry order, and clears the registry.
    fn sweep(&self, state: &mut ReducerState<S>) -> Result<(), E> {
        let mut sweep = Sweep {
            pending: take(&mut state.registry).into_iter(),
        };
        state.connect_count = 0;
        state.sweeps += 1;
        log::trace!("sweeping {} local accumulators", sweep.pending.len());

        let algebra = self.algebra();
        let res = sweep.by_ref().try_for_each(|slot| match slot.reset_state() {
            Some(partial) => state.merge(algebra, partial),
            None => Ok(()),
        });
        if res.is_err() {
            state.failed_sweeps += 1;
        }
        res
    }

    /// Merges all local accumulators and returns a clone of the resulting global state.
    pub fn get_state(&self) -> Result<S, E>
    where
        S: Clone,
    {
        self.with_state(S::clone)
    }

    /// Merges all local accumulators and invokes `f` on the resulting global state.
    /// The reducer's lock is held while `f` runs.
    pub fn with_state<V>(&self, f: impl FnOnce(&S) -> V) -> Result<V, E> {
        let mut state = self.lock();
        self.sweep(&mut state)?;
        let global = state.global(self.algebra())?;
        Ok(f(global))
    }

    /// Replaces the global state. Local buffers and the registry are left untouched.
    pub fn set_state(&self, global: S) {
        self.lock().global = Some(global);
    }

    /// Merges all local accumulators, resets the global state to `initial_state`, and returns the merged
    /// value observed just before the reset.
    pub fn reset_state(&self) -> Result<S, E> {
        let mut state = self.lock();
        self.sweep(&mut state)?;
        let algebra = self.algebra();
        let fresh = algebra.initial_state()?;
        match state.global.replace(fresh) {
            Some(prev) => Ok(prev),
            None => algebra.initial_state(),
        }
    }

    /// Number of local accumulators currently registered.
    pub fn registry_len(&self) -> usize {
        self.lock().registry.len()
    }

    /// Snapshot of the registry size, connect counter and sweep counts.
    pub fn stats(&self) -> ReducerStats {
        let state = self.lock();
        ReducerStats {
            registered: state.registry.len(),
            connect_count: state.connect_count,
            sweeps: state.sweeps,
            failed_sweeps: state.failed_sweeps,
        }
    }
}

impl<O, S, E> Clone for FoldReducer<O, S, E>
where
    S: Send,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<O, S, E> Debug for FoldReducer<O, S, E>
where
    S: Send,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // `try_lock` so that formatting from inside `with_state` cannot deadlock.
        let registered = self.inner.state.try_lock().ok().map(|s| s.registry.len());
        f.debug_struct("FoldReducer")
            .field("config", &self.inner.config)
            .field("registered", &registered)
            .finish()
    }
}
