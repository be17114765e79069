//! Per-thread buffering for [`FoldReducer`].
//!
//! Each thread that folds into a reducer owns one [`LocalSlot`], held in the reducer's
//! [`ThreadLocal`](https://docs.rs/thread_local/latest/thread_local/struct.ThreadLocal.html). The slot's buffer
//! is `Some` while the slot is connected (present in the reducer's registry) and `None` once a sweep has taken
//! its partial state.
//!
//! The buffer mutex is only ever touched by the owning thread and by a sweeping reducer, so it is
//! uncontended on the fold path.

use crate::FoldReducer;
use std::{
    fmt::Debug,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// Thread-owned buffer holding a partial state.
pub(crate) struct LocalSlot<S> {
    buffer: Mutex<Option<S>>,
}

impl<S> LocalSlot<S> {
    /// Creates a disconnected slot. The first fold connects it.
    pub(crate) fn new() -> Self {
        Self {
            buffer: Mutex::new(None),
        }
    }

    /// A hook that panicked while holding the buffer leaves it usable, so poisoning is ignored.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Option<S>> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.lock().is_some()
    }

    /// Installs a fresh buffer. Called by the reducer, under its lock, right before the slot is added
    /// to the registry.
    pub(crate) fn connect(&self, initial: S) {
        *self.lock() = Some(initial);
    }

    /// Hands over the buffered partial state and disconnects the slot.
    /// Called by the reducer, under its lock, during a sweep.
    pub(crate) fn reset_state(&self) -> Option<S> {
        self.lock().take()
    }
}

impl<S> Debug for LocalSlot<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let connected = match self.buffer.try_lock() {
            Ok(guard) => Some(guard.is_some()),
            Err(_) => None,
        };
        f.debug_struct("LocalSlot")
            .field("connected", &connected)
            .finish()
    }
}

/// Handle on the calling thread's local accumulator for a [`FoldReducer`], returned by
/// [`FoldReducer::local_state`].
///
/// The handle borrows the reducer and is not `Send`: it must be used on the thread that obtained it.
pub struct LocalAccumulator<'a, O, S, E>
where
    S: Send,
{
    reducer: &'a FoldReducer<O, S, E>,
    slot: &'a Arc<LocalSlot<S>>,
    _not_send: std::marker::PhantomData<*const ()>,
}

impl<'a, O, S, E> LocalAccumulator<'a, O, S, E>
where
    S: Send,
{
    pub(crate) fn new(reducer: &'a FoldReducer<O, S, E>, slot: &'a Arc<LocalSlot<S>>) -> Self {
        Self {
            reducer,
            slot,
            _not_send: std::marker::PhantomData,
        }
    }

    /// Folds `op` into this thread's buffer.
    ///
    /// If a sweep disconnected the buffer since the last fold, the accumulator first reconnects: it gets a
    /// fresh buffer from the algebra's `initial_state` and is registered again with the reducer, which may
    /// in turn trigger a cleanup merge. Only that reconnect step takes the reducer's lock.
    pub fn fold(&self, op: O) -> Result<(), E> {
        loop {
            {
                let mut buffer = self.slot.lock();
                if let Some(state) = buffer.as_mut() {
                    return self.reducer.algebra().fold(state, op);
                }
            }
            // A sweep may run between `connect` and the next lock, so loop until the fold lands in a
            // connected buffer.
            log::trace!(
                "reconnecting local accumulator on {:?}",
                std::thread::current().id()
            );
            self.reducer.connect(self.slot)?;
        }
    }

    /// Whether the buffer is currently registered with the reducer.
    pub fn is_connected(&self) -> bool {
        self.slot.is_connected()
    }
}

impl<O, S, E> Debug for LocalAccumulator<'_, O, S, E>
where
    S: Send,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LocalAccumulator({:?})", self.slot)
    }
}
