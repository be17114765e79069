//! The pluggable fold/reduce algebra used by [`crate::FoldReducer`].
//!
//! An algebra supplies three hooks:
//! - `initial_state` produces the identity state. It is used once for the global state and again every
//!   time a local accumulator (re)connects.
//! - `fold` merges one operation into a state in place. It is only ever invoked on a state owned by a
//!   single thread.
//! - `reduce` merges two partial states. Merge order across threads is unspecified, so `reduce` must be
//!   associative and commutative with respect to the set of operations folded into its arguments.
//!
//! Any hook may fail with the algebra's own `Error` type. Failures are returned unchanged to the caller of
//! the reducer operation that triggered the hook.

use std::{
    convert::Infallible,
    fmt::Debug,
    marker::PhantomData,
    ops::{Add, AddAssign},
    sync::Arc,
};

/// Fold/reduce hooks over an operation type [`Algebra::Op`] and a state type [`Algebra::State`].
pub trait Algebra {
    /// Type of the operations folded into a state.
    type Op;
    /// Type of the partial and merged states.
    type State;
    /// Failure raised by any of the hooks.
    type Error;

    /// Produces the identity/starting state.
    fn initial_state(&self) -> Result<Self::State, Self::Error>;

    /// Merges `op` into `state` in place.
    fn fold(&self, state: &mut Self::State, op: Self::Op) -> Result<(), Self::Error>;

    /// Merges two partial states into one.
    fn reduce(&self, s1: Self::State, s2: Self::State) -> Result<Self::State, Self::Error>;
}

/// [`Algebra`] assembled from three closures.
///
/// `O` is the operation type, `S` the state type and `E` the error type of the hooks.
pub struct FnAlgebra<O, S, E = Infallible> {
    initial: Arc<dyn Fn() -> Result<S, E> + Send + Sync>,
    #[allow(clippy::type_complexity)]
    fold: Arc<dyn Fn(&mut S, O) -> Result<(), E> + Send + Sync>,
    reduce: Arc<dyn Fn(S, S) -> Result<S, E> + Send + Sync>,
}

impl<O, S> FnAlgebra<O, S>
where
    O: 'static,
    S: 'static,
{
    /// Builds an algebra from infallible hooks.
    pub fn new(
        initial: impl Fn() -> S + Send + Sync + 'static,
        fold: impl Fn(&mut S, O) + Send + Sync + 'static,
        reduce: impl Fn(S, S) -> S + Send + Sync + 'static,
    ) -> Self {
        Self::try_new(
            move || Ok(initial()),
            move |s, op| {
                fold(s, op);
                Ok(())
            },
            move |s1, s2| Ok(reduce(s1, s2)),
        )
    }
}

impl<O, S, E> FnAlgebra<O, S, E> {
    /// Builds an algebra from fallible hooks.
    pub fn try_new(
        initial: impl Fn() -> Result<S, E> + Send + Sync + 'static,
        fold: impl Fn(&mut S, O) -> Result<(), E> + Send + Sync + 'static,
        reduce: impl Fn(S, S) -> Result<S, E> + Send + Sync + 'static,
    ) -> Self {
        Self {
            initial: Arc::new(initial),
            fold: Arc::new(fold),
            reduce: Arc::new(reduce),
        }
    }
}

impl<O, S, E> Clone for FnAlgebra<O, S, E> {
    fn clone(&self) -> Self {
        Self {
            initial: self.initial.clone(),
            fold: self.fold.clone(),
            reduce: self.reduce.clone(),
        }
    }
}

impl<O, S, E> Debug for FnAlgebra<O, S, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnAlgebra")
    }
}

impl<O, S, E> Algebra for FnAlgebra<O, S, E> {
    type Op = O;
    type State = S;
    type Error = E;

    fn initial_state(&self) -> Result<S, E> {
        (self.initial)()
    }

    fn fold(&self, state: &mut S, op: O) -> Result<(), E> {
        (self.fold)(state, op)
    }

    fn reduce(&self, s1: S, s2: S) -> Result<S, E> {
        (self.reduce)(s1, s2)
    }
}

/// Sum of the folded values, starting from `T::default()`.
#[derive(Debug)]
pub struct Sum<T> {
    _t: PhantomData<fn(T) -> T>,
}

impl<T> Sum<T> {
    pub fn new() -> Self {
        Self { _t: PhantomData }
    }
}

impl<T> Clone for Sum<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> Algebra for Sum<T>
where
    T: Default + AddAssign + Add<Output = T>,
{
    type Op = T;
    type State = T;
    type Error = Infallible;

    fn initial_state(&self) -> Result<T, Infallible> {
        Ok(T::default())
    }

    fn fold(&self, state: &mut T, op: T) -> Result<(), Infallible> {
        *state += op;
        Ok(())
    }

    fn reduce(&self, s1: T, s2: T) -> Result<T, Infallible> {
        Ok(s1 + s2)
    }
}
