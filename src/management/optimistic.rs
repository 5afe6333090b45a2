//! Optimistic updates of local state.
//!
//! A mutation is applied to the local value immediately, so the UI reflects it
//! without waiting for the network. The remote effect then either confirms it
//! or the recorded inverse is applied to undo it. Concurrent sessions are last
//! write wins; there is no versioning.

use std::{
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    Pending,
    Committed,
    RolledBack,
}

#[derive(Debug)]
pub enum Outcome<E> {
    Committed,
    RolledBack(E),
}

impl<E> Outcome<E> {
    pub fn state(&self) -> MutationState {
        match self {
            Outcome::Committed => MutationState::Committed,
            Outcome::RolledBack(_) => MutationState::RolledBack,
        }
    }

    pub fn into_result(self) -> Result<(), E> {
        match self {
            Outcome::Committed => Ok(()),
            Outcome::RolledBack(e) => Err(e),
        }
    }
}

type Inverse<T> = Box<dyn FnOnce(&mut T) + Send>;

/// Shared local value that mutations are applied to optimistically.
pub struct Optimistic<T> {
    value: Arc<Mutex<T>>,
}

impl<T> Clone for Optimistic<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
        }
    }
}

impl<T: Default> Default for Optimistic<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Optimistic<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: Arc::new(Mutex::new(value)),
        }
    }

    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&*lock(&self.value))
    }

    /// Replaces the value outright, e.g. after reloading from the server.
    pub fn replace(&self, value: T) {
        *lock(&self.value) = value;
    }

    /// Applies `forward` now and returns the pending mutation that will undo
    /// it with `inverse` if the remote effect fails.
    pub fn begin<F, I>(&self, forward: F, inverse: I) -> PendingMutation<T>
    where
        F: FnOnce(&mut T),
        I: FnOnce(&mut T) + Send + 'static,
    {
        self.begin_with(forward, inverse).1
    }

    /// Like [`begin`](Self::begin), also handing back what `forward` saw
    /// while it held the value.
    pub fn begin_with<R, F, I>(&self, forward: F, inverse: I) -> (R, PendingMutation<T>)
    where
        F: FnOnce(&mut T) -> R,
        I: FnOnce(&mut T) + Send + 'static,
    {
        let seen = forward(&mut *lock(&self.value));
        let pending = PendingMutation {
            value: Arc::clone(&self.value),
            inverse: Some(Box::new(inverse)),
            state: MutationState::Pending,
        };
        (seen, pending)
    }
}

impl<T: Clone> Optimistic<T> {
    pub fn snapshot(&self) -> T {
        lock(&self.value).clone()
    }
}

/// A mutation that has been applied locally but not yet confirmed.
///
/// Dropping it without settling keeps the local change.
pub struct PendingMutation<T> {
    value: Arc<Mutex<T>>,
    inverse: Option<Inverse<T>>,
    state: MutationState,
}

impl<T> PendingMutation<T> {
    pub fn state(&self) -> MutationState {
        self.state
    }

    /// Awaits the remote effect. On failure the inverse is applied and the
    /// error handed back in [`Outcome::RolledBack`].
    pub async fn settle<Fut, E>(mut self, effect: Fut) -> Outcome<E>
    where
        Fut: Future<Output = Result<(), E>>,
    {
        match effect.await {
            Ok(()) => {
                self.state = MutationState::Committed;
                Outcome::Committed
            }
            Err(e) => {
                self.rollback();
                Outcome::RolledBack(e)
            }
        }
    }

    /// Confirms the local change without a remote effect.
    pub fn commit(mut self) -> MutationState {
        self.inverse = None;
        self.state = MutationState::Committed;
        self.state
    }

    fn rollback(&mut self) {
        if let Some(inverse) = self.inverse.take() {
            inverse(&mut *lock(&self.value));
        }
        self.state = MutationState::RolledBack;
    }
}

// A panic inside a mutation closure must not wedge the value for everyone else.
fn lock<T>(value: &Mutex<T>) -> MutexGuard<'_, T> {
    value.lock().unwrap_or_else(PoisonError::into_inner)
}
