//! Change notifications.
//!
//! Observers are plain `FnMut` closures owned by the engine and called
//! synchronously, on the dispatching call stack, after the cursor has moved.
//! While an observer runs the engine is mutably borrowed, so an observer can
//! never re-enter the machine that notified it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Old and new state of a transition or reset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateChange<T> {
    pub old: T,
    pub new: T,
}

impl<T> StateChange<T> {
    pub fn new(old: T, new: T) -> Self {
        Self { old, new }
    }

    /// Converts both sides, e.g. indices to names.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> StateChange<U> {
        StateChange {
            old: f(self.old),
            new: f(self.new),
        }
    }
}

/// A registered callback.
pub type Observer<T> = Box<dyn FnMut(&StateChange<T>)>;

/// The two notification channels of an engine.
pub struct Observers<T> {
    state_changed: Vec<Observer<T>>,
    reset: Vec<Observer<T>>,
}

impl<T> Default for Observers<T> {
    fn default() -> Self {
        Self {
            state_changed: Vec::new(),
            reset: Vec::new(),
        }
    }
}

impl<T> fmt::Debug for Observers<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("state_changed", &self.state_changed.len())
            .field("reset", &self.reset.len())
            .finish()
    }
}

impl<T> Observers<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback for transitions caused by dispatch or forcing.
    pub fn on_state_changed(&mut self, f: impl FnMut(&StateChange<T>) + 'static) {
        self.state_changed.push(Box::new(f));
    }

    /// Registers a callback for resets to the initial state.
    pub fn on_reset(&mut self, f: impl FnMut(&StateChange<T>) + 'static) {
        self.reset.push(Box::new(f));
    }

    pub fn notify_state_changed(&mut self, change: &StateChange<T>) {
        for observer in &mut self.state_changed {
            observer(change);
        }
    }

    pub fn notify_reset(&mut self, change: &StateChange<T>) {
        for observer in &mut self.reset {
            observer(change);
        }
    }
}
