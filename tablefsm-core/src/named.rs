//! Sparse, string-keyed state machine.
//!
//! States and messages live in two validation universes that are managed
//! separately from the transition maps. Absence of an entry and a self-loop
//! mean the same thing, so self-loops are never stored.

use crate::error::CoreError;
use crate::event::{Observers, StateChange};
use crate::machine::TransitionMachine;
use crate::vocabulary::Vocabulary;
use std::collections::{BTreeMap, BTreeSet};
use tablefsm_document::TransitionDocument;
use tracing::{debug, trace};

/// String-keyed transition table with a cursor.
#[derive(Debug, Default)]
pub struct NamedMachine {
    states: BTreeSet<String>,
    messages: BTreeSet<String>,
    transitions: BTreeMap<String, BTreeMap<String, String>>,

    initial: Option<String>,
    current: Option<String>,
    prev: Option<String>,

    observers: Observers<String>,
}

impl NamedMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether any state has been added.
    pub fn is_ready(&self) -> bool {
        self.initial.is_some()
    }

    /// Adds states to the universe. Returns how many were new.
    ///
    /// The first state ever added becomes the initial state.
    pub fn add_states<I, S>(&mut self, names: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut added = 0;
        for name in names {
            let name = name.into();
            if self.states.contains(&name) {
                continue;
            }
            self.transitions.entry(name.clone()).or_default();
            if self.initial.is_none() {
                self.initial = Some(name.clone());
                self.current = Some(name.clone());
                self.prev = Some(name.clone());
            }
            self.states.insert(name);
            added += 1;
        }
        added
    }

    /// Adds messages to the universe. Returns how many were new.
    pub fn add_messages<I, S>(&mut self, names: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut added = 0;
        for name in names {
            if self.messages.insert(name.into()) {
                added += 1;
            }
        }
        added
    }

    pub fn add_states_from<S: Vocabulary>(&mut self) -> usize {
        self.add_states(S::NAMES.iter().copied())
    }

    pub fn add_messages_from<M: Vocabulary>(&mut self) -> usize {
        self.add_messages(M::NAMES.iter().copied())
    }

    /// Sets initial, previous and current state to a known state.
    ///
    /// Unknown names are ignored and return `false`.
    pub fn set_initial_state(&mut self, name: &str) -> bool {
        if !self.states.contains(name) {
            return false;
        }
        self.initial = Some(name.to_string());
        self.current = Some(name.to_string());
        self.prev = Some(name.to_string());
        true
    }

    /// Writes the transition `state --message--> next_state`.
    ///
    /// All three names must already be known. Writing a self-loop clears the
    /// entry.
    pub fn set(&mut self, state: &str, message: &str, next_state: &str) -> Result<(), CoreError> {
        if !self.states.contains(state) {
            return Err(CoreError::UnknownState {
                state: state.to_string(),
            });
        }
        if !self.messages.contains(message) {
            return Err(CoreError::UnknownMessage {
                message: message.to_string(),
            });
        }
        if !self.states.contains(next_state) {
            return Err(CoreError::UnknownTargetState {
                state: next_state.to_string(),
            });
        }

        let table = self
            .transitions
            .get_mut(state)
            .ok_or_else(|| CoreError::MissingStateTable {
                state: state.to_string(),
            })?;
        if state == next_state {
            table.remove(message);
        } else {
            table.insert(message.to_string(), next_state.to_string());
        }
        Ok(())
    }

    /// Dispatches `message` from the current state.
    ///
    /// Unknown messages and messages without a transition return `false`.
    ///
    /// # Panics
    ///
    /// Panics if no state has been added.
    pub fn send_message(&mut self, message: &str) -> bool {
        let current = self.cursor();
        let next = match self
            .transitions
            .get(current)
            .and_then(|table| table.get(message))
        {
            Some(next) if next != current => next.clone(),
            _ => return false,
        };
        trace!("state {} -> {} on message {}", current, next, message);
        self.transition_to(next);
        true
    }

    /// Moves the cursor to a known state without consulting the table.
    ///
    /// # Panics
    ///
    /// Panics if no state has been added.
    pub fn force_state(&mut self, name: &str) -> bool {
        let current = self.cursor();
        if current == name || !self.states.contains(name) {
            return false;
        }
        trace!("state {} -> {} forced", current, name);
        self.transition_to(name.to_string());
        true
    }

    /// # Panics
    ///
    /// Panics if no state has been added.
    pub fn reset_to_initial_state(&mut self) {
        let old = self.cursor().to_string();
        let initial = self.initial.clone();
        self.prev = initial.clone();
        self.current = initial.clone();
        if let Some(initial) = initial {
            self.observers.notify_reset(&StateChange::new(old, initial));
        }
    }

    pub fn on_state_changed(&mut self, f: impl FnMut(&StateChange<String>) + 'static) {
        self.observers.on_state_changed(f);
    }

    pub fn on_reset(&mut self, f: impl FnMut(&StateChange<String>) + 'static) {
        self.observers.on_reset(f);
    }

    /// Merges a document into this machine.
    ///
    /// Names are unioned into the universes; names that already exist are
    /// accepted as-is. Every transition is validated and written, so the
    /// document's entries win over existing ones. An unsized machine adopts
    /// the document's initial state.
    pub fn add_state_machine(&mut self, doc: &TransitionDocument) -> Result<(), CoreError> {
        let was_ready = self.is_ready();
        let new_states = self.add_states(doc.state_names.iter().cloned());
        let new_messages = self.add_messages(doc.message_names.iter().cloned());

        if !was_ready {
            self.set_initial_state(&doc.initial);
        }

        for block in &doc.states {
            for t in &block.transitions {
                self.set(&block.name, &t.message, &t.target_state)?;
            }
        }

        debug!(
            "merged {} transitions ({} new states, {} new messages)",
            doc.transition_count(),
            new_states,
            new_messages
        );
        Ok(())
    }

    /// Removes every state and message named by a document.
    ///
    /// Remaining transitions that use a removed message or lead to a removed
    /// state are dropped. A removed initial state is replaced by the first
    /// remaining state; a removed current state is forced to the initial
    /// state.
    pub fn remove_state_machine(&mut self, doc: &TransitionDocument) {
        let removed_states: BTreeSet<&str> = doc.state_names.iter().map(String::as_str).collect();
        let removed_messages: BTreeSet<&str> =
            doc.message_names.iter().map(String::as_str).collect();

        for name in &removed_states {
            self.states.remove(*name);
            self.transitions.remove(*name);
        }
        for name in &removed_messages {
            self.messages.remove(*name);
        }
        for table in self.transitions.values_mut() {
            table.retain(|message, target| {
                !removed_messages.contains(message.as_str()) && !removed_states.contains(target.as_str())
            });
        }

        if self.states.is_empty() {
            debug!("removed every state; machine is empty");
            self.initial = None;
            self.current = None;
            self.prev = None;
            return;
        }

        let is_removed = |name: &Option<String>| {
            name.as_deref()
                .map_or(true, |name| removed_states.contains(name))
        };

        if is_removed(&self.initial) {
            self.initial = self.states.iter().next().cloned();
        }
        let Some(initial) = self.initial.clone() else {
            return;
        };

        if is_removed(&self.current) {
            let old = self.current.replace(initial.clone()).unwrap_or_default();
            self.prev = Some(initial.clone());
            self.observers
                .notify_state_changed(&StateChange::new(old, initial));
        } else if is_removed(&self.prev) {
            self.prev = Some(initial);
        }
    }

    pub fn states(&self) -> impl Iterator<Item = &str> {
        self.states.iter().map(String::as_str)
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().map(String::as_str)
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn num_messages(&self) -> usize {
        self.messages.len()
    }

    pub fn has_state(&self, name: &str) -> bool {
        self.states.contains(name)
    }

    pub fn has_message(&self, name: &str) -> bool {
        self.messages.contains(name)
    }

    /// Target of `state` on `message`, if a transition is stored.
    pub fn transition(&self, state: &str, message: &str) -> Option<&str> {
        self.transitions
            .get(state)
            .and_then(|table| table.get(message))
            .map(String::as_str)
    }

    /// All stored transitions of `state`, keyed by message.
    pub fn transitions_from(&self, state: &str) -> Option<&BTreeMap<String, String>> {
        self.transitions.get(state)
    }

    pub fn initial_state(&self) -> Option<&str> {
        self.initial.as_deref()
    }

    pub fn current_state(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn prev_state(&self) -> Option<&str> {
        self.prev.as_deref()
    }

    /// Structural equality over universes, transitions and initial state.
    pub fn compare(&self, other: &NamedMachine) -> bool {
        self.initial == other.initial
            && self.states == other.states
            && self.messages == other.messages
            && self.transitions == other.transitions
    }

    pub fn from_document(doc: &TransitionDocument) -> Result<Self, CoreError> {
        let mut machine = Self::new();
        machine.load_document(doc)?;
        Ok(machine)
    }

    /// Replaces the machine with the contents of `doc`. Observers are kept.
    ///
    /// On error the machine is left as it was.
    pub fn load_document(&mut self, doc: &TransitionDocument) -> Result<(), CoreError> {
        if doc.state_names.is_empty() {
            return Err(CoreError::EmptyDocument);
        }
        if !doc.state_names.contains(&doc.initial) {
            return Err(CoreError::UnknownState {
                state: doc.initial.clone(),
            });
        }

        let mut staged = Self::new();
        staged.add_state_machine(doc)?;
        staged.observers = std::mem::take(&mut self.observers);
        *self = staged;
        Ok(())
    }

    pub fn to_document(&self) -> Result<TransitionDocument, CoreError> {
        let initial = self.initial.clone().ok_or(CoreError::EmptyDocument)?;
        let mut doc = TransitionDocument::new(initial)
            .with_states(self.states.iter().cloned())
            .with_messages(self.messages.iter().cloned());
        for (state, table) in &self.transitions {
            for (message, target) in table {
                doc.add_transition(state.as_str(), message.as_str(), target.as_str());
            }
        }
        Ok(doc)
    }

    fn cursor(&self) -> &str {
        match self.current.as_deref() {
            Some(current) => current,
            None => panic!("state machine has no states"),
        }
    }

    fn transition_to(&mut self, next: String) {
        self.prev = self.current.replace(next);
        if let (Some(old), Some(new)) = (&self.prev, &self.current) {
            let change = StateChange::new(old.clone(), new.clone());
            self.observers.notify_state_changed(&change);
        }
    }
}

impl TransitionMachine for NamedMachine {
    type State = String;
    type Message = str;
    type StateKey = str;

    fn send_message(&mut self, message: &str) -> bool {
        NamedMachine::send_message(self, message)
    }

    fn force_state(&mut self, state: &str) -> bool {
        NamedMachine::force_state(self, state)
    }

    fn reset_to_initial_state(&mut self) {
        NamedMachine::reset_to_initial_state(self)
    }

    fn initial_state(&self) -> String {
        sized(&self.initial)
    }

    fn current_state(&self) -> String {
        sized(&self.current)
    }

    fn prev_state(&self) -> String {
        sized(&self.prev)
    }

    fn current_state_name(&self) -> Option<&str> {
        self.current.as_deref()
    }

    fn on_state_changed(&mut self, f: Box<dyn FnMut(&StateChange<String>)>) {
        self.observers.on_state_changed(f);
    }

    fn on_reset(&mut self, f: Box<dyn FnMut(&StateChange<String>)>) {
        self.observers.on_reset(f);
    }

    fn to_document(&self) -> Result<TransitionDocument, CoreError> {
        NamedMachine::to_document(self)
    }
}

fn sized(name: &Option<String>) -> String {
    match name {
        Some(name) => name.clone(),
        None => panic!("state machine has no states"),
    }
}
