//! Dense, integer-indexed state machine.
//!
//! The transition table is a row-major `num_states * num_messages` grid in
//! which every cell holds a valid state index. A cell equal to its row index
//! is a self-loop and means "no transition".
//!
//! Messages passed to [`IndexedMachine::send_message`],
//! [`IndexedMachine::set_entry`] and [`IndexedMachine::entry`] are absolute
//! ids: the machine subtracts its message offset before touching the table,
//! so several machines can consume one shared message-id stream. Name
//! accessors and [`IndexedMachine::remove_message`] work on local indices.

use crate::error::CoreError;
use crate::event::{Observers, StateChange};
use crate::machine::TransitionMachine;
use crate::names::NameTable;
use crate::vocabulary::Vocabulary;
use std::collections::HashSet;
use tablefsm_document::TransitionDocument;
use tracing::{debug, trace, warn};

/// Integer-indexed transition table with a cursor.
#[derive(Debug, Default)]
pub struct IndexedMachine {
    table: Vec<usize>,
    num_states: usize,
    num_messages: usize,
    message_offset: usize,

    initial: usize,
    current: usize,
    prev: usize,

    state_names: NameTable,
    message_names: NameTable,

    observers: Observers<usize>,
}

impl IndexedMachine {
    /// Creates an unsized machine. Call [`initialize`](Self::initialize)
    /// before dispatching.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates and sizes a machine in one step.
    pub fn with_size(
        num_states: usize,
        num_messages: usize,
        initial_state: usize,
        message_offset: usize,
    ) -> Self {
        let mut machine = Self::new();
        machine.initialize(num_states, num_messages, initial_state, message_offset);
        machine
    }

    /// Creates a machine sized and named from two vocabularies.
    pub fn from_vocabulary<S: Vocabulary, M: Vocabulary>(initial: S, message_offset: usize) -> Self {
        let mut machine = Self::new();
        machine.initialize_from::<S, M>(initial, message_offset);
        machine
    }

    /// Allocates the table and resets names and cursor.
    ///
    /// Every cell starts as a self-loop and every name slot starts unset. An
    /// out-of-range `initial_state` falls back to 0. Registered observers are
    /// kept.
    ///
    /// # Panics
    ///
    /// Panics if `num_states` is 0.
    pub fn initialize(
        &mut self,
        num_states: usize,
        num_messages: usize,
        initial_state: usize,
        message_offset: usize,
    ) {
        assert!(num_states > 0, "state machine needs at least one state");

        self.table = (0..num_states)
            .flat_map(|state| std::iter::repeat(state).take(num_messages))
            .collect();
        self.num_states = num_states;
        self.num_messages = num_messages;
        self.message_offset = message_offset;

        self.state_names = NameTable::with_len(num_states);
        self.message_names = NameTable::with_len(num_messages);

        self.initial = if initial_state < num_states { initial_state } else { 0 };
        self.current = self.initial;
        self.prev = self.initial;
    }

    /// Sizes the machine from two vocabularies and copies their names.
    pub fn initialize_from<S: Vocabulary, M: Vocabulary>(&mut self, initial: S, message_offset: usize) {
        self.initialize(S::NAMES.len(), M::NAMES.len(), initial.index(), message_offset);
        self.state_names.set_from(0, S::NAMES.iter().copied());
        self.message_names.set_from(0, M::NAMES.iter().copied());
    }

    /// Returns whether the machine has been sized.
    pub fn is_ready(&self) -> bool {
        self.num_states > 0
    }

    pub fn num_states(&self) -> usize {
        self.num_states
    }

    pub fn num_messages(&self) -> usize {
        self.num_messages
    }

    pub fn message_offset(&self) -> usize {
        self.message_offset
    }

    pub fn initial_state(&self) -> usize {
        self.initial
    }

    /// Sets the initial state; out-of-range values fall back to 0.
    ///
    /// The cursor is not moved.
    pub fn set_initial_state(&mut self, state: usize) {
        self.initial = if state < self.num_states { state } else { 0 };
    }

    pub fn current_state(&self) -> usize {
        self.current
    }

    pub fn prev_state(&self) -> usize {
        self.prev
    }

    pub fn current_state_name(&self) -> Option<&str> {
        self.state_names.get(self.current)
    }

    pub fn state_name(&self, state: usize) -> Option<&str> {
        self.state_names.get(state)
    }

    /// # Panics
    ///
    /// Panics if `state` is out of range.
    pub fn set_state_name(&mut self, state: usize, name: impl Into<String>) {
        self.state_names.set(state, name);
    }

    /// Name of the message at local index `message`.
    pub fn message_name(&self, message: usize) -> Option<&str> {
        self.message_names.get(message)
    }

    /// Names the message at local index `message`.
    ///
    /// # Panics
    ///
    /// Panics if `message` is out of range.
    pub fn set_message_name(&mut self, message: usize, name: impl Into<String>) {
        self.message_names.set(message, name);
    }

    pub fn state_from_name(&self, name: &str) -> Option<usize> {
        self.state_names.index_of(name)
    }

    /// Local index of the named message.
    pub fn message_from_name(&self, name: &str) -> Option<usize> {
        self.message_names.index_of(name)
    }

    /// Absolute id of the named message, suitable for
    /// [`send_message`](Self::send_message).
    pub fn message_id_from_name(&self, name: &str) -> Option<usize> {
        self.message_from_name(name).map(|m| m + self.message_offset)
    }

    pub fn state_names(&self) -> &NameTable {
        &self.state_names
    }

    pub fn message_names(&self) -> &NameTable {
        &self.message_names
    }

    /// Target of `state` on absolute message id `message`.
    ///
    /// # Panics
    ///
    /// Panics if either operand is out of range.
    pub fn entry(&self, state: usize, message: usize) -> usize {
        let cell = self.cell(state, message);
        self.table[cell]
    }

    /// Writes the target of `state` on absolute message id `message`.
    ///
    /// # Panics
    ///
    /// Panics if any operand is out of range.
    pub fn set_entry(&mut self, state: usize, message: usize, next_state: usize) {
        assert!(
            next_state < self.num_states,
            "target state {} out of range (machine has {} states)",
            next_state,
            self.num_states
        );
        let cell = self.cell(state, message);
        self.table[cell] = next_state;
    }

    /// Writes a transition by name.
    pub fn set_entry_by_name(
        &mut self,
        state: &str,
        message: &str,
        next_state: &str,
    ) -> Result<(), CoreError> {
        let (state, message, next_state) = self.resolve(state, message, next_state)?;
        let cell = self.local_cell(state, message);
        self.table[cell] = next_state;
        Ok(())
    }

    /// Row of `state`, indexed by local message.
    pub fn row(&self, state: usize) -> &[usize] {
        self.assert_state(state);
        let start = state * self.num_messages;
        &self.table[start..start + self.num_messages]
    }

    /// Dispatches absolute message id `message`.
    ///
    /// Returns `true` and notifies observers if the current state changed.
    ///
    /// # Panics
    ///
    /// Panics if the machine is unsized or the message is out of range.
    pub fn send_message(&mut self, message: usize) -> bool {
        self.assert_ready();
        let next = self.table[self.cell(self.current, message)];
        if next == self.current {
            return false;
        }
        trace!("state {} -> {} on message {}", self.current, next, message);
        self.transition_to(next);
        true
    }

    /// Moves the cursor to `state` without consulting the table.
    ///
    /// # Panics
    ///
    /// Panics if the machine is unsized or `state` is out of range.
    pub fn force_state(&mut self, state: usize) -> bool {
        self.assert_ready();
        self.assert_state(state);
        if state == self.current {
            return false;
        }
        trace!("state {} -> {} forced", self.current, state);
        self.transition_to(state);
        true
    }

    /// Sets previous and current state to the initial state.
    pub fn reset_to_initial_state(&mut self) {
        self.assert_ready();
        let change = StateChange::new(self.current, self.initial);
        self.prev = self.initial;
        self.current = self.initial;
        self.observers.notify_reset(&change);
    }

    pub fn on_state_changed(&mut self, f: impl FnMut(&StateChange<usize>) + 'static) {
        self.observers.on_state_changed(f);
    }

    pub fn on_reset(&mut self, f: impl FnMut(&StateChange<usize>) + 'static) {
        self.observers.on_reset(f);
    }

    /// Rebuilds the table with new dimensions.
    ///
    /// Overlapping cells keep their target if it still exists and otherwise
    /// degrade to self-loops; new cells are self-loops and new name slots are
    /// unset. A zero dimension leaves the machine untouched.
    ///
    /// The cursor is not reset: initial, current and previous state keep
    /// their values while they stay in range. An out-of-range initial state
    /// falls back to 0 and an out-of-range current or previous state falls
    /// back to the initial state, without raising events.
    ///
    /// Returns the number of transitions that degraded to self-loops.
    pub fn resize(&mut self, num_states: usize, num_messages: usize) -> usize {
        if num_states == 0 || num_messages == 0 {
            warn!(
                "ignoring resize to {} states x {} messages",
                num_states, num_messages
            );
            return 0;
        }

        let mut table: Vec<usize> = (0..num_states)
            .flat_map(|state| std::iter::repeat(state).take(num_messages))
            .collect();

        let mut degraded = 0;
        for state in 0..self.num_states.min(num_states) {
            for message in 0..self.num_messages.min(num_messages) {
                let old = self.table[state * self.num_messages + message];
                if old < num_states {
                    table[state * num_messages + message] = old;
                } else {
                    degraded += 1;
                }
            }
        }

        if degraded > 0 {
            debug!(
                "resize to {} states degraded {} transitions to self-loops",
                num_states, degraded
            );
        }

        self.table = table;
        self.num_states = num_states;
        self.num_messages = num_messages;
        self.state_names.resize(num_states);
        self.message_names.resize(num_messages);

        if self.initial >= num_states {
            self.initial = 0;
        }
        if self.current >= num_states {
            self.current = self.initial;
        }
        if self.prev >= num_states {
            self.prev = self.initial;
        }

        degraded
    }

    /// Removes `state` and renumbers the states after it.
    ///
    /// Transitions into the removed state become self-loops. Removing the
    /// last remaining state is a no-op that returns `false`.
    ///
    /// # Panics
    ///
    /// Panics if `state` is out of range.
    pub fn remove_state(&mut self, state: usize) -> bool {
        self.assert_state(state);
        if self.num_states == 1 {
            warn!("refusing to remove the only state");
            return false;
        }

        let shift = |index: usize| if index > state { index - 1 } else { index };

        let mut table = Vec::with_capacity((self.num_states - 1) * self.num_messages);
        for (row, cells) in self.table.chunks(self.num_messages.max(1)).enumerate() {
            if row == state {
                continue;
            }
            let new_row = shift(row);
            table.extend(
                cells
                    .iter()
                    .map(|&target| if target == state { new_row } else { shift(target) }),
            );
        }

        self.table = table;
        self.num_states -= 1;
        self.state_names.remove(state);

        self.initial = if self.initial == state { 0 } else { shift(self.initial) };
        self.current = if self.current == state { self.initial } else { shift(self.current) };
        self.prev = if self.prev == state { self.initial } else { shift(self.prev) };

        true
    }

    /// Removes the message at local index `message`.
    ///
    /// Removing the last remaining message is a no-op that returns `false`.
    ///
    /// # Panics
    ///
    /// Panics if `message` is out of range.
    pub fn remove_message(&mut self, message: usize) -> bool {
        assert!(
            message < self.num_messages,
            "message index {} out of range (machine has {} messages)",
            message,
            self.num_messages
        );
        if self.num_messages == 1 {
            warn!("refusing to remove the only message");
            return false;
        }

        let width = self.num_messages;
        self.table = self
            .table
            .iter()
            .enumerate()
            .filter(|(cell, _)| cell % width != message)
            .map(|(_, &target)| target)
            .collect();
        self.num_messages -= 1;
        self.message_names.remove(message);

        true
    }

    /// Structural equality: initial state, dimensions, names and cells.
    ///
    /// The cursor, message offset and observers are not compared.
    pub fn compare(&self, other: &IndexedMachine) -> bool {
        self.initial == other.initial
            && self.num_states == other.num_states
            && self.num_messages == other.num_messages
            && self.state_names == other.state_names
            && self.message_names == other.message_names
            && self.table == other.table
    }

    /// Builds a machine from a document.
    ///
    /// States and messages are numbered in document order.
    pub fn from_document(doc: &TransitionDocument, message_offset: usize) -> Result<Self, CoreError> {
        let mut machine = Self::new();
        machine.message_offset = message_offset;
        machine.load_document(doc)?;
        Ok(machine)
    }

    /// Replaces the table, names and cursor with the contents of `doc`.
    ///
    /// The message offset and observers are kept. On error the machine is
    /// left as it was.
    pub fn load_document(&mut self, doc: &TransitionDocument) -> Result<(), CoreError> {
        let mut staged = Self::new();
        staged.message_offset = self.message_offset;
        staged.hydrate(doc)?;
        staged.observers = std::mem::take(&mut self.observers);
        *self = staged;
        Ok(())
    }

    fn hydrate(&mut self, doc: &TransitionDocument) -> Result<(), CoreError> {
        let states = unique(&doc.state_names);
        if states.is_empty() {
            return Err(CoreError::EmptyDocument);
        }
        let messages = unique(&doc.message_names);

        self.initialize(states.len(), messages.len(), 0, self.message_offset);
        self.state_names.set_from(0, states);
        self.message_names.set_from(0, messages);

        self.write_transitions(doc)?;

        let initial = self.require_state(&doc.initial)?;
        self.initial = initial;
        self.current = initial;
        self.prev = initial;
        Ok(())
    }

    /// Grows the machine to hold a document's names, then applies it.
    ///
    /// Unknown names are appended after the existing ones; existing cells
    /// are kept. The document's initial state becomes the machine's initial
    /// state and its transitions overwrite the matching cells. Every name is
    /// checked before anything is written, so on error the machine is left
    /// as it was.
    pub fn append_document(&mut self, doc: &TransitionDocument) -> Result<(), CoreError> {
        if !self.is_ready() {
            return self.load_document(doc);
        }
        self.check_append(doc)?;

        let new_states: Vec<&str> = unique(&doc.state_names)
            .into_iter()
            .filter(|name| self.state_from_name(name).is_none())
            .collect();
        let new_messages: Vec<&str> = unique(&doc.message_names)
            .into_iter()
            .filter(|name| self.message_from_name(name).is_none())
            .collect();

        if !new_states.is_empty() || !new_messages.is_empty() {
            let (first_state, first_message) = (self.num_states, self.num_messages);
            if first_message + new_messages.len() == 0 {
                // Nothing to resize into; only states are new.
                self.grow_states(new_states.len());
            } else {
                self.resize(
                    first_state + new_states.len(),
                    first_message + new_messages.len(),
                );
            }
            self.state_names.set_from(first_state, new_states.iter().copied());
            self.message_names
                .set_from(first_message, new_messages.iter().copied());
            debug!(
                "appended {} states and {} messages",
                new_states.len(),
                new_messages.len()
            );
        }

        self.write_transitions(doc)?;
        self.initial = self.require_state(&doc.initial)?;
        Ok(())
    }

    /// Serializes the machine.
    ///
    /// Every state and message must carry a name that no other state or
    /// message of the same kind uses.
    pub fn to_document(&self) -> Result<TransitionDocument, CoreError> {
        if let Some(index) = self.state_names.first_unset() {
            return Err(CoreError::UnnamedState { index });
        }
        if let Some(index) = self.message_names.first_unset() {
            return Err(CoreError::UnnamedMessage { index });
        }
        let state_names = distinct_names(&self.state_names)?;
        let message_names = distinct_names(&self.message_names)?;

        let initial = state_names
            .get(self.initial)
            .cloned()
            .ok_or(CoreError::EmptyDocument)?;
        let mut doc = TransitionDocument::new(initial);

        for (state, name) in state_names.iter().enumerate() {
            for (message, &target) in self.row(state).iter().enumerate() {
                if target != state {
                    doc.add_transition(
                        name.as_str(),
                        message_names[message].as_str(),
                        state_names[target].as_str(),
                    );
                }
            }
        }

        doc.state_names = state_names;
        doc.message_names = message_names;
        Ok(doc)
    }

    fn check_append(&self, doc: &TransitionDocument) -> Result<(), CoreError> {
        let doc_states: HashSet<&str> = doc.state_names.iter().map(String::as_str).collect();
        let doc_messages: HashSet<&str> = doc.message_names.iter().map(String::as_str).collect();
        let has_state =
            |name: &str| doc_states.contains(name) || self.state_from_name(name).is_some();
        let has_message =
            |name: &str| doc_messages.contains(name) || self.message_from_name(name).is_some();

        for block in &doc.states {
            if !has_state(&block.name) {
                return Err(CoreError::UnknownState {
                    state: block.name.clone(),
                });
            }
            for t in &block.transitions {
                if !has_message(&t.message) {
                    return Err(CoreError::UnknownMessage {
                        message: t.message.clone(),
                    });
                }
                if !has_state(&t.target_state) {
                    return Err(CoreError::UnknownTargetState {
                        state: t.target_state.clone(),
                    });
                }
            }
        }
        if !has_state(&doc.initial) {
            return Err(CoreError::UnknownState {
                state: doc.initial.clone(),
            });
        }
        Ok(())
    }

    fn transition_to(&mut self, next: usize) {
        self.prev = self.current;
        self.current = next;
        let change = StateChange::new(self.prev, self.current);
        self.observers.notify_state_changed(&change);
    }

    fn grow_states(&mut self, extra: usize) {
        self.num_states += extra;
        self.state_names.resize(self.num_states);
    }

    fn write_transitions(&mut self, doc: &TransitionDocument) -> Result<(), CoreError> {
        for block in &doc.states {
            for t in &block.transitions {
                let (state, message, next_state) =
                    self.resolve(&block.name, &t.message, &t.target_state)?;
                let cell = self.local_cell(state, message);
                self.table[cell] = next_state;
            }
        }
        Ok(())
    }

    fn resolve(
        &self,
        state: &str,
        message: &str,
        next_state: &str,
    ) -> Result<(usize, usize, usize), CoreError> {
        let state = self.require_state(state)?;
        let message = self
            .message_from_name(message)
            .ok_or_else(|| CoreError::UnknownMessage {
                message: message.to_string(),
            })?;
        let next_state = self
            .state_from_name(next_state)
            .ok_or_else(|| CoreError::UnknownTargetState {
                state: next_state.to_string(),
            })?;
        Ok((state, message, next_state))
    }

    fn require_state(&self, name: &str) -> Result<usize, CoreError> {
        self.state_from_name(name)
            .ok_or_else(|| CoreError::UnknownState {
                state: name.to_string(),
            })
    }

    fn cell(&self, state: usize, message: usize) -> usize {
        assert!(
            message >= self.message_offset && message - self.message_offset < self.num_messages,
            "message {} out of range [{}, {})",
            message,
            self.message_offset,
            self.message_offset + self.num_messages
        );
        self.local_cell(state, message - self.message_offset)
    }

    fn local_cell(&self, state: usize, message: usize) -> usize {
        self.assert_state(state);
        state * self.num_messages + message
    }

    fn assert_state(&self, state: usize) {
        assert!(
            state < self.num_states,
            "state {} out of range (machine has {} states)",
            state,
            self.num_states
        );
    }

    fn assert_ready(&self) {
        assert!(self.is_ready(), "state machine has not been sized");
    }
}

impl TransitionMachine for IndexedMachine {
    type State = usize;
    type Message = usize;
    type StateKey = usize;

    fn send_message(&mut self, message: &usize) -> bool {
        IndexedMachine::send_message(self, *message)
    }

    fn force_state(&mut self, state: &usize) -> bool {
        IndexedMachine::force_state(self, *state)
    }

    fn reset_to_initial_state(&mut self) {
        IndexedMachine::reset_to_initial_state(self)
    }

    fn initial_state(&self) -> usize {
        self.initial
    }

    fn current_state(&self) -> usize {
        self.current
    }

    fn prev_state(&self) -> usize {
        self.prev
    }

    fn current_state_name(&self) -> Option<&str> {
        IndexedMachine::current_state_name(self)
    }

    fn on_state_changed(&mut self, f: Box<dyn FnMut(&StateChange<usize>)>) {
        self.observers.on_state_changed(f);
    }

    fn on_reset(&mut self, f: Box<dyn FnMut(&StateChange<usize>)>) {
        self.observers.on_reset(f);
    }

    fn to_document(&self) -> Result<TransitionDocument, CoreError> {
        IndexedMachine::to_document(self)
    }
}

/// Names in first-seen order without repeats.
fn distinct_names(table: &NameTable) -> Result<Vec<String>, CoreError> {
    let mut seen = HashSet::new();
    table
        .iter()
        .flatten()
        .map(|name| {
            if seen.insert(name) {
                Ok(name.to_string())
            } else {
                Err(CoreError::DuplicateName {
                    name: name.to_string(),
                })
            }
        })
        .collect()
}

fn unique(names: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    names
        .iter()
        .map(String::as_str)
        .filter(|name| seen.insert(*name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// States `[one, two, three, four]`, messages `[one, two]`.
    fn counting(offset: usize) -> IndexedMachine {
        let mut machine = IndexedMachine::with_size(4, 2, 0, offset);
        for (i, name) in ["one", "two", "three", "four"].iter().enumerate() {
            machine.set_state_name(i, *name);
        }
        machine.set_message_name(0, "one");
        machine.set_message_name(1, "two");
        machine
    }

    fn record(machine: &mut IndexedMachine) -> Rc<RefCell<Vec<StateChange<usize>>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        machine.on_state_changed(move |c| sink.borrow_mut().push(c.clone()));
        events
    }

    #[test]
    fn test_initialize_defaults_to_self_loops() {
        let machine = IndexedMachine::with_size(3, 2, 1, 0);
        for state in 0..3 {
            for message in 0..2 {
                assert_eq!(machine.entry(state, message), state);
            }
        }
        assert_eq!(machine.initial_state(), 1);
        assert_eq!(machine.current_state(), 1);
        assert_eq!(machine.prev_state(), 1);
        assert_eq!(machine.state_name(0), None);
    }

    #[test]
    fn test_initialize_clamps_initial_state() {
        let machine = IndexedMachine::with_size(2, 1, 9, 0);
        assert_eq!(machine.initial_state(), 0);
        assert_eq!(machine.current_state(), 0);
    }

    #[test]
    #[should_panic(expected = "at least one state")]
    fn test_initialize_requires_states() {
        IndexedMachine::with_size(0, 3, 0, 0);
    }

    #[test]
    #[should_panic(expected = "not been sized")]
    fn test_send_before_sizing_panics() {
        IndexedMachine::new().send_message(0);
    }

    #[test]
    fn test_counting_scenario() {
        let mut machine = counting(0);
        machine.set_entry_by_name("one", "one", "two").unwrap();
        machine.set_entry_by_name("one", "two", "three").unwrap();
        machine.set_entry_by_name("two", "one", "three").unwrap();
        machine.set_entry_by_name("two", "two", "four").unwrap();
        let events = record(&mut machine);

        assert!(machine.send_message(0));
        assert_eq!(machine.current_state(), 1);
        assert_eq!(machine.prev_state(), 0);

        assert!(machine.send_message(1));
        assert_eq!(machine.current_state(), 3);
        assert_eq!(machine.prev_state(), 1);
        assert_eq!(machine.current_state_name(), Some("four"));

        assert_eq!(
            *events.borrow(),
            vec![StateChange::new(0, 1), StateChange::new(1, 3)]
        );
    }

    #[test]
    fn test_self_loop_is_not_a_transition() {
        let mut machine = counting(0);
        let events = record(&mut machine);
        assert!(!machine.send_message(0));
        assert_eq!(machine.current_state(), 0);
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn test_message_offset() {
        let mut machine = counting(10);
        machine.set_entry(0, 11, 2);
        assert_eq!(machine.entry(0, 11), 2);
        assert_eq!(machine.row(0), &[0, 2]);

        assert_eq!(machine.message_from_name("two"), Some(1));
        assert_eq!(machine.message_id_from_name("two"), Some(11));

        let id = machine.message_id_from_name("two").unwrap();
        assert!(machine.send_message(id));
        assert_eq!(machine.current_state(), 2);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_message_below_offset_panics() {
        counting(10).send_message(1);
    }

    #[test]
    #[should_panic(expected = "target state 4 out of range")]
    fn test_set_entry_target_out_of_range_panics() {
        counting(0).set_entry(0, 0, 4);
    }

    #[test]
    fn test_set_entry_by_name_reports_operand() {
        let mut machine = counting(0);
        assert!(matches!(
            machine.set_entry_by_name("five", "one", "two"),
            Err(CoreError::UnknownState { state }) if state == "five"
        ));
        assert!(matches!(
            machine.set_entry_by_name("one", "three", "two"),
            Err(CoreError::UnknownMessage { message }) if message == "three"
        ));
        assert!(matches!(
            machine.set_entry_by_name("one", "one", "zero"),
            Err(CoreError::UnknownTargetState { state }) if state == "zero"
        ));
    }

    #[test]
    fn test_force_state() {
        let mut machine = counting(0);
        let events = record(&mut machine);

        assert!(machine.force_state(2));
        assert_eq!(machine.prev_state(), 0);
        assert!(!machine.force_state(2));
        assert_eq!(machine.prev_state(), 0);
        assert_eq!(events.borrow().len(), 1);
    }

    #[test]
    fn test_reset_raises_reset_only() {
        let mut machine = counting(0);
        let changes = record(&mut machine);
        let resets = Rc::new(RefCell::new(Vec::new()));
        let sink = resets.clone();
        machine.on_reset(move |c| sink.borrow_mut().push(c.clone()));

        machine.force_state(3);
        machine.reset_to_initial_state();

        assert_eq!(machine.current_state(), 0);
        assert_eq!(machine.prev_state(), 0);
        assert_eq!(changes.borrow().len(), 1);
        assert_eq!(*resets.borrow(), vec![StateChange::new(3, 0)]);
    }

    #[test]
    fn test_resize_preserves_in_range_cells() {
        let mut machine = counting(0);
        machine.set_entry(0, 0, 1);
        machine.set_entry(0, 1, 3);
        machine.set_entry(2, 0, 0);

        let degraded = machine.resize(3, 3);
        assert_eq!(degraded, 1);
        assert_eq!(machine.entry(0, 0), 1);
        assert_eq!(machine.entry(0, 1), 0);
        assert_eq!(machine.entry(2, 0), 0);
        assert_eq!(machine.entry(2, 2), 2);
        assert_eq!(machine.state_name(2), Some("three"));
        assert_eq!(machine.state_from_name("four"), None);
        assert_eq!(machine.message_name(2), None);
    }

    #[test]
    fn test_resize_resets_out_of_range_cursor() {
        let mut machine = counting(0);
        machine.set_initial_state(3);
        machine.force_state(2);
        machine.resize(2, 2);
        assert_eq!(machine.initial_state(), 0);
        assert_eq!(machine.current_state(), 0);
        assert_eq!(machine.prev_state(), 0);
    }

    #[test]
    fn test_resize_keeps_in_range_cursor() {
        let mut machine = counting(0);
        machine.set_initial_state(1);
        machine.force_state(3);
        machine.force_state(2);
        machine.resize(3, 1);
        assert_eq!(machine.initial_state(), 1);
        assert_eq!(machine.current_state(), 2);
        assert_eq!(machine.prev_state(), 1);
    }

    #[test]
    fn test_resize_to_zero_is_noop() {
        let mut machine = counting(0);
        assert_eq!(machine.resize(0, 4), 0);
        assert_eq!(machine.resize(4, 0), 0);
        assert_eq!(machine.num_states(), 4);
        assert_eq!(machine.num_messages(), 2);
    }

    #[test]
    fn test_remove_state_remaps_cells() {
        let mut machine = counting(0);
        machine.set_entry(0, 0, 1);
        machine.set_entry(0, 1, 3);
        machine.set_entry(2, 0, 3);
        machine.set_entry(3, 1, 1);
        machine.force_state(3);

        assert!(machine.remove_state(1));
        assert_eq!(machine.num_states(), 3);
        // Transitions into the removed state are now self-loops.
        assert_eq!(machine.entry(0, 0), 0);
        assert_eq!(machine.entry(2, 1), 2);
        // Later states keep their identity under the new numbering.
        assert_eq!(machine.entry(0, 1), 2);
        assert_eq!(machine.entry(1, 0), 2);
        assert_eq!(machine.state_name(1), Some("three"));
        assert_eq!(machine.state_from_name("four"), Some(2));
        assert_eq!(machine.current_state(), 2);
        assert_eq!(machine.prev_state(), 0);
    }

    #[test]
    fn test_remove_current_state_falls_back_to_initial() {
        let mut machine = counting(0);
        machine.force_state(1);
        machine.remove_state(1);
        assert_eq!(machine.current_state(), 0);

        machine.remove_state(0);
        assert_eq!(machine.initial_state(), 0);
        assert_eq!(machine.state_name(0), Some("three"));
    }

    #[test]
    fn test_remove_last_state_is_noop() {
        let mut machine = IndexedMachine::with_size(1, 1, 0, 0);
        assert!(!machine.remove_state(0));
        assert_eq!(machine.num_states(), 1);
    }

    #[test]
    fn test_remove_message() {
        let mut machine = counting(0);
        machine.set_entry(0, 1, 2);
        assert!(machine.remove_message(0));
        assert_eq!(machine.num_messages(), 1);
        assert_eq!(machine.entry(0, 0), 2);
        assert_eq!(machine.message_name(0), Some("two"));
        assert!(!machine.remove_message(0));
    }

    #[test]
    fn test_compare() {
        let mut a = counting(0);
        let mut b = counting(5);
        assert!(a.compare(&b));

        a.set_entry(1, 1, 2);
        assert!(!a.compare(&b));
        b.set_entry(1, 6, 2);
        assert!(a.compare(&b));

        b.set_message_name(0, "uno");
        assert!(!a.compare(&b));
    }

    #[test]
    fn test_document_roundtrip() {
        let mut machine = counting(0);
        machine.set_entry(0, 0, 1);
        machine.set_entry(1, 1, 3);
        machine.set_initial_state(1);

        let doc = machine.to_document().unwrap();
        assert_eq!(doc.initial, "two");
        assert_eq!(doc.transition_count(), 2);

        let restored = IndexedMachine::from_document(&doc, 0).unwrap();
        assert!(restored.compare(&machine));
        assert_eq!(restored.current_state(), 1);
    }

    #[test]
    fn test_to_document_requires_names() {
        let machine = IndexedMachine::with_size(2, 1, 0, 0);
        assert!(matches!(
            machine.to_document(),
            Err(CoreError::UnnamedState { index: 0 })
        ));
    }

    #[test]
    fn test_from_document_rejects_unknown_names() {
        let mut doc = TransitionDocument::new("a")
            .with_states(["a", "b"])
            .with_messages(["go"]);
        doc.add_transition("a", "go", "c");
        assert!(matches!(
            IndexedMachine::from_document(&doc, 0),
            Err(CoreError::UnknownTargetState { .. })
        ));

        let empty = TransitionDocument::new("a");
        assert!(matches!(
            IndexedMachine::from_document(&empty, 0),
            Err(CoreError::EmptyDocument)
        ));
    }

    #[test]
    fn test_failed_load_leaves_machine_unchanged() {
        let build = || {
            let mut machine = counting(0);
            machine.set_entry(0, 0, 1);
            machine.set_entry(1, 1, 3);
            machine
        };
        let mut machine = build();
        machine.force_state(2);
        let events = record(&mut machine);

        let mut doc = TransitionDocument::new("a")
            .with_states(["a", "b"])
            .with_messages(["go"]);
        doc.add_transition("a", "go", "nowhere");
        assert!(matches!(
            machine.load_document(&doc),
            Err(CoreError::UnknownTargetState { ref state }) if state == "nowhere"
        ));

        assert!(machine.compare(&build()));
        assert_eq!(machine.current_state(), 2);
        assert_eq!(machine.prev_state(), 0);
        assert!(machine.force_state(0));
        assert_eq!(events.borrow().len(), 1);
    }

    #[test]
    fn test_failed_append_leaves_machine_unchanged() {
        let mut machine = counting(0);
        machine.set_entry(0, 1, 2);

        let mut doc = TransitionDocument::new("five")
            .with_states(["five"])
            .with_messages(["three"]);
        doc.add_transition("five", "three", "one")
            .add_transition("one", "three", "six");
        assert!(matches!(
            machine.append_document(&doc),
            Err(CoreError::UnknownTargetState { ref state }) if state == "six"
        ));

        let mut expected = counting(0);
        expected.set_entry(0, 1, 2);
        assert!(machine.compare(&expected));

        let mut doc = TransitionDocument::new("seven").with_states(["five"]);
        doc.add_transition("five", "one", "one");
        assert!(matches!(
            machine.append_document(&doc),
            Err(CoreError::UnknownState { ref state }) if state == "seven"
        ));
        assert!(machine.compare(&expected));
    }

    #[test]
    fn test_to_document_rejects_duplicate_names() {
        let mut machine = IndexedMachine::with_size(2, 1, 0, 0);
        machine.set_state_name(0, "a");
        machine.set_state_name(1, "a");
        machine.set_message_name(0, "go");
        machine.set_entry(0, 0, 1);
        assert!(matches!(
            machine.to_document(),
            Err(CoreError::DuplicateName { ref name }) if name == "a"
        ));

        machine.set_state_name(1, "b");
        machine.resize(2, 2);
        machine.set_message_name(1, "go");
        let err = machine.to_document().unwrap_err();
        assert_eq!(err.error_code(), "DUPLICATE_NAME");

        machine.set_message_name(1, "stop");
        let doc = machine.to_document().unwrap();
        assert!(IndexedMachine::from_document(&doc, 0).unwrap().compare(&machine));
    }

    #[test]
    fn test_load_document_keeps_observers_and_offset() {
        let mut machine = counting(3);
        let events = record(&mut machine);

        let mut doc = TransitionDocument::new("a")
            .with_states(["a", "b"])
            .with_messages(["go"]);
        doc.add_transition("a", "go", "b");
        machine.load_document(&doc).unwrap();

        assert_eq!(machine.message_offset(), 3);
        assert!(machine.send_message(3));
        assert_eq!(events.borrow().len(), 1);
    }

    #[test]
    fn test_append_document_grows_machine() {
        let mut machine = counting(0);
        machine.set_entry(0, 0, 1);

        let mut extra = TransitionDocument::new("five")
            .with_states(["four", "five"])
            .with_messages(["two", "jump"]);
        extra
            .add_transition("four", "jump", "five")
            .add_transition("five", "two", "four");
        machine.append_document(&extra).unwrap();

        assert_eq!(machine.num_states(), 5);
        assert_eq!(machine.num_messages(), 3);
        assert_eq!(machine.state_name(4), Some("five"));
        assert_eq!(machine.message_name(2), Some("jump"));
        assert_eq!(machine.entry(0, 0), 1);
        assert_eq!(machine.entry(3, 2), 4);
        assert_eq!(machine.entry(4, 1), 3);
        assert_eq!(machine.initial_state(), 4);
    }

    #[test]
    fn test_trait_send_all() {
        let mut machine = counting(0);
        machine.set_entry(0, 0, 1);
        machine.set_entry(1, 1, 2);

        let changed = TransitionMachine::send_all(&mut machine, &[0, 0, 1]);
        assert_eq!(changed, 2);
        assert_eq!(machine.current_state(), 2);
    }
}
