//! Enum vocabularies.
//!
//! A [`Vocabulary`] is a closed set of names with dense indices, usually a
//! fieldless enum declared through [`vocabulary!`](crate::vocabulary!).
//! [`EnumMachine`] wraps an [`IndexedMachine`] so that its whole API speaks
//! enum values instead of raw indices.

use crate::error::CoreError;
use crate::event::StateChange;
use crate::indexed::IndexedMachine;
use crate::machine::TransitionMachine;
use std::marker::PhantomData;
use tablefsm_document::TransitionDocument;

/// A closed, densely indexed set of names.
pub trait Vocabulary: Copy + 'static {
    /// Names in index order.
    const NAMES: &'static [&'static str];

    fn index(self) -> usize;

    fn from_index(index: usize) -> Option<Self>;

    fn name(self) -> &'static str {
        Self::NAMES[self.index()]
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::NAMES
            .iter()
            .position(|n| *n == name)
            .and_then(Self::from_index)
    }
}

/// Declares a fieldless enum implementing [`Vocabulary`].
///
/// The enum derives `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`,
/// `PartialOrd` and `Ord`; variant names double as vocabulary names.
///
/// ```
/// tablefsm_core::vocabulary! {
///     pub enum Door { Open, Closed, Locked }
/// }
///
/// use tablefsm_core::Vocabulary;
/// assert_eq!(Door::Locked.index(), 2);
/// assert_eq!(Door::from_name("Closed"), Some(Door::Closed));
/// ```
#[macro_export]
macro_rules! vocabulary {
    ($(#[$meta:meta])* $vis:vis enum $name:ident { $($variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $vis enum $name {
            $($variant),+
        }

        impl $crate::Vocabulary for $name {
            const NAMES: &'static [&'static str] = &[$(stringify!($variant)),+];

            fn index(self) -> usize {
                self as usize
            }

            fn from_index(index: usize) -> Option<Self> {
                const ALL: &[$name] = &[$($name::$variant),+];
                ALL.get(index).copied()
            }
        }
    };
}

/// An [`IndexedMachine`] keyed by enum states `S` and messages `M`.
#[derive(Debug)]
pub struct EnumMachine<S, M> {
    inner: IndexedMachine,
    _marker: PhantomData<fn() -> (S, M)>,
}

impl<S: Vocabulary, M: Vocabulary> EnumMachine<S, M> {
    pub fn new(initial: S) -> Self {
        Self::with_offset(initial, 0)
    }

    /// Creates a machine whose messages occupy ids starting at `message_offset`.
    pub fn with_offset(initial: S, message_offset: usize) -> Self {
        Self {
            inner: IndexedMachine::from_vocabulary::<S, M>(initial, message_offset),
            _marker: PhantomData,
        }
    }

    /// Builds a machine from a document whose names match the vocabularies.
    pub fn from_document(doc: &TransitionDocument) -> Result<Self, CoreError> {
        let initial = S::from_name(&doc.initial).ok_or_else(|| CoreError::UnknownState {
            state: doc.initial.clone(),
        })?;
        let mut machine = Self::new(initial);
        for block in &doc.states {
            for t in &block.transitions {
                machine
                    .inner
                    .set_entry_by_name(&block.name, &t.message, &t.target_state)?;
            }
        }
        Ok(machine)
    }

    pub fn set_entry(&mut self, state: S, message: M, next_state: S) {
        let message = self.message_id(message);
        self.inner.set_entry(state.index(), message, next_state.index());
    }

    pub fn entry(&self, state: S, message: M) -> S {
        state_of(self.inner.entry(state.index(), self.message_id(message)))
    }

    pub fn send_message(&mut self, message: M) -> bool {
        let message = self.message_id(message);
        self.inner.send_message(message)
    }

    pub fn force_state(&mut self, state: S) -> bool {
        self.inner.force_state(state.index())
    }

    pub fn reset_to_initial_state(&mut self) {
        self.inner.reset_to_initial_state();
    }

    pub fn initial_state(&self) -> S {
        state_of(self.inner.initial_state())
    }

    pub fn current_state(&self) -> S {
        state_of(self.inner.current_state())
    }

    pub fn prev_state(&self) -> S {
        state_of(self.inner.prev_state())
    }

    pub fn on_state_changed(&mut self, mut f: impl FnMut(&StateChange<S>) + 'static) {
        self.inner
            .on_state_changed(move |change| f(&change.clone().map(state_of::<S>)));
    }

    pub fn on_reset(&mut self, mut f: impl FnMut(&StateChange<S>) + 'static) {
        self.inner
            .on_reset(move |change| f(&change.clone().map(state_of::<S>)));
    }

    pub fn to_document(&self) -> Result<TransitionDocument, CoreError> {
        self.inner.to_document()
    }

    /// The underlying index machine.
    pub fn inner(&self) -> &IndexedMachine {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut IndexedMachine {
        &mut self.inner
    }

    pub fn into_inner(self) -> IndexedMachine {
        self.inner
    }

    fn message_id(&self, message: M) -> usize {
        message.index() + self.inner.message_offset()
    }
}

impl<S: Vocabulary, M: Vocabulary> TransitionMachine for EnumMachine<S, M> {
    type State = S;
    type Message = M;
    type StateKey = S;

    fn send_message(&mut self, message: &M) -> bool {
        EnumMachine::send_message(self, *message)
    }

    fn force_state(&mut self, state: &S) -> bool {
        EnumMachine::force_state(self, *state)
    }

    fn reset_to_initial_state(&mut self) {
        EnumMachine::reset_to_initial_state(self)
    }

    fn initial_state(&self) -> S {
        EnumMachine::initial_state(self)
    }

    fn current_state(&self) -> S {
        EnumMachine::current_state(self)
    }

    fn prev_state(&self) -> S {
        EnumMachine::prev_state(self)
    }

    fn current_state_name(&self) -> Option<&str> {
        Some(self.current_state().name())
    }

    fn on_state_changed(&mut self, f: Box<dyn FnMut(&StateChange<S>)>) {
        EnumMachine::on_state_changed(self, f)
    }

    fn on_reset(&mut self, f: Box<dyn FnMut(&StateChange<S>)>) {
        EnumMachine::on_reset(self, f)
    }

    fn to_document(&self) -> Result<TransitionDocument, CoreError> {
        EnumMachine::to_document(self)
    }
}

fn state_of<S: Vocabulary>(index: usize) -> S {
    match S::from_index(index) {
        Some(state) => state,
        None => panic!("state index {} outside vocabulary", index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    crate::vocabulary! {
        enum Stance { Idle, Walking, Running, Jumping }
    }

    crate::vocabulary! {
        enum Input { Walk, Run, Jump, Stop, Land, }
    }

    fn locomotion() -> EnumMachine<Stance, Input> {
        let mut machine = EnumMachine::new(Stance::Idle);
        machine.set_entry(Stance::Idle, Input::Walk, Stance::Walking);
        machine.set_entry(Stance::Walking, Input::Run, Stance::Running);
        machine.set_entry(Stance::Running, Input::Stop, Stance::Idle);
        machine.set_entry(Stance::Walking, Input::Jump, Stance::Jumping);
        machine.set_entry(Stance::Jumping, Input::Land, Stance::Walking);
        machine
    }

    #[test]
    fn test_vocabulary_macro() {
        assert_eq!(Stance::NAMES, &["Idle", "Walking", "Running", "Jumping"]);
        assert_eq!(Input::Land.index(), 4);
        assert_eq!(Input::from_index(1), Some(Input::Run));
        assert_eq!(Input::from_index(5), None);
        assert_eq!(Stance::Running.name(), "Running");
        assert_eq!(Stance::from_name("Jumping"), Some(Stance::Jumping));
        assert_eq!(Stance::from_name("Flying"), None);
    }

    #[test]
    fn test_machine_takes_vocabulary_names() {
        let machine = locomotion();
        let inner = machine.inner();
        assert_eq!(inner.num_states(), 4);
        assert_eq!(inner.num_messages(), 5);
        assert_eq!(inner.state_name(2), Some("Running"));
        assert_eq!(inner.message_from_name("Stop"), Some(3));
    }

    #[test]
    fn test_typed_dispatch_and_events() {
        let mut machine = locomotion();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        machine.on_state_changed(move |c| sink.borrow_mut().push(c.clone()));

        assert!(machine.send_message(Input::Walk));
        assert!(machine.send_message(Input::Jump));
        assert!(!machine.send_message(Input::Stop));
        assert!(machine.send_message(Input::Land));

        assert_eq!(machine.current_state(), Stance::Walking);
        assert_eq!(machine.prev_state(), Stance::Jumping);
        assert_eq!(
            *events.borrow(),
            vec![
                StateChange::new(Stance::Idle, Stance::Walking),
                StateChange::new(Stance::Walking, Stance::Jumping),
                StateChange::new(Stance::Jumping, Stance::Walking),
            ]
        );
    }

    #[test]
    fn test_offset_is_applied() {
        let mut machine = EnumMachine::<Stance, Input>::with_offset(Stance::Idle, 100);
        machine.set_entry(Stance::Idle, Input::Run, Stance::Running);
        assert_eq!(machine.inner().entry(0, 101), 2);
        assert_eq!(machine.entry(Stance::Idle, Input::Run), Stance::Running);
        assert!(machine.send_message(Input::Run));
    }

    #[test]
    fn test_document_roundtrip() {
        let machine = locomotion();
        let doc = machine.to_document().unwrap();
        let restored = EnumMachine::<Stance, Input>::from_document(&doc).unwrap();
        assert!(restored.inner().compare(machine.inner()));
    }

    #[test]
    fn test_from_document_rejects_foreign_names() {
        let mut doc = TransitionDocument::new("Idle");
        doc.add_transition("Idle", "Fly", "Running");
        assert!(matches!(
            EnumMachine::<Stance, Input>::from_document(&doc),
            Err(CoreError::UnknownMessage { .. })
        ));
    }

    #[test]
    fn test_trait_current_state_name() {
        let mut machine = locomotion();
        TransitionMachine::send_message(&mut machine, &Input::Walk);
        assert_eq!(TransitionMachine::current_state_name(&machine), Some("Walking"));
    }
}
