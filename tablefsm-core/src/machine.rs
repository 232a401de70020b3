//! The capability set shared by every engine.

use crate::error::CoreError;
use crate::event::StateChange;
use tablefsm_document::TransitionDocument;

/// A table-driven state machine.
///
/// Engines implement this independently; there is no shared base type.
/// `Message` and `StateKey` are borrowed on input so that string-keyed
/// engines can accept `&str` while index-keyed engines accept `&usize`.
pub trait TransitionMachine {
    /// State identifier reported by the cursor accessors and events.
    type State: Clone;
    /// Message identifier accepted by dispatch.
    type Message: ?Sized;
    /// State identifier accepted by `force_state`.
    type StateKey: ?Sized;

    /// Dispatches one message. Returns whether the current state changed.
    fn send_message(&mut self, message: &Self::Message) -> bool;

    /// Moves to `state` without consulting the table.
    fn force_state(&mut self, state: &Self::StateKey) -> bool;

    /// Returns the cursor to the initial state and raises a reset event.
    fn reset_to_initial_state(&mut self);

    fn initial_state(&self) -> Self::State;
    fn current_state(&self) -> Self::State;
    fn prev_state(&self) -> Self::State;
    fn current_state_name(&self) -> Option<&str>;

    fn on_state_changed(&mut self, f: Box<dyn FnMut(&StateChange<Self::State>)>);
    fn on_reset(&mut self, f: Box<dyn FnMut(&StateChange<Self::State>)>);

    /// Serializes the machine to its engine-agnostic form.
    fn to_document(&self) -> Result<TransitionDocument, CoreError>;

    /// Dispatches messages in order and returns how many changed state.
    fn send_all<'a, I>(&mut self, messages: I) -> usize
    where
        I: IntoIterator<Item = &'a Self::Message>,
        Self::Message: 'a,
    {
        messages
            .into_iter()
            .filter(|message| self.send_message(*message))
            .count()
    }
}
