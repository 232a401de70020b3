//! Name-driven front end over both engines.

use crate::config::{EngineConfig, EngineKind};
use std::collections::BTreeMap;
use tablefsm_core::{
    CoreError, IndexedMachine, NamedMachine, StateChange, TransitionDocument, TransitionMachine,
};

/// A loaded machine of either kind, driven by state and message names.
pub enum Engine {
    Indexed(IndexedMachine),
    Named(NamedMachine),
}

impl Engine {
    pub fn load(doc: &TransitionDocument, config: &EngineConfig) -> Result<Self, CoreError> {
        Ok(match config.kind {
            EngineKind::Indexed => {
                Engine::Indexed(IndexedMachine::from_document(doc, config.message_offset)?)
            }
            EngineKind::Named => Engine::Named(NamedMachine::from_document(doc)?),
        })
    }

    pub fn kind(&self) -> EngineKind {
        match self {
            Engine::Indexed(_) => EngineKind::Indexed,
            Engine::Named(_) => EngineKind::Named,
        }
    }

    /// Registers a change observer that reports state names.
    pub fn on_state_changed(&mut self, mut f: impl FnMut(&StateChange<String>) + 'static) {
        match self {
            Engine::Indexed(machine) => {
                let names = state_names(machine);
                machine.on_state_changed(move |change| {
                    f(&change.clone().map(|index| names[index].clone()))
                });
            }
            Engine::Named(machine) => machine.on_state_changed(f),
        }
    }

    pub fn has_message(&self, name: &str) -> bool {
        match self {
            Engine::Indexed(machine) => machine.message_from_name(name).is_some(),
            Engine::Named(machine) => machine.has_message(name),
        }
    }

    pub fn has_state(&self, name: &str) -> bool {
        match self {
            Engine::Indexed(machine) => machine.state_from_name(name).is_some(),
            Engine::Named(machine) => machine.has_state(name),
        }
    }

    /// Dispatches a message by name. Unknown messages change nothing.
    pub fn send(&mut self, message: &str) -> bool {
        match self {
            Engine::Indexed(machine) => match machine.message_id_from_name(message) {
                Some(id) => machine.send_message(id),
                None => false,
            },
            Engine::Named(machine) => machine.send_message(message),
        }
    }

    /// Forces a state by name. Unknown states change nothing.
    pub fn force(&mut self, state: &str) -> bool {
        match self {
            Engine::Indexed(machine) => match machine.state_from_name(state) {
                Some(index) => machine.force_state(index),
                None => false,
            },
            Engine::Named(machine) => machine.force_state(state),
        }
    }

    pub fn reset(&mut self) {
        match self {
            Engine::Indexed(machine) => TransitionMachine::reset_to_initial_state(machine),
            Engine::Named(machine) => TransitionMachine::reset_to_initial_state(machine),
        }
    }

    pub fn current(&self) -> String {
        match self {
            Engine::Indexed(machine) => name_of(machine, machine.current_state()),
            Engine::Named(machine) => TransitionMachine::current_state(machine),
        }
    }

    pub fn prev(&self) -> String {
        match self {
            Engine::Indexed(machine) => name_of(machine, machine.prev_state()),
            Engine::Named(machine) => TransitionMachine::prev_state(machine),
        }
    }

    pub fn states(&self) -> Vec<String> {
        match self {
            Engine::Indexed(machine) => state_names(machine),
            Engine::Named(machine) => machine.states().map(str::to_string).collect(),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        match self {
            Engine::Indexed(machine) => (0..machine.num_messages())
                .map(|m| machine.message_name(m).unwrap_or("?").to_string())
                .collect(),
            Engine::Named(machine) => machine.messages().map(str::to_string).collect(),
        }
    }

    /// Outgoing transitions of the current state, keyed by message.
    pub fn outgoing(&self) -> BTreeMap<String, String> {
        match self {
            Engine::Indexed(machine) => {
                let current = machine.current_state();
                machine
                    .row(current)
                    .iter()
                    .enumerate()
                    .filter(|&(_, &target)| target != current)
                    .map(|(message, &target)| {
                        (
                            machine.message_name(message).unwrap_or("?").to_string(),
                            name_of(machine, target),
                        )
                    })
                    .collect()
            }
            Engine::Named(machine) => machine
                .current_state()
                .and_then(|current| machine.transitions_from(current))
                .cloned()
                .unwrap_or_default(),
        }
    }

    pub fn to_document(&self) -> Result<TransitionDocument, CoreError> {
        match self {
            Engine::Indexed(machine) => TransitionMachine::to_document(machine),
            Engine::Named(machine) => TransitionMachine::to_document(machine),
        }
    }
}

fn state_names(machine: &IndexedMachine) -> Vec<String> {
    (0..machine.num_states())
        .map(|s| name_of(machine, s))
        .collect()
}

fn name_of(machine: &IndexedMachine, state: usize) -> String {
    machine
        .state_name(state)
        .map(str::to_string)
        .unwrap_or_else(|| format!("#{}", state))
}
