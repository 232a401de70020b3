//! Transition document model.
//!
//! A `TransitionDocument` is the engine-agnostic form of a machine: its
//! vocabulary plus the outgoing transitions of every state. Documents are
//! produced by the parser (or by an engine) and consumed by engines; they are
//! never kept alive alongside the machine they describe.

use crate::error::DocumentError;
use crate::parser::{DocumentParser, ParserConfig};
use crate::tag::TagNode;
use crate::writer::DocumentWriter;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A single `(message, target)` pair of a state block.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionEntry {
    pub message: String,
    pub target_state: String,
}

impl TransitionEntry {
    pub fn new(message: impl Into<String>, target_state: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            target_state: target_state.into(),
        }
    }
}

/// Outgoing transitions of one state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransitions {
    pub name: String,

    #[serde(default)]
    pub transitions: Vec<TransitionEntry>,
}

impl StateTransitions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transitions: Vec::new(),
        }
    }

    /// Returns the target for `message`, if this block lists one.
    pub fn target(&self, message: &str) -> Option<&str> {
        self.transitions
            .iter()
            .rev()
            .find(|t| t.message == message)
            .map(|t| t.target_state.as_str())
    }
}

/// Engine-agnostic description of a complete machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionDocument {
    /// Name of the initial state.
    pub initial: String,

    /// All state names, in document order.
    #[serde(default)]
    pub state_names: Vec<String>,

    /// All message names, in document order.
    #[serde(default)]
    pub message_names: Vec<String>,

    /// Per-state transition blocks.
    #[serde(default)]
    pub states: Vec<StateTransitions>,
}

impl TransitionDocument {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            initial: initial.into(),
            ..Self::default()
        }
    }

    pub fn with_states<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state_names.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_messages<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.message_names.extend(names.into_iter().map(Into::into));
        self
    }

    /// Appends a transition to the block of `state`, creating it if needed.
    pub fn add_transition(
        &mut self,
        state: impl Into<String>,
        message: impl Into<String>,
        target_state: impl Into<String>,
    ) -> &mut Self {
        let state = state.into();
        let entry = TransitionEntry::new(message, target_state);
        match self.states.iter_mut().find(|s| s.name == state) {
            Some(block) => block.transitions.push(entry),
            None => {
                let mut block = StateTransitions::new(state);
                block.transitions.push(entry);
                self.states.push(block);
            }
        }
        self
    }

    /// Returns the transition block for `name`.
    pub fn state(&self, name: &str) -> Option<&StateTransitions> {
        self.states.iter().find(|s| s.name == name)
    }

    /// Total number of transition entries across all blocks.
    pub fn transition_count(&self) -> usize {
        self.states.iter().map(|s| s.transitions.len()).sum()
    }

    /// Brings the document into canonical form.
    ///
    /// Name lists are sorted and deduplicated, blocks with the same name are
    /// merged and sorted, self transitions and empty blocks are dropped, and
    /// each block lists a message at most once (the last entry wins).
    pub fn normalize(&mut self) {
        self.state_names = sorted_unique(&self.state_names);
        self.message_names = sorted_unique(&self.message_names);

        let mut blocks: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        for block in self.states.drain(..) {
            let entries = blocks.entry(block.name.clone()).or_default();
            for t in block.transitions {
                if t.target_state == block.name {
                    entries.remove(&t.message);
                } else {
                    entries.insert(t.message, t.target_state);
                }
            }
        }

        self.states = blocks
            .into_iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(name, entries)| StateTransitions {
                name,
                transitions: entries
                    .into_iter()
                    .map(|(message, target_state)| TransitionEntry {
                        message,
                        target_state,
                    })
                    .collect(),
            })
            .collect();
    }

    /// Returns a canonical copy; see [`normalize`](Self::normalize).
    pub fn normalized(&self) -> Self {
        let mut doc = self.clone();
        doc.normalize();
        doc
    }

    /// CRC32C of the canonical form, as 8 hex digits.
    ///
    /// Two documents describing the same machine share a checksum regardless
    /// of the order in which their names and transitions were authored.
    pub fn checksum(&self) -> Result<String, DocumentError> {
        let bytes = serde_json::to_vec(&self.normalized())?;
        Ok(format!("{:08x}", crc32c::crc32c(&bytes)))
    }

    /// Parses a document from a tagged tree.
    pub fn parse(root: &TagNode, config: &ParserConfig) -> Result<Self, DocumentError> {
        DocumentParser::new(config.clone()).parse(root)
    }

    /// Parses a document from the JSON form of a tagged tree.
    pub fn parse_json(text: &str, config: &ParserConfig) -> Result<Self, DocumentError> {
        Self::parse(&TagNode::from_json_str(text)?, config)
    }

    /// Parses a document from the YAML form of a tagged tree.
    pub fn parse_yaml(text: &str, config: &ParserConfig) -> Result<Self, DocumentError> {
        Self::parse(&TagNode::from_yaml_str(text)?, config)
    }

    /// Writes the canonical tagged tree for this document.
    pub fn to_tag_tree(&self) -> TagNode {
        DocumentWriter::new().write(self)
    }

    pub fn to_json_string(&self) -> Result<String, DocumentError> {
        self.to_tag_tree().to_json_string()
    }

    pub fn to_yaml_string(&self) -> Result<String, DocumentError> {
        self.to_tag_tree().to_yaml_string()
    }
}

fn sorted_unique(names: &[String]) -> Vec<String> {
    names
        .iter()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
