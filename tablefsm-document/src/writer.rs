//! Deterministic document writer.
//!
//! The writer always emits the current scheme: the initial state, the sorted
//! state names, the sorted message names, then one block per state (sorted by
//! name) holding its non-self transitions sorted by message. Unchanged
//! machines therefore produce byte-identical output.

use crate::document::TransitionDocument;
use crate::tag::TagNode;
use crate::ROOT_TAG;
use std::collections::BTreeSet;

/// Writes [`TransitionDocument`]s as tagged trees.
#[derive(Debug, Clone)]
pub struct DocumentWriter {
    include_empty_blocks: bool,
}

impl Default for DocumentWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentWriter {
    pub fn new() -> Self {
        Self {
            include_empty_blocks: true,
        }
    }

    /// Whether states without outgoing transitions still get a block.
    /// Defaults to `true`.
    pub fn with_empty_blocks(mut self, include: bool) -> Self {
        self.include_empty_blocks = include;
        self
    }

    pub fn write(&self, doc: &TransitionDocument) -> TagNode {
        let doc = doc.normalized();

        let states = TagNode::new("states").with_children(
            doc.state_names
                .iter()
                .map(|name| TagNode::new("state").with_attribute("name", name.as_str())),
        );

        let messages = TagNode::new("messages").with_children(
            doc.message_names
                .iter()
                .map(|name| TagNode::new("message").with_attribute("name", name.as_str())),
        );

        let names: BTreeSet<&str> = doc
            .state_names
            .iter()
            .map(String::as_str)
            .chain(doc.states.iter().map(|b| b.name.as_str()))
            .collect();

        let blocks = names.into_iter().filter_map(|name| {
            let entries = doc.state(name).map(|b| b.transitions.as_slice()).unwrap_or(&[]);
            if entries.is_empty() && !self.include_empty_blocks {
                return None;
            }
            let transitions = TagNode::new("transitions").with_children(entries.iter().map(|t| {
                TagNode::new("transition")
                    .with_attribute("message", t.message.as_str())
                    .with_attribute("state", t.target_state.as_str())
            }));
            Some(
                TagNode::new("state")
                    .with_attribute("name", name)
                    .with_child(transitions),
            )
        });

        TagNode::new(ROOT_TAG)
            .with_attribute("initial", doc.initial.as_str())
            .with_child(states)
            .with_child(messages)
            .with_child(TagNode::new("stateChanges").with_children(blocks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{DocumentParser, ParserConfig};

    fn sample() -> TransitionDocument {
        let mut doc = TransitionDocument::new("b")
            .with_states(["c", "a", "b"])
            .with_messages(["y", "x"]);
        doc.add_transition("c", "y", "a")
            .add_transition("a", "y", "b")
            .add_transition("a", "x", "c")
            .add_transition("b", "x", "b");
        doc
    }

    #[test]
    fn test_write_order() {
        let tree = DocumentWriter::new().write(&sample());

        assert_eq!(tree.name, "StateMachine");
        assert_eq!(tree.attribute("initial"), Some("b"));

        let sections: Vec<_> = tree.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(sections, vec!["states", "messages", "stateChanges"]);

        let states: Vec<_> = tree.children[0]
            .children
            .iter()
            .map(|c| c.attribute("name").unwrap())
            .collect();
        assert_eq!(states, vec!["a", "b", "c"]);

        let first_block = &tree.children[2].children[0];
        assert_eq!(first_block.attribute("name"), Some("a"));
        let messages: Vec<_> = first_block.children[0]
            .children
            .iter()
            .map(|t| t.attribute("message").unwrap())
            .collect();
        assert_eq!(messages, vec!["x", "y"]);
    }

    #[test]
    fn test_self_transitions_are_not_written() {
        let tree = DocumentWriter::new().write(&sample());
        let block_b = tree.children[2]
            .children
            .iter()
            .find(|b| b.attribute("name") == Some("b"))
            .unwrap();
        assert!(block_b.children[0].children.is_empty());

        let compact = DocumentWriter::new().with_empty_blocks(false).write(&sample());
        assert_eq!(compact.children[2].children.len(), 2);
    }

    #[test]
    fn test_output_is_byte_stable() {
        let mut reordered = TransitionDocument::new("b")
            .with_states(["a", "b", "c"])
            .with_messages(["x", "y"]);
        reordered
            .add_transition("a", "x", "c")
            .add_transition("a", "y", "b")
            .add_transition("c", "y", "a");

        let first = sample().to_json_string().unwrap();
        let second = reordered.to_json_string().unwrap();
        assert_eq!(first, second);
        assert_eq!(first, sample().to_json_string().unwrap());
    }

    #[test]
    fn test_written_tree_parses_strictly() {
        let tree = DocumentWriter::new().write(&sample());
        let doc = DocumentParser::new(ParserConfig::strict())
            .parse(&tree)
            .unwrap();
        assert_eq!(doc.state_names, vec!["a", "b", "c"]);
        assert_eq!(doc.normalized(), sample().normalized());
    }
}
