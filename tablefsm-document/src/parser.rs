//! Table-driven document parser.
//!
//! Parsing is a depth-first walk over a [`TagNode`] tree. Every context
//! (document root, name list, state block, ...) owns a small table of
//! `tag name -> handler` pairs; the walker looks each child up by name, never
//! by position. Two schemes are understood:
//!
//! ```text
//! current                                  legacy (lenient only)
//! StateMachine @initial                    XnaContent
//!   states/state @name                       Asset @Type
//!   messages/message @name                     initial
//!   stateChanges/state @name                   stateNames/Item
//!     transitions/transition                   messageNames/Item
//!       @message @state                        states/Item
//!                                                name
//!                                                transitions/Item
//!                                                  message, state
//! ```
//!
//! Attributes are visited as leaf pseudo-children, so a value may be written
//! either as an attribute or as a text child.

use crate::document::{StateTransitions, TransitionDocument, TransitionEntry};
use crate::error::DocumentError;
use crate::tag::TagNode;
use crate::{LEGACY_ROOT_TAG, ROOT_TAG};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the parser treats structure it does not recognize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    /// Only the current scheme; unknown tags are errors.
    #[default]
    Strict,
    /// Current and legacy schemes; unknown tags are skipped.
    Lenient,
}

impl std::str::FromStr for ParseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(ParseMode::Strict),
            "lenient" | "legacy" => Ok(ParseMode::Lenient),
            other => Err(format!("unknown parse mode '{}'", other)),
        }
    }
}

/// Parser configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub mode: ParseMode,
}

impl ParserConfig {
    pub fn strict() -> Self {
        Self {
            mode: ParseMode::Strict,
        }
    }

    pub fn lenient() -> Self {
        Self {
            mode: ParseMode::Lenient,
        }
    }

    pub fn is_lenient(&self) -> bool {
        self.mode == ParseMode::Lenient
    }
}

type Handler<T> = fn(&DocumentParser, &TagNode, &mut T) -> Result<(), DocumentError>;

/// Handlers for the children of one context.
struct HandlerTable<T> {
    entries: Vec<(&'static str, Handler<T>)>,
}

impl<T> fmt::Debug for HandlerTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(tag, _)| tag))
            .finish()
    }
}

impl<T> HandlerTable<T> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn on(mut self, tag: &'static str, handler: Handler<T>) -> Self {
        self.entries.push((tag, handler));
        self
    }

    fn on_if(self, enabled: bool, tag: &'static str, handler: Handler<T>) -> Self {
        if enabled {
            self.on(tag, handler)
        } else {
            self
        }
    }

    fn lookup(&self, tag: &str) -> Option<Handler<T>> {
        self.entries
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(tag))
            .map(|(_, handler)| *handler)
    }
}

/// A transition whose fields are still being collected.
#[derive(Debug, Default)]
struct PendingTransition {
    message: Option<String>,
    target_state: Option<String>,
}

/// Parses tagged trees into [`TransitionDocument`]s.
#[derive(Debug)]
pub struct DocumentParser {
    config: ParserConfig,
    current: HandlerTable<TransitionDocument>,
    legacy_root: HandlerTable<TransitionDocument>,
    legacy_asset: HandlerTable<TransitionDocument>,
    state_list: HandlerTable<Vec<String>>,
    message_list: HandlerTable<Vec<String>>,
    block_list: HandlerTable<Vec<StateTransitions>>,
    block: HandlerTable<StateTransitions>,
    transition_list: HandlerTable<Vec<TransitionEntry>>,
    transition: HandlerTable<PendingTransition>,
}

impl Default for DocumentParser {
    fn default() -> Self {
        Self::new(ParserConfig::default())
    }
}

impl DocumentParser {
    /// Builds the handler tables for the given configuration.
    pub fn new(config: ParserConfig) -> Self {
        let lenient = config.is_lenient();

        let current = HandlerTable::new()
            .on("initial", read_initial)
            .on("states", read_state_names)
            .on("messages", read_message_names)
            .on("stateChanges", read_blocks)
            .on_if(lenient, "Asset", read_current_asset)
            .on_if(lenient, "Type", skip);

        let legacy_root = HandlerTable::new()
            .on_if(lenient, "Asset", read_legacy_asset)
            .on_if(lenient, "Type", skip);

        let legacy_asset = HandlerTable::new()
            .on("initial", read_initial)
            .on("stateNames", read_state_names)
            .on("messageNames", read_message_names)
            .on("states", read_blocks)
            .on("Type", skip);

        let state_list = HandlerTable::new()
            .on("state", push_named_item)
            .on_if(lenient, "Item", push_text_item);

        let message_list = HandlerTable::new()
            .on("message", push_named_item)
            .on_if(lenient, "Item", push_text_item);

        let block_list = HandlerTable::new()
            .on("state", push_block)
            .on_if(lenient, "Item", push_block);

        let block = HandlerTable::new()
            .on("name", read_block_name)
            .on("transitions", read_transition_list)
            .on("transition", push_block_transition)
            .on_if(lenient, "Type", skip);

        let transition_list = HandlerTable::new()
            .on("transition", push_transition)
            .on_if(lenient, "Item", push_transition);

        let transition = HandlerTable::new()
            .on("message", read_transition_message)
            .on("state", read_transition_target)
            .on_if(lenient, "Type", skip);

        Self {
            config,
            current,
            legacy_root,
            legacy_asset,
            state_list,
            message_list,
            block_list,
            block,
            transition_list,
            transition,
        }
    }

    /// Parses a whole document. Any error fails the entire load.
    pub fn parse(&self, root: &TagNode) -> Result<TransitionDocument, DocumentError> {
        let mut doc = TransitionDocument::default();

        if root.name.eq_ignore_ascii_case(ROOT_TAG) {
            self.walk(root, &self.current, &mut doc)?;
        } else if self.config.is_lenient() && root.name.eq_ignore_ascii_case(LEGACY_ROOT_TAG) {
            self.walk(root, &self.legacy_root, &mut doc)?;
        } else {
            return Err(DocumentError::UnexpectedRoot {
                found: root.name.clone(),
            });
        }

        tracing::debug!(
            "parsed document: {} states, {} messages, {} transitions",
            doc.state_names.len(),
            doc.message_names.len(),
            doc.transition_count()
        );

        Ok(doc)
    }

    fn walk<T>(
        &self,
        node: &TagNode,
        table: &HandlerTable<T>,
        target: &mut T,
    ) -> Result<(), DocumentError> {
        node.visit_children(|child| match table.lookup(&child.name) {
            Some(handler) => handler(self, child, target),
            None => self.unknown(child, node),
        })
    }

    fn unknown(&self, child: &TagNode, parent: &TagNode) -> Result<(), DocumentError> {
        if self.config.is_lenient() {
            tracing::debug!("ignoring unknown tag '{}' in '{}'", child.name, parent.name);
            Ok(())
        } else {
            Err(DocumentError::UnknownTag {
                tag: child.name.clone(),
                parent: parent.name.clone(),
            })
        }
    }
}

fn skip<T>(_: &DocumentParser, _: &TagNode, _: &mut T) -> Result<(), DocumentError> {
    Ok(())
}

fn read_initial(
    _: &DocumentParser,
    node: &TagNode,
    doc: &mut TransitionDocument,
) -> Result<(), DocumentError> {
    doc.initial = node.inner_text().to_string();
    Ok(())
}

fn read_current_asset(
    parser: &DocumentParser,
    node: &TagNode,
    doc: &mut TransitionDocument,
) -> Result<(), DocumentError> {
    parser.walk(node, &parser.current, doc)
}

fn read_legacy_asset(
    parser: &DocumentParser,
    node: &TagNode,
    doc: &mut TransitionDocument,
) -> Result<(), DocumentError> {
    parser.walk(node, &parser.legacy_asset, doc)
}

fn read_state_names(
    parser: &DocumentParser,
    node: &TagNode,
    doc: &mut TransitionDocument,
) -> Result<(), DocumentError> {
    parser.walk(node, &parser.state_list, &mut doc.state_names)
}

fn read_message_names(
    parser: &DocumentParser,
    node: &TagNode,
    doc: &mut TransitionDocument,
) -> Result<(), DocumentError> {
    parser.walk(node, &parser.message_list, &mut doc.message_names)
}

fn read_blocks(
    parser: &DocumentParser,
    node: &TagNode,
    doc: &mut TransitionDocument,
) -> Result<(), DocumentError> {
    parser.walk(node, &parser.block_list, &mut doc.states)
}

fn push_named_item(
    _: &DocumentParser,
    node: &TagNode,
    names: &mut Vec<String>,
) -> Result<(), DocumentError> {
    match node.attribute("name").or(node.text.as_deref()) {
        Some(name) if !name.is_empty() => {
            names.push(name.to_string());
            Ok(())
        }
        _ => Err(missing(node, "name")),
    }
}

fn push_text_item(
    _: &DocumentParser,
    node: &TagNode,
    names: &mut Vec<String>,
) -> Result<(), DocumentError> {
    match node.text.as_deref() {
        Some(name) if !name.is_empty() => {
            names.push(name.to_string());
            Ok(())
        }
        _ => Err(missing(node, "name")),
    }
}

fn push_block(
    parser: &DocumentParser,
    node: &TagNode,
    blocks: &mut Vec<StateTransitions>,
) -> Result<(), DocumentError> {
    let mut block = StateTransitions::default();
    parser.walk(node, &parser.block, &mut block)?;
    if block.name.is_empty() {
        return Err(missing(node, "name"));
    }
    blocks.push(block);
    Ok(())
}

fn read_block_name(
    _: &DocumentParser,
    node: &TagNode,
    block: &mut StateTransitions,
) -> Result<(), DocumentError> {
    block.name = node.inner_text().to_string();
    Ok(())
}

fn read_transition_list(
    parser: &DocumentParser,
    node: &TagNode,
    block: &mut StateTransitions,
) -> Result<(), DocumentError> {
    parser.walk(node, &parser.transition_list, &mut block.transitions)
}

fn push_block_transition(
    parser: &DocumentParser,
    node: &TagNode,
    block: &mut StateTransitions,
) -> Result<(), DocumentError> {
    push_transition(parser, node, &mut block.transitions)
}

fn push_transition(
    parser: &DocumentParser,
    node: &TagNode,
    transitions: &mut Vec<TransitionEntry>,
) -> Result<(), DocumentError> {
    let mut pending = PendingTransition::default();
    parser.walk(node, &parser.transition, &mut pending)?;

    let message = pending
        .message
        .filter(|m| !m.is_empty())
        .ok_or_else(|| missing(node, "message"))?;
    let target_state = pending
        .target_state
        .filter(|s| !s.is_empty())
        .ok_or_else(|| missing(node, "target state"))?;

    transitions.push(TransitionEntry {
        message,
        target_state,
    });
    Ok(())
}

fn read_transition_message(
    _: &DocumentParser,
    node: &TagNode,
    pending: &mut PendingTransition,
) -> Result<(), DocumentError> {
    pending.message = Some(node.inner_text().to_string());
    Ok(())
}

fn read_transition_target(
    _: &DocumentParser,
    node: &TagNode,
    pending: &mut PendingTransition,
) -> Result<(), DocumentError> {
    pending.target_state = Some(node.inner_text().to_string());
    Ok(())
}

fn missing(node: &TagNode, field: &'static str) -> DocumentError {
    DocumentError::MissingValue {
        tag: node.name.clone(),
        field,
    }
}
