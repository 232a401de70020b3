//! # tablefsm-document
//!
//! Transition document model for tablefsm.
//!
//! This crate provides:
//! - The engine-agnostic [`TransitionDocument`] model
//! - A format-agnostic tagged tree ([`TagNode`]) with JSON and YAML codecs
//! - A table-driven parser that reads the current and legacy tag schemes
//! - A deterministic writer producing byte-stable output

pub mod document;
pub mod error;
pub mod parser;
pub mod tag;
pub mod writer;

pub use document::{StateTransitions, TransitionDocument, TransitionEntry};
pub use error::DocumentError;
pub use parser::{DocumentParser, ParseMode, ParserConfig};
pub use tag::TagNode;
pub use writer::DocumentWriter;

/// Root tag of documents written by this crate.
pub const ROOT_TAG: &str = "StateMachine";

/// Root tag of documents produced by the legacy content pipeline.
pub const LEGACY_ROOT_TAG: &str = "XnaContent";
