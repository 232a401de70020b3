//! # tablefsm-core
//!
//! State machine engines for tablefsm.
//!
//! This crate provides:
//! - [`IndexedMachine`]: a dense, integer-indexed transition table built for
//!   dispatch speed, with message offsets for shared message streams
//! - [`NamedMachine`]: a sparse, string-keyed transition table with
//!   validation universes and whole-document composition
//! - [`TransitionMachine`]: the capability set both engines implement
//! - Change notifications, an enum [`Vocabulary`] adapter and the
//!   [`StateSync`] replication codec

pub mod error;
pub mod event;
pub mod indexed;
pub mod machine;
pub mod named;
pub mod names;
pub mod sync;
pub mod vocabulary;

pub use error::CoreError;
pub use event::{Observers, StateChange};
pub use indexed::IndexedMachine;
pub use machine::TransitionMachine;
pub use named::NamedMachine;
pub use names::NameTable;
pub use sync::StateSync;
pub use vocabulary::{EnumMachine, Vocabulary};

pub use tablefsm_document::{ParseMode, ParserConfig, TransitionDocument};
