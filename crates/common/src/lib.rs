//! Shared types, error definitions, and the record lifecycle hook system used
//! across all exambank crates.

pub mod error;
pub mod hooks;
pub mod types;

pub use {
    error::{Error, FromMessage, Result},
    hooks::{HookRegistry, RecordEvent, RecordHook},
    types::{Attributes, Record},
};
