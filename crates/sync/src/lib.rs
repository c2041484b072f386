//! Keeps the vector index in step with the relational store.

pub mod error;
pub mod manager;

pub use {
    error::{Error, Result},
    manager::{HOOK_NAME, SyncManager, SyncReport},
};
