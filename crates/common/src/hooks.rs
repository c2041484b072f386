//! Record lifecycle hooks.
//!
//! The relational store fires a [`RecordEvent`] after every committed
//! mutation and awaits each subscribed [`RecordHook`] in registration order.
//! A failing hook stops dispatch and surfaces to the writer; the relational
//! commit is not rolled back.

use std::{collections::HashMap, fmt, sync::Arc, time::Instant};

use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    tracing::{debug, error, info},
};

use crate::{
    error::{Error, Result},
    types::Record,
};

// ── RecordEvent ─────────────────────────────────────────────────────────────

/// Mutation events a hook can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordEvent {
    AfterInsert,
    AfterUpdate,
    AfterDelete,
}

impl RecordEvent {
    /// All variants, for iteration.
    pub const ALL: &'static [RecordEvent] =
        &[Self::AfterInsert, Self::AfterUpdate, Self::AfterDelete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AfterInsert => "after_insert",
            Self::AfterUpdate => "after_update",
            Self::AfterDelete => "after_delete",
        }
    }
}

impl fmt::Display for RecordEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── RecordHook trait ────────────────────────────────────────────────────────

/// A subscriber to record lifecycle events.
#[async_trait]
pub trait RecordHook: Send + Sync {
    /// Human-readable name used in logs and errors.
    fn name(&self) -> &str;

    /// Which events this hook subscribes to. Defaults to all of them.
    fn events(&self) -> &[RecordEvent] {
        RecordEvent::ALL
    }

    /// Handle one committed mutation of `record`.
    async fn handle(&self, event: RecordEvent, record: &dyn Record) -> anyhow::Result<()>;
}

// ── HookRegistry ────────────────────────────────────────────────────────────

/// Registered hooks keyed by event, dispatched in registration order.
#[derive(Clone, Default)]
pub struct HookRegistry {
    handlers: HashMap<RecordEvent, Vec<Arc<dyn RecordHook>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook for all events it subscribes to.
    pub fn register(&mut self, hook: Arc<dyn RecordHook>) {
        for &event in hook.events() {
            self.handlers
                .entry(event)
                .or_default()
                .push(Arc::clone(&hook));
        }
        info!(hook = hook.name(), "record hook registered");
    }

    /// Returns true if any hooks are registered for the given event.
    pub fn has_handlers(&self, event: RecordEvent) -> bool {
        self.handlers.get(&event).is_some_and(|v| !v.is_empty())
    }

    /// List all registered hook names (deduplicated).
    pub fn handler_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .handlers
            .values()
            .flatten()
            .map(|h| h.name().to_string())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Run every hook subscribed to `event`, stopping at the first failure.
    pub async fn dispatch(&self, event: RecordEvent, record: &dyn Record) -> Result<()> {
        let Some(handlers) = self.handlers.get(&event) else {
            return Ok(());
        };

        for hook in handlers {
            let started = Instant::now();
            match hook.handle(event, record).await {
                Ok(()) => {
                    debug!(
                        hook = hook.name(),
                        %event,
                        uuid = record.uuid(),
                        elapsed_us = started.elapsed().as_micros() as u64,
                        "record hook completed"
                    );
                },
                Err(e) => {
                    error!(
                        hook = hook.name(),
                        %event,
                        uuid = record.uuid(),
                        error = %e,
                        "record hook failed"
                    );
                    return Err(Error::hook(hook.name(), event, record.uuid(), e));
                },
            }
        }
        Ok(())
    }
}
