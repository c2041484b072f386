//! Record abstraction shared by the relational store and the index sync layer.

use std::{collections::BTreeMap, fmt};

/// Flat attribute dictionary of a record, as carried on every index chunk.
///
/// Values are always strings; absent optional columns are normalized to `""`
/// because the index does not distinguish "absent" from "empty".
pub type Attributes = BTreeMap<String, String>;

/// A row of the relational store that can be mirrored into the vector index.
pub trait Record: fmt::Debug + Send + Sync {
    /// Table the record lives in. Used to pick the index collection.
    fn kind(&self) -> &str;

    /// Caller-assigned stable identifier, the only cross-store join key.
    fn uuid(&self) -> &str;

    /// Full attribute set used as chunk metadata. Never contains the
    /// store-assigned primary key.
    fn attributes(&self) -> Attributes;
}
