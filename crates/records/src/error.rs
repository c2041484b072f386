use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Spreadsheet(#[from] calamine::Error),

    /// A bulk-load row was rejected before anything was written.
    #[error("row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },

    #[error("no {kind} with uuid {uuid}")]
    NotFound { kind: &'static str, uuid: String },

    /// The relational write committed but index propagation failed.
    #[error("committed, but propagation failed: {0}")]
    Propagation(#[source] exambank_common::Error),

    #[error("unsupported import format: .{extension}")]
    UnsupportedFormat { extension: String },
}

impl Error {
    #[must_use]
    pub fn invalid_row(row: usize, reason: impl Into<String>) -> Self {
        Self::InvalidRow {
            row,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
