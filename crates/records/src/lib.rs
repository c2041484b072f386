//! Relational system of record: questions, knowledge points, conjunctive
//! queries, lifecycle hooks and bulk loading.

pub mod error;
pub mod import;
pub mod model;
pub mod query;
pub mod store;

pub use {
    error::{Error, Result},
    import::{load_knowledge_points, load_questions},
    model::{Difficulty, KnowledgePoint, Question, QuestionType, RecordKind, Source, Subject},
    query::{Condition, QuestionColumn, QuestionQuery},
    store::SqliteRecordStore,
};

/// Run database migrations for the record tables.
pub async fn run_migrations(pool: &sqlx::SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .set_ignore_missing(true)
        .run(pool)
        .await?;
    Ok(())
}
