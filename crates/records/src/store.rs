//! SQLite-backed relational store using sqlx.
//!
//! Every write commits first, then fires the matching [`RecordEvent`] for each
//! affected record. A hook failure surfaces as [`Error::Propagation`]; the
//! relational change stays committed.

use std::{
    collections::HashSet,
    sync::{Arc, PoisonError, RwLock},
};

use {
    exambank_common::{HookRegistry, Record, RecordEvent, RecordHook},
    sqlx::{
        Row, SqlitePool,
        sqlite::{SqlitePoolOptions, SqliteRow},
    },
    tracing::{debug, info, warn},
};

use crate::{
    error::{Error, Result},
    model::{KnowledgePoint, Question, RecordKind},
    query::QuestionQuery,
};

const QUESTION_COLUMNS: &str = "id, uuid, document, type, subject, question, options, answer, \
                                difficulty, source, exam_point";
const KNOWLEDGE_POINT_COLUMNS: &str =
    "id, uuid, document, subject, knowledge_point, difficulty, source, exam_point";

/// The system of record for questions and knowledge points.
pub struct SqliteRecordStore {
    pool: SqlitePool,
    hooks: RwLock<HookRegistry>,
}

impl SqliteRecordStore {
    /// Connect with a dedicated pool and run migrations.
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        crate::run_migrations(&pool).await?;
        Ok(Self::with_pool(pool))
    }

    /// Use an existing pool (call [`crate::run_migrations`] first).
    pub fn with_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            hooks: RwLock::new(HookRegistry::new()),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Subscribe `hook` to the lifecycle events it declares.
    pub fn register_hook(&self, hook: Arc<dyn RecordHook>) {
        self.hooks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .register(hook);
    }

    pub fn hook_names(&self) -> Vec<String> {
        self.hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .handler_names()
    }

    async fn fire(&self, event: RecordEvent, record: &dyn Record) -> Result<()> {
        // Snapshot so no lock is held across the await.
        let hooks = self
            .hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if !hooks.has_handlers(event) {
            return Ok(());
        }
        hooks
            .dispatch(event, record)
            .await
            .map_err(Error::Propagation)
    }

    /// Fire `event` for every record of a committed batch. A failure does not
    /// stop the remaining records; the first one is returned at the end.
    async fn fire_each<R: Record>(&self, event: RecordEvent, records: &[R]) -> Result<()> {
        let mut first = None;
        let mut failed = 0usize;
        for record in records {
            if let Err(e) = self.fire(event, record).await {
                failed += 1;
                first.get_or_insert(e);
            }
        }
        match first {
            None => Ok(()),
            Some(e) => {
                warn!(%event, failed, total = records.len(), "batch propagation incomplete");
                Err(e)
            },
        }
    }

    // ── Questions ───────────────────────────────────────────────────────────

    pub async fn save_question(&self, question: Question) -> Result<Question> {
        let mut saved = self.save_questions(vec![question]).await?;
        saved
            .pop()
            .ok_or_else(|| sqlx::Error::RowNotFound.into())
    }

    /// Insert a batch in one transaction, then fire `AfterInsert` per record
    /// in order. Returns the records with their assigned ids.
    pub async fn save_questions(&self, questions: Vec<Question>) -> Result<Vec<Question>> {
        let mut tx = self.pool.begin().await?;
        let mut saved = Vec::with_capacity(questions.len());
        for mut q in questions {
            let result = sqlx::query(
                "INSERT INTO questions
                     (uuid, document, type, subject, question, options, answer, difficulty, source, exam_point)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&q.uuid)
            .bind(&q.document)
            .bind(q.question_type.as_str())
            .bind(q.subject.as_str())
            .bind(&q.question)
            .bind(&q.options)
            .bind(&q.answer)
            .bind(q.difficulty.as_str())
            .bind(q.source.as_str())
            .bind(&q.exam_point)
            .execute(&mut *tx)
            .await?;
            q.id = Some(result.last_insert_rowid());
            saved.push(q);
        }
        tx.commit().await?;
        info!(count = saved.len(), "saved questions");

        self.fire_each(RecordEvent::AfterInsert, &saved).await?;
        Ok(saved)
    }

    /// Overwrite every attribute of the question with `question.uuid`.
    pub async fn update_question(&self, question: &Question) -> Result<Question> {
        let row = sqlx::query(
            "UPDATE questions
             SET document = ?, type = ?, subject = ?, question = ?, options = ?, answer = ?,
                 difficulty = ?, source = ?, exam_point = ?
             WHERE uuid = ?
             RETURNING id",
        )
        .bind(&question.document)
        .bind(question.question_type.as_str())
        .bind(question.subject.as_str())
        .bind(&question.question)
        .bind(&question.options)
        .bind(&question.answer)
        .bind(question.difficulty.as_str())
        .bind(question.source.as_str())
        .bind(&question.exam_point)
        .bind(&question.uuid)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound {
            kind: "question",
            uuid: question.uuid.clone(),
        })?;

        let mut updated = question.clone();
        updated.id = Some(row.get("id"));
        debug!(uuid = %updated.uuid, "updated question");
        self.fire(RecordEvent::AfterUpdate, &updated).await?;
        Ok(updated)
    }

    /// Delete by uuid and return the removed row.
    pub async fn delete_question(&self, uuid: &str) -> Result<Question> {
        let row = sqlx::query(&format!(
            "DELETE FROM questions WHERE uuid = ? RETURNING {QUESTION_COLUMNS}"
        ))
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound {
            kind: "question",
            uuid: uuid.to_string(),
        })?;
        let deleted = question_from_row(&row)?;
        debug!(uuid, "deleted question");
        self.fire(RecordEvent::AfterDelete, &deleted).await?;
        Ok(deleted)
    }

    pub async fn get_question_by_uuid(&self, uuid: &str) -> Result<Option<Question>> {
        let row = sqlx::query(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE uuid = ?"
        ))
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(question_from_row).transpose()
    }

    pub async fn all_questions(&self) -> Result<Vec<Question>> {
        self.find_questions(&QuestionQuery::new()).await
    }

    pub async fn find_questions(&self, query: &QuestionQuery) -> Result<Vec<Question>> {
        let rows = query
            .build(QUESTION_COLUMNS)
            .build()
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(question_from_row).collect()
    }

    pub async fn count_questions(&self) -> Result<u64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions")
            .fetch_one(&self.pool)
            .await?;
        Ok(n as u64)
    }

    // ── Knowledge points ────────────────────────────────────────────────────

    pub async fn save_knowledge_point(&self, point: KnowledgePoint) -> Result<KnowledgePoint> {
        let mut saved = self.save_knowledge_points(vec![point]).await?;
        saved
            .pop()
            .ok_or_else(|| sqlx::Error::RowNotFound.into())
    }

    pub async fn save_knowledge_points(
        &self,
        points: Vec<KnowledgePoint>,
    ) -> Result<Vec<KnowledgePoint>> {
        let mut tx = self.pool.begin().await?;
        let mut saved = Vec::with_capacity(points.len());
        for mut kp in points {
            let result = sqlx::query(
                "INSERT INTO knowledge_points
                     (uuid, document, subject, knowledge_point, difficulty, source, exam_point)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&kp.uuid)
            .bind(&kp.document)
            .bind(kp.subject.as_str())
            .bind(&kp.knowledge_point)
            .bind(kp.difficulty.as_str())
            .bind(kp.source.as_str())
            .bind(&kp.exam_point)
            .execute(&mut *tx)
            .await?;
            kp.id = Some(result.last_insert_rowid());
            saved.push(kp);
        }
        tx.commit().await?;
        info!(count = saved.len(), "saved knowledge points");

        self.fire_each(RecordEvent::AfterInsert, &saved).await?;
        Ok(saved)
    }

    pub async fn update_knowledge_point(&self, point: &KnowledgePoint) -> Result<KnowledgePoint> {
        let row = sqlx::query(
            "UPDATE knowledge_points
             SET document = ?, subject = ?, knowledge_point = ?, difficulty = ?, source = ?,
                 exam_point = ?
             WHERE uuid = ?
             RETURNING id",
        )
        .bind(&point.document)
        .bind(point.subject.as_str())
        .bind(&point.knowledge_point)
        .bind(point.difficulty.as_str())
        .bind(point.source.as_str())
        .bind(&point.exam_point)
        .bind(&point.uuid)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound {
            kind: "knowledge point",
            uuid: point.uuid.clone(),
        })?;

        let mut updated = point.clone();
        updated.id = Some(row.get("id"));
        debug!(uuid = %updated.uuid, "updated knowledge point");
        self.fire(RecordEvent::AfterUpdate, &updated).await?;
        Ok(updated)
    }

    pub async fn delete_knowledge_point(&self, uuid: &str) -> Result<KnowledgePoint> {
        let row = sqlx::query(&format!(
            "DELETE FROM knowledge_points WHERE uuid = ? RETURNING {KNOWLEDGE_POINT_COLUMNS}"
        ))
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound {
            kind: "knowledge point",
            uuid: uuid.to_string(),
        })?;
        let deleted = knowledge_point_from_row(&row)?;
        debug!(uuid, "deleted knowledge point");
        self.fire(RecordEvent::AfterDelete, &deleted).await?;
        Ok(deleted)
    }

    pub async fn get_knowledge_point_by_uuid(&self, uuid: &str) -> Result<Option<KnowledgePoint>> {
        let row = sqlx::query(&format!(
            "SELECT {KNOWLEDGE_POINT_COLUMNS} FROM knowledge_points WHERE uuid = ?"
        ))
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(knowledge_point_from_row).transpose()
    }

    pub async fn all_knowledge_points(&self) -> Result<Vec<KnowledgePoint>> {
        let rows = sqlx::query(&format!(
            "SELECT {KNOWLEDGE_POINT_COLUMNS} FROM knowledge_points ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(knowledge_point_from_row).collect()
    }

    pub async fn count_knowledge_points(&self) -> Result<u64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM knowledge_points")
            .fetch_one(&self.pool)
            .await?;
        Ok(n as u64)
    }

    // ── Administrative ──────────────────────────────────────────────────────

    /// Every uuid currently stored for `kind`.
    pub async fn uuids(&self, kind: RecordKind) -> Result<HashSet<String>> {
        let uuids: Vec<String> = sqlx::query_scalar(&format!("SELECT uuid FROM {kind}"))
            .fetch_all(&self.pool)
            .await?;
        Ok(uuids.into_iter().collect())
    }

    /// Remove every row of both tables. No hooks fire.
    pub async fn reset_tables(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for kind in RecordKind::ALL {
            sqlx::query(&format!("DELETE FROM {kind}"))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        info!("relational tables reset");
        Ok(())
    }
}

fn parse_column<T>(row: &SqliteRow, column: &str) -> Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    let raw: String = row.try_get(column)?;
    raw.parse::<T>().map_err(|e| {
        Error::Sqlx(sqlx::Error::ColumnDecode {
            index: column.to_string(),
            source: e.into(),
        })
    })
}

fn question_from_row(row: &SqliteRow) -> Result<Question> {
    Ok(Question {
        id: Some(row.try_get("id")?),
        uuid: row.try_get("uuid")?,
        document: row.try_get("document")?,
        question_type: parse_column(row, "type")?,
        subject: parse_column(row, "subject")?,
        question: row.try_get("question")?,
        options: row.try_get("options")?,
        answer: row.try_get("answer")?,
        difficulty: parse_column(row, "difficulty")?,
        source: parse_column(row, "source")?,
        exam_point: row.try_get("exam_point")?,
    })
}

fn knowledge_point_from_row(row: &SqliteRow) -> Result<KnowledgePoint> {
    Ok(KnowledgePoint {
        id: Some(row.try_get("id")?),
        uuid: row.try_get("uuid")?,
        document: row.try_get("document")?,
        subject: parse_column(row, "subject")?,
        knowledge_point: row.try_get("knowledge_point")?,
        difficulty: parse_column(row, "difficulty")?,
        source: parse_column(row, "source")?,
        exam_point: row.try_get("exam_point")?,
    })
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use {
        super::*,
        crate::{
            model::{Difficulty, QuestionType, Subject},
            query::QuestionColumn,
        },
        async_trait::async_trait,
    };

    async fn make_store() -> SqliteRecordStore {
        SqliteRecordStore::new("sqlite::memory:", 1).await.unwrap()
    }

    fn question(subject: Subject, text: &str) -> Question {
        Question::new(QuestionType::SingleChoice, subject, text, "A")
    }

    #[derive(Default)]
    struct Log {
        seen: Mutex<Vec<(RecordEvent, String, String)>>,
        fail_on: Option<RecordEvent>,
        fail_uuid: Option<String>,
    }

    #[async_trait]
    impl RecordHook for Log {
        fn name(&self) -> &str {
            "log"
        }

        async fn handle(&self, event: RecordEvent, record: &dyn Record) -> anyhow::Result<()> {
            self.seen.lock().unwrap().push((
                event,
                record.kind().to_string(),
                record.uuid().to_string(),
            ));
            if self.fail_on == Some(event) {
                anyhow::bail!("index down");
            }
            if self.fail_uuid.as_deref() == Some(record.uuid()) {
                anyhow::bail!("index rejected {}", record.uuid());
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn save_and_get_round_trip() {
        let store = make_store().await;
        let saved = store
            .save_question(
                question(Subject::DataStructure, "What is a heap?")
                    .with_difficulty(Difficulty::Hard)
                    .with_exam_point("heaps"),
            )
            .await
            .unwrap();
        assert!(saved.id.is_some());

        let loaded = store.get_question_by_uuid(&saved.uuid).await.unwrap().unwrap();
        assert_eq!(loaded, saved);
        assert!(store.get_question_by_uuid("missing").await.unwrap().is_none());
        assert_eq!(store.count_questions().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn hooks_fire_after_each_write_in_order() {
        let store = make_store().await;
        let log = Arc::new(Log::default());
        store.register_hook(log.clone());

        let saved = store
            .save_questions(vec![
                question(Subject::DataStructure, "q1"),
                question(Subject::OperatingSystem, "q2"),
            ])
            .await
            .unwrap();
        let mut changed = saved[0].clone();
        changed.answer = "C".into();
        store.update_question(&changed).await.unwrap();
        store.delete_question(&saved[1].uuid).await.unwrap();

        let seen = log.seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                (RecordEvent::AfterInsert, "questions".into(), saved[0].uuid.clone()),
                (RecordEvent::AfterInsert, "questions".into(), saved[1].uuid.clone()),
                (RecordEvent::AfterUpdate, "questions".into(), saved[0].uuid.clone()),
                (RecordEvent::AfterDelete, "questions".into(), saved[1].uuid.clone()),
            ]
        );
        assert_eq!(store.hook_names(), vec!["log".to_string()]);
    }

    #[tokio::test]
    async fn failed_propagation_keeps_the_commit() {
        let store = make_store().await;
        store.register_hook(Arc::new(Log {
            fail_on: Some(RecordEvent::AfterInsert),
            ..Log::default()
        }));

        let kp = KnowledgePoint::new(Subject::ComputerNetwork, "sliding window");
        let uuid = kp.uuid.clone();
        let err = store.save_knowledge_point(kp).await.unwrap_err();
        assert!(matches!(err, Error::Propagation(_)));
        assert!(err.to_string().contains("index down"));

        let stored = store.get_knowledge_point_by_uuid(&uuid).await.unwrap();
        assert!(stored.is_some());
    }

    #[tokio::test]
    async fn batch_failure_still_propagates_the_rest() {
        let store = make_store().await;
        let batch = vec![
            question(Subject::DataStructure, "first"),
            question(Subject::DataStructure, "second"),
            question(Subject::DataStructure, "third"),
        ];
        let uuids: Vec<String> = batch.iter().map(|q| q.uuid.clone()).collect();
        let log = Arc::new(Log {
            fail_uuid: Some(uuids[0].clone()),
            ..Log::default()
        });
        store.register_hook(log.clone());

        let err = store.save_questions(batch).await.unwrap_err();
        assert!(matches!(err, Error::Propagation(_)));
        assert!(err.to_string().contains(&uuids[0]));
        assert_eq!(store.count_questions().await.unwrap(), 3);

        let propagated: Vec<String> = log
            .seen
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, uuid)| uuid.clone())
            .collect();
        assert_eq!(propagated, uuids);
    }

    #[tokio::test]
    async fn update_and_delete_of_unknown_uuid_are_not_found() {
        let store = make_store().await;
        let ghost = question(Subject::Mix, "ghost");
        assert!(matches!(
            store.update_question(&ghost).await,
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            store.delete_knowledge_point("nope").await,
            Err(Error::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn find_applies_filters_and_limit() {
        let store = make_store().await;
        store
            .save_questions(vec![
                question(Subject::DataStructure, "stack push"),
                question(Subject::DataStructure, "queue 50% full"),
                question(Subject::OperatingSystem, "stack of a process"),
                Question::new(
                    QuestionType::ShortAnswer,
                    Subject::DataStructure,
                    "explain a stack",
                    "LIFO",
                ),
            ])
            .await
            .unwrap();

        let ds_choice = store
            .find_questions(
                &QuestionQuery::new()
                    .eq(QuestionColumn::Type, "single_choice")
                    .eq(QuestionColumn::Subject, "data_structure"),
            )
            .await
            .unwrap();
        assert_eq!(ds_choice.len(), 2);

        let stacks = store
            .find_questions(
                &QuestionQuery::new()
                    .like(QuestionColumn::Question, "stack")
                    .limit(2),
            )
            .await
            .unwrap();
        assert_eq!(
            stacks.iter().map(|q| q.question.as_str()).collect::<Vec<_>>(),
            vec!["stack push", "stack of a process"]
        );

        let percent = store
            .find_questions(&QuestionQuery::new().like(QuestionColumn::Question, "50%"))
            .await
            .unwrap();
        assert_eq!(percent.len(), 1);

        let none = store
            .find_questions(&QuestionQuery::new().any_of(QuestionColumn::Uuid, Vec::<String>::new()))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn reset_clears_both_tables_silently() {
        let store = make_store().await;
        let log = Arc::new(Log::default());
        store
            .save_question(question(Subject::DataStructure, "q"))
            .await
            .unwrap();
        store
            .save_knowledge_point(KnowledgePoint::new(Subject::DataStructure, "kp"))
            .await
            .unwrap();
        store.register_hook(log.clone());

        store.reset_tables().await.unwrap();
        assert_eq!(store.count_questions().await.unwrap(), 0);
        assert_eq!(store.count_knowledge_points().await.unwrap(), 0);
        assert!(store.uuids(RecordKind::Questions).await.unwrap().is_empty());
        assert!(log.seen.lock().unwrap().is_empty());
    }
}
