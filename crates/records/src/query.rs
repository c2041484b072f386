//! Conjunctive question queries.

use sqlx::{QueryBuilder, Sqlite};

/// Filterable columns of the `questions` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionColumn {
    Uuid,
    Document,
    Type,
    Subject,
    Question,
    Options,
    Answer,
    Difficulty,
    Source,
    ExamPoint,
}

impl QuestionColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uuid => "uuid",
            Self::Document => "document",
            Self::Type => "type",
            Self::Subject => "subject",
            Self::Question => "question",
            Self::Options => "options",
            Self::Answer => "answer",
            Self::Difficulty => "difficulty",
            Self::Source => "source",
            Self::ExamPoint => "exam_point",
        }
    }
}

/// One predicate of a [`QuestionQuery`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Eq(QuestionColumn, String),
    /// Substring match; `%` and `_` in the needle match literally.
    Contains(QuestionColumn, String),
    /// Membership; an empty set matches nothing.
    AnyOf(QuestionColumn, Vec<String>),
}

/// A conjunction of [`Condition`]s with an optional row limit.
///
/// Rows come back in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionQuery {
    conditions: Vec<Condition>,
    limit: Option<usize>,
}

impl QuestionQuery {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn eq(mut self, column: QuestionColumn, value: impl Into<String>) -> Self {
        self.conditions.push(Condition::Eq(column, value.into()));
        self
    }

    /// `eq` when `value` is present; a wildcard otherwise.
    #[must_use]
    pub fn eq_opt<V: Into<String>>(self, column: QuestionColumn, value: Option<V>) -> Self {
        match value {
            Some(value) => self.eq(column, value),
            None => self,
        }
    }

    #[must_use]
    pub fn like(mut self, column: QuestionColumn, needle: impl Into<String>) -> Self {
        self.conditions.push(Condition::Contains(column, needle.into()));
        self
    }

    #[must_use]
    pub fn any_of<I, V>(mut self, column: QuestionColumn, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.conditions.push(Condition::AnyOf(
            column,
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    #[must_use]
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn max_rows(&self) -> Option<usize> {
        self.limit
    }

    /// Build the SQL for `SELECT <columns> FROM questions ...`.
    pub(crate) fn build<'q>(&self, columns: &str) -> QueryBuilder<'q, Sqlite> {
        let mut qb = QueryBuilder::new(format!("SELECT {columns} FROM questions"));
        for (i, condition) in self.conditions.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            match condition {
                Condition::Eq(column, value) => {
                    qb.push(column.as_str()).push(" = ").push_bind(value.clone());
                },
                Condition::Contains(column, needle) => {
                    qb.push(column.as_str())
                        .push(" LIKE ")
                        .push_bind(format!("%{}%", escape_like(needle)))
                        .push(" ESCAPE '\\'");
                },
                Condition::AnyOf(_, values) if values.is_empty() => {
                    qb.push("1 = 0");
                },
                Condition::AnyOf(column, values) => {
                    qb.push(column.as_str()).push(" IN (");
                    let mut sep = qb.separated(", ");
                    for value in values {
                        sep.push_bind(value.clone());
                    }
                    sep.push_unseparated(")");
                },
            }
        }
        qb.push(" ORDER BY id");
        if let Some(limit) = self.limit {
            qb.push(" LIMIT ").push_bind(limit as i64);
        }
        qb
    }
}

fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
