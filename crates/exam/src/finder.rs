//! Question finders: resolve a section into stored questions.
//!
//! Every finder starts from the same static conjunction (type, plus subject,
//! difficulty and source when given). The strategies only differ in how a
//! knowledge-point constraint is turned into one more predicate.

use {
    exambank_records::{Question, QuestionColumn, QuestionQuery, SqliteRecordStore},
    exambank_vector::{MetadataFilter, QUESTIONS, QueryInput, VectorIndexClient},
    tracing::debug,
};

use crate::{
    error::{Error, Result},
    keyword::KeywordExtractor,
    spec::SectionSpec,
};

/// Candidate uuids requested from the index when a section asks for fewer.
pub const DEFAULT_VECTOR_CANDIDATES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionFinder {
    /// Restrict to the uuids of the questions most similar to the knowledge point.
    Vector,
    /// Restrict to questions whose text contains an LLM-extracted keyword.
    Keyword,
    /// Static filters only.
    Relational,
}

/// What the finders read from.
pub struct FinderContext<'a> {
    pub store: &'a SqliteRecordStore,
    pub index: &'a VectorIndexClient,
    pub keywords: Option<&'a dyn KeywordExtractor>,
}

impl QuestionFinder {
    /// `knowledge_finder` for sections with a knowledge point, the relational
    /// finder otherwise.
    pub fn select(section: &SectionSpec, knowledge_finder: QuestionFinder) -> Self {
        if section.knowledge_point().is_some() {
            knowledge_finder
        } else {
            Self::Relational
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Vector => "vector",
            Self::Keyword => "keyword",
            Self::Relational => "relational",
        }
    }

    /// At most `section.number` questions matching the section.
    pub async fn find(&self, ctx: &FinderContext<'_>, section: &SectionSpec) -> Result<Vec<Question>> {
        let mut query = static_conditions(section);

        match (self, section.knowledge_point()) {
            (Self::Vector, Some(kp)) => {
                let filter = MetadataFilter::from([(
                    "type".to_string(),
                    section.question_type.as_str().to_string(),
                )]);
                let candidates = ctx
                    .index
                    .query_by_uuid(
                        QUESTIONS,
                        QueryInput::Text(kp),
                        &filter,
                        section.number.max(DEFAULT_VECTOR_CANDIDATES),
                    )
                    .await?;
                debug!(knowledge_point = kp, candidates = candidates.len(), "vector candidates");
                query = query.any_of(QuestionColumn::Uuid, candidates);
            },
            (Self::Keyword, Some(kp)) => {
                let extractor = ctx
                    .keywords
                    .ok_or_else(|| Error::keyword("no keyword extractor configured"))?;
                let keyword = extractor.extract(kp).await?;
                debug!(knowledge_point = kp, keyword = %keyword, "keyword filter");
                query = query.like(QuestionColumn::Question, keyword);
            },
            _ => {},
        }

        let questions = ctx
            .store
            .find_questions(&query.limit(section.number))
            .await?;
        debug!(
            finder = self.name(),
            needed = section.number,
            actual = questions.len(),
            "find questions complete"
        );
        Ok(questions)
    }
}

/// Type always, subject/difficulty/source when present.
pub fn static_conditions(section: &SectionSpec) -> QuestionQuery {
    QuestionQuery::new()
        .eq(QuestionColumn::Type, section.question_type.as_str())
        .eq_opt(QuestionColumn::Subject, section.subject.map(|s| s.as_str()))
        .eq_opt(QuestionColumn::Difficulty, section.difficulty.map(|d| d.as_str()))
        .eq_opt(QuestionColumn::Source, section.source.map(|s| s.as_str()))
}
