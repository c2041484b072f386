//! Assemble exams from stored questions.

use std::sync::Arc;

use {
    exambank_records::{Question, SqliteRecordStore},
    exambank_vector::VectorIndexClient,
    serde::{Serialize, Serializer, ser::SerializeStruct},
    tracing::{debug, error, info, warn},
};

use crate::{
    error::Result,
    finder::{FinderContext, QuestionFinder},
    keyword::KeywordExtractor,
    spec::{ExamSpec, SectionSpec},
};

/// A flat, ordered list of questions. Section boundaries are not kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Exam {
    pub questions: Vec<Question>,
}

impl Exam {
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

impl Serialize for Exam {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Exam", 2)?;
        s.serialize_field("length", &self.questions.len())?;
        s.serialize_field("questions", &self.questions)?;
        s.end()
    }
}

pub struct TestGenerator {
    store: Arc<SqliteRecordStore>,
    index: Arc<VectorIndexClient>,
    keywords: Option<Arc<dyn KeywordExtractor>>,
    knowledge_finder: QuestionFinder,
}

impl TestGenerator {
    /// Knowledge points are resolved through the vector index by default.
    pub fn new(store: Arc<SqliteRecordStore>, index: Arc<VectorIndexClient>) -> Self {
        Self {
            store,
            index,
            keywords: None,
            knowledge_finder: QuestionFinder::Vector,
        }
    }

    /// Resolve knowledge points through keyword extraction instead.
    #[must_use]
    pub fn with_keyword_extractor(mut self, extractor: Arc<dyn KeywordExtractor>) -> Self {
        self.keywords = Some(extractor);
        self.knowledge_finder = QuestionFinder::Keyword;
        self
    }

    #[must_use]
    pub fn with_knowledge_finder(mut self, finder: QuestionFinder) -> Self {
        self.knowledge_finder = finder;
        self
    }

    pub fn knowledge_finder(&self) -> QuestionFinder {
        self.knowledge_finder
    }

    fn context(&self) -> FinderContext<'_> {
        FinderContext {
            store: &self.store,
            index: &self.index,
            keywords: self.keywords.as_deref(),
        }
    }

    async fn find(&self, section: &SectionSpec) -> Result<Vec<Question>> {
        let finder = QuestionFinder::select(section, self.knowledge_finder);
        finder.find(&self.context(), section).await
    }

    /// Fill every section in order. Short sections are accepted; any finder
    /// error aborts the whole exam.
    pub async fn generate(&self, spec: &ExamSpec) -> Result<Exam> {
        info!(sections = spec.sections.len(), requested = spec.length(), "generating exam");
        let mut exam = Exam::default();
        for (i, section) in spec.sections.iter().enumerate() {
            let questions = self.find(section).await.inspect_err(|e| {
                error!(section = i, condition = %section, error = %e, "exam generation failed");
            })?;
            if questions.len() < section.number {
                warn!(
                    section = i,
                    needed = section.number,
                    actual = questions.len(),
                    "section short of questions"
                );
            }
            debug!(section = i, needed = section.number, actual = questions.len(), condition = %section, "section complete");
            exam.questions.extend(questions);
        }
        info!(needed = spec.length(), actual = exam.len(), "exam generated");
        Ok(exam)
    }

    /// A one-section exam.
    pub async fn generate_section(&self, section: &SectionSpec) -> Result<Exam> {
        info!(condition = %section, "generating section");
        let questions = self.find(section).await?;
        info!(needed = section.number, actual = questions.len(), "section generated");
        Ok(Exam { questions })
    }
}
