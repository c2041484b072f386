#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use {
    async_trait::async_trait,
    exambank_exam::{
        Error, ExamSpec, KeywordExtractor, QuestionFinder, SectionSpec, TestGenerator,
    },
    exambank_records::{Question, QuestionType, SqliteRecordStore, Subject},
    exambank_sync::SyncManager,
    exambank_vector::{
        HashingEmbeddingProvider, SqliteVectorStore, VectorIndexClient, VectorIndexConfig,
    },
};

struct Bank {
    store: Arc<SqliteRecordStore>,
    index: Arc<VectorIndexClient>,
}

async fn bank() -> Bank {
    let store = Arc::new(SqliteRecordStore::new("sqlite::memory:", 1).await.unwrap());
    let vectors = SqliteVectorStore::connect("sqlite::memory:", 1).await.unwrap();
    let index = Arc::new(
        VectorIndexClient::new(Arc::new(vectors), VectorIndexConfig::default())
            .unwrap()
            .with_embedder(Arc::new(HashingEmbeddingProvider::new(256))),
    );
    index.ensure_collections().await.unwrap();
    SyncManager::attach(&store, Arc::clone(&index));
    Bank { store, index }
}

fn question(kind: QuestionType, subject: Subject, stem: &str) -> Question {
    Question::new(kind, subject, stem, format!("answer to {stem}"))
}

async fn seed(bank: &Bank, single_choice_ds: usize, short_answer_os: usize) {
    let mut questions = Vec::new();
    for i in 0..single_choice_ds {
        questions.push(question(
            QuestionType::SingleChoice,
            Subject::DataStructure,
            &format!("data structure choice {i}"),
        ));
    }
    for i in 0..short_answer_os {
        questions.push(question(
            QuestionType::ShortAnswer,
            Subject::OperatingSystem,
            &format!("operating system essay {i}"),
        ));
    }
    // Noise that no section asks for.
    questions.push(question(
        QuestionType::SingleChoice,
        Subject::ComputerNetwork,
        "network choice",
    ));
    questions.push(question(
        QuestionType::ShortAnswer,
        Subject::DataStructure,
        "data structure essay",
    ));
    bank.store.save_questions(questions).await.unwrap();
}

fn two_sections() -> ExamSpec {
    ExamSpec::new(vec![
        SectionSpec::new(QuestionType::SingleChoice, 5).with_subject(Subject::DataStructure),
        SectionSpec::new(QuestionType::ShortAnswer, 2).with_subject(Subject::OperatingSystem),
    ])
}

#[tokio::test]
async fn generates_sections_in_order() {
    let bank = bank().await;
    seed(&bank, 6, 3).await;

    let exam = TestGenerator::new(Arc::clone(&bank.store), Arc::clone(&bank.index))
        .generate(&two_sections())
        .await
        .unwrap();

    assert_eq!(exam.len(), 7);
    for q in &exam.questions[..5] {
        assert_eq!(q.question_type, QuestionType::SingleChoice);
        assert_eq!(q.subject, Subject::DataStructure);
    }
    for q in &exam.questions[5..] {
        assert_eq!(q.question_type, QuestionType::ShortAnswer);
        assert_eq!(q.subject, Subject::OperatingSystem);
    }
}

#[tokio::test]
async fn shortfall_is_accepted() {
    let bank = bank().await;
    seed(&bank, 3, 2).await;

    let exam = TestGenerator::new(Arc::clone(&bank.store), Arc::clone(&bank.index))
        .generate(&two_sections())
        .await
        .unwrap();

    assert_eq!(exam.len(), 5);
    assert!(
        exam.questions[..3]
            .iter()
            .all(|q| q.question_type == QuestionType::SingleChoice)
    );
    assert!(
        exam.questions[3..]
            .iter()
            .all(|q| q.subject == Subject::OperatingSystem)
    );
}

#[tokio::test]
async fn vector_finder_restricts_to_similar_questions() {
    let bank = bank().await;
    let mut questions: Vec<Question> = (0..11)
        .map(|i| {
            Question::new(
                QuestionType::SingleChoice,
                Subject::ComputerNetwork,
                format!("congestion window sizing case {i}"),
                format!("slow start threshold {i}"),
            )
        })
        .collect();
    let target = Question::new(
        QuestionType::SingleChoice,
        Subject::DataStructure,
        "binary tree inorder traversal order",
        "left subtree, root, right subtree",
    );
    questions.push(target.clone());
    questions.push(Question::new(
        QuestionType::ShortAnswer,
        Subject::DataStructure,
        "explain binary tree inorder traversal in detail",
        "recursive visit",
    ));
    bank.store.save_questions(questions).await.unwrap();

    let section = SectionSpec::new(QuestionType::SingleChoice, 10)
        .with_knowledge_point("binary tree inorder traversal");
    let exam = TestGenerator::new(Arc::clone(&bank.store), Arc::clone(&bank.index))
        .generate_section(&section)
        .await
        .unwrap();

    // Without the similarity restriction the first ten rows by id would
    // exclude the target, which was inserted after every filler.
    assert_eq!(exam.len(), 10);
    assert!(exam.questions.iter().any(|q| q.uuid == target.uuid));
    assert!(
        exam.questions
            .iter()
            .all(|q| q.question_type == QuestionType::SingleChoice)
    );
}

struct FixedKeyword {
    keyword: &'static str,
    calls: AtomicUsize,
}

#[async_trait]
impl KeywordExtractor for FixedKeyword {
    async fn extract(&self, _knowledge_point: &str) -> exambank_exam::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.keyword.to_string())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

struct Unreachable;

#[async_trait]
impl KeywordExtractor for Unreachable {
    async fn extract(&self, _knowledge_point: &str) -> exambank_exam::Result<String> {
        Err(Error::keyword("model unavailable"))
    }

    fn name(&self) -> &str {
        "unreachable"
    }
}

#[tokio::test]
async fn keyword_finder_filters_on_the_extracted_keyword() {
    let bank = bank().await;
    bank.store
        .save_questions(vec![
            question(QuestionType::SingleChoice, Subject::OperatingSystem, "What does a semaphore count"),
            question(QuestionType::SingleChoice, Subject::OperatingSystem, "What does a page table map"),
            question(QuestionType::SingleChoice, Subject::OperatingSystem, "When is a page fault raised"),
        ])
        .await
        .unwrap();

    let extractor = Arc::new(FixedKeyword {
        keyword: "page",
        calls: AtomicUsize::new(0),
    });
    let generator = TestGenerator::new(Arc::clone(&bank.store), Arc::clone(&bank.index))
        .with_keyword_extractor(Arc::clone(&extractor) as Arc<dyn KeywordExtractor>);
    assert_eq!(generator.knowledge_finder(), QuestionFinder::Keyword);

    let spec = ExamSpec::new(vec![
        SectionSpec::new(QuestionType::SingleChoice, 5).with_knowledge_point("虚拟内存分页"),
        SectionSpec::new(QuestionType::SingleChoice, 1),
    ]);
    let exam = generator.generate(&spec).await.unwrap();

    assert_eq!(exam.len(), 3);
    assert!(exam.questions[..2].iter().all(|q| q.question.contains("page")));
    assert!(exam.questions[2].question.contains("semaphore"));
    // Only the section with a knowledge point consults the model.
    assert_eq!(extractor.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn finder_errors_abort_generation() {
    let bank = bank().await;
    seed(&bank, 5, 2).await;

    let spec = ExamSpec::new(vec![
        SectionSpec::new(QuestionType::SingleChoice, 5).with_subject(Subject::DataStructure),
        SectionSpec::new(QuestionType::ShortAnswer, 2).with_knowledge_point("scheduling"),
    ]);
    let result = TestGenerator::new(Arc::clone(&bank.store), Arc::clone(&bank.index))
        .with_keyword_extractor(Arc::new(Unreachable))
        .generate(&spec)
        .await;
    assert!(matches!(result, Err(Error::KeywordExtraction { .. })));
}

#[tokio::test]
async fn keyword_finder_without_extractor_is_an_error() {
    let bank = bank().await;
    let section = SectionSpec::new(QuestionType::SingleChoice, 1).with_knowledge_point("paging");
    let result = TestGenerator::new(Arc::clone(&bank.store), Arc::clone(&bank.index))
        .with_knowledge_finder(QuestionFinder::Keyword)
        .generate_section(&section)
        .await;
    assert!(matches!(result, Err(Error::KeywordExtraction { .. })));
}
