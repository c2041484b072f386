//! Record kinds stored in the relational store and their attribute vocabularies.

use std::{fmt, str::FromStr};

use {
    exambank_common::{Attributes, Record},
    serde::{Deserialize, Serialize},
};

/// Declares a closed vocabulary stored as its snake_case name.
///
/// Parsing also accepts the SCREAMING_CASE spelling and the Chinese display
/// label used by the source question banks.
macro_rules! vocabulary {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident => ($key:literal, $label:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $key, alias = $label)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            /// Stored column value.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $key,)+
                }
            }

            /// Human-facing label.
            pub fn label(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s) || v.label() == s)
                    .ok_or_else(|| {
                        format!(concat!("unknown ", stringify!($name), " '{}'"), s)
                    })
            }
        }
    };
}

vocabulary! {
    pub enum QuestionType {
        SingleChoice => ("single_choice", "单选题"),
        ShortAnswer => ("short_answer", "简答题"),
        ComprehensiveApplication => ("comprehensive_application", "综合应用题"),
        MultipleChoice => ("multiple_choice", "多选题"),
        FillInTheBlank => ("fill_in_the_blank", "填空题"),
    }
}

vocabulary! {
    pub enum Subject {
        DataStructure => ("data_structure", "数据结构"),
        ComputerOrganization => ("computer_organization", "计算机组成原理"),
        OperatingSystem => ("operating_system", "操作系统"),
        ComputerNetwork => ("computer_network", "计算机网络"),
        Mix => ("mix", "混合"),
    }
}

vocabulary! {
    pub enum Difficulty {
        Easy => ("easy", "简单"),
        Medium => ("medium", "中等"),
        Hard => ("hard", "困难"),
    }
}

vocabulary! {
    pub enum Source {
        Real => ("real", "真题"),
        Internet => ("internet", "互联网"),
        Ai => ("ai", "AI"),
    }
}

/// The record kinds mirrored into the vector index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Questions,
    KnowledgePoints,
}

impl RecordKind {
    pub const ALL: &'static [RecordKind] = &[Self::Questions, Self::KnowledgePoints];

    /// Table name, also the name of the index collection.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Questions => "questions",
            Self::KnowledgePoints => "knowledge_points",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "questions" => Ok(Self::Questions),
            "knowledge_points" => Ok(Self::KnowledgePoints),
            other => Err(format!("unsupported record kind '{other}'")),
        }
    }
}

fn new_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// An exam question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Store-assigned primary key, `None` until saved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub uuid: String,
    pub document: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub subject: Subject,
    pub question: String,
    /// Answer options, one per line. Empty for open questions.
    #[serde(default)]
    pub options: String,
    pub answer: String,
    pub difficulty: Difficulty,
    pub source: Source,
    #[serde(default)]
    pub exam_point: Option<String>,
}

impl Question {
    /// A new unsaved question with a fresh uuid. Difficulty defaults to
    /// medium and source to real exam papers.
    pub fn new(
        question_type: QuestionType,
        subject: Subject,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        let mut q = Self {
            id: None,
            uuid: new_uuid(),
            document: String::new(),
            question_type,
            subject,
            question: question.into(),
            options: String::new(),
            answer: answer.into(),
            difficulty: Difficulty::Medium,
            source: Source::Real,
            exam_point: None,
        };
        q.document = q.compose_document();
        q
    }

    #[must_use]
    pub fn with_options(mut self, options: impl Into<String>) -> Self {
        self.options = options.into();
        self.document = self.compose_document();
        self
    }

    #[must_use]
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: Source) -> Self {
        self.source = source;
        self
    }

    #[must_use]
    pub fn with_exam_point(mut self, exam_point: impl Into<String>) -> Self {
        self.exam_point = Some(exam_point.into());
        self
    }

    #[must_use]
    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = uuid.into();
        self
    }

    /// Stem, options and answer joined by newlines, skipping empty parts.
    pub fn compose_document(&self) -> String {
        [
            self.question.as_str(),
            self.options.as_str(),
            self.answer.as_str(),
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
    }
}

impl Record for Question {
    fn kind(&self) -> &str {
        RecordKind::Questions.as_str()
    }

    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn attributes(&self) -> Attributes {
        Attributes::from([
            ("uuid".to_string(), self.uuid.clone()),
            ("document".to_string(), self.document.clone()),
            ("type".to_string(), self.question_type.as_str().to_string()),
            ("subject".to_string(), self.subject.as_str().to_string()),
            ("question".to_string(), self.question.clone()),
            ("options".to_string(), self.options.clone()),
            ("answer".to_string(), self.answer.clone()),
            ("difficulty".to_string(), self.difficulty.as_str().to_string()),
            ("source".to_string(), self.source.as_str().to_string()),
            (
                "exam_point".to_string(),
                self.exam_point.clone().unwrap_or_default(),
            ),
        ])
    }
}

/// A knowledge point of the syllabus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgePoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub uuid: String,
    pub document: String,
    pub subject: Subject,
    pub knowledge_point: String,
    pub difficulty: Difficulty,
    pub source: Source,
    #[serde(default)]
    pub exam_point: Option<String>,
}

impl KnowledgePoint {
    /// A new unsaved knowledge point whose document is its own text.
    pub fn new(subject: Subject, knowledge_point: impl Into<String>) -> Self {
        let knowledge_point = knowledge_point.into();
        Self {
            id: None,
            uuid: new_uuid(),
            document: knowledge_point.clone(),
            subject,
            knowledge_point,
            difficulty: Difficulty::Medium,
            source: Source::Real,
            exam_point: None,
        }
    }

    #[must_use]
    pub fn with_document(mut self, document: impl Into<String>) -> Self {
        self.document = document.into();
        self
    }

    #[must_use]
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: Source) -> Self {
        self.source = source;
        self
    }

    #[must_use]
    pub fn with_exam_point(mut self, exam_point: impl Into<String>) -> Self {
        self.exam_point = Some(exam_point.into());
        self
    }

    #[must_use]
    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = uuid.into();
        self
    }
}

impl Record for KnowledgePoint {
    fn kind(&self) -> &str {
        RecordKind::KnowledgePoints.as_str()
    }

    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn attributes(&self) -> Attributes {
        Attributes::from([
            ("uuid".to_string(), self.uuid.clone()),
            ("document".to_string(), self.document.clone()),
            ("subject".to_string(), self.subject.as_str().to_string()),
            ("knowledge_point".to_string(), self.knowledge_point.clone()),
            ("difficulty".to_string(), self.difficulty.as_str().to_string()),
            ("source".to_string(), self.source.as_str().to_string()),
            (
                "exam_point".to_string(),
                self.exam_point.clone().unwrap_or_default(),
            ),
        ])
    }
}
