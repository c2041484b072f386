//! Declarative exam layouts.

use std::{fmt, path::Path};

use {
    exambank_records::{Difficulty, QuestionType, Source, Subject},
    serde::{Deserialize, Serialize},
    tracing::debug,
};

use crate::error::{Error, Result};

/// One section of an exam: how many questions of which kind.
///
/// Absent filters match anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSpec {
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub number: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<Subject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    /// Free-text semantic constraint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge_point: Option<String>,
}

impl SectionSpec {
    pub fn new(question_type: QuestionType, number: usize) -> Self {
        Self {
            question_type,
            number,
            subject: None,
            difficulty: None,
            source: None,
            knowledge_point: None,
        }
    }

    #[must_use]
    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.subject = Some(subject);
        self
    }

    #[must_use]
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn with_knowledge_point(mut self, knowledge_point: impl Into<String>) -> Self {
        self.knowledge_point = Some(knowledge_point.into());
        self
    }

    /// The knowledge-point constraint, if it has any content.
    pub fn knowledge_point(&self) -> Option<&str> {
        self.knowledge_point
            .as_deref()
            .map(str::trim)
            .filter(|kp| !kp.is_empty())
    }
}

impl fmt::Display for SectionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn or_none<T: fmt::Display>(value: Option<T>) -> String {
            value.map_or_else(|| "none".to_string(), |v| v.to_string())
        }
        write!(
            f,
            "type={}, number={}, subject={}, difficulty={}, knowledge_point={}, source={}",
            self.question_type,
            self.number,
            or_none(self.subject),
            or_none(self.difficulty),
            or_none(self.knowledge_point()),
            or_none(self.source),
        )
    }
}

/// An ordered list of sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamSpec {
    pub sections: Vec<SectionSpec>,
}

impl ExamSpec {
    pub fn new(sections: Vec<SectionSpec>) -> Self {
        Self { sections }
    }

    /// Load a spec from a `.toml`, `.yaml`/`.yml` or `.json` file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let spec: Self = match ext.as_str() {
            "toml" => toml::from_str(&raw)?,
            "yaml" | "yml" => serde_yaml::from_str(&raw)?,
            "json" => serde_json::from_str(&raw)?,
            other => {
                return Err(Error::UnsupportedFormat {
                    extension: other.to_string(),
                });
            },
        };
        spec.validate()?;
        debug!(path = %path.display(), sections = spec.sections.len(), "loaded exam spec");
        Ok(spec)
    }

    /// Total number of questions requested.
    pub fn length(&self) -> usize {
        self.sections.iter().map(|s| s.number).sum()
    }

    pub fn validate(&self) -> Result<()> {
        if self.sections.is_empty() {
            return Err(Error::invalid_spec("exam spec has no sections"));
        }
        if let Some(i) = self.sections.iter().position(|s| s.number == 0) {
            return Err(Error::invalid_spec(format!(
                "section {i} requests zero questions"
            )));
        }
        Ok(())
    }
}

/// The standard 408 layout: ten single-choice questions and one short-answer
/// question per subject, plus three unrestricted short-answer questions.
impl Default for ExamSpec {
    fn default() -> Self {
        let subjects = [
            Subject::DataStructure,
            Subject::ComputerOrganization,
            Subject::OperatingSystem,
            Subject::ComputerNetwork,
        ];
        let single_choice = subjects
            .iter()
            .map(|s| SectionSpec::new(QuestionType::SingleChoice, 10).with_subject(*s));
        let short_answer = subjects
            .iter()
            .map(|s| SectionSpec::new(QuestionType::ShortAnswer, 1).with_subject(*s));
        Self {
            sections: single_choice
                .chain(short_answer)
                .chain(std::iter::once(SectionSpec::new(QuestionType::ShortAnswer, 3)))
                .collect(),
        }
    }
}

impl fmt::Display for ExamSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "section {i}: {section}")?;
        }
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[test]
    fn default_is_the_408_layout() {
        let spec = ExamSpec::default();
        assert_eq!(spec.sections.len(), 9);
        assert_eq!(spec.length(), 47);
        assert!(spec.validate().is_ok());
        assert_eq!(spec.sections[8].subject, None);
    }

    #[rstest]
    #[case("spec.toml", "[[sections]]\ntype = \"single_choice\"\nnumber = 5\nsubject = \"数据结构\"\n\n[[sections]]\ntype = \"short_answer\"\nnumber = 2\nknowledge_point = \"paging\"\n")]
    #[case("spec.yaml", "sections:\n  - type: single_choice\n    number: 5\n    subject: data_structure\n  - type: 简答题\n    number: 2\n    knowledge_point: paging\n")]
    #[case("spec.json", r#"{"sections":[{"type":"single_choice","number":5,"subject":"data_structure"},{"type":"short_answer","number":2,"knowledge_point":"paging"}]}"#)]
    fn loads_every_format(#[case] name: &str, #[case] body: &str) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();

        let spec = ExamSpec::load(&path).unwrap();
        assert_eq!(spec.length(), 7);
        assert_eq!(spec.sections[0].subject, Some(Subject::DataStructure));
        assert_eq!(spec.sections[1].question_type, QuestionType::ShortAnswer);
        assert_eq!(spec.sections[1].knowledge_point(), Some("paging"));
    }

    #[test]
    fn rejects_empty_and_zero_sized_specs() {
        assert!(matches!(
            ExamSpec::new(Vec::new()).validate(),
            Err(Error::InvalidSpec { .. })
        ));
        let spec = ExamSpec::new(vec![
            SectionSpec::new(QuestionType::SingleChoice, 3),
            SectionSpec::new(QuestionType::ShortAnswer, 0),
        ]);
        match spec.validate() {
            Err(Error::InvalidSpec { message }) => assert!(message.contains("section 1")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spec.ini");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(
            ExamSpec::load(&path),
            Err(Error::UnsupportedFormat { extension }) if extension == "ini"
        ));
    }

    #[test]
    fn blank_knowledge_point_counts_as_absent() {
        let section = SectionSpec::new(QuestionType::SingleChoice, 1).with_knowledge_point("  ");
        assert_eq!(section.knowledge_point(), None);
        assert!(section.to_string().contains("knowledge_point=none"));
    }
}
