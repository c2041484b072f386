//! Exam generation: section specs, question finders and the generator.

pub mod error;
pub mod finder;
pub mod generator;
pub mod keyword;
pub mod spec;

pub use {
    error::{Error, Result},
    finder::{FinderContext, QuestionFinder, static_conditions},
    generator::{Exam, TestGenerator},
    keyword::{KeywordExtractor, OpenAiKeywordExtractor},
    spec::{ExamSpec, SectionSpec},
};
