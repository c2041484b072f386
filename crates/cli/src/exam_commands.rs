use std::path::{Path, PathBuf};

use {exambank_exam::ExamSpec, tracing::info};

use crate::knowledge_base::KnowledgeBase;

/// `--spec`, then `exam.spec` from the config, then the built-in 408 layout.
pub fn resolve_spec(flag: Option<&Path>, configured: Option<&Path>) -> anyhow::Result<ExamSpec> {
    match flag.or(configured) {
        Some(path) => {
            info!(path = %path.display(), "using exam spec file");
            Ok(ExamSpec::load(path)?)
        },
        None => Ok(ExamSpec::default()),
    }
}

pub async fn handle_generate(
    kb: &KnowledgeBase,
    spec: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    let spec = resolve_spec(spec.as_deref(), kb.config.exam.spec.as_deref())?;
    let exam = kb.generator().generate(&spec).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&exam)?);
        return Ok(());
    }

    for (i, q) in exam.questions.iter().enumerate() {
        println!("{}. [{}] {}", i + 1, q.question_type.label(), q.question.trim());
        for line in q.options.lines() {
            println!("   {line}");
        }
    }
    if exam.len() < spec.length() {
        println!(
            "\nOnly {} of {} requested questions were available.",
            exam.len(),
            spec.length()
        );
    }
    Ok(())
}
