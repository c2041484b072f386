use std::path::PathBuf;

use clap::Subcommand;

use crate::knowledge_base::KnowledgeBase;

#[derive(Subcommand)]
pub enum ImportAction {
    /// Import questions from a .csv, .xlsx or .json file.
    Questions {
        /// File to import.
        path: PathBuf,
    },
    /// Import knowledge points from a .csv, .xlsx or .json file.
    KnowledgePoints {
        /// File to import.
        path: PathBuf,
    },
}

/// Rows are validated up front; every saved record is indexed as it is
/// written.
pub async fn handle_import(kb: &KnowledgeBase, action: ImportAction) -> anyhow::Result<()> {
    match action {
        ImportAction::Questions { path } => {
            let questions = exambank_records::load_questions(&path)?;
            let saved = kb.store.save_questions(questions).await?;
            println!("Imported {} questions from {}.", saved.len(), path.display());
        },
        ImportAction::KnowledgePoints { path } => {
            let points = exambank_records::load_knowledge_points(&path)?;
            let saved = kb.store.save_knowledge_points(points).await?;
            println!(
                "Imported {} knowledge points from {}.",
                saved.len(),
                path.display()
            );
        },
    }
    Ok(())
}
