use {
    exambank_records::{KnowledgePoint, Question, QuestionType},
    exambank_vector::{KNOWLEDGE_POINTS, MetadataFilter, QUESTIONS, QueryInput},
    serde_json::json,
};

use crate::knowledge_base::KnowledgeBase;

/// Re-index every stored record and prune index entries without a record.
pub async fn handle_sync(kb: &KnowledgeBase) -> anyhow::Result<()> {
    let report = kb.sync.full_resync(&kb.store).await?;
    println!(
        "Indexed {} questions and {} knowledge points, pruned {} stale records.",
        report.questions, report.knowledge_points, report.pruned
    );
    Ok(())
}

pub struct SearchArgs {
    pub query: String,
    pub collection: String,
    pub limit: usize,
    pub question_type: Option<String>,
    pub json: bool,
}

/// Similarity search resolved to whole records.
pub async fn handle_search(kb: &KnowledgeBase, args: SearchArgs) -> anyhow::Result<()> {
    let mut filter = MetadataFilter::new();
    if let Some(t) = &args.question_type {
        let question_type: QuestionType = t.parse().map_err(anyhow::Error::msg)?;
        filter.insert("type".into(), question_type.as_str().into());
    }
    let uuids = kb
        .index
        .query_by_uuid(&args.collection, QueryInput::Text(&args.query), &filter, args.limit)
        .await?;

    match args.collection.as_str() {
        QUESTIONS => {
            let mut found = Vec::with_capacity(uuids.len());
            for uuid in &uuids {
                if let Some(q) = kb.store.get_question_by_uuid(uuid).await? {
                    found.push(q);
                }
            }
            if args.json {
                println!("{}", serde_json::to_string_pretty(&found)?);
            } else {
                print_questions(&found);
            }
        },
        KNOWLEDGE_POINTS => {
            let mut found = Vec::with_capacity(uuids.len());
            for uuid in &uuids {
                if let Some(kp) = kb.store.get_knowledge_point_by_uuid(uuid).await? {
                    found.push(kp);
                }
            }
            if args.json {
                println!("{}", serde_json::to_string_pretty(&found)?);
            } else {
                print_knowledge_points(&found);
            }
        },
        other => {
            // Collections without a backing table: show the raw uuids.
            if args.json {
                println!("{}", json!({ "collection": other, "uuids": uuids }));
            } else {
                for uuid in &uuids {
                    println!("{uuid}");
                }
            }
        },
    }
    Ok(())
}

fn print_questions(questions: &[Question]) {
    if questions.is_empty() {
        println!("No results found.");
        return;
    }
    for (i, q) in questions.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!(
            "[{}] {} / {} / {} ({})",
            i + 1,
            q.question_type.label(),
            q.subject.label(),
            q.difficulty.label(),
            q.uuid
        );
        for line in q.question.lines() {
            println!("  {line}");
        }
        for line in q.options.lines() {
            println!("    {line}");
        }
        println!("  => {}", q.answer.trim());
    }
}

fn print_knowledge_points(points: &[KnowledgePoint]) {
    if points.is_empty() {
        println!("No results found.");
        return;
    }
    for (i, kp) in points.iter().enumerate() {
        println!(
            "[{}] {} / {}: {} ({})",
            i + 1,
            kp.subject.label(),
            kp.difficulty.label(),
            kp.knowledge_point,
            kp.uuid
        );
    }
}

/// Chunk count and the first `limit` chunks of a collection, as JSON.
pub async fn handle_describe(
    kb: &KnowledgeBase,
    collection: &str,
    limit: usize,
) -> anyhow::Result<()> {
    let summary = kb.index.describe_collection(collection, limit).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Empty the vector index and both tables.
pub async fn handle_reset(kb: &KnowledgeBase, yes: bool) -> anyhow::Result<()> {
    if !yes {
        anyhow::bail!("refusing to reset without --yes");
    }
    kb.index.reset_all().await?;
    kb.store.reset_tables().await?;
    println!("Knowledge base reset.");
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        exambank_config::{DatabaseConfig, ExambankConfig, VectorConfig},
        exambank_records::Subject,
    };

    async fn open(allow_reset: bool) -> KnowledgeBase {
        KnowledgeBase::open(ExambankConfig {
            database: DatabaseConfig {
                url: "sqlite::memory:".into(),
                max_connections: 1,
            },
            vector: VectorConfig {
                url: "sqlite::memory:".into(),
                allow_reset,
                ..VectorConfig::default()
            },
            ..ExambankConfig::default()
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn reset_needs_confirmation_and_permission() {
        let kb = open(false).await;
        assert!(handle_reset(&kb, false).await.is_err());
        assert!(handle_reset(&kb, true).await.is_err());

        let kb = open(true).await;
        kb.store
            .save_question(Question::new(
                QuestionType::SingleChoice,
                Subject::Mix,
                "stem",
                "answer",
            ))
            .await
            .unwrap();
        handle_reset(&kb, true).await.unwrap();
        assert_eq!(kb.store.count_questions().await.unwrap(), 0);
        assert!(kb.index.uuids_in(QUESTIONS).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_rejects_unknown_question_types() {
        let kb = open(false).await;
        let result = handle_search(&kb, SearchArgs {
            query: "stack".into(),
            collection: QUESTIONS.into(),
            limit: 3,
            question_type: Some("essay".into()),
            json: true,
        })
        .await;
        assert!(result.is_err());
    }
}
