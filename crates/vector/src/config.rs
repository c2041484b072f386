use std::collections::BTreeMap;

/// Collection holding question stems, answers and options.
pub const QUESTIONS: &str = "questions";
/// Collection holding knowledge point documents.
pub const KNOWLEDGE_POINTS: &str = "knowledge_points";

/// Configuration for the vector index client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorIndexConfig {
    /// Maximum chunk length in characters.
    pub max_length: usize,
    /// Characters shared by consecutive chunks.
    pub overlap: usize,
    /// Raw hits requested beyond `n_results` by [`query_by_uuid`], since
    /// several chunks can resolve to the same record.
    ///
    /// [`query_by_uuid`]: crate::VectorIndexClient::query_by_uuid
    pub over_fetch: usize,
    /// Whether [`reset_all`](crate::VectorIndexClient::reset_all) may run.
    pub allow_reset: bool,
    /// Collection name to declared metadata fields.
    pub collections: BTreeMap<String, Vec<String>>,
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        let fields = |names: &[&str]| -> Vec<String> {
            names.iter().map(|s| (*s).to_string()).collect()
        };
        Self {
            max_length: 200,
            overlap: 20,
            over_fetch: 100,
            allow_reset: false,
            collections: BTreeMap::from([
                (
                    QUESTIONS.to_string(),
                    fields(&[
                        "uuid",
                        "document",
                        "type",
                        "subject",
                        "question",
                        "options",
                        "answer",
                        "difficulty",
                        "source",
                        "exam_point",
                    ]),
                ),
                (
                    KNOWLEDGE_POINTS.to_string(),
                    fields(&[
                        "uuid",
                        "document",
                        "subject",
                        "knowledge_point",
                        "difficulty",
                        "source",
                        "exam_point",
                    ]),
                ),
            ]),
        }
    }
}
