use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Records(#[from] exambank_records::Error),

    #[error(transparent)]
    Vector(#[from] exambank_vector::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("keyword extraction failed: {message}")]
    KeywordExtraction { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid TOML exam spec: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid YAML exam spec: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid JSON exam spec: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported exam spec format: .{extension}")]
    UnsupportedFormat { extension: String },

    #[error("invalid exam spec: {message}")]
    InvalidSpec { message: String },
}

impl Error {
    pub fn keyword(message: impl Into<String>) -> Self {
        Self::KeywordExtraction {
            message: message.into(),
        }
    }

    pub fn invalid_spec(message: impl Into<String>) -> Self {
        Self::InvalidSpec {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
