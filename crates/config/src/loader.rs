use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{
    env_subst::substitute_env,
    error::{Context, Error, Result},
    schema::ExambankConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "exambank.toml",
    "exambank.yaml",
    "exambank.yml",
    "exambank.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<ExambankConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Find a config file in the standard locations.
///
/// Search order:
/// 1. `./exambank.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/exambank/exambank.{toml,yaml,yml,json}` (user-global)
pub fn discover_config() -> Option<PathBuf> {
    find_config_in(Path::new(".")).or_else(|| find_config_in(&config_dir()?))
}

/// Load the explicitly requested file, else the discovered one, else defaults.
///
/// A file that exists but does not parse is an error, never a silent
/// fallback to defaults.
pub fn load_or_discover(path: Option<&Path>) -> Result<ExambankConfig> {
    let found = match path {
        Some(path) => Some(path.to_path_buf()),
        None => discover_config(),
    };
    load_found(found.as_deref())
}

fn load_found(found: Option<&Path>) -> Result<ExambankConfig> {
    match found {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(path).with_context(|| format!("config file {}", path.display()))
        },
        None => {
            debug!("no config file found, using defaults");
            Ok(ExambankConfig::default())
        },
    }
}

fn find_config_in(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/exambank/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "exambank").map(|d| d.config_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> Result<ExambankConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        other => Err(Error::UnsupportedFormat {
            extension: other.to_string(),
        }),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::schema::KnowledgePointStrategy};

    #[test]
    fn loads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exambank.toml");
        std::fs::write(
            &path,
            "[vector]\nover_fetch = 7\n\n[exam]\nknowledge_point_strategy = \"keyword\"\n",
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.vector.over_fetch, 7);
        assert_eq!(
            cfg.exam.knowledge_point_strategy,
            KnowledgePointStrategy::Keyword
        );
    }

    #[test]
    fn loads_yaml_and_json() {
        let dir = tempfile::tempdir().unwrap();

        let yaml = dir.path().join("exambank.yaml");
        std::fs::write(&yaml, "vector:\n  max_length: 120\n  overlap: 10\n").unwrap();
        assert_eq!(load_config(&yaml).unwrap().vector.max_length, 120);

        let json = dir.path().join("exambank.json");
        std::fs::write(&json, r#"{"database": {"url": "sqlite::memory:"}}"#).unwrap();
        assert_eq!(load_config(&json).unwrap().database.url, "sqlite::memory:");
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exambank.ini");
        std::fs::write(&path, "x=1").unwrap();
        assert!(matches!(
            load_config(&path),
            Err(Error::UnsupportedFormat { extension }) if extension == "ini"
        ));
    }

    #[test]
    fn discovered_file_that_fails_to_parse_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exambank.toml");
        std::fs::write(&path, "[vector\nover_fetch = ").unwrap();

        let found = find_config_in(dir.path());
        assert_eq!(found.as_deref(), Some(path.as_path()));
        let err = load_found(found.as_deref()).unwrap_err();
        assert!(err.to_string().contains(&path.display().to_string()));

        let empty = tempfile::tempdir().unwrap();
        assert!(find_config_in(empty.path()).is_none());
        assert_eq!(
            load_found(None).unwrap().vector.over_fetch,
            ExambankConfig::default().vector.over_fetch
        );
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = load_or_discover(Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
