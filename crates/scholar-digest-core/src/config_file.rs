use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub gmail: Option<GmailConfig>,
    pub pubmed: Option<PubMedConfig>,
    pub extraction: Option<ExtractionConfig>,
    pub output: Option<OutputConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GmailConfig {
    pub credentials_path: Option<String>,
    pub token_path: Option<String>,
    pub query: Option<String>,
    pub max_results: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PubMedConfig {
    pub esearch_url: Option<String>,
    pub efetch_url: Option<String>,
    pub database: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub scholar_domains: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    pub directory: Option<String>,
}

/// Platform config directory path: `<config_dir>/scholar-digest/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("scholar-digest").join("config.toml"))
}

/// Load config by cascading CWD `.scholar-digest.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".scholar-digest.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparseable config file");
            None
        }
    }
}

fn pick<T: Clone>(overlay: &Option<T>, base: &Option<T>) -> Option<T> {
    overlay.clone().or_else(|| base.clone())
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let bg = base.gmail.unwrap_or_default();
    let og = overlay.gmail.unwrap_or_default();
    let bp = base.pubmed.unwrap_or_default();
    let op = overlay.pubmed.unwrap_or_default();
    let be = base.extraction.unwrap_or_default();
    let oe = overlay.extraction.unwrap_or_default();
    let bo = base.output.unwrap_or_default();
    let oo = overlay.output.unwrap_or_default();

    ConfigFile {
        gmail: Some(GmailConfig {
            credentials_path: pick(&og.credentials_path, &bg.credentials_path),
            token_path: pick(&og.token_path, &bg.token_path),
            query: pick(&og.query, &bg.query),
            max_results: og.max_results.or(bg.max_results),
        }),
        pubmed: Some(PubMedConfig {
            esearch_url: pick(&op.esearch_url, &bp.esearch_url),
            efetch_url: pick(&op.efetch_url, &bp.efetch_url),
            database: pick(&op.database, &bp.database),
            api_key: pick(&op.api_key, &bp.api_key),
        }),
        extraction: Some(ExtractionConfig {
            scholar_domains: pick(&oe.scholar_domains, &be.scholar_domains),
        }),
        output: Some(OutputConfig {
            directory: pick(&oo.directory, &bo.directory),
        }),
    }
}
