// ⚙️ Configuration - spendalyzer.toml with defaults for every key

use crate::geo::ZipLookup;
use crate::ledger::{load_statement, TransactionTable};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "spendalyzer.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ingest: IngestSection,
    pub analysis: AnalysisSection,
    pub geo: GeoSection,
    pub classifier: ClassifierSection,
    pub server: ServerSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSection {
    /// Rows shown in an upload preview
    pub page_size: usize,
    /// Largest accepted upload body, in bytes
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSection {
    pub ranked: usize,
    pub sma_window: usize,
    pub alpha: f64,
    pub necessities: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoSection {
    /// GeoNames-format postal code table (tab separated). None = no coordinates.
    pub postal_codes: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSection {
    /// Labelled transactions to train on. None = train on the upload itself.
    pub training_csv: Option<PathBuf>,
    /// Leading rows held out to measure accuracy
    pub holdout: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: String,
}

impl Default for IngestSection {
    fn default() -> Self {
        Self {
            page_size: 5,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Default for AnalysisSection {
    fn default() -> Self {
        Self {
            ranked: 5,
            sma_window: 4,
            alpha: 0.2,
            necessities: crate::necessity::DEFAULT_NECESSITIES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for ClassifierSection {
    fn default() -> Self {
        Self {
            training_csv: None,
            holdout: 100,
        }
    }
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Load config from `path`, falling back to defaults when the file is absent.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: Config = toml::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    tracing::info!(path = %path.display(), "loaded config");
    Ok(cfg)
}

impl Config {
    /// Reject settings that would make every forecast meaningless.
    pub fn validate(&self) -> Result<()> {
        let analysis = &self.analysis;
        if !(analysis.alpha > 0.0 && analysis.alpha <= 1.0) {
            bail!("[analysis].alpha must be in (0, 1], got {}", analysis.alpha);
        }
        if analysis.sma_window == 0 {
            bail!("[analysis].sma_window must be at least 1");
        }
        if !(crate::analysis::MIN_RANKED..=crate::analysis::MAX_RANKED).contains(&analysis.ranked) {
            bail!(
                "[analysis].ranked must be between {} and {}, got {}",
                crate::analysis::MIN_RANKED,
                crate::analysis::MAX_RANKED,
                analysis.ranked
            );
        }
        Ok(())
    }

    /// Postal code table from `[geo]`, or an empty lookup when none is configured.
    pub fn zip_lookup(&self) -> Result<ZipLookup> {
        match &self.geo.postal_codes {
            Some(path) => ZipLookup::from_path(path),
            None => {
                tracing::warn!("no postal code table configured; geo charts will show a notice");
                Ok(ZipLookup::new())
            }
        }
    }

    /// Labelled classifier training data from `[classifier]`, if configured.
    pub fn training_table(&self) -> Result<Option<TransactionTable>> {
        self.classifier
            .training_csv
            .as_deref()
            .map(load_statement)
            .transpose()
    }
}

pub fn save_config(path: &Path, cfg: &Config) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn init_config(path: &Path) -> Result<()> {
    if path.exists() {
        println!("Config already exists: {}", path.display());
        return Ok(());
    }
    save_config(path, &Config::default())?;
    println!("Wrote {}", path.display());
    Ok(())
}
