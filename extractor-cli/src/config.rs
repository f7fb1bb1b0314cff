//! Configuration file loading for test-extractor.
//!
//! Discovers and loads `extractor.toml` from the current directory.
//! Merges config file settings with CLI arguments (CLI takes precedence).

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use extractor_domain::ExtractionRules;
use fs_err as fs;
use serde::Deserialize;
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "extractor.toml";

const DEFAULT_WORK_DIR: &str = "target/extractor-work";
const DEFAULT_OUT_DIR: &str = "target/quarkus-tests";
const DEFAULT_INPUT_DIR: &str = "target/extractor-modules";

/// Top-level configuration from extractor.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Rule tables; tables not named keep their built-in values.
    pub rules: ExtractionRules,

    pub run: RunConfig,
}

/// Run section of the config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Working directory shared by every pass.
    pub work_dir: Option<Utf8PathBuf>,

    /// Root of the generated project.
    pub out_dir: Option<Utf8PathBuf>,

    /// Directory of module descriptor JSON files.
    pub input: Option<Utf8PathBuf>,

    /// Finalize when the terminal module is processed.
    pub auto_finalize: Option<bool>,
}

/// Discover the extractor.toml config file in `dir`.
pub fn discover_config(dir: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

pub fn load_config(path: &Utf8Path) -> anyhow::Result<ExtractorConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

pub fn parse_config(contents: &str) -> anyhow::Result<ExtractorConfig> {
    let config: ExtractorConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load the explicit config file, or discover one in `dir`, or fall back to
/// defaults.
pub fn load_or_default(explicit: Option<&Utf8Path>, dir: &Utf8Path) -> anyhow::Result<ExtractorConfig> {
    match explicit {
        Some(path) => load_config(path),
        None => match discover_config(dir) {
            Some(path) => load_config(&path),
            None => Ok(ExtractorConfig::default()),
        },
    }
}

/// Run options given on the command line. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct CliRunArgs {
    pub work_dir: Option<Utf8PathBuf>,
    pub out_dir: Option<Utf8PathBuf>,
    pub input: Option<Utf8PathBuf>,
    pub no_auto_finalize: bool,
}

/// Configuration after merging the file with CLI arguments.
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub work_dir: Utf8PathBuf,
    pub out_dir: Utf8PathBuf,
    pub input: Utf8PathBuf,
    pub auto_finalize: bool,
    pub rules: ExtractionRules,
}

/// Builder for merging config file with CLI arguments.
pub struct ConfigMerger {
    config: ExtractorConfig,
}

impl ConfigMerger {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// CLI values win over `[run]`; `[run]` wins over built-in defaults.
    pub fn merge_run_args(self, cli: &CliRunArgs) -> MergedConfig {
        let run = self.config.run;
        MergedConfig {
            work_dir: cli
                .work_dir
                .clone()
                .or(run.work_dir)
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_WORK_DIR)),
            out_dir: cli
                .out_dir
                .clone()
                .or(run.out_dir)
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_OUT_DIR)),
            input: cli
                .input
                .clone()
                .or(run.input)
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_INPUT_DIR)),
            auto_finalize: !cli.no_auto_finalize && run.auto_finalize.unwrap_or(true),
            rules: self.config.rules,
        }
    }
}
