//! Clap-free settings for the collect and extract passes.

use camino::Utf8PathBuf;
use extractor_domain::ExtractionRules;

/// Settings for the metadata collection pass.
#[derive(Debug, Clone)]
pub struct CollectSettings {
    /// Working directory shared by every pass.
    pub work_dir: Utf8PathBuf,
    pub rules: ExtractionRules,
}

impl Default for CollectSettings {
    fn default() -> Self {
        Self {
            work_dir: Utf8PathBuf::from("target/extractor-work"),
            rules: ExtractionRules::default(),
        }
    }
}

/// Settings for the per-module pass and finalize.
#[derive(Debug, Clone)]
pub struct ExtractSettings {
    pub work_dir: Utf8PathBuf,
    /// Root of the generated project.
    pub out_dir: Utf8PathBuf,
    /// Finalize as soon as the terminal module has been processed.
    pub auto_finalize: bool,
    pub rules: ExtractionRules,
}

impl Default for ExtractSettings {
    fn default() -> Self {
        Self {
            work_dir: Utf8PathBuf::from("target/extractor-work"),
            out_dir: Utf8PathBuf::from("target/quarkus-tests"),
            auto_finalize: true,
            rules: ExtractionRules::default(),
        }
    }
}

impl ExtractSettings {
    pub fn collect_settings(&self) -> CollectSettings {
        CollectSettings {
            work_dir: self.work_dir.clone(),
            rules: self.rules.clone(),
        }
    }
}
