//! Port traits for the I/O the pipeline performs.

use camino::Utf8Path;
use extractor_types::ModuleDescriptor;

/// Source of module descriptors produced by the build-graph driver.
pub trait ModuleSource {
    /// Descriptors in processing order.
    fn load_modules(&self) -> anyhow::Result<Vec<ModuleDescriptor>>;
}

/// Files of the generated project. Paths are relative to the output root.
pub trait OutputPort {
    fn exists(&self, path: &Utf8Path) -> anyhow::Result<bool>;

    fn read(&self, path: &Utf8Path) -> anyhow::Result<Option<String>>;

    /// Write `contents`, creating parent directories and replacing any
    /// existing file.
    fn write(&self, path: &Utf8Path, contents: &str) -> anyhow::Result<()>;
}
