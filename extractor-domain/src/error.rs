use extractor_store::StoreError;
use thiserror::Error;

/// Fatal extraction failures. Every variant names the module it happened in.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(
        "failed to determine plugin '{plugin}' version for module '{module}': not declared by the shared parent, no version property in the generated parent and absent from the resolved build"
    )]
    UnresolvablePluginVersion { plugin: String, module: String },

    #[error("module '{module}' references profile '{profile}' which the parent skeleton does not declare")]
    UnknownProfile { profile: String, module: String },

    #[error("target path '{path}' of module '{module}' is already taken by another module")]
    DuplicateTargetPath { path: String, module: String },

    #[error("module '{module}' at '{path}' has no '{parent}' ancestor to place its tests next to")]
    MissingExtensionsParent {
        module: String,
        path: String,
        parent: String,
    },

    #[error("integration-tests parent '{module}' has no modules in profile '{profile}'")]
    MissingTestModulesProfile { module: String, profile: String },

    #[error("BOM module '{module}' manages no dependencies")]
    EmptyBom { module: String },

    #[error("output '{path}' already exists; the output directory is not clean")]
    OutputExists { path: String },
}

impl ExtractError {
    /// 2 for invocation-order and dirty-directory failures, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        match self {
            ExtractError::Store(e) if e.is_precondition() => 2,
            ExtractError::OutputExists { .. } | ExtractError::DuplicateTargetPath { .. } => 2,
            _ => 1,
        }
    }
}
