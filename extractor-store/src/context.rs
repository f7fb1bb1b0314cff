use crate::error::StoreError;
use crate::keys::{self, pass};
use crate::store::WorkingStore;
use extractor_types::{BuildParentSnapshot, ManagementKey, ParentSkeleton};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Immutable metadata collected by earlier passes, loaded once per run and
/// passed by reference into every policy call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolutionContext {
    /// Keys managed by the platform BOM.
    pub bom_managed: BTreeSet<ManagementKey>,
    /// Keys managed by the generated parent's skeleton.
    pub test_parent_managed: BTreeSet<ManagementKey>,
    /// Artifact ids of core extensions.
    pub core_extensions: BTreeSet<String>,
    /// Relative paths of integration-test modules listed directly by the IT parent.
    pub integration_test_modules: BTreeSet<String>,
    /// Lower-cased plugin artifact id to version, from the shared parent.
    pub parent_plugin_versions: BTreeMap<String, String>,
    pub build_parent: Option<BuildParentSnapshot>,
    pub skeleton: ParentSkeleton,
}

impl ResolutionContext {
    /// Load and validate. Fails fast on any missing or empty prior-pass entry;
    /// an empty BOM key set always means the collect pass did not run.
    pub fn load(store: &dyn WorkingStore) -> Result<Self, StoreError> {
        let skeleton: ParentSkeleton =
            read_json(store, keys::PARENT_SKELETON)?.ok_or(StoreError::MissingPriorPass {
                key: keys::PARENT_SKELETON.to_string(),
                pass: pass::INIT,
            })?;

        let test_parent_managed = match store.read(keys::TEST_PARENT_MANAGED_KEYS)? {
            Some(contents) => parse_keys(keys::TEST_PARENT_MANAGED_KEYS, &contents)?,
            None => {
                return Err(StoreError::MissingPriorPass {
                    key: keys::TEST_PARENT_MANAGED_KEYS.to_string(),
                    pass: pass::INIT,
                });
            }
        };

        let bom_contents = read_required(store, keys::BOM_MANAGED_KEYS, pass::COLLECT)?;
        let bom_managed = parse_keys(keys::BOM_MANAGED_KEYS, &bom_contents)?;

        let core_extensions: BTreeSet<String> =
            keys::parse_lines(&read_required(store, keys::CORE_EXTENSIONS, pass::COLLECT)?)
                .map(str::to_string)
                .collect();

        let integration_test_modules: BTreeSet<String> = keys::parse_lines(&read_required(
            store,
            keys::INTEGRATION_TEST_MODULES,
            pass::COLLECT,
        )?)
        .map(normalize_path)
        .collect();

        let parent_plugin_versions = match store.read(keys::PARENT_PLUGIN_VERSIONS)? {
            Some(contents) => parse_plugin_versions(&contents)?,
            None => {
                warn!("no shared-parent plugin versions collected; plugin versions fall back to parent properties");
                BTreeMap::new()
            }
        };

        let build_parent: Option<BuildParentSnapshot> = read_json(store, keys::BUILD_PARENT)?;
        if build_parent.is_none() {
            warn!("no build parent collected; generated parent keeps skeleton properties only");
        }

        let ctx = Self {
            bom_managed,
            test_parent_managed,
            core_extensions,
            integration_test_modules,
            parent_plugin_versions,
            build_parent,
            skeleton,
        };
        ctx.validate()?;

        debug!(
            bom = ctx.bom_managed.len(),
            core_extensions = ctx.core_extensions.len(),
            it_modules = ctx.integration_test_modules.len(),
            parent_plugins = ctx.parent_plugin_versions.len(),
            "loaded resolution context"
        );
        Ok(ctx)
    }

    /// Re-check the invariants `load` enforces; useful for contexts built by hand.
    pub fn validate(&self) -> Result<(), StoreError> {
        let checks = [
            (self.bom_managed.is_empty(), keys::BOM_MANAGED_KEYS),
            (self.core_extensions.is_empty(), keys::CORE_EXTENSIONS),
            (
                self.integration_test_modules.is_empty(),
                keys::INTEGRATION_TEST_MODULES,
            ),
        ];
        for (empty, key) in checks {
            if empty {
                return Err(StoreError::MissingPriorPass {
                    key: key.to_string(),
                    pass: pass::COLLECT,
                });
            }
        }
        Ok(())
    }

    pub fn is_bom_managed(&self, key: &ManagementKey) -> bool {
        self.bom_managed.contains(key)
    }

    /// The skeleton manages artifacts under the generated group, so only the
    /// artifact id is compared.
    pub fn is_test_parent_managed_artifact(&self, artifact_id: &str) -> bool {
        self.test_parent_managed
            .iter()
            .any(|k| k.artifact_id.eq_ignore_ascii_case(artifact_id))
    }

    pub fn is_core_extension(&self, artifact_id: &str) -> bool {
        self.core_extensions.contains(artifact_id)
    }

    pub fn is_direct_it_module(&self, relative_path: &str) -> bool {
        let path = normalize_path(relative_path);
        self.integration_test_modules
            .iter()
            .any(|m| m.eq_ignore_ascii_case(&path))
    }

    pub fn parent_plugin_version(&self, artifact_id: &str) -> Option<&str> {
        self.parent_plugin_versions
            .get(&artifact_id.trim().to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Properties of the generated parent: skeleton, overlaid by the build parent.
    pub fn parent_properties(&self) -> BTreeMap<String, String> {
        let mut props = self.skeleton.properties.clone();
        if let Some(build_parent) = &self.build_parent {
            for (k, v) in &build_parent.properties {
                props.insert(k.clone(), v.clone());
            }
        }
        props
    }

    pub fn has_parent_property(&self, name: &str) -> bool {
        self.skeleton.properties.contains_key(name)
            || self
                .build_parent
                .as_ref()
                .is_some_and(|b| b.properties.contains_key(name))
    }

    pub fn is_managed_by_build_parent(&self, key: &ManagementKey) -> bool {
        self.build_parent
            .as_ref()
            .is_some_and(|b| b.managed_keys.contains(key))
    }
}

fn normalize_path(path: &str) -> String {
    path.trim().trim_end_matches('/').replace('\\', "/")
}

fn read_required(
    store: &dyn WorkingStore,
    key: &str,
    pass: &'static str,
) -> Result<String, StoreError> {
    match store.read(key)? {
        Some(contents) if keys::parse_lines(&contents).next().is_some() => Ok(contents),
        _ => Err(StoreError::MissingPriorPass {
            key: key.to_string(),
            pass,
        }),
    }
}

fn read_json<T: DeserializeOwned>(
    store: &dyn WorkingStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.read(key)? {
        Some(contents) => serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| StoreError::Malformed {
                key: key.to_string(),
                message: e.to_string(),
            }),
        None => Ok(None),
    }
}

fn parse_keys(key: &str, contents: &str) -> Result<BTreeSet<ManagementKey>, StoreError> {
    keys::parse_lines(contents)
        .map(|line| {
            line.parse::<ManagementKey>()
                .map_err(|e| StoreError::Malformed {
                    key: key.to_string(),
                    message: e.to_string(),
                })
        })
        .collect()
}

/// `artifactId;version` lines.
pub(crate) fn parse_plugin_versions(contents: &str) -> Result<BTreeMap<String, String>, StoreError> {
    let mut out = BTreeMap::new();
    for line in keys::parse_lines(contents) {
        let Some((artifact, version)) = line.split_once(keys::ENTRY_SEPARATOR) else {
            return Err(StoreError::Malformed {
                key: keys::PARENT_PLUGIN_VERSIONS.to_string(),
                message: format!("expected 'artifactId{}version', got '{}'", keys::ENTRY_SEPARATOR, line),
            });
        };
        out.insert(
            artifact.trim().to_ascii_lowercase(),
            version.trim().to_string(),
        );
    }
    Ok(out)
}
