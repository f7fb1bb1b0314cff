use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A version as it will appear in a generated descriptor: either a literal
/// or a `${property}` placeholder resolved by the generated parent.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VersionRef {
    Literal(String),
    Property(String),
}

impl VersionRef {
    pub fn literal(version: impl Into<String>) -> Self {
        Self::Literal(version.into())
    }

    pub fn property(name: impl Into<String>) -> Self {
        Self::Property(name.into())
    }

    /// Parses `${name}` as a property reference; anything else is a literal.
    pub fn parse(raw: &str) -> Self {
        match raw
            .strip_prefix("${")
            .and_then(|rest| rest.strip_suffix('}'))
        {
            Some(name) if !name.is_empty() && !name.contains('$') => Self::property(name),
            _ => Self::literal(raw),
        }
    }

    pub fn is_property(&self) -> bool {
        matches!(self, Self::Property(_))
    }
}

impl fmt::Display for VersionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(v) => f.write_str(v),
            Self::Property(name) => write!(f, "${{{}}}", name),
        }
    }
}

impl Serialize for VersionRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// Why a dependency was pinned instead of left to a BOM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    CommunityFallback,
    PlatformFallback,
    ResolvedPin,
    TestFrameworkFallback,
    ProductizedFallback,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CommunityFallback => "community-fallback",
            Self::PlatformFallback => "platform-fallback",
            Self::ResolvedPin => "resolved-pin",
            Self::TestFrameworkFallback => "test-framework-fallback",
            Self::ProductizedFallback => "productized-fallback",
        }
    }
}

/// Outcome of resolving one dependency version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VersionDecision {
    /// Already covered by a BOM or the generated parent.
    Unmanaged,
    Pinned {
        version: VersionRef,
        reason: DecisionReason,
    },
}

impl VersionDecision {
    pub fn pinned(version: VersionRef, reason: DecisionReason) -> Self {
        Self::Pinned { version, reason }
    }

    pub fn is_unmanaged(&self) -> bool {
        matches!(self, Self::Unmanaged)
    }

    pub fn version(&self) -> Option<&VersionRef> {
        match self {
            Self::Unmanaged => None,
            Self::Pinned { version, .. } => Some(version),
        }
    }

    pub fn reason(&self) -> Option<DecisionReason> {
        match self {
            Self::Unmanaged => None,
            Self::Pinned { reason, .. } => Some(*reason),
        }
    }
}

/// Role of a module in the extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModuleClassification {
    ExtensionDeploymentTestModule,
    ExtensionSupplementaryModule,
    IntegrationTestModule,
    IntegrationTestSubmodule,
    CopyAsIs,
    Unsupported,
    BomSource,
    BuildParentSource,
    OrdinarySkip,
}

impl ModuleClassification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExtensionDeploymentTestModule => "EXTENSION_DEPLOYMENT_TEST_MODULE",
            Self::ExtensionSupplementaryModule => "EXTENSION_SUPPLEMENTARY_MODULE",
            Self::IntegrationTestModule => "INTEGRATION_TEST_MODULE",
            Self::IntegrationTestSubmodule => "INTEGRATION_TEST_SUBMODULE",
            Self::CopyAsIs => "COPY_AS_IS",
            Self::Unsupported => "UNSUPPORTED",
            Self::BomSource => "BOM_SOURCE",
            Self::BuildParentSource => "BUILD_PARENT_SOURCE",
            Self::OrdinarySkip => "ORDINARY_SKIP",
        }
    }

    pub fn is_extension_test(&self) -> bool {
        matches!(
            self,
            Self::ExtensionDeploymentTestModule | Self::ExtensionSupplementaryModule
        )
    }

    pub fn is_integration_test(&self) -> bool {
        matches!(
            self,
            Self::IntegrationTestModule | Self::IntegrationTestSubmodule
        )
    }
}

impl fmt::Display for ModuleClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_ref_parses_placeholders() {
        assert_eq!(
            VersionRef::parse("${core.quarkus.version}"),
            VersionRef::property("core.quarkus.version")
        );
        assert_eq!(VersionRef::parse("3.20.0"), VersionRef::literal("3.20.0"));
        assert_eq!(VersionRef::parse("${a}-${b}"), VersionRef::literal("${a}-${b}"));
    }

    #[test]
    fn version_ref_displays_placeholder() {
        assert_eq!(
            VersionRef::property("community.quarkus.version").to_string(),
            "${community.quarkus.version}"
        );
    }

    #[test]
    fn decision_serializes_with_kind_tag() {
        let decision = VersionDecision::pinned(
            VersionRef::literal("1.2.3"),
            DecisionReason::ResolvedPin,
        );
        let value = serde_json::to_value(&decision).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"kind": "pinned", "version": "1.2.3", "reason": "resolved_pin"})
        );
        let unmanaged = serde_json::to_value(VersionDecision::Unmanaged).unwrap();
        assert_eq!(unmanaged, serde_json::json!({"kind": "unmanaged"}));
    }

    #[test]
    fn classification_serializes_screaming_snake() {
        let value = serde_json::to_value(ModuleClassification::CopyAsIs).unwrap();
        assert_eq!(value, serde_json::json!("COPY_AS_IS"));
        assert_eq!(
            ModuleClassification::ExtensionDeploymentTestModule.to_string(),
            "EXTENSION_DEPLOYMENT_TEST_MODULE"
        );
    }
}
