//! Plain-text extraction summary.

use crate::key::{AuditCategory, AuditKey};
use extractor_types::Usage;
use std::collections::{BTreeMap, BTreeSet};

const NONE_FOUND: &str = "none found";

pub(crate) fn render_summary(entries: &BTreeMap<AuditKey, BTreeSet<Usage>>) -> String {
    let mut out = String::new();
    out.push_str("Test extraction summary:\n");

    for category in AuditCategory::ALL {
        out.push('\n');
        out.push_str(category.heading());
        out.push('\n');

        let mut section = String::new();
        for (key, usages) in entries.iter().filter(|(k, _)| k.category() == category) {
            render_entry(&mut section, key, usages);
        }
        if section.is_empty() {
            out.push_str(NONE_FOUND);
            out.push('\n');
        } else {
            out.push_str(&section);
        }
    }

    out
}

fn render_entry(out: &mut String, key: &AuditKey, usages: &BTreeSet<Usage>) {
    match key {
        AuditKey::UnmanagedDependency {
            key,
            version,
            test_jar,
        } => {
            let kind = if *test_jar { " (test-jar type)" } else { "" };
            out.push_str(&format!(
                "- Dependency '{}{}' is not managed by Quarkus BOM, going to use '{}' version, this dependency is used at:\n",
                key, kind, version
            ));
            render_usages(out, usages);
        }
        AuditKey::Repository { id, name, url } | AuditKey::PluginRepository { id, name, url } => {
            out.push_str(&format!(
                "- Repository '{}' (with id '{}' and URL '{}') was declared in POM of following projects:\n",
                name.as_deref().unwrap_or("<<no repository name found>>"),
                id,
                url
            ));
            render_usages(out, usages);
        }
        AuditKey::DependencyManagement { managed } => {
            let managed = managed
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            for usage in usages {
                out.push_str(&format!(
                    "- project '{}' located at '{}' manages following dependencies: [{}]\n",
                    usage.module_id, usage.target_path, managed
                ));
            }
        }
        AuditKey::BuildPlugin {
            artifact_id,
            version,
        } => {
            out.push_str(&format!(
                "- Plugin '{}' with version '{}' is used at:\n",
                artifact_id,
                version.as_deref().unwrap_or("<<no version>>")
            ));
            render_usages(out, usages);
        }
    }
}

fn render_usages(out: &mut String, usages: &BTreeSet<Usage>) {
    for usage in usages {
        out.push_str(&format!(
            "  - project '{}' located at '{}'\n",
            usage.module_id, usage.target_path
        ));
    }
}
