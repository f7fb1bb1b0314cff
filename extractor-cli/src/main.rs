mod config;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use config::{CliRunArgs, ConfigMerger, MergedConfig};
use extractor_core::adapters::{FsModuleSource, FsOutput};
use extractor_core::pipeline::{
    self, CollectOutcome, ExtractOutcome, FinalizeOutcome, ModuleAction, PipelineError,
};
use extractor_core::settings::{CollectSettings, ExtractSettings};
use extractor_core::FsStore;
use serde_json::json;
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "test-extractor",
    version,
    about = "Extracts monorepo test modules into a standalone project pinned to published platform artifacts."
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write the generated parent's skeleton into a clean working directory.
    Init(CommonArgs),
    /// Record BOM keys, core extensions, integration-test modules and plugin versions.
    Collect(CollectArgs),
    /// Transform every module descriptor into the generated project.
    Extract(ExtractArgs),
    /// Merge every module's contribution into the generated parent.
    Finalize(FinalizeArgs),
}

#[derive(Debug, Args)]
struct CommonArgs {
    /// Working directory shared by every pass (default: target/extractor-work).
    #[arg(long, env = "EXTRACTOR_WORK_DIR")]
    work_dir: Option<Utf8PathBuf>,

    /// Config file (default: ./extractor.toml when present).
    #[arg(long)]
    config: Option<Utf8PathBuf>,
}

#[derive(Debug, Args)]
struct CollectArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Directory of module descriptor JSON files.
    #[arg(long)]
    input: Option<Utf8PathBuf>,
}

#[derive(Debug, Args)]
struct ExtractArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Directory of module descriptor JSON files.
    #[arg(long)]
    input: Option<Utf8PathBuf>,

    /// Root of the generated project (default: target/quarkus-tests).
    #[arg(long)]
    out_dir: Option<Utf8PathBuf>,

    /// Do not finalize when the terminal module is processed.
    #[arg(long, default_value_t = false)]
    no_auto_finalize: bool,
}

#[derive(Debug, Args)]
struct FinalizeArgs {
    #[command(flatten)]
    common: CommonArgs,

    #[arg(long)]
    out_dir: Option<Utf8PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = real_main(cli) {
        error!("{:#}", e);
        return ExitCode::from(e.exit_code());
    }
    ExitCode::from(0)
}

fn real_main(cli: Cli) -> Result<(), PipelineError> {
    match cli.cmd {
        Command::Init(args) => cmd_init(args),
        Command::Collect(args) => cmd_collect(args),
        Command::Extract(args) => cmd_extract(args),
        Command::Finalize(args) => cmd_finalize(args),
    }
}

fn merged_config(common: &CommonArgs, run: CliRunArgs) -> anyhow::Result<MergedConfig> {
    let file_config = config::load_or_default(common.config.as_deref(), camino::Utf8Path::new("."))?;
    let run = CliRunArgs {
        work_dir: common.work_dir.clone(),
        ..run
    };
    let merged = ConfigMerger::new(file_config).merge_run_args(&run);
    debug!(
        work_dir = %merged.work_dir,
        out_dir = %merged.out_dir,
        input = %merged.input,
        auto_finalize = merged.auto_finalize,
        "merged config"
    );
    Ok(merged)
}

fn extract_settings(merged: MergedConfig) -> ExtractSettings {
    ExtractSettings {
        work_dir: merged.work_dir,
        out_dir: merged.out_dir,
        auto_finalize: merged.auto_finalize,
        rules: merged.rules,
    }
}

fn cmd_init(args: CommonArgs) -> Result<(), PipelineError> {
    let merged = merged_config(&args, CliRunArgs::default())?;
    let store = FsStore::new(merged.work_dir.clone());
    let skeleton = pipeline::run_init(&merged.rules, &store)?;
    print_json(&json!({
        "command": "init",
        "work_dir": merged.work_dir,
        "parent": format!("{}:{}", skeleton.group_id, skeleton.artifact_id),
        "profiles": skeleton.profiles.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
    }));
    Ok(())
}

fn cmd_collect(args: CollectArgs) -> Result<(), PipelineError> {
    let merged = merged_config(
        &args.common,
        CliRunArgs {
            input: args.input.clone(),
            ..Default::default()
        },
    )?;
    let settings = CollectSettings {
        work_dir: merged.work_dir.clone(),
        rules: merged.rules,
    };
    let store = FsStore::new(settings.work_dir.clone());
    let source = FsModuleSource::new(merged.input);
    let outcome = pipeline::run_collect(&settings, &store, &source)?;
    print_json(&collect_json(&outcome));
    Ok(())
}

fn cmd_extract(args: ExtractArgs) -> Result<(), PipelineError> {
    let merged = merged_config(
        &args.common,
        CliRunArgs {
            input: args.input.clone(),
            out_dir: args.out_dir.clone(),
            no_auto_finalize: args.no_auto_finalize,
            ..Default::default()
        },
    )?;
    let source = FsModuleSource::new(merged.input.clone());
    let settings = extract_settings(merged);
    let store = FsStore::new(settings.work_dir.clone());
    let output = FsOutput::new(settings.out_dir.clone());
    let outcome = pipeline::run_extract(&settings, &store, &output, &source)?;
    print_json(&extract_json(&outcome));
    Ok(())
}

fn cmd_finalize(args: FinalizeArgs) -> Result<(), PipelineError> {
    let merged = merged_config(
        &args.common,
        CliRunArgs {
            out_dir: args.out_dir.clone(),
            ..Default::default()
        },
    )?;
    let settings = extract_settings(merged);
    let store = FsStore::new(settings.work_dir.clone());
    let output = FsOutput::new(settings.out_dir.clone());
    let outcome = pipeline::run_finalize(&settings, &store, &output)?;
    print_json(&finalize_json(&outcome));
    Ok(())
}

fn collect_json(outcome: &CollectOutcome) -> serde_json::Value {
    json!({
        "command": "collect",
        "bom_keys": outcome.bom_keys,
        "build_parent": outcome.build_parent,
        "integration_test_modules": outcome.integration_test_modules,
        "parent_plugin_versions": outcome.parent_plugin_versions,
        "core_extensions": outcome.core_extensions.len(),
    })
}

fn extract_json(outcome: &ExtractOutcome) -> serde_json::Value {
    let count = |pred: fn(&ModuleAction) -> bool| outcome.modules.iter().filter(|m| pred(&m.action)).count();
    json!({
        "command": "extract",
        "modules": outcome.modules.len(),
        "written": outcome.written(),
        "detached": count(|a| matches!(a, ModuleAction::Detached { .. })),
        "skipped": count(|a| matches!(a, ModuleAction::Skipped(_) | ModuleAction::Unsupported)),
        "finalized": outcome.finalized.as_ref().map(finalize_json),
    })
}

fn finalize_json(outcome: &FinalizeOutcome) -> serde_json::Value {
    json!({
        "command": "finalize",
        "audit_fragments": outcome.audit_fragments,
        "parent_fragments": outcome.parent_fragments,
        "profiles": outcome
            .parent
            .profiles
            .iter()
            .map(|p| (p.id.clone(), p.modules.len()))
            .collect::<std::collections::BTreeMap<_, _>>(),
    })
}

fn print_json(value: &serde_json::Value) {
    println!("{}", value);
}
