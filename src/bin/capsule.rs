//! Capsule Tool
//!
//! Generate, validate, run and package simulator experiments.
//!
//! Axis arguments take the compact parameter syntax: `8,16`, `1-4:1`,
//! `1-4:1 + 16`. Generated experiments are appended to a selection
//! manifest (JSON) that the later stages read.

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use repro_capsule::archive::{create_capsule_archive, export_all, DEFAULT_ARCHIVE_NAME};
use repro_capsule::collect::collect_experiment_files;
use repro_capsule::compare::compare_all_outputs;
use repro_capsule::config::{CapsuleConfig, CollisionPolicy};
use repro_capsule::document::to_pretty_string;
use repro_capsule::experiment::{ExperimentGenerator, ExperimentParams, SelectionEntry};
use repro_capsule::generation::GenerationReport;
use repro_capsule::params::{
    clean_selection, filter_by_keyword, list_json_files, parse_input, ExpansionMode,
};
use repro_capsule::report::{generate_readme, RunStats, SystemInfo};
use repro_capsule::runner::ExperimentRunner;
use repro_capsule::topology::{PowerModelSpec, TopologyGenerator, TopologyOptions, TopologyParams};
use repro_capsule::validate::{validate_experiments, ValidationStatus};

#[derive(Parser, Debug)]
#[command(name = "capsule", version, about = "Reproducibility capsules for datacenter simulation")]
struct Cli {
    /// Config file (JSON); defaults apply for missing fields
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Workspace root, overriding the config
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Selection manifest shared between stages
    #[arg(long, global = true, default_value = "selection.json")]
    manifest: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate topology variants
    Topologies(TopologyArgs),
    /// Generate experiment variants and append them to the manifest
    Experiments(ExperimentArgs),
    /// Check that every manifest experiment references existing files
    Validate,
    /// List the files a capsule of the manifest needs
    Collect {
        /// Write the list here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Compare original outputs against their `repr_` reproductions
    Compare,
    /// Run every manifest experiment through the simulator runner
    Run {
        /// Where to write run timings and host info
        #[arg(long, default_value = "run_stats.json")]
        stats: PathBuf,
    },
    /// Write the capsule README
    Report {
        /// Run timings written by `capsule run`
        #[arg(long, default_value = "run_stats.json")]
        stats: PathBuf,
        /// README destination
        #[arg(long, default_value = "README.md")]
        out: PathBuf,
    },
    /// Package the capsule as a zip archive
    Export {
        /// Archive destination
        #[arg(long, default_value = DEFAULT_ARCHIVE_NAME)]
        out: PathBuf,
        /// README to include
        #[arg(long, default_value = "README.md")]
        readme: PathBuf,
        /// Pack every workspace folder uncompressed instead of only what the manifest needs
        #[arg(long)]
        all: bool,
    },
}

#[derive(Args, Debug)]
struct TopologyArgs {
    /// Base topology, relative to the topology root
    #[arg(long)]
    template: Option<PathBuf>,
    /// Output base name
    #[arg(long)]
    name: Option<String>,
    #[arg(long, default_value = "")]
    cores: String,
    #[arg(long, default_value = "")]
    core_speeds: String,
    #[arg(long, default_value = "")]
    memory: String,
    #[arg(long, default_value = "")]
    hosts: String,
    /// Carbon trace files under the carbon traces folder
    #[arg(long, default_value = "")]
    carbon: String,
    #[arg(long, default_value = "")]
    battery_capacity: String,
    #[arg(long, default_value = "")]
    starting_threshold: String,
    /// Fraction of capacity
    #[arg(long, default_value = "")]
    charging_speed: String,
    #[arg(long, default_value = "")]
    expected_lifetime: String,
    /// Attach battery blocks
    #[arg(long)]
    battery: bool,
    /// Power model type, e.g. `linear`
    #[arg(long)]
    power_model: Option<String>,
    #[arg(long)]
    idle_power: Option<f64>,
    #[arg(long)]
    max_power: Option<f64>,
    #[arg(long)]
    power: Option<f64>,
    /// Every combination instead of index-aligned iteration
    #[arg(long)]
    cartesian: bool,
    /// Last variant wins on a name collision
    #[arg(long)]
    overwrite: bool,
}

#[derive(Args, Debug)]
struct ExperimentArgs {
    /// Base experiment, relative to the experiments root
    #[arg(long)]
    template: Option<PathBuf>,
    #[arg(long)]
    name: Option<String>,
    /// Topology files; `[Select All]` takes every topology on disk
    #[arg(long, value_delimiter = ',')]
    topologies: Vec<String>,
    /// Keep only topologies whose path contains this keyword
    #[arg(long)]
    topology_filter: Option<String>,
    #[arg(long, value_delimiter = ',')]
    workloads: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    failures: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    policies: Vec<String>,
    #[arg(long)]
    checkpoint_interval: Option<String>,
    #[arg(long)]
    checkpoint_duration: Option<String>,
    #[arg(long)]
    checkpoint_scaling: Option<String>,
    #[arg(long, default_value = "")]
    export_interval: String,
    #[arg(long, default_value = "")]
    print_frequency: String,
    #[arg(long, value_delimiter = ',')]
    files_to_export: Vec<String>,
    #[arg(long, default_value = "")]
    seeds: String,
    #[arg(long, default_value = "")]
    runs: String,
    #[arg(long, default_value = "")]
    max_failures: String,
    #[arg(long)]
    output_folder: Option<String>,
    /// One experiment per topology folder
    #[arg(long)]
    group_by_folder: bool,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(false).init();
}

fn load_config(cli: &Cli) -> anyhow::Result<CapsuleConfig> {
    let mut config = match &cli.config {
        Some(path) => CapsuleConfig::load(path)?,
        None => CapsuleConfig::default(),
    };
    if let Some(root) = &cli.root {
        config.workspace_root.clone_from(root);
    }
    Ok(config)
}

fn read_manifest(path: &Path) -> anyhow::Result<Vec<SelectionEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing manifest {}", path.display()))
}

fn write_manifest(path: &Path, entries: &[SelectionEntry]) -> anyhow::Result<()> {
    std::fs::write(path, to_pretty_string(&entries)?).with_context(|| format!("writing {}", path.display()))
}

/// Append freshly written entries, replacing queued entries of the same name.
fn merge_manifest(entries: &mut Vec<SelectionEntry>, written: Vec<SelectionEntry>) {
    entries.retain(|e| !written.iter().any(|w| w.name == e.name));
    entries.extend(written);
}

/// Resolve a file-list argument: `[Select All]` expands to `all`; an empty
/// list keeps the template's references.
fn selection(chosen: &[String], all: impl FnOnce() -> Vec<String>) -> Option<Vec<String>> {
    if chosen.is_empty() {
        return None;
    }
    clean_selection(chosen, &all())
}

fn topologies(config: &CapsuleConfig, args: TopologyArgs) -> anyhow::Result<()> {
    let config = CapsuleConfig {
        collision_policy: if args.overwrite {
            CollisionPolicy::Overwrite
        } else {
            config.collision_policy
        },
        ..config.clone()
    };

    let params = TopologyParams {
        core_counts: parse_input(&args.cores),
        core_speeds: parse_input(&args.core_speeds),
        memory_sizes: parse_input(&args.memory),
        host_counts: parse_input(&args.hosts),
        carbon_traces: parse_input(&args.carbon),
        battery_capacities: parse_input(&args.battery_capacity),
        starting_thresholds: parse_input(&args.starting_threshold),
        charging_speeds: parse_input(&args.charging_speed),
        expected_lifetimes: parse_input(&args.expected_lifetime),
    };
    let options = TopologyOptions {
        name: args.name,
        include_battery: args.battery,
        power_model: args.power_model.map(|model_type| PowerModelSpec {
            model_type,
            idle_power: args.idle_power,
            max_power: args.max_power,
            power: args.power,
        }),
        mode: if args.cartesian {
            ExpansionMode::Cartesian
        } else {
            ExpansionMode::IndexAligned
        },
    };

    let report = TopologyGenerator::new(&config).generate(args.template.as_deref(), &params, &options)?;
    for path in &report.written {
        println!("{path}");
    }
    if !report.is_complete() {
        bail!("{} topologies could not be written", report.failed.len());
    }
    Ok(())
}

fn experiments(config: &CapsuleConfig, manifest: &Path, args: ExperimentArgs) -> anyhow::Result<()> {
    let mut topologies = selection(&args.topologies, || list_json_files(config.topologies_dir()));
    if let (Some(files), Some(keyword)) = (topologies.as_mut(), args.topology_filter.as_deref()) {
        *files = filter_by_keyword(files, keyword);
    }

    let params = ExperimentParams {
        name: args.name,
        topologies,
        workloads: selection(&args.workloads, Vec::new),
        failures: selection(&args.failures, Vec::new),
        policies: args.policies,
        checkpoint_interval: args.checkpoint_interval,
        checkpoint_duration: args.checkpoint_duration,
        checkpoint_scaling: args.checkpoint_scaling,
        export_intervals: parse_input(&args.export_interval),
        print_frequencies: parse_input(&args.print_frequency),
        files_to_export: args.files_to_export,
        seeds: parse_input(&args.seeds),
        runs: parse_input(&args.runs),
        max_failures: parse_input(&args.max_failures),
        output_folder: args.output_folder,
        group_by_topology_folder: args.group_by_folder,
    };

    let GenerationReport { written, failed } =
        ExperimentGenerator::new(config).generate(args.template.as_deref(), &params)?;

    let mut entries = read_manifest(manifest)?;
    for entry in &written {
        println!("{}", entry.name);
    }
    merge_manifest(&mut entries, written);
    write_manifest(manifest, &entries)?;
    info!(manifest = %manifest.display(), queued = entries.len(), "manifest updated");

    if !failed.is_empty() {
        bail!("{} experiments could not be written", failed.len());
    }
    Ok(())
}

fn validate(config: &CapsuleConfig, manifest: &Path) -> anyhow::Result<()> {
    let entries = read_manifest(manifest)?;
    let report = validate_experiments(config, &entries);
    for outcome in report.failures() {
        match &outcome.status {
            ValidationStatus::Unreadable(reason) => println!("{}: unreadable: {reason}", outcome.name),
            ValidationStatus::Invalid(problems) => {
                for problem in problems {
                    println!("{}: {problem}", outcome.name);
                }
            }
            ValidationStatus::Valid => {}
        }
    }
    if !report.all_valid() {
        bail!("validation failed");
    }
    println!("{} experiments valid", report.outcomes.len());
    Ok(())
}

fn collect(config: &CapsuleConfig, manifest: &Path, out: Option<PathBuf>) -> anyhow::Result<()> {
    let entries = read_manifest(manifest)?;
    let files: Vec<String> = collect_experiment_files(config, &entries).into_iter().collect();
    let listing = files.join("\n");
    match out {
        Some(path) => {
            std::fs::write(&path, listing + "\n").with_context(|| format!("writing {}", path.display()))?;
            info!(files = files.len(), path = %path.display(), "file list written");
        }
        None => println!("{listing}"),
    }
    Ok(())
}

fn compare(config: &CapsuleConfig) -> anyhow::Result<()> {
    let comparisons = compare_all_outputs(config);
    for comparison in &comparisons {
        let verdict = if comparison.matches() { "match" } else { "DIFFER" };
        println!(
            "{verdict}: {} vs {}",
            comparison.original.display(),
            comparison.reproduced.display()
        );
        for (file, reason) in &comparison.unreadable {
            println!("  unreadable {file}: {reason}");
        }
        for file in &comparison.mismatched {
            println!("  mismatched {file}");
        }
        for file in &comparison.missing {
            println!("  missing {file}");
        }
        for file in &comparison.extra {
            println!("  extra {file}");
        }
    }
    if comparisons.iter().any(|c| !c.matches()) {
        bail!("reproduced outputs differ");
    }
    Ok(())
}

fn run(config: &CapsuleConfig, manifest: &Path, stats_path: &Path) -> anyhow::Result<()> {
    let mut queue = read_manifest(manifest)?;
    let timings = ExperimentRunner::new(config).run_queue(&mut queue);
    let stats = RunStats {
        experiments: timings,
        system_info: SystemInfo::collect(),
    };
    std::fs::write(stats_path, to_pretty_string(&stats)?)
        .with_context(|| format!("writing {}", stats_path.display()))?;
    Ok(())
}

fn report(config: &CapsuleConfig, manifest: &Path, stats_path: &Path, out: &Path) -> anyhow::Result<()> {
    let entries = read_manifest(manifest)?;
    let stats: RunStats = if stats_path.exists() {
        let text = std::fs::read_to_string(stats_path)?;
        serde_json::from_str(&text).with_context(|| format!("parsing {}", stats_path.display()))?
    } else {
        warn!(path = %stats_path.display(), "no run stats, reporting without timings");
        RunStats {
            experiments: Vec::new(),
            system_info: SystemInfo::collect(),
        }
    };
    let path = generate_readme(config, &entries, &stats, out)?;
    println!("{}", path.display());
    Ok(())
}

fn export(config: &CapsuleConfig, manifest: &Path, out: &Path, readme: &Path, all: bool) -> anyhow::Result<()> {
    let summary = if all {
        export_all(config, Some(readme), out)?
    } else {
        let entries = read_manifest(manifest)?;
        if entries.is_empty() {
            bail!("manifest {} lists no experiments", manifest.display());
        }
        create_capsule_archive(config, &entries, Some(readme), out)?
    };
    println!("{} ({} files)", summary.path.display(), summary.entries.len());
    Ok(())
}

fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let manifest = cli.manifest.as_path();
    match cli.command {
        Commands::Topologies(args) => topologies(&config, args),
        Commands::Experiments(args) => experiments(&config, manifest, args),
        Commands::Validate => validate(&config, manifest),
        Commands::Collect { out } => collect(&config, manifest, out),
        Commands::Compare => compare(&config),
        Commands::Run { stats } => run(&config, manifest, &stats),
        Commands::Report { stats, out } => report(&config, manifest, &stats, &out),
        Commands::Export { out, readme, all } => export(&config, manifest, &out, &readme, all),
    }
}

fn main() {
    init_logging();

    let cli = Cli::parse();

    if let Err(e) = execute(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
