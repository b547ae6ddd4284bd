//! Generate Capsule: topologies to archive in one scratch workspace
//!
//! Walks the whole pipeline without the simulator:
//! 1. Expand compact axis specs into topology variants
//! 2. Generate seeded experiments grouped by topology folder
//! 3. Validate references and collect the capsule file set
//! 4. Render the README and pack the capsule archive
//!
//! Run with: cargo run --example generate_capsule

use repro_capsule::archive::create_capsule_archive;
use repro_capsule::collect::collect_experiment_files;
use repro_capsule::config::CapsuleConfig;
use repro_capsule::experiment::{ExperimentGenerator, ExperimentParams};
use repro_capsule::params::{parse_input, ExpansionMode};
use repro_capsule::report::{generate_readme, RunStats, SystemInfo};
use repro_capsule::topology::{TopologyGenerator, TopologyOptions, TopologyParams};
use repro_capsule::validate::validate_experiments;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Reproducibility Capsule Walkthrough ===\n");

    let workspace = tempfile::tempdir()?;
    let config = CapsuleConfig::with_root(workspace.path());
    println!("Workspace: {}\n", workspace.path().display());

    println!("=== Step 1: Topologies ===");
    let topology_params = TopologyParams {
        core_counts: parse_input("8,16"),
        host_counts: parse_input("2,4"),
        ..TopologyParams::default()
    };
    let options = TopologyOptions {
        name: Some("cluster".into()),
        mode: ExpansionMode::Cartesian,
        ..TopologyOptions::default()
    };
    let topologies = TopologyGenerator::new(&config).generate(None, &topology_params, &options)?;
    for path in &topologies.written {
        println!("  topologies/{path}");
    }
    println!();

    println!("=== Step 2: Experiments ===");
    let workload = workspace.path().join("workload_traces/bitbrains.parquet");
    std::fs::create_dir_all(workload.parent().unwrap_or(workspace.path()))?;
    std::fs::write(&workload, b"")?;

    let experiment_params = ExperimentParams {
        name: Some("scaling".into()),
        topologies: Some(topologies.written.clone()),
        workloads: Some(vec!["bitbrains.parquet".into()]),
        seeds: parse_input("1-2:1"),
        group_by_topology_folder: true,
        ..ExperimentParams::default()
    };
    let experiments = ExperimentGenerator::new(&config).generate(None, &experiment_params)?;
    for entry in &experiments.written {
        println!("  experiments/{}", entry.name);
    }
    println!();

    println!("=== Step 3: Validate and Collect ===");
    let validation = validate_experiments(&config, &experiments.written);
    println!("  All references present: {}", validation.all_valid());
    let files = collect_experiment_files(&config, &experiments.written);
    println!("  Capsule file set: {} files\n", files.len());

    println!("=== Step 4: README and Archive ===");
    let stats = RunStats {
        experiments: Vec::new(),
        system_info: SystemInfo::collect(),
    };
    let readme = generate_readme(
        &config,
        &experiments.written,
        &stats,
        workspace.path().join("README.md"),
    )?;
    let summary = create_capsule_archive(
        &config,
        &experiments.written,
        Some(&readme),
        &workspace.path().join("reproducibility_capsule.zip"),
    )?;
    println!("  Archive: {}", summary.path.display());
    for entry in &summary.entries {
        println!("    {entry}");
    }

    Ok(())
}
