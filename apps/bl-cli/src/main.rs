use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use bl_app::{AppError, AppResult, LabContext, LabId, LabRequest, ServiceConfig, definitions, run_lab};
use bl_params::catalog;
use bl_sim::Step;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bl-cli")]
#[command(about = "batterylab CLI - run battery lab simulations from JSON request files", long_about = None)]
struct Cli {
    /// Service configuration (timeouts, cycle cap, downsampling)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rate sweeps and standard cycling
    Lab1(LabArgs),
    /// Graphite and silicon composite electrode
    Lab2(LabArgs),
    /// User-defined cycling protocol
    Lab3(LabArgs),
    /// List supported chemistries
    Chemistries,
    /// List labs and their routes
    Labs,
    /// Parse experiment instructions and print them back
    Experiment {
        /// e.g. "Charge at 1C for 3 hours or until 4.3 V"
        #[arg(required = true)]
        instructions: Vec<String>,
    },
}

#[derive(clap::Args)]
struct LabArgs {
    /// Request body as JSON; "-" reads stdin
    request: PathBuf,
    /// Pretty-print the result
    #[arg(long)]
    pretty: bool,
    /// Write the result here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ServiceConfig::load(path)?,
        None => ServiceConfig::default(),
    };

    match cli.command {
        Commands::Lab1(args) => cmd_lab(&config, LabId::Lab1, &args),
        Commands::Lab2(args) => cmd_lab(&config, LabId::Lab2, &args),
        Commands::Lab3(args) => cmd_lab(&config, LabId::Lab3, &args),
        Commands::Chemistries => cmd_chemistries(),
        Commands::Labs => cmd_labs(),
        Commands::Experiment { instructions } => cmd_experiment(&instructions),
    }
}

fn read_request(path: &Path) -> AppResult<serde_json::Value> {
    let text = if path == Path::new("-") {
        io::read_to_string(io::stdin())
    } else {
        std::fs::read_to_string(path)
    }
    .map_err(|e| AppError::InvalidInput(format!("cannot read {}: {e}", path.display())))?;
    Ok(serde_json::from_str(&text)?)
}

fn cmd_lab(config: &ServiceConfig, lab: LabId, args: &LabArgs) -> AppResult<()> {
    let request = LabRequest::parse(lab, read_request(&args.request)?)?;
    let ctx = LabContext::reference(config.lab_settings());

    let started = Instant::now();
    let output = run_lab(&ctx, &request)?;
    info!(
        %lab,
        simulations = request.simulation_count(),
        elapsed_s = started.elapsed().as_secs_f64(),
        "lab finished"
    );

    let value = output.to_json()?;
    let text = if args.pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    };
    match &args.output {
        Some(path) => {
            std::fs::write(path, text).map_err(|e| {
                AppError::InvalidInput(format!("cannot write {}: {e}", path.display()))
            })?;
            println!("✓ Wrote {} blocks to {}", output.blocks().count(), path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{text}")
                .map_err(|e| AppError::InvalidInput(format!("cannot write stdout: {e}")))?;
        }
    }
    Ok(())
}

fn cmd_chemistries() -> AppResult<()> {
    println!("Supported chemistries:");
    for entry in catalog() {
        let params = entry.chemistry.base_parameters();
        let aliases = if entry.aliases.is_empty() {
            String::new()
        } else {
            format!(" (also {})", entry.aliases.join(", "))
        };
        println!(
            "  {:<8} {:<20} {:.2} A.h nominal, {:.2}-{:.2} V{}",
            entry.canonical_id,
            entry.parameter_set,
            params.nominal_capacity_ah,
            params.lower_voltage_cutoff_v,
            params.upper_voltage_cutoff_v,
            aliases
        );
    }
    Ok(())
}

fn cmd_labs() -> AppResult<()> {
    for def in definitions() {
        println!(
            "  {} {:<16} {} ({:?}, {:?} solver) - {}",
            def.id, def.route, def.model.kind, def.model.particle_phases, def.solver.mode, def.summary
        );
    }
    Ok(())
}

fn cmd_experiment(instructions: &[String]) -> AppResult<()> {
    for text in instructions {
        let step = Step::parse(text).map_err(AppError::from)?;
        let limit = match step.duration_s {
            Some(d) => format!("{d:.0} s"),
            None => "until cutoff".to_string(),
        };
        println!("✓ {step}  [{limit}]");
    }
    Ok(())
}
