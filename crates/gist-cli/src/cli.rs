use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan, Ted Yu, William A. Goddard III, Victor Wai Tak Kam",
    version,
    about = "GIST++ CLI - A command-line interface for GIST++, voxel-resolved solvation thermodynamics from molecular dynamics trajectories.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a GIST analysis over a periodic trajectory and write the voxel fields.
    Run(RunArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    // --- Core Arguments ---
    /// Path to the input trajectory (multi-frame BGF).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Directory that receives the output fields and tables.
    #[arg(short, long, required = true, value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Path to an optional configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the forcefield parameter file (TOML with a `vdw` table).
    #[arg(short, long, value_name = "PATH")]
    pub forcefield: Option<PathBuf>,

    // --- Grid Overrides ---
    /// Override the grid centre, in Å.
    #[arg(long, value_name = "X,Y,Z", value_delimiter = ',')]
    pub grid_center: Option<Vec<f64>>,

    /// Override the number of voxels along each axis.
    #[arg(long, value_name = "NX,NY,NZ", value_delimiter = ',')]
    pub grid_dims: Option<Vec<usize>>,

    /// Override the voxel edge length, in Å.
    #[arg(long, value_name = "FLOAT")]
    pub grid_spacing: Option<f64>,

    // --- Model Overrides ---
    /// Override the water model (tip3p, tip4p, tip4pew).
    #[arg(short, long, value_name = "NAME")]
    pub water_model: Option<String>,

    /// Override `order-parameter` from the config file.
    #[command(flatten)]
    pub order_parameter: OrderParameterFlags,

    // --- Energy Overrides ---
    /// Override the nonbonded cutoff, in Å.
    #[arg(long, value_name = "FLOAT")]
    pub cutoff: Option<f64>,

    /// Override the Lennard-Jones switching width, in Å.
    #[arg(long, value_name = "FLOAT")]
    pub switch_width: Option<f64>,

    /// Use particle-mesh Ewald electrostatics, even if the config file has no `energy.pme` section.
    #[arg(long)]
    pub pme: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S energy.pme.spline-order=4
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// A group to handle mutually exclusive boolean flags for the order parameter.
#[derive(Args, Debug, Clone, Copy)]
#[group(required = false, multiple = false)]
pub struct OrderParameterFlags {
    /// Compute the tetrahedral order parameter of on-grid waters.
    #[arg(long)]
    pub with_order: bool,
    /// Skip the tetrahedral order parameter.
    #[arg(long)]
    pub no_order: bool,
}
