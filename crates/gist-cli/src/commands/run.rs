use crate::cli::RunArgs;
use crate::config::{PartialGistConfig, RunConfig};
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use gistpp::{
    core::forcefield::params::Forcefield,
    core::io::{bgf::BgfTrajectory, sink::DirectorySink},
    engine::progress::ProgressReporter,
    workflows,
};
use tracing::info;

pub fn run(args: RunArgs) -> Result<()> {
    let partial_config = match &args.config {
        Some(path) => PartialGistConfig::from_file(path)?,
        None => PartialGistConfig::default(),
    };
    info!("Merging configuration from file and CLI arguments...");
    let RunConfig {
        forcefield_path,
        gist: config,
    } = partial_config.merge_with_cli(&args)?;

    info!("Loading forcefield parameters from {:?}", &forcefield_path);
    let forcefield = Forcefield::load(&forcefield_path).map_err(|e| CliError::FileParsing {
        path: forcefield_path.clone(),
        source: e.into(),
    })?;

    info!("Opening trajectory {:?}", &args.input);
    let mut trajectory =
        BgfTrajectory::open(&args.input, &forcefield).map_err(|e| CliError::FileParsing {
            path: args.input.clone(),
            source: e.into(),
        })?;

    let mut sink = DirectorySink::new(&args.output_dir).map_err(|e| CliError::FileParsing {
        path: args.output_dir.clone(),
        source: e.into(),
    })?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.callback());

    println!("Starting GIST analysis...");
    info!("Invoking the core GIST workflow...");
    let summary = workflows::gist::run(&mut trajectory, &config, &mut sink, &reporter)?;

    println!(
        "✓ Analysed {} frame(s); maximum voxel occupancy {}.",
        summary.frames, summary.max_occupancy
    );
    println!(
        "  Translational entropy -TΔS: {:.4} kcal/mol, orientational: {:.4} kcal/mol",
        summary.totals.translational_entropy, summary.totals.orientational_entropy
    );
    println!(
        "  Solute-water energy: {:.4} kcal/mol, water-water energy: {:.4} kcal/mol",
        summary.totals.solute_water_energy, summary.totals.water_water_energy
    );
    println!("  Output written to: {}", args.output_dir.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::fs;
    use std::fmt::Write as _;

    const FORCEFIELD: &str = r#"
[vdw]
OW = { radius = 3.5364, well_depth = 0.1521 }
HW = { radius = 0.0, well_depth = 0.0 }
"#;

    fn atom_line(serial: usize, name: &str, resnum: usize, pos: [f64; 3], ff: &str, q: f64) -> String {
        format!(
            "{:<6} {:>5} {:<5} {:<3} {:1} {:>5}{:>10.5}{:>10.5}{:>10.5} {:<5}{:>3}{:>2} {:>8.5}",
            "HETATM", serial, name, "WAT", "W", resnum, pos[0], pos[1], pos[2], ff, 1, 0, q
        )
    }

    fn trajectory(frames: usize) -> String {
        let mut text = String::new();
        for frame in 0..frames {
            let shift = 0.05 * frame as f64;
            writeln!(text, "CRYSTX  20.00000  20.00000  20.00000  90.00000  90.00000  90.00000").unwrap();
            let oxygens = [[0.1 + shift, 0.2, 0.3], [3.0, 0.5, 0.2]];
            for (w, o) in oxygens.iter().enumerate() {
                let serial = 1 + 3 * w;
                let h1 = [o[0] + 0.5, o[1] + 0.4, o[2] + 0.6];
                let h2 = [o[0] - 0.15, o[1] + 0.8, o[2] + 0.45];
                writeln!(text, "{}", atom_line(serial, "OW", w + 1, *o, "OW", -0.834)).unwrap();
                writeln!(text, "{}", atom_line(serial + 1, "HW1", w + 1, h1, "HW", 0.417)).unwrap();
                writeln!(text, "{}", atom_line(serial + 2, "HW2", w + 1, h2, "HW", 0.417)).unwrap();
            }
            if frame == 0 {
                for w in 0..2 {
                    let o = 1 + 3 * w;
                    writeln!(text, "CONECT{:>6}{:>6}{:>6}", o, o + 1, o + 2).unwrap();
                }
            }
            writeln!(text, "END").unwrap();
        }
        text
    }

    #[test]
    fn run_command_writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("traj.bgf");
        let forcefield = dir.path().join("ff.toml");
        let output = dir.path().join("out");
        fs::write(&input, trajectory(3)).unwrap();
        fs::write(&forcefield, FORCEFIELD).unwrap();

        let cli = Cli::parse_from([
            "gist",
            "run",
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "-f",
            forcefield.to_str().unwrap(),
            "-w",
            "tip3p",
            "--grid-center",
            "1,1,1",
            "--grid-dims",
            "4,4,4",
        ]);
        let Commands::Run(args) = cli.command;
        run(args).unwrap();

        assert!(output.join("gist-g.dx").exists());
        assert!(output.join("gist-output.dat").exists());
        assert!(output.join("ww_Eij.dat").exists());
        let table = fs::read_to_string(output.join("gist-output.dat")).unwrap();
        assert!(table.contains("TSorient-norm"));
    }

    #[test]
    fn missing_trajectory_is_a_parsing_error() {
        let dir = tempfile::tempdir().unwrap();
        let forcefield = dir.path().join("ff.toml");
        fs::write(&forcefield, FORCEFIELD).unwrap();
        let missing = dir.path().join("missing.bgf");
        let output = dir.path().join("out");

        let cli = Cli::parse_from([
            "gist",
            "run",
            "-i",
            missing.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "-f",
            forcefield.to_str().unwrap(),
            "-w",
            "tip3p",
        ]);
        let Commands::Run(args) = cli.command;
        assert!(matches!(run(args), Err(CliError::FileParsing { .. })));
    }
}
