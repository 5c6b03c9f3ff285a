use crate::core::io::traits::{FrameSource, GistSink};
use crate::core::models::frame::Frame;
use crate::core::models::topology::Topology;
use crate::engine::accumulator::GistAccumulator;
use crate::engine::config::GistConfig;
use crate::engine::energy::EnergyEvaluator;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::reducer::{self, GistTotals};
use tracing::{info, instrument};

/// Headline numbers of a completed run; the full fields go to the sink.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GistSummary {
    pub frames: usize,
    pub max_occupancy: usize,
    pub totals: GistTotals,
}

#[instrument(skip_all, name = "gist_workflow")]
pub fn run<S, K>(
    source: &mut S,
    config: &GistConfig,
    sink: &mut K,
    reporter: &ProgressReporter,
) -> Result<GistSummary, EngineError>
where
    S: FrameSource,
    K: GistSink,
{
    // === Phase 0: Setup ===
    reporter.report(Progress::PhaseStart { name: "Setup" });
    config.validate()?;
    let topology = source.topology().clone();
    info!(
        "Topology has {} atoms in {} molecules, {} of them solvent.",
        topology.atom_count(),
        topology.molecules().len(),
        topology.solvent_molecules().len()
    );

    let mut accumulator = GistAccumulator::new(config);
    let grid = accumulator.grid();
    let [nx, ny, nz] = grid.dims();
    info!(
        "Grid of {}x{}x{} voxels ({} total), spacing {} Å, origin ({:.3}, {:.3}, {:.3}).",
        nx,
        ny,
        nz,
        grid.len(),
        grid.spacing(),
        grid.origin().x,
        grid.origin().y,
        grid.origin().z
    );
    info!(
        "Water model {}, bulk density {} 1/Å³, cutoff {} Å, {} electrostatics.",
        config.water_model,
        crate::engine::config::BULK_DENSITY,
        config.energy.cutoff,
        if config.is_pme() { "PME" } else { "direct Coulomb" }
    );

    let mut evaluator = EnergyEvaluator::new(&topology, &config.energy)?;
    reporter.report(Progress::PhaseFinish);

    // === Phase 1: Per-frame accumulation ===
    reporter.report(Progress::PhaseStart {
        name: "Accumulating Frames",
    });
    reporter.report(Progress::TaskStart {
        total_steps: source.frame_count_hint().map(|n| n as u64),
    });
    loop {
        let number = accumulator.frames() + 1;
        let frame = source
            .next_frame()
            .map_err(|e| EngineError::FrameSource {
                frame: number,
                source: Box::new(e),
            })?;
        let Some(frame) = frame else {
            break;
        };
        process_frame(&topology, &frame, number, &mut accumulator, &mut evaluator)?;
        reporter.report(Progress::TaskIncrement);
    }
    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    if accumulator.frames() == 0 {
        return Err(EngineError::Setup(
            "the trajectory contains no frames".to_string(),
        ));
    }
    info!("Accumulated {} frames.", accumulator.frames());

    // === Phase 2: Reduction ===
    reporter.report(Progress::PhaseStart { name: "Reduction" });
    let results = reducer::reduce(accumulator.finalize())?;
    reporter.report(Progress::PhaseFinish);

    // === Phase 3: Output ===
    reporter.report(Progress::PhaseStart { name: "Writing Output" });
    results.write(sink)?;
    reporter.report(Progress::PhaseFinish);

    info!("GIST analysis complete.");
    Ok(GistSummary {
        frames: results.frames,
        max_occupancy: results.max_occupancy,
        totals: results.totals,
    })
}

fn process_frame(
    topology: &Topology,
    frame: &Frame,
    number: usize,
    accumulator: &mut GistAccumulator,
    evaluator: &mut EnergyEvaluator,
) -> Result<(), EngineError> {
    if frame.atom_count() != topology.atom_count() {
        return Err(EngineError::FrameSource {
            frame: number,
            source: format!(
                "frame has {} atoms but the topology has {}",
                frame.atom_count(),
                topology.atom_count()
            )
            .into(),
        });
    }
    let cell = frame.cell.as_ref().ok_or_else(|| {
        EngineError::Setup(format!(
            "frame {number} has no periodic box; GIST requires periodic boundaries"
        ))
    })?;

    let assignment = accumulator.assign(topology, frame);
    let energies = evaluator.evaluate(&frame.positions, cell, &assignment.tracked())?;
    accumulator.accumulate(topology, frame, &assignment, &energies);
    Ok(())
}
