use super::config::{EnergyConfig, EnergyMode};
use super::error::EngineError;
use super::ewald::direct::{DirectEnergies, DirectEvaluator, IntramolecularPairs};
use super::ewald::{EwaldDecomposition, EwaldFrame};
use crate::core::forcefield::kernel::{Electrostatics, NonbondedKernel};
use crate::core::models::topology::Topology;
use crate::core::space::pair_list::PairList;
use crate::core::space::unit_cell::UnitCell;
use nalgebra::Point3;
use tracing::debug;

/// Nonbonded energies of one frame, in the shape of the evaluator that made them.
#[derive(Debug, Clone)]
pub enum FrameEnergies {
    Direct(DirectEnergies),
    Ewald(EwaldFrame),
}

impl FrameEnergies {
    /// Direct-space pass, present in both modes.
    pub fn direct(&self) -> &DirectEnergies {
        match self {
            FrameEnergies::Direct(direct) => direct,
            FrameEnergies::Ewald(frame) => &frame.direct,
        }
    }
}

/// Selects between plain cutoff Coulomb and the Ewald decomposition once per run.
pub enum EnergyEvaluator<'a> {
    Direct {
        evaluator: DirectEvaluator<'a>,
        cutoff: f64,
    },
    Ewald(EwaldDecomposition<'a>),
}

impl<'a> EnergyEvaluator<'a> {
    pub fn new(topology: &'a Topology, config: &EnergyConfig) -> Result<Self, EngineError> {
        match &config.mode {
            EnergyMode::Direct => {
                let kernel = NonbondedKernel::new(
                    Electrostatics::Coulomb,
                    config.cutoff,
                    config.switch_width,
                );
                Ok(EnergyEvaluator::Direct {
                    evaluator: DirectEvaluator::new(topology, kernel, IntramolecularPairs::Skip),
                    cutoff: config.cutoff,
                })
            }
            EnergyMode::Pme(pme) => Ok(EnergyEvaluator::Ewald(EwaldDecomposition::new(
                topology,
                pme,
                config.cutoff,
                config.switch_width,
            )?)),
        }
    }

    /// Evaluates one frame. `tracked` flags solvent molecules whose pair
    /// records are kept.
    pub fn evaluate(
        &mut self,
        positions: &[Point3<f64>],
        cell: &UnitCell,
        tracked: &[bool],
    ) -> Result<FrameEnergies, EngineError> {
        match self {
            EnergyEvaluator::Direct { evaluator, cutoff } => {
                let pairs = PairList::build(positions, cell, None, *cutoff)?;
                debug!(
                    "Pair list: {} populated cells on a {:?} lattice",
                    pairs.len(),
                    pairs.divisions()
                );
                let direct = evaluator.evaluate(&pairs, tracked);
                let total = direct.total();
                debug!(
                    "Direct energies: vdw {:.4}, elec {:.4} over {} water pair records",
                    total.vdw,
                    total.elec,
                    direct.water_pairs.len()
                );
                Ok(FrameEnergies::Direct(direct))
            }
            EnergyEvaluator::Ewald(ewald) => {
                Ok(FrameEnergies::Ewald(ewald.compute(positions, cell, tracked)?))
            }
        }
    }
}
