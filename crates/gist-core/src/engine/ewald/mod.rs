//! # Ewald Decomposition
//!
//! Splits the nonbonded energy of a periodic frame into terms that can each be
//! attributed to individual atoms.
//!
//! ## Overview
//!
//! The electrostatic energy is the sum of a **self** term (the cancelling
//! Gaussians plus a neutralizing plasma spread evenly over all atoms), a
//! **direct** term evaluated over the cell list with `erfc`-damped Coulomb
//! interactions, and a **reciprocal** term from a smooth particle-mesh
//! transform. Each term is accumulated per atom so that the per-atom sums
//! reproduce the system totals.
//!
//! Dispersion beyond the cutoff is handled by a [`DispersionPolicy`] chosen once
//! at setup. Only the analytic long-range correction is available.
//!
//! ## Key Components
//!
//! - [`EwaldDecomposition`] - Per-frame driver producing an [`EwaldFrame`]
//! - [`direct`] - Parallel direct-space evaluator shared with the plain Coulomb path
//! - [`recip`] - Smooth particle-mesh Ewald reciprocal sum

pub mod direct;
pub mod recip;

use self::direct::{DirectEnergies, DirectEvaluator, IntramolecularPairs};
use self::recip::ParticleMesh;
use crate::core::forcefield::kernel::{Electrostatics, NonbondedKernel};
use crate::core::forcefield::potentials::ewald_coefficient;
use crate::core::forcefield::term::EnergyTerm;
use crate::core::models::topology::Topology;
use crate::core::space::pair_list::PairList;
use crate::core::space::unit_cell::UnitCell;
use crate::engine::config::PmeConfig;
use crate::engine::error::EngineError;
use nalgebra::Point3;
use std::f64::consts::PI;
use tracing::{debug, info};

/// How dispersion beyond the cutoff is accounted for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DispersionPolicy {
    /// Analytic tail correction depending only on the box volume.
    LongRangeCorrection,
    /// Particle-mesh dispersion with the given decay coefficient.
    LjPme { decay: f64 },
}

impl DispersionPolicy {
    /// A non-positive decay coefficient selects the long-range correction.
    pub fn from_decay(decay: f64) -> Self {
        if decay > 0.0 {
            DispersionPolicy::LjPme { decay }
        } else {
            DispersionPolicy::LongRangeCorrection
        }
    }
}

/// Self energy of scaled `charges`, written per atom.
pub fn self_energy(charges: &[f64], beta: f64, volume: f64, per_atom: &mut [f64]) -> f64 {
    let d0 = -beta / PI.sqrt();
    let total_charge: f64 = charges.iter().sum();
    let plasma = -0.5 * PI / (beta * beta * volume) * total_charge * total_charge;
    let plasma_share = if charges.is_empty() {
        0.0
    } else {
        plasma / charges.len() as f64
    };

    let mut total = 0.0;
    for (slot, &q) in per_atom.iter_mut().zip(charges) {
        *slot = q * q * d0 + plasma_share;
        total += *slot;
    }
    total
}

/// Long-range dispersion tail `-2π/(3 V rc³) Σ_ij N_i N_j B_ij`.
///
/// Each type's share is divided evenly among the atoms of that type.
#[derive(Debug, Clone)]
pub struct DispersionCorrection {
    atom_types: Vec<usize>,
    type_counts: Vec<f64>,
    type_terms: Vec<f64>,
    total_term: f64,
}

impl DispersionCorrection {
    pub fn new(topology: &Topology) -> Self {
        let table = topology.lj_table();
        let ntypes = table.type_count();
        let mut type_counts = vec![0.0; ntypes];
        for &t in topology.lj_types() {
            type_counts[t] += 1.0;
        }
        let type_terms: Vec<f64> = (0..ntypes)
            .map(|ti| {
                (0..ntypes)
                    .map(|tj| type_counts[ti] * type_counts[tj] * table.get(ti, tj).b)
                    .sum()
            })
            .collect();
        let total_term = type_terms.iter().sum();
        Self {
            atom_types: topology.lj_types().to_vec(),
            type_counts,
            type_terms,
            total_term,
        }
    }

    pub fn energy(&self, volume: f64, cutoff: f64, per_atom: &mut [f64]) -> f64 {
        let prefactor = 2.0 * PI / (3.0 * volume * cutoff.powi(3));
        for (slot, &t) in per_atom.iter_mut().zip(&self.atom_types) {
            *slot = -prefactor * self.type_terms[t] / self.type_counts[t];
        }
        -prefactor * self.total_term
    }
}

/// Per-atom decomposition of one frame.
#[derive(Debug, Clone, Default)]
pub struct EwaldFrame {
    /// Electrostatic self energy.
    pub self_energy: Vec<f64>,
    /// Electrostatic reciprocal energy.
    pub reciprocal: Vec<f64>,
    /// Van der Waals long-range correction.
    pub dispersion: Vec<f64>,
    pub direct: DirectEnergies,
}

impl EwaldFrame {
    /// Every term of `atom` except its direct interactions with solute partners.
    pub fn non_solute_share(&self, atom: usize) -> EnergyTerm {
        let direct = &self.direct.per_atom[atom];
        direct.solvent
            + EnergyTerm::new(
                self.dispersion[atom],
                self.self_energy[atom] + self.reciprocal[atom] + direct.adjust,
            )
    }

    pub fn total(&self) -> EnergyTerm {
        let sum = |v: &[f64]| v.iter().sum::<f64>();
        self.direct.total()
            + EnergyTerm::new(
                sum(&self.dispersion),
                sum(&self.self_energy) + sum(&self.reciprocal),
            )
    }
}

/// Drives the self, direct and reciprocal sums for successive frames.
pub struct EwaldDecomposition<'a> {
    beta: f64,
    cutoff: f64,
    evaluator: DirectEvaluator<'a>,
    mesh: ParticleMesh,
    dispersion: DispersionCorrection,
}

impl<'a> EwaldDecomposition<'a> {
    pub fn new(
        topology: &'a Topology,
        pme: &PmeConfig,
        cutoff: f64,
        switch_width: f64,
    ) -> Result<Self, EngineError> {
        if let DispersionPolicy::LjPme { decay } = DispersionPolicy::from_decay(pme.dispersion_decay)
        {
            return Err(EngineError::Configuration(format!(
                "LJ-PME dispersion (decay coefficient {decay}) is not supported; \
                 use a non-positive coefficient for the long-range correction"
            )));
        }

        let beta = pme
            .ewald_coefficient
            .unwrap_or_else(|| ewald_coefficient(cutoff, pme.tolerance));
        info!(
            "Ewald coefficient {:.5} 1/Å, spline order {}, target mesh spacing {} Å.",
            beta, pme.spline_order, pme.grid_spacing
        );

        let kernel = NonbondedKernel::new(Electrostatics::Ewald { beta }, cutoff, switch_width);
        Ok(Self {
            beta,
            cutoff,
            evaluator: DirectEvaluator::new(topology, kernel, IntramolecularPairs::Evaluate),
            mesh: ParticleMesh::new(pme.spline_order, pme.grid_spacing, pme.max_grid_points),
            dispersion: DispersionCorrection::new(topology),
        })
    }

    #[inline]
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Decomposes one frame. `tracked` flags the solvent molecules whose pair
    /// records the direct pass keeps.
    pub fn compute(
        &mut self,
        positions: &[Point3<f64>],
        cell: &UnitCell,
        tracked: &[bool],
    ) -> Result<EwaldFrame, EngineError> {
        let count = positions.len();
        let volume = cell.volume();
        let charges = self.evaluator.scaled_charges();

        let mut self_terms = vec![0.0; count];
        let e_self = self_energy(charges, self.beta, volume, &mut self_terms);

        let mut recip_terms = vec![0.0; count];
        let e_recip = self
            .mesh
            .energy(positions, charges, cell, self.beta, &mut recip_terms)?;

        let mut dispersion_terms = vec![0.0; count];
        let e_lr = self
            .dispersion
            .energy(volume, self.cutoff, &mut dispersion_terms);

        let pairs = PairList::build(positions, cell, None, self.cutoff)?;
        let mut direct = self.evaluator.evaluate(&pairs, tracked);
        self.evaluator.adjust_exclusions(positions, cell, &mut direct);

        let direct_total = direct.total();
        debug!(
            "Ewald terms: self {:.4}, direct {:.4}, reciprocal {:.4}, vdw {:.4}, vdw tail {:.4}",
            e_self, direct_total.elec, e_recip, direct_total.vdw, e_lr
        );

        Ok(EwaldFrame {
            self_energy: self_terms,
            reciprocal: recip_terms,
            dispersion: dispersion_terms,
            direct,
        })
    }
}
