use super::params::LjPair;
use super::potentials;
use super::term::EnergyTerm;
use std::ops::{AddAssign, Mul};

/// How the electrostatic part of a pair is evaluated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Electrostatics {
    /// Plain `q_i q_j / r` up to the cutoff.
    Coulomb,
    /// Real-space part of an Ewald sum with splitting coefficient `beta`.
    Ewald { beta: f64 },
}

/// Pairwise nonbonded energy kernel shared by every evaluation path.
///
/// Charges passed to it are already scaled by
/// [`CHARGE_SCALE`](super::potentials::CHARGE_SCALE).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NonbondedKernel {
    electrostatics: Electrostatics,
    cutoff2: f64,
    switch_on2: f64,
}

impl NonbondedKernel {
    /// `switch_width` of zero disables the van der Waals switching function.
    pub fn new(electrostatics: Electrostatics, cutoff: f64, switch_width: f64) -> Self {
        let switch_on = (cutoff - switch_width.max(0.0)).max(0.0);
        Self {
            electrostatics,
            cutoff2: cutoff * cutoff,
            switch_on2: switch_on * switch_on,
        }
    }

    #[inline]
    pub fn cutoff2(&self) -> f64 {
        self.cutoff2
    }

    /// Energy of a non-excluded pair at squared distance `dist2`.
    #[inline]
    pub fn pair(&self, dist2: f64, qi: f64, qj: f64, lj: LjPair) -> EnergyTerm {
        let dist = dist2.sqrt();
        let elec = match self.electrostatics {
            Electrostatics::Coulomb => potentials::coulomb(dist, qi, qj),
            Electrostatics::Ewald { beta } => potentials::ewald_direct(dist, qi, qj, beta),
        };
        let mut vdw = potentials::lennard_jones_ab(dist2, lj.a, lj.b);
        if self.switch_on2 < self.cutoff2 {
            vdw *= potentials::switch_factor(dist2, self.switch_on2, self.cutoff2);
        }
        EnergyTerm { vdw, elec }
    }

    /// Correction for an excluded pair. Zero unless the reciprocal sum has
    /// included the pair's interaction, which must then be removed.
    #[inline]
    pub fn exclusion_adjust(&self, dist2: f64, qi: f64, qj: f64) -> f64 {
        match self.electrostatics {
            Electrostatics::Coulomb => 0.0,
            Electrostatics::Ewald { beta } => {
                potentials::ewald_exclusion_adjust(dist2.sqrt(), qi, qj, beta)
            }
        }
    }
}

/// Deposits half of a pair's `value` on each of its atoms `i` and `j`.
///
/// `slot` picks the accumulator of one atom given the index of its partner,
/// so a caller can bucket the share by the partner's class.
#[inline]
pub fn deposit_half<A, V>(
    per_atom: &mut [A],
    i: usize,
    j: usize,
    value: V,
    slot: impl Fn(&mut A, usize) -> &mut V,
) where
    V: Copy + AddAssign + Mul<f64, Output = V>,
{
    let half = value * 0.5;
    *slot(&mut per_atom[i], j) += half;
    *slot(&mut per_atom[j], i) += half;
}
