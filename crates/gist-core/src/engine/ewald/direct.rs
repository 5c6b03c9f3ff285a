use crate::core::forcefield::kernel::{NonbondedKernel, deposit_half};
use crate::core::forcefield::potentials::CHARGE_SCALE;
use crate::core::forcefield::term::EnergyTerm;
use crate::core::models::topology::Topology;
use crate::core::space::pair_list::{PairList, PairVisit};
use crate::core::space::unit_cell::UnitCell;
use nalgebra::Point3;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// O–O distance below which two waters count as neighbours.
pub const NEIGHBOR_DISTANCE: f64 = 3.5;

/// Which same-molecule pairs the evaluator considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntramolecularPairs {
    /// Ignore every pair inside one molecule.
    Skip,
    /// Evaluate non-excluded pairs. Excluded pairs are left to
    /// [`DirectEvaluator::adjust_exclusions`].
    Evaluate,
}

/// Direct-space energy of one atom, split by the class of its partners.
///
/// Every pair deposits half of its energy on each of its atoms.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AtomDirect {
    pub solute: EnergyTerm,
    pub solvent: EnergyTerm,
    /// Electrostatic exclusion adjustment.
    pub adjust: f64,
}

impl AtomDirect {
    pub fn total(&self) -> EnergyTerm {
        self.solute + self.solvent + EnergyTerm::new(0.0, self.adjust)
    }
}

impl std::ops::AddAssign for AtomDirect {
    fn add_assign(&mut self, other: Self) {
        self.solute += other.solute;
        self.solvent += other.solvent;
        self.adjust += other.adjust;
    }
}

/// Atom-pair energy between two distinct solvent molecules (indices into
/// [`Topology::solvent_molecules`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterPairEnergy {
    pub first: usize,
    pub second: usize,
    pub energy: f64,
}

/// Result of one direct-space pass over a frame.
#[derive(Debug, Clone, Default)]
pub struct DirectEnergies {
    pub per_atom: Vec<AtomDirect>,
    /// Pairs whose molecules are both tracked.
    pub water_pairs: Vec<WaterPairEnergy>,
    /// Solvent molecule pairs with O–O closer than [`NEIGHBOR_DISTANCE`],
    /// where at least one molecule is tracked.
    pub oxygen_contacts: Vec<(usize, usize)>,
}

impl DirectEnergies {
    fn new(atom_count: usize) -> Self {
        Self {
            per_atom: vec![AtomDirect::default(); atom_count],
            water_pairs: Vec::new(),
            oxygen_contacts: Vec::new(),
        }
    }

    fn merge(mut self, other: Self) -> Self {
        for (mine, theirs) in self.per_atom.iter_mut().zip(other.per_atom) {
            *mine += theirs;
        }
        self.water_pairs.extend(other.water_pairs);
        self.oxygen_contacts.extend(other.oxygen_contacts);
        self
    }

    /// Sum over atoms, equal to the sum over evaluated pairs.
    pub fn total(&self) -> EnergyTerm {
        self.per_atom.iter().map(AtomDirect::total).sum()
    }
}

/// Evaluates the short-range part of the nonbonded energy over a pair list.
pub struct DirectEvaluator<'a> {
    topology: &'a Topology,
    kernel: NonbondedKernel,
    intramolecular: IntramolecularPairs,
    charges: Vec<f64>,
    solvent_of: Vec<Option<usize>>,
    is_oxygen: Vec<bool>,
}

impl<'a> DirectEvaluator<'a> {
    pub fn new(
        topology: &'a Topology,
        kernel: NonbondedKernel,
        intramolecular: IntramolecularPairs,
    ) -> Self {
        let count = topology.atom_count();
        let mut solvent_of = vec![None; count];
        let mut is_oxygen = vec![false; count];
        for (index, water) in topology.solvent_molecules().iter().enumerate() {
            for atom in water.atoms() {
                solvent_of[atom] = Some(index);
            }
            is_oxygen[water.oxygen] = true;
        }
        let charges = topology
            .charges()
            .into_iter()
            .map(|q| q * CHARGE_SCALE)
            .collect();
        Self {
            topology,
            kernel,
            intramolecular,
            charges,
            solvent_of,
            is_oxygen,
        }
    }

    #[inline]
    pub fn kernel(&self) -> &NonbondedKernel {
        &self.kernel
    }

    /// Charges scaled for the energy kernel.
    #[inline]
    pub fn scaled_charges(&self) -> &[f64] {
        &self.charges
    }

    /// Walks every populated cell; `tracked` flags the solvent molecules whose
    /// pair energies and contacts are recorded.
    pub fn evaluate(&self, pairs: &PairList, tracked: &[bool]) -> DirectEnergies {
        let count = self.topology.atom_count();
        #[cfg(feature = "parallel")]
        let cells = 0..pairs.cells().len();

        #[cfg(not(feature = "parallel"))]
        let energies = {
            let mut acc = DirectEnergies::new(count);
            pairs.for_each_pair(|visit| self.visit(&mut acc, visit, tracked));
            acc
        };

        #[cfg(feature = "parallel")]
        let energies = cells
            .into_par_iter()
            .fold(
                || DirectEnergies::new(count),
                |mut acc, cell| {
                    pairs.visit_cell(cell, |visit| self.visit(&mut acc, visit, tracked));
                    acc
                },
            )
            .reduce(|| DirectEnergies::new(count), DirectEnergies::merge);

        energies
    }

    /// Adds the kernel's exclusion adjustment for every excluded pair, at its
    /// minimum-image separation and regardless of the cutoff.
    pub fn adjust_exclusions(
        &self,
        positions: &[Point3<f64>],
        cell: &UnitCell,
        energies: &mut DirectEnergies,
    ) {
        for (i, j) in self.topology.excluded_pairs() {
            let dist2 = cell.distance2(&positions[i], &positions[j]);
            if !dist2.is_finite() {
                continue;
            }
            let adjust = self
                .kernel
                .exclusion_adjust(dist2, self.charges[i], self.charges[j]);
            deposit_half(&mut energies.per_atom, i, j, adjust, |atom, _| &mut atom.adjust);
        }
    }

    fn visit(&self, acc: &mut DirectEnergies, visit: PairVisit, tracked: &[bool]) {
        let PairVisit { i, j, dist2, .. } = visit;
        let topology = self.topology;
        if self.intramolecular == IntramolecularPairs::Skip
            && topology.molecule_of(i) == topology.molecule_of(j)
        {
            return;
        }

        if topology.is_excluded(i, j) {
            return;
        }

        let (qi, qj) = (self.charges[i], self.charges[j]);
        let term = self.kernel.pair(dist2, qi, qj, topology.lj_pair(i, j));
        deposit_half(&mut acc.per_atom, i, j, term, |atom, partner| {
            if topology.is_solvent_atom(partner) {
                &mut atom.solvent
            } else {
                &mut atom.solute
            }
        });

        let (wi, wj) = (self.solvent_of[i], self.solvent_of[j]);

        let (Some(a), Some(b)) = (wi, wj) else {
            return;
        };
        if a == b {
            return;
        }
        if tracked[a] && tracked[b] {
            acc.water_pairs.push(WaterPairEnergy {
                first: a,
                second: b,
                energy: term.total(),
            });
        }
        if self.is_oxygen[i]
            && self.is_oxygen[j]
            && dist2 < NEIGHBOR_DISTANCE * NEIGHBOR_DISTANCE
            && (tracked[a] || tracked[b])
        {
            acc.oxygen_contacts.push((a, b));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::kernel::Electrostatics;
    use crate::core::forcefield::params::{Forcefield, VdwParam};
    use crate::core::models::atom::Atom;
    use crate::core::models::topology::TopologyBuilder;
    use crate::core::space::unit_cell::UnitCell;
    use nalgebra::Point3;
    use std::collections::HashMap;

    fn forcefield() -> Forcefield {
        let mut vdw = HashMap::new();
        vdw.insert(
            "OW".to_string(),
            VdwParam {
                radius: 3.5364,
                well_depth: 0.1521,
            },
        );
        vdw.insert(
            "HW".to_string(),
            VdwParam {
                radius: 0.0,
                well_depth: 0.0,
            },
        );
        vdw.insert(
            "C".to_string(),
            VdwParam {
                radius: 3.8,
                well_depth: 0.1,
            },
        );
        Forcefield::from_vdw(vdw)
    }

    /// A two-atom solute molecule followed by `waters` waters on a lattice.
    fn system(waters: usize) -> (Topology, Vec<Point3<f64>>) {
        let mut builder = TopologyBuilder::new();
        let mut positions = Vec::new();
        builder.start_molecule(false);
        builder.add_atom(Atom::new(1, "C1", "LIG", 1, "C", 0.25));
        builder.add_atom(Atom::new(2, "C2", "LIG", 1, "C", -0.25));
        builder.add_bond(0, 1);
        positions.push(Point3::new(9.0, 9.0, 9.0));
        positions.push(Point3::new(10.5, 9.0, 9.0));
        for w in 0..waters {
            builder.start_molecule(true);
            let serial = 3 + 3 * w;
            builder.add_atom(Atom::new(serial, "OW", "WAT", 2 + w as isize, "OW", -0.834));
            builder.add_atom(Atom::new(serial + 1, "HW1", "WAT", 2 + w as isize, "HW", 0.417));
            builder.add_atom(Atom::new(serial + 2, "HW2", "WAT", 2 + w as isize, "HW", 0.417));
            let o = Point3::new(
                1.0 + 3.1 * (w % 6) as f64,
                1.3 + 3.2 * ((w / 6) % 6) as f64,
                0.7 + 3.3 * (w / 36) as f64,
            );
            positions.push(o);
            positions.push(o + nalgebra::Vector3::new(0.9572, 0.0, 0.0));
            positions.push(o + nalgebra::Vector3::new(-0.24, 0.927, 0.0));
        }
        (builder.build(&forcefield()).unwrap(), positions)
    }

    fn brute_force(
        topology: &Topology,
        positions: &[Point3<f64>],
        cell: &UnitCell,
        kernel: &NonbondedKernel,
        skip_intramolecular: bool,
    ) -> EnergyTerm {
        let q: Vec<f64> = topology.charges().iter().map(|q| q * CHARGE_SCALE).collect();
        let mut total = EnergyTerm::default();
        for i in 0..positions.len() {
            for j in (i + 1)..positions.len() {
                let same = topology.molecule_of(i) == topology.molecule_of(j);
                if skip_intramolecular && same {
                    continue;
                }
                let d2 = cell.distance2(&positions[i], &positions[j]);
                if d2 >= kernel.cutoff2() {
                    continue;
                }
                if topology.is_excluded(i, j) {
                    total.elec += kernel.exclusion_adjust(d2, q[i], q[j]);
                } else {
                    total += kernel.pair(d2, q[i], q[j], topology.lj_pair(i, j));
                }
            }
        }
        total
    }

    #[test]
    fn per_atom_sum_equals_pair_sum_for_coulomb() {
        let (topology, positions) = system(20);
        let cell = UnitCell::orthorhombic(19.0, 20.0, 21.0).unwrap();
        let kernel = NonbondedKernel::new(Electrostatics::Coulomb, 8.0, 0.0);
        let evaluator = DirectEvaluator::new(&topology, kernel, IntramolecularPairs::Skip);
        let pairs = PairList::build(&positions, &cell, None, 8.0).unwrap();
        let tracked = vec![true; topology.solvent_molecules().len()];

        let energies = evaluator.evaluate(&pairs, &tracked);
        let expected = brute_force(&topology, &positions, &cell, &kernel, true);
        let total = energies.total();
        assert!((total.elec - expected.elec).abs() < 1e-8 * expected.elec.abs().max(1.0));
        assert!((total.vdw - expected.vdw).abs() < 1e-8 * expected.vdw.abs().max(1.0));
        assert!(energies.per_atom.iter().all(|a| a.adjust == 0.0));
    }

    #[test]
    fn per_atom_sum_equals_pair_sum_for_ewald_in_triclinic_cell() {
        let (topology, positions) = system(20);
        let cell = UnitCell::from_box([19.0, 20.0, 21.0], [85.0, 90.0, 100.0]).unwrap();
        let kernel = NonbondedKernel::new(Electrostatics::Ewald { beta: 0.35 }, 8.0, 1.0);
        let evaluator = DirectEvaluator::new(&topology, kernel, IntramolecularPairs::Evaluate);
        let pairs = PairList::build(&positions, &cell, None, 8.0).unwrap();
        let tracked = vec![false; topology.solvent_molecules().len()];

        let mut energies = evaluator.evaluate(&pairs, &tracked);
        assert!(energies.per_atom.iter().all(|a| a.adjust == 0.0));
        evaluator.adjust_exclusions(&positions, &cell, &mut energies);
        let expected = brute_force(&topology, &positions, &cell, &kernel, false);
        let total = energies.total();
        assert!((total.elec - expected.elec).abs() < 1e-8 * expected.elec.abs().max(1.0));
        assert!((total.vdw - expected.vdw).abs() < 1e-8 * expected.vdw.abs().max(1.0));
        assert!(energies.per_atom.iter().any(|a| a.adjust != 0.0));
        assert!(energies.water_pairs.is_empty());
        assert!(energies.oxygen_contacts.is_empty());
    }

    #[test]
    fn partner_classes_split_solute_and_solvent() {
        let (topology, positions) = system(4);
        let cell = UnitCell::orthorhombic(30.0, 30.0, 30.0).unwrap();
        let kernel = NonbondedKernel::new(Electrostatics::Coulomb, 12.0, 0.0);
        let evaluator = DirectEvaluator::new(&topology, kernel, IntramolecularPairs::Skip);
        let pairs = PairList::build(&positions, &cell, None, 12.0).unwrap();
        let energies = evaluator.evaluate(&pairs, &[true; 4]);

        // The solute only has solvent partners once intramolecular pairs are skipped.
        assert_eq!(energies.per_atom[0].solute, EnergyTerm::default());
        assert_ne!(energies.per_atom[0].solvent, EnergyTerm::default());

        let solute_side: EnergyTerm = energies.per_atom[..2].iter().map(|a| a.solvent).sum();
        let water_side: EnergyTerm = energies.per_atom[2..].iter().map(|a| a.solute).sum();
        assert!((solute_side.total() - water_side.total()).abs() < 1e-9);

        let pair_sum: f64 = energies.water_pairs.iter().map(|p| p.energy).sum();
        let water_water: EnergyTerm = energies.per_atom[2..].iter().map(|a| a.solvent).sum();
        assert!((pair_sum - water_water.total()).abs() < 1e-9);
    }

    #[test]
    fn close_oxygens_are_reported_as_contacts() {
        let (topology, mut positions) = system(3);
        // Bring water 1 within 3 Å of water 0; leave water 2 far away.
        let shift = Point3::new(1.0, 4.3, 0.7) - positions[5];
        for p in &mut positions[5..8] {
            *p += shift;
        }
        let cell = UnitCell::orthorhombic(30.0, 30.0, 30.0).unwrap();
        let kernel = NonbondedKernel::new(Electrostatics::Coulomb, 8.0, 0.0);
        let evaluator = DirectEvaluator::new(&topology, kernel, IntramolecularPairs::Skip);
        let pairs = PairList::build(&positions, &cell, None, 8.0).unwrap();

        let energies = evaluator.evaluate(&pairs, &[true, false, false]);
        assert_eq!(energies.oxygen_contacts.len(), 1);
        let (a, b) = energies.oxygen_contacts[0];
        assert_eq!((a.min(b), a.max(b)), (0, 1));
        assert!(energies.water_pairs.is_empty());
    }

    #[test]
    fn exclusions_beyond_the_cutoff_are_still_adjusted() {
        let mut builder = TopologyBuilder::new();
        builder.start_molecule(false);
        builder.add_atom(Atom::new(1, "C1", "LIG", 1, "C", 0.5));
        builder.add_atom(Atom::new(2, "C2", "LIG", 1, "C", -0.5));
        builder.add_bond(0, 1);
        let topology = builder.build(&forcefield()).unwrap();
        // 9 Å apart directly, 11 Å through the boundary: outside a 6 Å cutoff.
        let positions = vec![Point3::new(5.0, 10.0, 10.0), Point3::new(14.0, 10.0, 10.0)];
        let cell = UnitCell::orthorhombic(20.0, 20.0, 20.0).unwrap();
        let kernel = NonbondedKernel::new(Electrostatics::Ewald { beta: 0.3 }, 6.0, 0.0);
        let evaluator = DirectEvaluator::new(&topology, kernel, IntramolecularPairs::Evaluate);
        let pairs = PairList::build(&positions, &cell, None, 6.0).unwrap();

        let mut energies = evaluator.evaluate(&pairs, &[]);
        assert_eq!(energies.total(), EnergyTerm::default());
        evaluator.adjust_exclusions(&positions, &cell, &mut energies);

        let q = 0.5 * CHARGE_SCALE;
        let expected = kernel.exclusion_adjust(81.0, q, -q);
        assert!(expected > 0.0);
        assert!((energies.per_atom[0].adjust - 0.5 * expected).abs() < 1e-12);
        assert!((energies.per_atom[1].adjust - 0.5 * expected).abs() < 1e-12);
        assert!((energies.total().elec - expected).abs() < 1e-12);
    }
}
