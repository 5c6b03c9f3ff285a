use super::atom::{Atom, Element};
use crate::core::forcefield::params::{Forcefield, LjPair, LjTable, ParamError};
use std::collections::VecDeque;
use std::ops::Range;
use thiserror::Error;
use tracing::warn;

/// Bonded separations (in bonds) whose nonbonded pairs are excluded.
pub const EXCLUSION_DEPTH: usize = 3;

#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("Topology contains no atoms")]
    Empty,
    #[error("Atom {atom} is not assigned to any molecule")]
    UnassignedAtom { atom: usize },
    #[error("Bond references atom {atom}, but the topology has {count} atoms")]
    BondOutOfRange { atom: usize, count: usize },
    #[error("Solvent molecule {molecule} has {atoms} atom(s); water needs at least O, H, H")]
    MalformedSolvent { molecule: usize, atoms: usize },
    #[error("Forcefield parameter error: {0}")]
    Parameters(#[from] ParamError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Molecule {
    pub atoms: Range<usize>,
    pub is_solvent: bool,
}

/// A solvent molecule viewed as a water: first atom oxygen, next two hydrogens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolventMolecule {
    /// Index into [`Topology::molecules`].
    pub molecule: usize,
    pub first_atom: usize,
    pub end_atom: usize,
    pub oxygen: usize,
    pub hydrogens: [usize; 2],
}

impl SolventMolecule {
    #[inline]
    pub fn atoms(&self) -> Range<usize> {
        self.first_atom..self.end_atom
    }
}

/// Static system description shared by every frame.
#[derive(Debug, Clone)]
pub struct Topology {
    atoms: Vec<Atom>,
    molecules: Vec<Molecule>,
    molecule_of: Vec<usize>,
    solvent: Vec<SolventMolecule>,
    exclusions: Vec<Vec<usize>>,
    lj_types: Vec<usize>,
    lj_table: LjTable,
}

impl Topology {
    #[inline]
    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    #[inline]
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    #[inline]
    pub fn molecules(&self) -> &[Molecule] {
        &self.molecules
    }

    #[inline]
    pub fn molecule_of(&self, atom: usize) -> usize {
        self.molecule_of[atom]
    }

    #[inline]
    pub fn is_solvent_atom(&self, atom: usize) -> bool {
        self.molecules[self.molecule_of[atom]].is_solvent
    }

    /// Solvent molecules in topology order.
    #[inline]
    pub fn solvent_molecules(&self) -> &[SolventMolecule] {
        &self.solvent
    }

    /// Sorted partner list of atom `atom`.
    #[inline]
    pub fn exclusions(&self, atom: usize) -> &[usize] {
        &self.exclusions[atom]
    }

    #[inline]
    pub fn is_excluded(&self, i: usize, j: usize) -> bool {
        self.exclusions(i).binary_search(&j).is_ok()
    }

    /// All excluded pairs with `i < j`.
    pub fn excluded_pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.exclusions.iter().enumerate().flat_map(|(i, partners)| {
            partners
                .iter()
                .filter(move |&&j| j > i)
                .map(move |&j| (i, j))
        })
    }

    #[inline]
    pub fn lj_type(&self, atom: usize) -> usize {
        self.lj_types[atom]
    }

    #[inline]
    pub fn lj_types(&self) -> &[usize] {
        &self.lj_types
    }

    #[inline]
    pub fn lj_table(&self) -> &LjTable {
        &self.lj_table
    }

    #[inline]
    pub fn lj_pair(&self, i: usize, j: usize) -> LjPair {
        self.lj_table.get(self.lj_types[i], self.lj_types[j])
    }

    pub fn charges(&self) -> Vec<f64> {
        self.atoms.iter().map(|a| a.partial_charge).collect()
    }
}

/// Incrementally assembles a [`Topology`] from parsed records.
#[derive(Debug, Default)]
pub struct TopologyBuilder {
    atoms: Vec<Atom>,
    molecules: Vec<Molecule>,
    bonds: Vec<(usize, usize)>,
}

impl TopologyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new molecule; subsequently added atoms belong to it.
    pub fn start_molecule(&mut self, is_solvent: bool) -> &mut Self {
        let start = self.atoms.len();
        self.molecules.push(Molecule {
            atoms: start..start,
            is_solvent,
        });
        self
    }

    /// Adds an atom to the current molecule and returns its index.
    pub fn add_atom(&mut self, atom: Atom) -> usize {
        let index = self.atoms.len();
        self.atoms.push(atom);
        if let Some(current) = self.molecules.last_mut() {
            current.atoms.end = index + 1;
        }
        index
    }

    pub fn add_bond(&mut self, i: usize, j: usize) -> &mut Self {
        self.bonds.push((i.min(j), i.max(j)));
        self
    }

    #[inline]
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn build(self, forcefield: &Forcefield) -> Result<Topology, TopologyError> {
        let count = self.atoms.len();
        if count == 0 {
            return Err(TopologyError::Empty);
        }

        let mut molecule_of = vec![usize::MAX; count];
        for (m, molecule) in self.molecules.iter().enumerate() {
            for a in molecule.atoms.clone() {
                molecule_of[a] = m;
            }
        }
        if let Some(atom) = molecule_of.iter().position(|&m| m == usize::MAX) {
            return Err(TopologyError::UnassignedAtom { atom });
        }

        let solvent = collect_solvent(&self.atoms, &self.molecules)?;
        let exclusions = build_exclusions(count, &self.bonds, &self.molecules)?;
        let (lj_types, lj_table) = forcefield.assign_lj(&self.atoms)?;

        Ok(Topology {
            atoms: self.atoms,
            molecules: self.molecules,
            molecule_of,
            solvent,
            exclusions,
            lj_types,
            lj_table,
        })
    }
}

fn collect_solvent(
    atoms: &[Atom],
    molecules: &[Molecule],
) -> Result<Vec<SolventMolecule>, TopologyError> {
    let mut solvent = Vec::new();
    let mut misordered = 0usize;
    for (m, molecule) in molecules.iter().enumerate().filter(|(_, m)| m.is_solvent) {
        let start = molecule.atoms.start;
        if molecule.atoms.len() < 3 {
            return Err(TopologyError::MalformedSolvent {
                molecule: m,
                atoms: molecule.atoms.len(),
            });
        }
        let ordered = atoms[start].element == Element::Oxygen
            && atoms[start + 1].element == Element::Hydrogen
            && atoms[start + 2].element == Element::Hydrogen;
        if !ordered {
            misordered += 1;
        }
        solvent.push(SolventMolecule {
            molecule: m,
            first_atom: start,
            end_atom: molecule.atoms.end,
            oxygen: start,
            hydrogens: [start + 1, start + 2],
        });
    }
    if misordered > 0 {
        warn!(
            "{} solvent molecule(s) are not ordered O, H, H; the first atom is treated as oxygen regardless.",
            misordered
        );
    }
    Ok(solvent)
}

/// Excludes pairs up to [`EXCLUSION_DEPTH`] bonds apart, plus every pair
/// inside a solvent molecule (rigid waters often carry no H-H bond record).
fn build_exclusions(
    count: usize,
    bonds: &[(usize, usize)],
    molecules: &[Molecule],
) -> Result<Vec<Vec<usize>>, TopologyError> {
    let mut adjacency = vec![Vec::new(); count];
    for &(i, j) in bonds {
        if let Some(&atom) = [i, j].iter().find(|&&a| a >= count) {
            return Err(TopologyError::BondOutOfRange { atom, count });
        }
        if i != j {
            adjacency[i].push(j);
            adjacency[j].push(i);
        }
    }

    let mut exclusions: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut depth = vec![usize::MAX; count];
    let mut queue = VecDeque::new();
    for root in 0..count {
        if adjacency[root].is_empty() {
            continue;
        }
        let mut touched = vec![root];
        depth[root] = 0;
        queue.push_back(root);
        while let Some(current) = queue.pop_front() {
            if depth[current] == EXCLUSION_DEPTH {
                continue;
            }
            for &next in &adjacency[current] {
                if depth[next] == usize::MAX {
                    depth[next] = depth[current] + 1;
                    touched.push(next);
                    queue.push_back(next);
                }
            }
        }
        for &atom in &touched {
            if atom != root {
                exclusions[root].push(atom);
            }
            depth[atom] = usize::MAX;
        }
    }

    for molecule in molecules.iter().filter(|m| m.is_solvent) {
        for i in molecule.atoms.clone() {
            exclusions[i].extend(molecule.atoms.clone().filter(|&j| j != i));
        }
    }

    for list in &mut exclusions {
        list.sort_unstable();
        list.dedup();
    }
    Ok(exclusions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::params::VdwParam;
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

    fn add_water(builder: &mut TopologyBuilder, residue: isize) {
        builder.start_molecule(true);
        builder.add_atom(Atom::new(0, "OW", "WAT", residue, "OW", -0.834));
        builder.add_atom(Atom::new(0, "HW1", "WAT", residue, "HW", 0.417));
        builder.add_atom(Atom::new(0, "HW2", "WAT", residue, "HW", 0.417));
    }

    #[test]
    fn build_collects_solvent_molecules_in_order() {
        let mut builder = TopologyBuilder::new();
        builder.start_molecule(false);
        builder.add_atom(Atom::new(1, "C1", "LIG", 1, "C", 0.0));
        add_water(&mut builder, 2);
        add_water(&mut builder, 3);
        let topology = builder.build(&forcefield()).unwrap();

        let solvent = topology.solvent_molecules();
        assert_eq!(solvent.len(), 2);
        assert_eq!(solvent[0].oxygen, 1);
        assert_eq!(solvent[0].hydrogens, [2, 3]);
        assert_eq!(solvent[1].molecule, 2);
        assert!(topology.is_solvent_atom(5));
        assert!(!topology.is_solvent_atom(0));
    }

    #[test]
    fn solvent_atoms_are_mutually_excluded_without_bonds() {
        let mut builder = TopologyBuilder::new();
        add_water(&mut builder, 1);
        let topology = builder.build(&forcefield()).unwrap();
        assert_eq!(topology.exclusions(0), &[1, 2]);
        assert!(topology.is_excluded(1, 2));
        assert_eq!(topology.excluded_pairs().count(), 3);
    }

    #[test]
    fn bonded_exclusions_stop_after_three_bonds() {
        let mut builder = TopologyBuilder::new();
        builder.start_molecule(false);
        for i in 0..5 {
            builder.add_atom(Atom::new(i + 1, "C", "BUT", 1, "C", 0.0));
        }
        builder.add_bond(0, 1).add_bond(1, 2).add_bond(2, 3).add_bond(3, 4);
        let topology = builder.build(&forcefield()).unwrap();
        assert_eq!(topology.exclusions(0), &[1, 2, 3]);
        assert!(!topology.is_excluded(0, 4));
        assert_eq!(topology.exclusions(2), &[0, 1, 3, 4]);
    }

    #[test]
    fn solvent_with_too_few_atoms_is_rejected() {
        let mut builder = TopologyBuilder::new();
        builder.start_molecule(true);
        builder.add_atom(Atom::new(1, "OW", "WAT", 1, "OW", 0.0));
        let result = builder.build(&forcefield());
        assert!(matches!(result, Err(TopologyError::MalformedSolvent { .. })));
    }

    #[test]
    fn atom_outside_any_molecule_is_rejected() {
        let mut builder = TopologyBuilder::new();
        builder.add_atom(Atom::new(1, "C", "LIG", 1, "C", 0.0));
        let result = builder.build(&forcefield());
        assert!(matches!(result, Err(TopologyError::UnassignedAtom { atom: 0 })));
    }

    #[test]
    fn lj_pair_uses_assigned_types() {
        let mut builder = TopologyBuilder::new();
        add_water(&mut builder, 1);
        add_water(&mut builder, 2);
        let topology = builder.build(&forcefield()).unwrap();
        let oo = topology.lj_pair(0, 3);
        let expected_a = 0.1521 * 3.5364f64.powi(12);
        assert!((oo.a - expected_a).abs() / expected_a < 1e-12);
        assert_eq!(topology.lj_pair(1, 4), LjPair { a: 0.0, b: 0.0 });
    }

    #[test]
    fn misordered_solvent_is_warned_but_accepted() {
        let mut builder = TopologyBuilder::new();
        add_water(&mut builder, 1);
        builder.start_molecule(true);
        builder.add_atom(Atom::new(0, "HW1", "WAT", 2, "HW", 0.417));
        builder.add_atom(Atom::new(0, "OW", "WAT", 2, "OW", -0.834));
        builder.add_atom(Atom::new(0, "HW2", "WAT", 2, "HW", 0.417));

        let (topology, logs) = crate::testing::capture_logs(|| builder.build(&forcefield()));
        let topology = topology.unwrap();
        assert_eq!(topology.solvent_molecules()[1].oxygen, 3);
        assert!(logs.contains("WARN"), "{logs}");
        assert!(logs.contains("1 solvent molecule(s) are not ordered O, H, H"));
    }
}

