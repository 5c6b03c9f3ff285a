use super::unit_cell::UnitCell;
use nalgebra::{Point3, Vector3};
use thiserror::Error;

/// Neighbour offsets forming one half of the 26-cell shell. Together with the
/// home cell they cover every unordered cell pair exactly once.
const HALF_SHELL: [[i64; 3]; 13] = [
    [1, 0, 0],
    [1, 1, 0],
    [1, -1, 0],
    [1, 0, 1],
    [1, 0, -1],
    [1, 1, 1],
    [1, 1, -1],
    [1, -1, 1],
    [1, -1, -1],
    [0, 1, 0],
    [0, 1, 1],
    [0, 1, -1],
    [0, 0, 1],
];

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PairListError {
    #[error("Cutoff must be positive (got {0})")]
    InvalidCutoff(f64),
    #[error(
        "Cutoff {cutoff} Å exceeds half the smallest perpendicular box width ({min_width:.3} Å)"
    )]
    CutoffTooLarge { cutoff: f64, min_width: f64 },
    #[error("Atom index {index} is out of range for {count} coordinates")]
    AtomOutOfRange { index: usize, count: usize },
}

/// Atoms binned into one populated sub-cell, stored with wrapped coordinates.
#[derive(Debug, Clone, Default)]
pub struct CellAtoms {
    pub atoms: Vec<usize>,
    pub positions: Vec<Point3<f64>>,
}

/// A half-shell neighbour of a populated cell.
///
/// `shift` is the lattice translation to add to the neighbour's coordinates so
/// that they lie next to the home cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborCell {
    pub cell: usize,
    pub shift: Vector3<f64>,
}

/// Within-cutoff atom pair produced while walking the list.
///
/// `delta` points from atom `i` to atom `j` through the image that placed the
/// pair within the cutoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairVisit {
    pub i: usize,
    pub j: usize,
    pub delta: Vector3<f64>,
    pub dist2: f64,
}

/// Cell-list spatial index rebuilt once per frame.
#[derive(Debug, Clone)]
pub struct PairList {
    cutoff: f64,
    cutoff2: f64,
    divisions: [usize; 3],
    cells: Vec<CellAtoms>,
    neighbors: Vec<Vec<NeighborCell>>,
}

impl PairList {
    /// Bins `subset` (or every atom when `None`) into cutoff-sized sub-cells.
    ///
    /// Requires every perpendicular box width to be at least twice the cutoff,
    /// so that a pair can be within the cutoff through at most one image.
    pub fn build(
        positions: &[Point3<f64>],
        cell: &UnitCell,
        subset: Option<&[usize]>,
        cutoff: f64,
    ) -> Result<Self, PairListError> {
        if !(cutoff > 0.0) {
            return Err(PairListError::InvalidCutoff(cutoff));
        }
        let widths = cell.perpendicular_widths();
        let min_width = widths.min();
        if min_width < 2.0 * cutoff {
            return Err(PairListError::CutoffTooLarge { cutoff, min_width });
        }
        let divisions = [0, 1, 2].map(|i| ((widths[i] / cutoff).floor() as usize).max(2));
        let total = divisions[0] * divisions[1] * divisions[2];

        let mut dense: Vec<CellAtoms> = vec![CellAtoms::default(); total];
        let mut place = |index: usize| -> Result<(), PairListError> {
            let point = positions.get(index).ok_or(PairListError::AtomOutOfRange {
                index,
                count: positions.len(),
            })?;
            let frac = cell.wrap_fractional(point);
            let bin = [0, 1, 2]
                .map(|k| ((frac[k] * divisions[k] as f64) as usize).min(divisions[k] - 1));
            let slot = &mut dense[Self::flat(bin, divisions)];
            slot.atoms.push(index);
            slot.positions.push(cell.to_cartesian(&frac));
            Ok(())
        };
        match subset {
            Some(indices) => indices.iter().try_for_each(|&i| place(i))?,
            None => (0..positions.len()).try_for_each(&mut place)?,
        }

        let mut populated_index = vec![usize::MAX; total];
        let mut coords_of = Vec::new();
        let mut cells = Vec::new();
        for (flat, slot) in dense.into_iter().enumerate() {
            if slot.atoms.is_empty() {
                continue;
            }
            populated_index[flat] = cells.len();
            coords_of.push(Self::unflat(flat, divisions));
            cells.push(slot);
        }

        let neighbors = coords_of
            .iter()
            .map(|home| {
                HALF_SHELL
                    .iter()
                    .filter_map(|offset| {
                        let mut target = [0usize; 3];
                        let mut image = Vector3::zeros();
                        for k in 0..3 {
                            let n = divisions[k] as i64;
                            let raw = home[k] as i64 + offset[k];
                            target[k] = raw.rem_euclid(n) as usize;
                            image[k] = raw.div_euclid(n) as f64;
                        }
                        let idx = populated_index[Self::flat(target, divisions)];
                        (idx != usize::MAX).then(|| NeighborCell {
                            cell: idx,
                            shift: cell.ucell() * image,
                        })
                    })
                    .collect()
            })
            .collect();

        Ok(Self {
            cutoff,
            cutoff2: cutoff * cutoff,
            divisions,
            cells,
            neighbors,
        })
    }

    #[inline]
    fn flat(bin: [usize; 3], divisions: [usize; 3]) -> usize {
        (bin[0] * divisions[1] + bin[1]) * divisions[2] + bin[2]
    }

    #[inline]
    fn unflat(flat: usize, divisions: [usize; 3]) -> [usize; 3] {
        let z = flat % divisions[2];
        let y = (flat / divisions[2]) % divisions[1];
        let x = flat / (divisions[1] * divisions[2]);
        [x, y, z]
    }

    #[inline]
    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    #[inline]
    pub fn divisions(&self) -> [usize; 3] {
        self.divisions
    }

    /// Populated cells only.
    #[inline]
    pub fn cells(&self) -> &[CellAtoms] {
        &self.cells
    }

    #[inline]
    pub fn neighbors(&self, cell: usize) -> &[NeighborCell] {
        &self.neighbors[cell]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Visits every within-cutoff pair owned by `cell`: the unordered pairs
    /// inside it, then each of its atoms against every atom of its half-shell
    /// neighbours.
    pub fn visit_cell<F>(&self, cell: usize, mut visit: F)
    where
        F: FnMut(PairVisit),
    {
        let home = &self.cells[cell];
        for a in 0..home.atoms.len() {
            let pa = home.positions[a];
            for b in (a + 1)..home.atoms.len() {
                let delta = home.positions[b] - pa;
                let dist2 = delta.norm_squared();
                if dist2 < self.cutoff2 {
                    visit(PairVisit {
                        i: home.atoms[a],
                        j: home.atoms[b],
                        delta,
                        dist2,
                    });
                }
            }
        }

        for neighbor in &self.neighbors[cell] {
            let other = &self.cells[neighbor.cell];
            for a in 0..home.atoms.len() {
                let pa = home.positions[a];
                for b in 0..other.atoms.len() {
                    let delta = other.positions[b] + neighbor.shift - pa;
                    let dist2 = delta.norm_squared();
                    if dist2 < self.cutoff2 {
                        visit(PairVisit {
                            i: home.atoms[a],
                            j: other.atoms[b],
                            delta,
                            dist2,
                        });
                    }
                }
            }
        }
    }

    /// Visits every within-cutoff pair in the system exactly once.
    pub fn for_each_pair<F>(&self, mut visit: F)
    where
        F: FnMut(PairVisit),
    {
        for cell in 0..self.cells.len() {
            self.visit_cell(cell, &mut visit);
        }
    }
}
