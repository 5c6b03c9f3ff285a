use super::config::GistConfig;
use super::energy::FrameEnergies;
use super::ewald::direct::DirectEnergies;
use super::orientation::{EulerAngles, OrientationFailure, euler_angles};
use super::order::tetrahedral_order;
use crate::core::forcefield::term::EnergyTerm;
use crate::core::grid::VoxelGrid;
use crate::core::models::frame::Frame;
use crate::core::models::topology::Topology;
use nalgebra::{Point3, Vector3};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Voxel of each solvent molecule's oxygen for one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameAssignment {
    voxels: Vec<Option<usize>>,
}

impl FrameAssignment {
    /// On-grid voxel of solvent molecule `water`.
    #[inline]
    pub fn voxel(&self, water: usize) -> Option<usize> {
        self.voxels[water]
    }

    pub fn voxels(&self) -> &[Option<usize>] {
        &self.voxels
    }

    /// Flags of the molecules whose oxygen is on the grid.
    pub fn tracked(&self) -> Vec<bool> {
        self.voxels.iter().map(Option::is_some).collect()
    }

    pub fn on_grid_count(&self) -> usize {
        self.voxels.iter().flatten().count()
    }
}

/// Raw per-voxel sums handed to the reducer.
#[derive(Debug, Clone)]
pub struct AccumulatedState {
    pub grid: VoxelGrid,
    pub frames: usize,
    pub max_occupancy: usize,
    /// Bulk pair energy subtracted per water from the water-water sums.
    pub bulk_reference: f64,
    pub water_count: Vec<usize>,
    pub hydrogen_count: Vec<usize>,
    pub euler: Vec<Vec<EulerAngles>>,
    pub solute_water: Vec<EnergyTerm>,
    pub water_water: Vec<EnergyTerm>,
    /// Voxel-pair energies keyed `(higher, lower)`.
    pub pair_energy: HashMap<(usize, usize), f64>,
    pub dipole: Vec<Vector3<f64>>,
    pub neighbors: Vec<f64>,
    pub order: Vec<f64>,
    pub solute_water_series: Vec<f64>,
    pub water_water_series: Vec<f64>,
}

/// Per-voxel accumulation across frames.
///
/// Created configured from a [`GistConfig`], fed frames through
/// [`assign`](Self::assign) and [`accumulate`](Self::accumulate), and consumed
/// by [`finalize`](Self::finalize).
#[derive(Debug)]
pub struct GistAccumulator {
    pme: bool,
    order_parameter: bool,
    mismatch_reported: bool,
    state: AccumulatedState,
}

impl GistAccumulator {
    pub fn new(config: &GistConfig) -> Self {
        let grid = VoxelGrid::centered(
            config.grid.center,
            config.grid.dims,
            config.grid.spacing,
        );
        let n = grid.len();
        let pme = config.is_pme();
        let bulk = config.water_model.bulk_energy();
        Self {
            pme,
            order_parameter: config.order_parameter,
            mismatch_reported: false,
            state: AccumulatedState {
                grid,
                frames: 0,
                max_occupancy: 0,
                // PME buckets hold per-atom half shares.
                bulk_reference: if pme { 0.5 * bulk } else { bulk },
                water_count: vec![0; n],
                hydrogen_count: vec![0; n],
                euler: vec![Vec::new(); n],
                solute_water: vec![EnergyTerm::default(); n],
                water_water: vec![EnergyTerm::default(); n],
                pair_energy: HashMap::new(),
                dipole: vec![Vector3::zeros(); n],
                neighbors: vec![0.0; n],
                order: vec![0.0; n],
                solute_water_series: Vec::new(),
                water_water_series: Vec::new(),
            },
        }
    }

    #[inline]
    pub fn grid(&self) -> &VoxelGrid {
        &self.state.grid
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.state.frames
    }

    /// Bins every solvent molecule of `frame` and updates the occupancy counts.
    pub fn assign(&mut self, topology: &Topology, frame: &Frame) -> FrameAssignment {
        let grid = &self.state.grid;
        let waters = topology.solvent_molecules();
        let mut voxels = Vec::with_capacity(waters.len());
        let mut observed = 0usize;

        for water in waters {
            let atoms = water.atoms();
            if frame.positions[atoms].iter().all(|p| p.coords.iter().all(|c| c.is_finite())) {
                observed += 1;
            } else {
                voxels.push(None);
                continue;
            }

            let placement = grid.locate_oxygen(&frame.positions[water.oxygen]);
            if placement.within_margin() {
                for &h in &water.hydrogens {
                    if let Some(v) = grid.locate(&frame.positions[h]) {
                        self.state.hydrogen_count[v] += 1;
                    }
                }
            }
            let voxel = placement.voxel();
            if let Some(v) = voxel {
                self.state.water_count[v] += 1;
                self.state.max_occupancy = self.state.max_occupancy.max(self.state.water_count[v]);
            }
            voxels.push(voxel);
        }

        if observed != waters.len() && !self.mismatch_reported {
            warn!(
                "Frame {} has {} usable solvent molecules but the topology declares {}.",
                self.state.frames + 1,
                observed,
                waters.len()
            );
            self.mismatch_reported = true;
        }

        FrameAssignment { voxels }
    }

    /// Routes the frame's energies into the voxels of `assignment` and records
    /// orientations, dipoles, neighbours and order parameters.
    pub fn accumulate(
        &mut self,
        topology: &Topology,
        frame: &Frame,
        assignment: &FrameAssignment,
        energies: &FrameEnergies,
    ) {
        let waters = topology.solvent_molecules();
        let charges = topology.charges();
        let oxygens: Vec<Point3<f64>> = if self.order_parameter {
            waters.iter().map(|w| frame.positions[w.oxygen]).collect()
        } else {
            Vec::new()
        };
        let origin = self.state.grid.origin();

        let mut frame_solute_water = 0.0;
        let mut frame_water_water = 0.0;

        for (index, water) in waters.iter().enumerate() {
            let Some(voxel) = assignment.voxel(index) else {
                continue;
            };

            let (solute_water, water_water) = match energies {
                FrameEnergies::Direct(direct) => water.atoms().fold(
                    (EnergyTerm::default(), EnergyTerm::default()),
                    |(sw, ww), atom| {
                        let shares = &direct.per_atom[atom];
                        (sw + shares.solute * 2.0, ww + shares.solvent * 2.0)
                    },
                ),
                FrameEnergies::Ewald(ewald) => water.atoms().fold(
                    (EnergyTerm::default(), EnergyTerm::default()),
                    |(sw, ww), atom| {
                        (
                            sw + ewald.direct.per_atom[atom].solute,
                            ww + ewald.non_solute_share(atom),
                        )
                    },
                ),
            };
            self.state.solute_water[voxel] += solute_water;
            self.state.water_water[voxel] += water_water;
            frame_solute_water += solute_water.total();
            frame_water_water += water_water.total();

            let oxygen = frame.positions[water.oxygen];
            let [h1, h2] = water.hydrogens.map(|h| frame.positions[h]);
            match euler_angles(&oxygen, &h1, &h2) {
                Ok(angles) => self.state.euler[voxel].push(angles),
                Err(OrientationFailure::GimbalLock) => warn!(
                    "Gimbal lock for solvent molecule {} in frame {}; orientation sample skipped.",
                    index + 1,
                    self.state.frames + 1
                ),
                Err(OrientationFailure::DegenerateGeometry) => warn!(
                    "Degenerate geometry for solvent molecule {} in frame {}; orientation sample skipped.",
                    index + 1,
                    self.state.frames + 1
                ),
            }

            let dipole: Vector3<f64> = water
                .atoms()
                .map(|atom| (frame.positions[atom] - origin) * charges[atom])
                .sum();
            self.state.dipole[voxel] += dipole;

            if self.order_parameter {
                if let Some(cell) = &frame.cell {
                    if let Some(q) = tetrahedral_order(index, &oxygens, cell) {
                        self.state.order[voxel] += q;
                    }
                }
            }
        }

        self.record_pairs(energies.direct(), assignment);

        debug!(
            "Frame {}: {} waters on grid, solute-water {:.4}, water-water {:.4}{}",
            self.state.frames + 1,
            assignment.on_grid_count(),
            frame_solute_water,
            frame_water_water,
            if self.pme { " (PME)" } else { "" }
        );
        self.state.solute_water_series.push(frame_solute_water);
        self.state.water_water_series.push(frame_water_water);
        self.state.frames += 1;
    }

    fn record_pairs(&mut self, direct: &DirectEnergies, assignment: &FrameAssignment) {
        for pair in &direct.water_pairs {
            let (Some(a), Some(b)) = (assignment.voxel(pair.first), assignment.voxel(pair.second))
            else {
                continue;
            };
            if a != b {
                *self.state.pair_energy.entry((a.max(b), a.min(b))).or_insert(0.0) +=
                    0.5 * pair.energy;
            }
        }
        for &(first, second) in &direct.oxygen_contacts {
            for water in [first, second] {
                if let Some(v) = assignment.voxel(water) {
                    self.state.neighbors[v] += 1.0;
                }
            }
        }
    }

    /// Ends accumulation and hands the raw sums over for reduction.
    pub fn finalize(self) -> AccumulatedState {
        self.state
    }
}
