use super::accumulator::AccumulatedState;
use super::config::BULK_DENSITY;
use super::error::EngineError;
use super::orientation::EulerAngles;
use crate::core::grid::VoxelGrid;
use crate::core::io::traits::GistSink;
use itertools::Itertools;
use nalgebra::Vector3;
use std::f64::consts::{PI, TAU};
use tracing::info;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// kT at 300 K in kcal/mol.
pub const KT: f64 = 8.314 * 0.3 * 0.239;

const EULER_MASCHERONI: f64 = 0.5772;

const TABLE_HEADERS: [&str; 18] = [
    "xcoord",
    "ycoord",
    "zcoord",
    "population",
    "g",
    "gH",
    "TStrans",
    "TStrans-norm",
    "TSorient",
    "TSorient-norm",
    "dEwh",
    "dEwh-norm",
    "dEww",
    "dEww-norm",
    "Dipole_x",
    "Dipole_y",
    "Dipole_z",
    "neighbor",
];

/// Grid integrals, each a density summed over voxels times the voxel volume.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GistTotals {
    pub translational_entropy: f64,
    pub orientational_entropy: f64,
    pub solute_water_energy: f64,
    pub water_water_energy: f64,
}

/// Final per-voxel thermodynamic fields.
///
/// `_norm` fields are per water; the others are densities per Å³.
#[derive(Debug, Clone)]
pub struct GistResults {
    pub grid: VoxelGrid,
    pub frames: usize,
    pub max_occupancy: usize,
    pub population: Vec<f64>,
    pub g: Vec<f64>,
    pub g_hydrogen: Vec<f64>,
    pub ts_trans: Vec<f64>,
    pub ts_trans_norm: Vec<f64>,
    pub ts_orient: Vec<f64>,
    pub ts_orient_norm: Vec<f64>,
    pub dewh: Vec<f64>,
    pub dewh_norm: Vec<f64>,
    pub deww: Vec<f64>,
    pub deww_norm: Vec<f64>,
    pub dipole: Vec<Vector3<f64>>,
    pub neighbor: Vec<f64>,
    pub order: Vec<f64>,
    /// `(higher, lower, energy per frame)` sorted by voxel pair.
    pub pair_energies: Vec<(usize, usize, f64)>,
    pub solute_water_series: Vec<f64>,
    pub water_water_series: Vec<f64>,
    pub totals: GistTotals,
}

/// Wraps an angle difference into `[-π, π]`.
#[inline]
fn wrap_angle(delta: f64) -> f64 {
    delta - TAU * (delta / TAU).round()
}

/// Nearest-neighbour orientational entropy per water, `k (⟨ln(NN³ N / 6π)⟩ + γ)`.
///
/// Distances are measured in `(cos θ, φ, ψ)`. Samples whose nearest distinct
/// neighbour coincides with them do not contribute to the sum but still count
/// in the mean. Returns `None` for fewer than two samples.
pub fn orientational_entropy(samples: &[EulerAngles]) -> Option<f64> {
    let count = samples.len();
    if count < 2 {
        return None;
    }
    let n = count as f64;
    let mut sum = 0.0;
    for (i, a) in samples.iter().enumerate() {
        let cos_a = a.theta.cos();
        let nearest = samples
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != i)
            .map(|(_, b)| {
                let dc = b.theta.cos() - cos_a;
                let dphi = wrap_angle(b.phi - a.phi);
                let dpsi = wrap_angle(b.psi - a.psi);
                (dc * dc + dphi * dphi + dpsi * dpsi).sqrt()
            })
            .filter(|&r| r > 0.0)
            .fold(f64::INFINITY, f64::min);
        if nearest.is_finite() {
            sum += (nearest.powi(3) * n / (6.0 * PI)).ln();
        }
    }
    Some(KT * (sum / n + EULER_MASCHERONI))
}

fn voxel_orientational_entropy(euler: &[Vec<EulerAngles>]) -> Vec<f64> {
    #[cfg(not(feature = "parallel"))]
    let iter = euler.iter();
    #[cfg(feature = "parallel")]
    let iter = euler.par_iter();

    iter.map(|samples| orientational_entropy(samples).unwrap_or(0.0))
        .collect()
}

/// Reduces accumulated sums to per-voxel thermodynamic quantities.
///
/// # Errors
///
/// Returns [`EngineError::Setup`] when no frame was accumulated.
pub fn reduce(state: AccumulatedState) -> Result<GistResults, EngineError> {
    if state.frames == 0 {
        return Err(EngineError::Setup(
            "no frames were accumulated; nothing to reduce".to_string(),
        ));
    }
    let nf = state.frames as f64;
    let volume = state.grid.voxel_volume();
    let frame_volume = nf * volume;
    let voxels = state.grid.len();

    let ts_orient_norm = voxel_orientational_entropy(&state.euler);

    let mut results = GistResults {
        grid: state.grid.clone(),
        frames: state.frames,
        max_occupancy: state.max_occupancy,
        population: vec![0.0; voxels],
        g: vec![0.0; voxels],
        g_hydrogen: vec![0.0; voxels],
        ts_trans: vec![0.0; voxels],
        ts_trans_norm: vec![0.0; voxels],
        ts_orient: vec![0.0; voxels],
        ts_orient_norm,
        dewh: vec![0.0; voxels],
        dewh_norm: vec![0.0; voxels],
        deww: vec![0.0; voxels],
        deww_norm: vec![0.0; voxels],
        dipole: vec![Vector3::zeros(); voxels],
        neighbor: vec![0.0; voxels],
        order: vec![0.0; voxels],
        pair_energies: Vec::new(),
        solute_water_series: state.solute_water_series,
        water_water_series: state.water_water_series,
        totals: GistTotals::default(),
    };

    for v in 0..voxels {
        let count = state.water_count[v];
        let n = count as f64;
        let density = n / frame_volume;
        let g = density / BULK_DENSITY;

        results.population[v] = n;
        results.g[v] = g;
        results.g_hydrogen[v] = state.hydrogen_count[v] as f64 / (frame_volume * 2.0 * BULK_DENSITY);
        results.ts_orient[v] = results.ts_orient_norm[v] * n / frame_volume;

        if count > 1 {
            let ts = -KT * BULK_DENSITY * g * g.ln();
            results.ts_trans[v] = ts;
            results.ts_trans_norm[v] = ts / density;

            let ewh = state.solute_water[v].total();
            let eww = state.water_water[v].total();
            results.dewh[v] = ewh / frame_volume;
            results.deww[v] = (eww - n * state.bulk_reference) / frame_volume;
            results.dewh_norm[v] = ewh / n;
            results.deww_norm[v] = eww / n - state.bulk_reference;
        }

        results.neighbor[v] = state.neighbors[v] / nf;
        if count > 0 {
            results.order[v] = state.order[v] / n;
        }
        results.dipole[v] = state.dipole[v] / frame_volume;
    }

    results.pair_energies = state
        .pair_energy
        .into_iter()
        .filter(|&(_, e)| e != 0.0)
        .map(|((hi, lo), e)| (hi, lo, e / nf))
        .sorted_unstable_by_key(|&(hi, lo, _)| (hi, lo))
        .collect();

    let integrate = |field: &[f64]| field.iter().sum::<f64>() * volume;
    results.totals = GistTotals {
        translational_entropy: integrate(&results.ts_trans),
        orientational_entropy: integrate(&results.ts_orient),
        solute_water_energy: integrate(&results.dewh),
        water_water_energy: integrate(&results.deww),
    };

    info!(
        "Reduced {} frames; maximum voxel occupancy {}.",
        results.frames, results.max_occupancy
    );
    info!(
        "Total translational entropy {:.4} kcal/mol, orientational entropy {:.4} kcal/mol.",
        results.totals.translational_entropy, results.totals.orientational_entropy
    );
    info!(
        "Total solute-water energy {:.4} kcal/mol, water-water energy {:.4} kcal/mol.",
        results.totals.solute_water_energy, results.totals.water_water_energy
    );

    Ok(results)
}

impl GistResults {
    /// Writes every field, the summary table, the voxel-pair energies and the
    /// per-frame series to `sink`.
    pub fn write<S: GistSink>(&self, sink: &mut S) -> Result<(), EngineError> {
        fn output<E: std::error::Error + Send + Sync + 'static>(
            name: &str,
        ) -> impl FnOnce(E) -> EngineError + '_ {
            move |e| EngineError::Output {
                name: name.to_string(),
                source: Box::new(e),
            }
        }

        for (name, values) in [
            ("g", &self.g),
            ("gH", &self.g_hydrogen),
            ("dEwh", &self.dewh),
            ("dEww", &self.deww),
            ("TStrans", &self.ts_trans),
            ("TSorient", &self.ts_orient),
            ("order", &self.order),
            ("neighbor", &self.neighbor),
        ] {
            sink.write_field(name, &self.grid, values)
                .map_err(output(name))?;
        }

        let n = self.grid.len();
        let mut coords = [vec![0.0; n], vec![0.0; n], vec![0.0; n]];
        for v in 0..n {
            let center = self.grid.voxel_center(v);
            for k in 0..3 {
                coords[k][v] = center[k];
            }
        }
        let dipole: [Vec<f64>; 3] =
            std::array::from_fn(|k| self.dipole.iter().map(|d| d[k]).collect());
        let columns: [&[f64]; 18] = [
            &coords[0],
            &coords[1],
            &coords[2],
            &self.population,
            &self.g,
            &self.g_hydrogen,
            &self.ts_trans,
            &self.ts_trans_norm,
            &self.ts_orient,
            &self.ts_orient_norm,
            &self.dewh,
            &self.dewh_norm,
            &self.deww,
            &self.deww_norm,
            &dipole[0],
            &dipole[1],
            &dipole[2],
            &self.neighbor,
        ];
        sink.write_table("output", &TABLE_HEADERS, &columns)
            .map_err(output("output"))?;

        sink.write_pair_energies("ww_Eij", &self.pair_energies)
            .map_err(output("ww_Eij"))?;
        sink.write_series("Esw", &self.solute_water_series)
            .map_err(output("Esw"))?;
        sink.write_series("Eww", &self.water_water_series)
            .map_err(output("Eww"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::term::EnergyTerm;
    use crate::core::io::sink::MemorySink;
    use crate::engine::accumulator::GistAccumulator;
    use crate::engine::config::{GistConfigBuilder, WaterModel};
    use nalgebra::Point3;

    const TOLERANCE: f64 = 1e-9;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE * a.abs().max(b.abs()).max(1.0)
    }

    /// Empty sums for a 2x1x1 grid of 0.5 Å voxels.
    fn empty_state(frames: usize) -> AccumulatedState {
        let config = GistConfigBuilder::new()
            .water_model(WaterModel::Tip3p)
            .grid_center(Point3::origin())
            .grid_dims([2, 1, 1])
            .grid_spacing(0.5)
            .build()
            .unwrap();
        let mut state = GistAccumulator::new(&config).finalize();
        state.frames = frames;
        state
    }

    fn angles(theta: f64, phi: f64, psi: f64) -> EulerAngles {
        EulerAngles { theta, phi, psi }
    }

    #[test]
    fn translational_entropy_is_zero_below_two_waters() {
        let mut state = empty_state(4);
        state.water_count = vec![0, 1];
        state.solute_water[1] = EnergyTerm::new(-1.0, -3.0);
        let results = reduce(state).unwrap();
        assert_eq!(results.ts_trans, vec![0.0, 0.0]);
        assert_eq!(results.ts_trans_norm, vec![0.0, 0.0]);
        assert_eq!(results.dewh, vec![0.0, 0.0]);
        assert_eq!(results.deww_norm, vec![0.0, 0.0]);
        assert!(results.g[1] > 0.0);
    }

    #[test]
    fn single_voxel_quantities_match_closed_form() {
        let mut state = empty_state(4);
        state.water_count = vec![10, 0];
        state.hydrogen_count = vec![18, 0];
        state.solute_water[0] = EnergyTerm::new(-2.0, -6.0);
        state.water_water[0] = EnergyTerm::new(10.0, -160.0);
        state.neighbors[0] = 14.0;
        state.order[0] = 6.0;
        state.dipole[0] = Vector3::new(1.0, 0.0, -0.5);
        let results = reduce(state).unwrap();

        let frame_volume = 4.0 * 0.125;
        let density = 10.0 / frame_volume;
        let g = density / BULK_DENSITY;
        let ts = -KT * BULK_DENSITY * g * g.ln();

        assert!(f64_approx_equal(results.g[0], g));
        assert!(f64_approx_equal(results.g_hydrogen[0], 18.0 / (frame_volume * 2.0 * BULK_DENSITY)));
        assert!(f64_approx_equal(results.ts_trans[0], ts));
        assert!(f64_approx_equal(results.ts_trans_norm[0], ts / density));
        assert!(f64_approx_equal(results.dewh[0], -8.0 / frame_volume));
        assert!(f64_approx_equal(results.dewh_norm[0], -0.8));
        assert!(f64_approx_equal(results.deww[0], (-150.0 + 10.0 * 19.0653) / frame_volume));
        assert!(f64_approx_equal(results.deww_norm[0], -15.0 + 19.0653));
        assert!(f64_approx_equal(results.neighbor[0], 3.5));
        assert!(f64_approx_equal(results.order[0], 0.6));
        assert!(f64_approx_equal(results.dipole[0].x, 2.0));
        assert!(f64_approx_equal(results.dipole[0].z, -1.0));
        assert!(f64_approx_equal(results.totals.translational_entropy, ts * 0.125));
        assert_eq!(results.population, vec![10.0, 0.0]);
    }

    #[test]
    fn orientational_entropy_uses_nearest_sample() {
        let samples = [angles(1.0, 0.5, 0.5), angles(1.0, 0.8, 0.5)];
        let expected_sum = 2.0 * (0.3f64.powi(3) * 2.0 / (6.0 * PI)).ln();
        let expected = KT * (expected_sum / 2.0 + EULER_MASCHERONI);
        assert!(f64_approx_equal(orientational_entropy(&samples).unwrap(), expected));
    }

    #[test]
    fn orientational_entropy_wraps_angles() {
        let samples = [angles(1.0, 0.1, 3.0), angles(1.0, TAU - 0.1, 3.0)];
        let expected = KT * ((0.2f64.powi(3) * 2.0 / (6.0 * PI)).ln() + EULER_MASCHERONI);
        assert!(f64_approx_equal(orientational_entropy(&samples).unwrap(), expected));
    }

    #[test]
    fn orientational_entropy_needs_two_samples() {
        assert_eq!(orientational_entropy(&[]), None);
        assert_eq!(orientational_entropy(&[angles(1.0, 1.0, 1.0)]), None);
        let same = [angles(1.0, 1.0, 1.0); 3];
        assert!(f64_approx_equal(
            orientational_entropy(&same).unwrap(),
            KT * EULER_MASCHERONI
        ));
    }

    #[test]
    fn orientational_density_scales_with_population() {
        let mut state = empty_state(2);
        state.water_count = vec![3, 0];
        state.euler[0] = vec![angles(1.0, 0.5, 0.5), angles(1.0, 0.8, 0.5)];
        let results = reduce(state).unwrap();
        let norm = results.ts_orient_norm[0];
        assert!(f64_approx_equal(results.ts_orient[0], norm * 3.0 / (2.0 * 0.125)));
        assert_eq!(results.ts_orient_norm[1], 0.0);
    }

    #[test]
    fn reduce_without_frames_fails() {
        assert!(matches!(reduce(empty_state(0)), Err(EngineError::Setup(_))));
    }

    #[test]
    fn write_emits_every_output() {
        let mut state = empty_state(2);
        state.water_count = vec![2, 2];
        state.pair_energy.insert((1, 0), -3.0);
        state.solute_water_series = vec![-1.0, -2.0];
        state.water_water_series = vec![-5.0, -6.0];
        let results = reduce(state).unwrap();

        let mut sink = MemorySink::new();
        results.write(&mut sink).unwrap();

        for name in ["g", "gH", "dEwh", "dEww", "TStrans", "TSorient", "order", "neighbor"] {
            assert_eq!(sink.field(name).map(<[f64]>::len), Some(2), "{name}");
        }
        let (headers, columns) = &sink.tables["output"];
        assert_eq!(headers.len(), 18);
        assert_eq!(columns[0], vec![-0.25, 0.25]);
        assert_eq!(sink.pair_energies["ww_Eij"], vec![(1, 0, -1.5)]);
        assert_eq!(sink.series["Esw"], vec![-1.0, -2.0]);
        assert_eq!(sink.series["Eww"], vec![-5.0, -6.0]);
    }
}
