use crate::core::space::unit_cell::UnitCell;
use crate::engine::error::EngineError;
use nalgebra::{Point3, Vector3};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::f64::consts::PI;
use std::sync::Arc;

/// Cardinal B-spline values `M_n(w + order - 1 - j)` for `j = 0..order`, with
/// `w` the fractional part of a scaled grid coordinate.
fn fill_bspline(w: f64, order: usize, out: &mut [f64]) {
    out.iter_mut().for_each(|v| *v = 0.0);
    out[0] = 1.0 - w;
    out[1] = w;
    for k in 3..=order {
        let div = 1.0 / (k - 1) as f64;
        out[k - 1] = div * w * out[k - 2];
        for j in 1..(k - 1) {
            let jf = j as f64;
            out[k - j - 1] = div
                * ((w + jf) * out[k - j - 2] + (k as f64 - jf - w) * out[k - j - 1]);
        }
        out[0] *= div * (1.0 - w);
    }
}

/// Squared moduli `|b(m)|^-2` of the Euler exponential spline for one axis.
fn bspline_moduli(size: usize, order: usize) -> Vec<f64> {
    let mut spline = vec![0.0; order];
    fill_bspline(0.0, order, &mut spline);

    let mut moduli: Vec<f64> = (0..size)
        .map(|m| {
            let (mut re, mut im) = (0.0, 0.0);
            // M_n is symmetric, so spline[k] = M_n(k + 1).
            for (k, value) in spline.iter().enumerate() {
                let arg = 2.0 * PI * ((m * k) % size) as f64 / size as f64;
                re += value * arg.cos();
                im += value * arg.sin();
            }
            re * re + im * im
        })
        .collect();

    // Odd orders vanish at the Nyquist frequency.
    for m in 0..size {
        if moduli[m] < 1e-7 {
            let prev = moduli[(m + size - 1) % size];
            let next = moduli[(m + 1) % size];
            moduli[m] = 0.5 * (prev + next);
        }
    }
    moduli
}

fn is_smooth(mut n: usize) -> bool {
    for p in [2, 3, 5] {
        while n % p == 0 {
            n /= p;
        }
    }
    n == 1
}

/// Smallest 2,3,5-smooth grid size covering `length` at `spacing`, at least
/// `order` points.
pub fn grid_size(length: f64, spacing: f64, order: usize) -> usize {
    let mut n = ((length / spacing).ceil() as usize).max(order).max(1);
    while !is_smooth(n) {
        n += 1;
    }
    n
}

/// Smooth particle-mesh Ewald reciprocal-space sum.
pub struct ParticleMesh {
    order: usize,
    spacing: f64,
    max_points: usize,
    planner: FftPlanner<f64>,
    cached: Option<MeshPlan>,
}

struct MeshPlan {
    dims: [usize; 3],
    forward: [Arc<dyn Fft<f64>>; 3],
    inverse: [Arc<dyn Fft<f64>>; 3],
    moduli: [Vec<f64>; 3],
}

impl ParticleMesh {
    pub fn new(order: usize, spacing: f64, max_points: usize) -> Self {
        Self {
            order,
            spacing,
            max_points,
            planner: FftPlanner::new(),
            cached: None,
        }
    }

    /// Grid dimensions for `cell`, or a sizing error when an axis exceeds the
    /// configured limit.
    pub fn dims_for(&self, cell: &UnitCell) -> Result<[usize; 3], EngineError> {
        let mut dims = [0; 3];
        for (axis, slot) in dims.iter_mut().enumerate() {
            let length = cell.lattice_vector(axis).norm();
            let required = grid_size(length, self.spacing, self.order);
            if required > self.max_points {
                return Err(EngineError::GridSizing {
                    axis,
                    required,
                    max: self.max_points,
                });
            }
            *slot = required;
        }
        Ok(dims)
    }

    fn plan(&mut self, dims: [usize; 3]) -> &MeshPlan {
        if self.cached.as_ref().is_some_and(|p| p.dims != dims) {
            self.cached = None;
        }
        let planner = &mut self.planner;
        let order = self.order;
        self.cached.get_or_insert_with(|| MeshPlan {
            dims,
            forward: dims.map(|n| planner.plan_fft_forward(n)),
            inverse: dims.map(|n| planner.plan_fft_inverse(n)),
            moduli: dims.map(|n| bspline_moduli(n, order)),
        })
    }

    /// Reciprocal energy of `charges` (already scaled to kcal/mol units),
    /// writing each atom's share `0.5 * q_i * phi(r_i)` into `per_atom`.
    pub fn energy(
        &mut self,
        positions: &[Point3<f64>],
        charges: &[f64],
        cell: &UnitCell,
        beta: f64,
        per_atom: &mut [f64],
    ) -> Result<f64, EngineError> {
        if positions.len() != charges.len() || per_atom.len() != charges.len() {
            return Err(EngineError::Internal(format!(
                "PME received {} positions, {} charges and {} outputs",
                positions.len(),
                charges.len(),
                per_atom.len()
            )));
        }
        let dims = self.dims_for(cell)?;
        let order = self.order;
        let plan = self.plan(dims);
        let [k0, k1, k2] = dims;

        let splines = atom_splines(positions, cell, dims, order);

        let mut mesh = vec![Complex::new(0.0, 0.0); k0 * k1 * k2];
        for (spline, &q) in splines.iter().zip(charges) {
            let Some(spline) = spline else {
                continue;
            };
            if q == 0.0 {
                continue;
            }
            spline.for_each_point(dims, |index, weight| mesh[index].re += q * weight);
        }

        fft3d(&mut mesh, dims, &plan.forward);
        apply_influence(&mut mesh, dims, cell, beta, &plan.moduli);
        fft3d(&mut mesh, dims, &plan.inverse);

        let mut total = 0.0;
        for ((spline, &q), slot) in splines.iter().zip(charges).zip(per_atom.iter_mut()) {
            let Some(spline) = spline else {
                *slot = 0.0;
                continue;
            };
            let mut phi = 0.0;
            spline.for_each_point(dims, |index, weight| phi += weight * mesh[index].re);
            *slot = 0.5 * q * phi;
            total += *slot;
        }
        Ok(total)
    }
}

/// Spline support of one atom: weights `j` apply to mesh point `base + j`.
struct AtomSpline {
    base: [usize; 3],
    weights: [Vec<f64>; 3],
}

impl AtomSpline {
    /// Calls `f(grid index, weight)` for every mesh point the atom touches.
    fn for_each_point(&self, dims: [usize; 3], mut f: impl FnMut(usize, f64)) {
        let [k0, k1, k2] = dims;
        for (a, wa) in self.weights[0].iter().enumerate() {
            let ia = (self.base[0] + a) % k0;
            for (b, wb) in self.weights[1].iter().enumerate() {
                let ib = (self.base[1] + b) % k1;
                let wab = wa * wb;
                let row = (ia * k1 + ib) * k2;
                for (c, wc) in self.weights[2].iter().enumerate() {
                    let ic = (self.base[2] + c) % k2;
                    f(row + ic, wab * wc);
                }
            }
        }
    }
}

/// Atoms with non-finite coordinates get no spline and stay off the mesh.
fn atom_splines(
    positions: &[Point3<f64>],
    cell: &UnitCell,
    dims: [usize; 3],
    order: usize,
) -> Vec<Option<AtomSpline>> {
    positions
        .iter()
        .map(|p| {
            if !p.coords.iter().all(|c| c.is_finite()) {
                return None;
            }
            let frac = cell.wrap_fractional(p);
            let mut base = [0usize; 3];
            let weights = [0, 1, 2].map(|axis| {
                let k = dims[axis];
                let u = frac[axis] * k as f64;
                let floor = u.floor();
                base[axis] = ((floor as usize) % k + k - (order - 1)) % k;
                let mut w = vec![0.0; order];
                fill_bspline(u - floor, order, &mut w);
                w
            });
            Some(AtomSpline { base, weights })
        })
        .collect()
}

/// Multiplies the transformed charge mesh by
/// `exp(-pi^2 m^2 / beta^2) / (pi V m^2) * B(m)`.
fn apply_influence(
    mesh: &mut [Complex<f64>],
    dims: [usize; 3],
    cell: &UnitCell,
    beta: f64,
    moduli: &[Vec<f64>; 3],
) {
    let [k0, k1, k2] = dims;
    let recip = [0, 1, 2].map(|i| cell.reciprocal_vector(i));
    let factor = PI * PI / (beta * beta);
    let denom = PI * cell.volume();
    let signed = |k: usize, n: usize| -> f64 {
        if k > n / 2 {
            k as f64 - n as f64
        } else {
            k as f64
        }
    };

    for a in 0..k0 {
        let ma = signed(a, k0);
        for b in 0..k1 {
            let mb = signed(b, k1);
            for c in 0..k2 {
                let index = (a * k1 + b) * k2 + c;
                if a == 0 && b == 0 && c == 0 {
                    mesh[index] = Complex::new(0.0, 0.0);
                    continue;
                }
                let mc = signed(c, k2);
                let m: Vector3<f64> = recip[0] * ma + recip[1] * mb + recip[2] * mc;
                let m2 = m.norm_squared();
                let modulus = moduli[0][a] * moduli[1][b] * moduli[2][c];
                let g = (-factor * m2).exp() / (denom * m2 * modulus);
                mesh[index] *= g;
            }
        }
    }
}

/// In-place 3-D transform as successive 1-D transforms along z, y and x.
fn fft3d(mesh: &mut [Complex<f64>], dims: [usize; 3], plans: &[Arc<dyn Fft<f64>>; 3]) {
    let [k0, k1, k2] = dims;

    for line in mesh.chunks_exact_mut(k2) {
        plans[2].process(line);
    }

    let mut buffer = vec![Complex::new(0.0, 0.0); k1.max(k0)];
    for a in 0..k0 {
        for c in 0..k2 {
            for b in 0..k1 {
                buffer[b] = mesh[(a * k1 + b) * k2 + c];
            }
            plans[1].process(&mut buffer[..k1]);
            for b in 0..k1 {
                mesh[(a * k1 + b) * k2 + c] = buffer[b];
            }
        }
    }

    for b in 0..k1 {
        for c in 0..k2 {
            for a in 0..k0 {
                buffer[a] = mesh[(a * k1 + b) * k2 + c];
            }
            plans[0].process(&mut buffer[..k0]);
            for a in 0..k0 {
                mesh[(a * k1 + b) * k2 + c] = buffer[a];
            }
        }
    }
}
