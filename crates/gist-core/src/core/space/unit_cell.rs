use nalgebra::{Matrix3, Point3, Vector3};
use thiserror::Error;

const ORTHOGONAL_ANGLE_TOLERANCE_DEG: f64 = 1e-6;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CellError {
    #[error("Box length must be positive (got {a}, {b}, {c})")]
    NonPositiveLength { a: f64, b: f64, c: f64 },
    #[error("Box angles ({alpha}, {beta}, {gamma}) do not describe a valid cell")]
    InvalidAngles { alpha: f64, beta: f64, gamma: f64 },
    #[error("Unit cell matrix is singular (volume {0})")]
    Singular(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellShape {
    Orthogonal,
    Triclinic,
}

/// A periodic simulation cell.
///
/// The columns of `ucell` are the three lattice vectors. The `a` vector lies
/// along x and `b` lies in the xy plane. `recip` is the inverse of `ucell`, so
/// its rows are the reciprocal lattice vectors and `recip * r` gives
/// fractional coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitCell {
    ucell: Matrix3<f64>,
    recip: Matrix3<f64>,
    lengths: Vector3<f64>,
    angles: Vector3<f64>,
    shape: CellShape,
    volume: f64,
}

impl UnitCell {
    /// Builds a cell from box lengths (Å) and angles (degrees, alpha/beta/gamma).
    pub fn from_box(lengths: [f64; 3], angles: [f64; 3]) -> Result<Self, CellError> {
        let [la, lb, lc] = lengths;
        let [alpha, beta, gamma] = angles;
        if !(la > 0.0 && lb > 0.0 && lc > 0.0) {
            return Err(CellError::NonPositiveLength {
                a: la,
                b: lb,
                c: lc,
            });
        }

        let (cos_a, cos_b, cos_g) = (
            alpha.to_radians().cos(),
            beta.to_radians().cos(),
            gamma.to_radians().cos(),
        );
        let sin_g = gamma.to_radians().sin();
        let cy = (cos_a - cos_b * cos_g) / sin_g;
        let cz2 = 1.0 - cos_b * cos_b - cy * cy;
        if sin_g.abs() < 1e-12 || !(cz2 > 0.0) {
            return Err(CellError::InvalidAngles { alpha, beta, gamma });
        }

        let a = Vector3::new(la, 0.0, 0.0);
        let b = Vector3::new(lb * cos_g, lb * sin_g, 0.0);
        let c = Vector3::new(lc * cos_b, lc * cy, lc * cz2.sqrt());

        let is_right = |x: f64| (x - 90.0).abs() < ORTHOGONAL_ANGLE_TOLERANCE_DEG;
        let (ucell, shape) = if is_right(alpha) && is_right(beta) && is_right(gamma) {
            (
                Matrix3::from_diagonal(&Vector3::new(la, lb, lc)),
                CellShape::Orthogonal,
            )
        } else {
            (Matrix3::from_columns(&[a, b, c]), CellShape::Triclinic)
        };

        Self::from_parts(
            ucell,
            Vector3::new(la, lb, lc),
            Vector3::new(alpha, beta, gamma),
            shape,
        )
    }

    pub fn orthorhombic(lx: f64, ly: f64, lz: f64) -> Result<Self, CellError> {
        Self::from_box([lx, ly, lz], [90.0, 90.0, 90.0])
    }

    fn from_parts(
        ucell: Matrix3<f64>,
        lengths: Vector3<f64>,
        angles: Vector3<f64>,
        shape: CellShape,
    ) -> Result<Self, CellError> {
        let volume = ucell.determinant();
        if !(volume > 1e-12) {
            return Err(CellError::Singular(volume));
        }
        let recip = ucell.try_inverse().ok_or(CellError::Singular(volume))?;
        Ok(Self {
            ucell,
            recip,
            lengths,
            angles,
            shape,
            volume,
        })
    }

    #[inline]
    pub fn shape(&self) -> CellShape {
        self.shape
    }

    #[inline]
    pub fn is_orthogonal(&self) -> bool {
        self.shape == CellShape::Orthogonal
    }

    #[inline]
    pub fn ucell(&self) -> &Matrix3<f64> {
        &self.ucell
    }

    #[inline]
    pub fn recip(&self) -> &Matrix3<f64> {
        &self.recip
    }

    #[inline]
    pub fn lengths(&self) -> Vector3<f64> {
        self.lengths
    }

    #[inline]
    pub fn angles(&self) -> Vector3<f64> {
        self.angles
    }

    #[inline]
    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Lattice vector `i` (0 = a, 1 = b, 2 = c).
    #[inline]
    pub fn lattice_vector(&self, i: usize) -> Vector3<f64> {
        self.ucell.column(i).into_owned()
    }

    /// Reciprocal vector `i`, without the 2π factor.
    #[inline]
    pub fn reciprocal_vector(&self, i: usize) -> Vector3<f64> {
        self.recip.row(i).transpose()
    }

    /// Distance between the pair of lattice planes spanned by the other two vectors.
    pub fn perpendicular_widths(&self) -> Vector3<f64> {
        Vector3::from_fn(|i, _| 1.0 / self.reciprocal_vector(i).norm())
    }

    #[inline]
    pub fn to_fractional(&self, point: &Point3<f64>) -> Vector3<f64> {
        self.recip * point.coords
    }

    #[inline]
    pub fn to_cartesian(&self, frac: &Vector3<f64>) -> Point3<f64> {
        Point3::from(self.ucell * frac)
    }

    /// Fractional coordinates wrapped into `[0, 1)`.
    pub fn wrap_fractional(&self, point: &Point3<f64>) -> Vector3<f64> {
        self.to_fractional(point).map(|f| {
            let w = f - f.floor();
            // -1e-17 wraps to exactly 1.0 in floating point
            if w >= 1.0 { 0.0 } else { w }
        })
    }

    /// Shortest periodic image of a displacement vector.
    pub fn minimum_image(&self, delta: &Vector3<f64>) -> Vector3<f64> {
        match self.shape {
            CellShape::Orthogonal => Vector3::from_fn(|i, _| {
                let l = self.lengths[i];
                delta[i] - l * (delta[i] / l).round()
            }),
            CellShape::Triclinic => {
                let frac = (self.recip * delta).map(|f| f - f.round());
                let base = self.ucell * frac;
                let mut best = base;
                let mut best_d2 = base.norm_squared();
                for i in -1..=1 {
                    for j in -1..=1 {
                        for k in -1..=1 {
                            if i == 0 && j == 0 && k == 0 {
                                continue;
                            }
                            let shift = Vector3::new(i as f64, j as f64, k as f64);
                            let candidate = base + self.ucell * shift;
                            let d2 = candidate.norm_squared();
                            if d2 < best_d2 {
                                best_d2 = d2;
                                best = candidate;
                            }
                        }
                    }
                }
                best
            }
        }
    }

    /// Squared minimum-image distance between two points.
    #[inline]
    pub fn distance2(&self, a: &Point3<f64>, b: &Point3<f64>) -> f64 {
        self.minimum_image(&(b - a)).norm_squared()
    }
}
