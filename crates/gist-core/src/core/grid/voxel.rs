use nalgebra::{Point3, Vector3};

/// Distance (Å) an oxygen may sit outside the lattice and still have its
/// hydrogens binned.
pub const OXYGEN_MARGIN: f64 = 1.5;

/// Result of locating a water oxygen against the lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OxygenPlacement {
    /// Inside the lattice, at the given voxel.
    OnGrid(usize),
    /// Outside the lattice but within [`OXYGEN_MARGIN`] of it on every axis.
    Margin,
    /// Too far away for any of the molecule's atoms to be binned.
    Outside,
}

impl OxygenPlacement {
    #[inline]
    pub fn voxel(self) -> Option<usize> {
        match self {
            Self::OnGrid(v) => Some(v),
            _ => None,
        }
    }

    #[inline]
    pub fn within_margin(self) -> bool {
        !matches!(self, Self::Outside)
    }
}

/// Fixed rectilinear analysis lattice.
///
/// Voxels are numbered `((ix * ny) + iy) * nz + iz`, so z varies fastest.
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelGrid {
    origin: Point3<f64>,
    spacing: f64,
    dims: [usize; 3],
}

impl VoxelGrid {
    /// Builds a lattice of `dims` voxels of edge `spacing` centred on `center`.
    pub fn centered(center: Point3<f64>, dims: [usize; 3], spacing: f64) -> Self {
        let half_extent = Vector3::new(dims[0] as f64, dims[1] as f64, dims[2] as f64)
            * (0.5 * spacing);
        Self {
            origin: center - half_extent,
            spacing,
            dims,
        }
    }

    pub fn with_origin(origin: Point3<f64>, dims: [usize; 3], spacing: f64) -> Self {
        Self {
            origin,
            spacing,
            dims,
        }
    }

    #[inline]
    pub fn origin(&self) -> Point3<f64> {
        self.origin
    }

    #[inline]
    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    #[inline]
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn voxel_volume(&self) -> f64 {
        self.spacing.powi(3)
    }

    #[inline]
    pub fn index(&self, ix: usize, iy: usize, iz: usize) -> usize {
        (ix * self.dims[1] + iy) * self.dims[2] + iz
    }

    pub fn coords(&self, index: usize) -> [usize; 3] {
        let iz = index % self.dims[2];
        let iy = (index / self.dims[2]) % self.dims[1];
        let ix = index / (self.dims[1] * self.dims[2]);
        [ix, iy, iz]
    }

    pub fn voxel_center(&self, index: usize) -> Point3<f64> {
        let [ix, iy, iz] = self.coords(index);
        self.origin
            + Vector3::new(ix as f64 + 0.5, iy as f64 + 0.5, iz as f64 + 0.5) * self.spacing
    }

    /// Maps a point to its voxel, or `None` when it is off the lattice.
    pub fn locate(&self, point: &Point3<f64>) -> Option<usize> {
        let offset = point - self.origin;
        let mut bin = [0usize; 3];
        for k in 0..3 {
            if !(offset[k] >= 0.0) {
                return None;
            }
            let i = (offset[k] / self.spacing).floor() as usize;
            if i >= self.dims[k] {
                return None;
            }
            bin[k] = i;
        }
        Some(self.index(bin[0], bin[1], bin[2]))
    }

    /// Locates a water oxygen, distinguishing points in the hydrogen margin.
    pub fn locate_oxygen(&self, point: &Point3<f64>) -> OxygenPlacement {
        let offset = point - self.origin;
        let in_margin = (0..3).all(|k| {
            let extent = self.dims[k] as f64 * self.spacing;
            offset[k] >= -OXYGEN_MARGIN && offset[k] <= extent + OXYGEN_MARGIN
        });
        if !in_margin {
            return OxygenPlacement::Outside;
        }
        match self.locate(point) {
            Some(voxel) => OxygenPlacement::OnGrid(voxel),
            None => OxygenPlacement::Margin,
        }
    }
}
