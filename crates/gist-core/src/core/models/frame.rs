use crate::core::space::unit_cell::UnitCell;
use nalgebra::Point3;

/// One trajectory snapshot: coordinates in topology order plus the periodic cell.
#[derive(Debug, Clone)]
pub struct Frame {
    pub positions: Vec<Point3<f64>>,
    pub cell: Option<UnitCell>,
}

impl Frame {
    pub fn new(positions: Vec<Point3<f64>>, cell: Option<UnitCell>) -> Self {
        Self { positions, cell }
    }

    #[inline]
    pub fn atom_count(&self) -> usize {
        self.positions.len()
    }
}
