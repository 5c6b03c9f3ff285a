//! Periodic boundary geometry and the cell-list spatial index built on it.

pub mod pair_list;
pub mod unit_cell;
