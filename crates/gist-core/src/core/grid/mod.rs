//! The rectilinear voxel lattice that defines the GIST region of interest.

pub mod voxel;

pub use voxel::{OxygenPlacement, VoxelGrid};
