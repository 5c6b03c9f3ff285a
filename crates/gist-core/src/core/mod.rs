//! # Core Module
//!
//! This module provides the stateless building blocks of the GIST engine: molecular
//! topology, periodic geometry, pairwise energy functions, the voxel grid and I/O.
//!
//! ## Overview
//!
//! Nothing in `core` knows about frames being accumulated or about thermodynamic
//! reduction. It describes a single snapshot (a [`models::topology::Topology`] plus a
//! [`models::frame::Frame`]) and offers the geometric and energetic primitives the
//! [`crate::engine`] layer combines into a per-voxel analysis.
//!
//! ## Architecture
//!
//! - **Molecular Representation** ([`models`]) - Atoms, molecules, exclusions and frames
//! - **Periodic Geometry** ([`space`]) - Unit cells, minimum image and the cell-list pair search
//! - **Energy Functions** ([`forcefield`]) - Lennard-Jones and Coulomb/Ewald pair kernels
//! - **Voxel Grid** ([`grid`]) - Regular analysis grid and point-to-voxel mapping
//! - **File I/O** ([`io`]) - BGF trajectories, OpenDX volumes and tabular outputs
//!
//! ## Units
//!
//! Lengths are in Ångström, energies in kcal/mol and charges in elementary charges.
//! Angles supplied in box definitions are in degrees.

pub mod forcefield;
pub mod grid;
pub mod io;
pub mod models;
pub mod space;
