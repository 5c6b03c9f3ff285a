//! # GIST++ Core Library
//!
//! A high-performance library for Grid Inhomogeneous Solvation Theory (GIST):
//! voxel-resolved solvation thermodynamics computed from molecular dynamics
//! trajectories.
//!
//! ## Architectural Philosophy
//!
//! The library is designed with a strict three-layer architecture to ensure a clear separation of concerns,
//! making it modular, testable, and extensible.
//!
//! - **[`core`]: The Foundation.** Contains stateless data models (`Topology`, `Frame`),
//!   periodic geometry and the spatial cell list, the voxel lattice, pure forcefield
//!   potentials, and I/O (BGF trajectories, OpenDX fields, column tables).
//!
//! - **[`engine`]: The Logic Core.** This stateful layer evaluates per-atom nonbonded
//!   energies (direct Coulomb or a particle-mesh Ewald decomposition), accumulates
//!   occupancy, energies and orientations per voxel, and reduces them into densities,
//!   entropies and normalized energies.
//!
//! - **[`workflows`]: The Public API.** This is the highest-level, user-facing layer. It ties the
//!   `engine` and `core` together to run a complete analysis over a trajectory and write
//!   every output field through a sink.

pub mod core;
pub mod engine;
pub mod workflows;

#[cfg(test)]
pub(crate) mod testing;
