//! # Engine Module
//!
//! This module implements the stateful part of a GIST analysis: it turns a
//! stream of frames into per-voxel sums and reduces those sums into
//! thermodynamic fields.
//!
//! ## Overview
//!
//! Each frame passes through three stages. The [`accumulator`] bins every water
//! oxygen into the lattice, the [`energy`] evaluator computes per-atom nonbonded
//! energies (plain cutoff Coulomb or an [`ewald`] decomposition), and the
//! accumulator routes those energies, orientations, dipoles and neighbour
//! statistics into the voxel of each water. After the last frame the
//! [`reducer`] converts the sums into densities, entropies and energies.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Grid, water model and energy settings with a validating builder
//! - **Energy Evaluation** ([`energy`], [`ewald`]) - Direct-space pair evaluation and the particle-mesh Ewald split
//! - **Accumulation** ([`accumulator`]) - Per-voxel counts, energies and orientation samples
//! - **Analysis Kernels** ([`orientation`], [`order`]) - Euler angles and the tetrahedral order parameter
//! - **Reduction** ([`reducer`]) - Translational and orientational entropy, normalized energies, outputs
//! - **Progress Monitoring** ([`progress`]) - Progress reporting for front ends
//! - **Error Handling** ([`error`]) - Engine-specific error types and error propagation

pub mod accumulator;
pub mod config;
pub mod energy;
pub mod error;
pub mod ewald;
pub mod order;
pub mod orientation;
pub mod progress;
pub mod reducer;
