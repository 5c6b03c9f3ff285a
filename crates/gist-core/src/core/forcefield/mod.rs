//! # Force Field Module
//!
//! Pairwise nonbonded energy functions and their parameters.
//!
//! ## Overview
//!
//! GIST attributes solute-water and water-water interaction energy to voxels, so
//! the force field only needs the nonbonded part of a classical potential:
//!
//! - **Van der Waals interactions** as 12-6 Lennard-Jones in `A/r^12 - B/r^6` form,
//!   with an optional smooth switching function near the cutoff
//! - **Electrostatic interactions** as plain Coulomb or as the real-space part of
//!   an Ewald sum, plus the exclusion correction the Ewald path requires
//!
//! ## Key Components
//!
//! - [`params`] - Per-type Lennard-Jones parameters and the combined pair table
//! - [`potentials`] - Pure potential functions and the Ewald coefficient solver
//! - [`kernel`] - The pair kernel used by every direct-space loop
//! - [`term`] - Energy term aggregation

pub mod kernel;
pub mod params;
pub mod potentials;
pub mod term;
