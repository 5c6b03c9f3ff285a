//! # Workflows Module
//!
//! This module provides the high-level entry point that runs a complete GIST
//! analysis from a frame source to a set of output fields.
//!
//! ## Overview
//!
//! A workflow owns the whole pipeline: it validates the configuration, builds
//! the energy evaluator for the source's topology, streams every frame through
//! the per-voxel accumulator, reduces the sums and hands the results to a sink.
//! Callers only provide a [`FrameSource`](crate::core::io::traits::FrameSource),
//! a [`GistSink`](crate::core::io::traits::GistSink) and a configuration.
//!
//! ## Architecture
//!
//! - **GIST Workflow** ([`gist`]) - Setup, per-frame accumulation, reduction and output phases
//!   with progress reporting through [`ProgressReporter`](crate::engine::progress::ProgressReporter).

pub mod gist;
