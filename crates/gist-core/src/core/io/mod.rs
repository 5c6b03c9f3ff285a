//! Provides input/output for trajectories and GIST results.
//!
//! Trajectories are read through the [`traits::FrameSource`] trait, with a
//! multi-frame BGF reader in [`bgf`]. Results leave the engine through the
//! [`traits::GistSink`] trait; [`sink::DirectorySink`] writes OpenDX volumes
//! ([`dx`]) and whitespace-delimited tables ([`table`]) into one directory.

pub mod bgf;
pub mod dx;
pub mod sink;
pub mod table;
pub mod traits;
