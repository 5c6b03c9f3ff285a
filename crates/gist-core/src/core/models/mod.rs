//! Static topology and per-frame coordinate models consumed by the engine.

pub mod atom;
pub mod frame;
pub mod topology;
