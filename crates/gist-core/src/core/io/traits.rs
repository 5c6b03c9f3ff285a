use crate::core::grid::VoxelGrid;
use crate::core::models::frame::Frame;
use crate::core::models::topology::Topology;
use std::error::Error;

/// A read-only trajectory: a static topology and a sequence of frames.
pub trait FrameSource {
    /// The error type for frame reads.
    type Error: Error + Send + Sync + 'static;

    /// Topology shared by every frame.
    fn topology(&self) -> &Topology;

    /// Reads the next frame.
    ///
    /// # Return
    ///
    /// Returns `Ok(None)` once the trajectory is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be read or does not match the topology.
    fn next_frame(&mut self) -> Result<Option<Frame>, Self::Error>;

    /// Number of frames, when known without reading them.
    fn frame_count_hint(&self) -> Option<usize> {
        None
    }
}

/// Receives the named outputs of a GIST run.
///
/// Series are per-frame scalars; fields are per-voxel arrays laid out in
/// voxel index order.
pub trait GistSink {
    /// The error type for sink operations.
    type Error: Error + Send + Sync + 'static;

    /// Accepts a complete per-frame scalar series.
    fn write_series(&mut self, name: &str, values: &[f64]) -> Result<(), Self::Error>;

    /// Accepts a final per-voxel scalar field.
    fn write_field(
        &mut self,
        name: &str,
        grid: &VoxelGrid,
        values: &[f64],
    ) -> Result<(), Self::Error>;

    /// Accepts the per-voxel summary table.
    fn write_table(
        &mut self,
        name: &str,
        headers: &[&str],
        columns: &[&[f64]],
    ) -> Result<(), Self::Error>;

    /// Accepts the sparse voxel-pair energy listing `(higher, lower, energy)`.
    fn write_pair_energies(
        &mut self,
        name: &str,
        entries: &[(usize, usize, f64)],
    ) -> Result<(), Self::Error>;
}
