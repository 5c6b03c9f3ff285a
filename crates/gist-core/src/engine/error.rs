use thiserror::Error;

use super::config::ConfigError;
use crate::core::models::topology::TopologyError;
use crate::core::space::pair_list::PairListError;
use crate::core::space::unit_cell::CellError;

type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Setup failed: {0}")]
    Setup(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Invalid topology: {source}")]
    Topology {
        #[from]
        source: TopologyError,
    },

    #[error("Invalid periodic box: {source}")]
    Cell {
        #[from]
        source: CellError,
    },

    #[error("Pair list construction failed: {source}")]
    PairList {
        #[from]
        source: PairListError,
    },

    #[error("PME grid along axis {axis} needs {required} points, limit is {max}")]
    GridSizing {
        axis: usize,
        required: usize,
        max: usize,
    },

    #[error("Failed to read frame {frame}: {source}")]
    FrameSource { frame: usize, source: BoxedError },

    #[error("Failed to write output '{name}': {source}")]
    Output { name: String, source: BoxedError },

    #[error("Internal logic error: {0}")]
    Internal(String),
}
