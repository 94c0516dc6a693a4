//! Interpreter errors

use std::path::PathBuf;

use thiserror::Error;

use crate::cache::Location;

/// Interpreter result type
pub type Result<T> = std::result::Result<T, Error>;

/// Interpreter errors
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unbalanced loop close at position {position} ({location})")]
    UnbalancedClose { position: usize, location: Location },

    #[error("tape underflow: moved left of cell 0 at position {position} ({location})")]
    TapeUnderflow { position: usize, location: Location },
}
