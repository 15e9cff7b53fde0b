use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure of a single pairwise comparison.
///
/// These are scoped to one (token, match) pair; the matcher decides whether to
/// skip the pair or stop the run.
#[derive(Debug, Error)]
pub enum CompareError {
    #[error("failed to open '{}'", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read block {block} of '{}'", path.display())]
    Read {
        path: PathBuf,
        block: usize,
        #[source]
        source: io::Error,
    },

    #[error("file #{file_id} was not registered with the hash cache")]
    Unregistered { file_id: usize },

    #[error("block {block} requested for file #{file_id} whose track holds {len} blocks")]
    OutOfOrder {
        file_id: usize,
        block: usize,
        len: usize,
    },
}
