use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlasmaError {
    #[error("Invalid ionization mode '{0}': expected CIE or PIE")]
    InvalidMode(String),

    #[error("Incompatible shape for {argument}: got {actual:?}, expected {expected:?}")]
    IncompatibleShapes {
        argument: &'static str,
        actual: Vec<usize>,
        expected: Vec<usize>,
    },

    #[error("Invalid query arguments: {0}")]
    InvalidArguments(String),

    #[error("Query resolved to no batches")]
    NoBatchesResolved,

    #[error("No open handle for batch {batch}")]
    BatchHandleMissing { batch: usize },

    #[error("Batch supply failed: {0}")]
    Supply(String),

    #[error("Table error: {0}")]
    Table(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type PlasmaResult<T> = Result<T, PlasmaError>;
