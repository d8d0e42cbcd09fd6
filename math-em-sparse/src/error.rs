//! Error types for sparse storage, kernels and preconditioners.
//!
//! Every fallible operation in this crate reports a [`SparseError`]. Errors are
//! grouped into four broad categories (see [`ErrorKind`]) so that assembly and
//! solver layers can decide whether to abort, skip or rebuild without matching on
//! individual variants.

use thiserror::Error;

/// Broad category of a [`SparseError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad dimensions, operand size mismatches, malformed or unsupported input.
    InvalidArgument,
    /// A triplet or block index outside the declared bounds.
    OutOfRange,
    /// The operation requires a built matrix.
    PreconditionViolation,
    /// The sparsity structure does not allow the operation.
    StructuralViolation,
}

/// Errors that can occur while building, converting or applying sparse matrices.
#[derive(Debug, Error)]
pub enum SparseError {
    /// Matrix dimensions must be strictly positive.
    #[error("invalid dimensions: {rows}x{cols} (both must be > 0)")]
    InvalidDimensions {
        /// Requested number of rows
        rows: usize,
        /// Requested number of columns
        cols: usize,
    },

    /// Two operands have incompatible sizes.
    #[error("{context}: expected {expected}, got {got}")]
    DimensionMismatch {
        /// What was being checked
        context: &'static str,
        /// Expected size
        expected: usize,
        /// Actual size
        got: usize,
    },

    /// Generic invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Index outside `[0, rows) x [0, cols)`.
    #[error("index ({row}, {col}) out of range for {rows}x{cols} matrix")]
    OutOfRange {
        /// Offending row index
        row: usize,
        /// Offending column index
        col: usize,
        /// Number of rows
        rows: usize,
        /// Number of columns
        cols: usize,
    },

    /// Operation called on a matrix that has not been built yet.
    #[error("{operation} called on an unbuilt matrix")]
    NotBuilt {
        /// Name of the rejected operation
        operation: &'static str,
    },

    /// Symmetric storage received an entry above the diagonal.
    #[error("entry ({row}, {col}) lies in the strict upper triangle")]
    StrictUpperTriangle {
        /// Row index of the entry
        row: usize,
        /// Column index of the entry
        col: usize,
    },

    /// A diagonal slot is absent from the sparsity pattern.
    #[error("diagonal entry {index} is not part of the sparsity pattern")]
    MissingDiagonal {
        /// Row (or block row) without a diagonal slot
        index: usize,
    },

    /// Factorization hit a pivot below tolerance.
    #[error("pivot at row {row} is numerically zero")]
    SingularPivot {
        /// Row (or block row) of the zero pivot
        row: usize,
    },

    /// IO error while reading or writing a matrix file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed line in a MatrixMarket stream.
    #[error("parse error at line {line}: {message}")]
    Parse {
        /// 1-based line number
        line: usize,
        /// Description of the problem
        message: String,
    },

    /// MatrixMarket variant not handled by this crate.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

/// A specialized `Result` type for sparse operations.
pub type Result<T> = std::result::Result<T, SparseError>;

impl SparseError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SparseError::OutOfRange { .. } => ErrorKind::OutOfRange,
            SparseError::NotBuilt { .. } => ErrorKind::PreconditionViolation,
            SparseError::StrictUpperTriangle { .. }
            | SparseError::MissingDiagonal { .. }
            | SparseError::SingularPivot { .. } => ErrorKind::StructuralViolation,
            SparseError::InvalidDimensions { .. }
            | SparseError::DimensionMismatch { .. }
            | SparseError::InvalidArgument(_)
            | SparseError::Io(_)
            | SparseError::Parse { .. }
            | SparseError::UnsupportedFormat(_)
            | SparseError::Config(_) => ErrorKind::InvalidArgument,
        }
    }

    /// Returns `true` for argument, size and format errors.
    pub fn is_invalid_argument(&self) -> bool {
        self.kind() == ErrorKind::InvalidArgument
    }

    /// Returns `true` if an index was out of bounds.
    pub fn is_out_of_range(&self) -> bool {
        self.kind() == ErrorKind::OutOfRange
    }

    /// Returns `true` if the matrix was used before being built.
    pub fn is_precondition_violation(&self) -> bool {
        self.kind() == ErrorKind::PreconditionViolation
    }

    /// Returns `true` if the sparsity structure forbids the operation.
    pub fn is_structural_violation(&self) -> bool {
        self.kind() == ErrorKind::StructuralViolation
    }

    pub(crate) fn mismatch(context: &'static str, expected: usize, got: usize) -> Self {
        SparseError::DimensionMismatch {
            context,
            expected,
            got,
        }
    }
}

pub(crate) fn check_dimensions(rows: usize, cols: usize) -> Result<()> {
    if rows == 0 || cols == 0 {
        return Err(SparseError::InvalidDimensions { rows, cols });
    }
    Ok(())
}
