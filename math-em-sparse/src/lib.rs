//! Sparse storage, kernels and solver selection for electromagnetic FEM
//!
//! This crate is the numeric layer between finite-element assembly and an
//! external Krylov solver loop.
//!
//! # Features
//!
//! - **Sparse Matrices**: COO for assembly, CSR, block CSR (2x2/3x3 vector
//!   elements) and lower-triangle symmetric CSR for solving
//! - **Matrix Attributes**: symmetry, definiteness and field classification,
//!   presets for common electromagnetic scenarios and structural analysis
//! - **Preconditioners**: Jacobi, ILU(0), block ILU(0), identity
//! - **Adapter**: maps attributes to a solver/preconditioner choice and applies
//!   the divergence penalty to singular magnetostatic systems
//! - **MatrixMarket I/O**: coordinate real/complex files
//! - **Generic Scalar Types**: `f64` and `Complex64`
//!
//! # Example
//!
//! ```
//! use math_em_sparse::{CooMatrix, CsrMatrix, EmAdapter, MatrixAttribute, Preconditioner};
//! use ndarray::array;
//!
//! let mut coo = CooMatrix::new(2, 2)?;
//! coo.add_value(0, 0, 4.0)?;
//! coo.add_value(0, 1, -1.0)?;
//! coo.add_value(1, 0, -1.0)?;
//! coo.add_value(1, 1, 4.0)?;
//! let matrix = CsrMatrix::from_coo(&coo)?;
//!
//! let adapter = EmAdapter::default();
//! let attr = MatrixAttribute::electrostatic();
//! let config = adapter.auto_configure(&attr);
//! let system = adapter.prepare_system(&matrix, &attr)?;
//! let precond = adapter.build_preconditioner(&config, &system)?;
//!
//! let z = precond.apply(&array![3.0, 3.0])?;
//! let y = system.mat_vec(&z)?;
//! assert!((y[0] - 3.0).abs() < 1e-12);
//! # Ok::<(), math_em_sparse::SparseError>(())
//! ```

pub mod adapter;
pub mod attribute;
pub mod error;
pub mod io;
pub mod preconditioners;
pub mod sparse;
pub mod traits;

// Re-export main types
pub use error::{ErrorKind, Result, SparseError};
pub use sparse::{AnySparseMatrix, BlockCsrMatrix, CooMatrix, CsrMatrix, SymCsrMatrix};
pub use traits::{ComplexField, LinearOperator, Preconditioner, SparseFormat, SparseMatrixBase};

pub use attribute::{DataType, Definiteness, ElementType, FieldType, MatrixAttribute, Symmetry};

pub use adapter::{AdapterConfig, EmAdapter, PreconditionerType, SolverConfiguration, SolverType};

// Re-export preconditioners
pub use preconditioners::{
    BlockIlu0Preconditioner, IdentityPreconditioner, Ilu0Preconditioner, JacobiPreconditioner,
};

pub use io::{MatrixMarketHeader, MatrixMarketIo};
