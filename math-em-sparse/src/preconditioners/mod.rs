//! Preconditioners for iterative solvers
//!
//! Preconditioners approximate A^(-1) to accelerate convergence of the Krylov
//! loop that consumes this crate. Each one is built once from a matrix
//! snapshot and applied any number of times.
//!
//! # Available Preconditioners
//!
//! - **JacobiPreconditioner**: reciprocal diagonal with a small-value floor
//! - **Ilu0Preconditioner**: scalar ILU(0) on the CSR pattern
//! - **BlockIlu0Preconditioner**: ILU(0) over the dense blocks of vector elements
//! - **IdentityPreconditioner**: no preconditioning

mod block_ilu0;
mod ilu0;
mod jacobi;

pub use block_ilu0::BlockIlu0Preconditioner;
pub use ilu0::Ilu0Preconditioner;
pub use jacobi::JacobiPreconditioner;

// Re-export IdentityPreconditioner from traits
pub use crate::traits::IdentityPreconditioner;
