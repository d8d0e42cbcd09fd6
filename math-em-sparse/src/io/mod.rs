//! Text serialization of sparse matrices

mod matrix_market;

pub use matrix_market::{MatrixMarketHeader, MatrixMarketIo};
