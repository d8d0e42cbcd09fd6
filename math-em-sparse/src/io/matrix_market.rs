//! MatrixMarket coordinate format
//!
//! ```text
//! %%MatrixMarket matrix coordinate real general
//! % comment
//! 3 3 4
//! 1 1 4.0
//! 2 1 1.0
//! ...
//! ```
//!
//! Only `coordinate` storage with `real` or `complex` values is handled.
//! Entries are returned exactly as stored; symmetric files are not expanded,
//! the qualifier is reported alongside the matrix instead.

use crate::attribute::{DataType, Symmetry};
use crate::error::{Result, SparseError};
use crate::sparse::{CooMatrix, CsrMatrix, SymCsrMatrix};
use crate::traits::ComplexField;
use num_traits::FromPrimitive;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

const BANNER: &str = "%%MatrixMarket";

/// Upper bound on triplets reserved up front from a size line
const MAX_PREALLOCATED_ENTRIES: usize = 1 << 20;

/// Parsed banner line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixMarketHeader {
    /// `real` or `complex`
    pub data_type: DataType,
    /// Symmetry qualifier (`general` maps to [`Symmetry::Unsymmetric`])
    pub symmetry: Symmetry,
}

impl MatrixMarketHeader {
    /// Parse the `%%MatrixMarket` banner
    pub fn parse(line: &str) -> Result<Self> {
        let tokens: Vec<String> = line.split_whitespace().map(str::to_lowercase).collect();
        if tokens.first().map(String::as_str) != Some("%%matrixmarket") {
            return Err(SparseError::Parse {
                line: 1,
                message: format!("expected '{BANNER}' banner"),
            });
        }
        if tokens.len() != 5 {
            return Err(SparseError::Parse {
                line: 1,
                message: format!("banner has {} fields, expected 5", tokens.len()),
            });
        }
        if tokens[1] != "matrix" {
            return Err(SparseError::UnsupportedFormat(format!("object '{}'", tokens[1])));
        }
        if tokens[2] != "coordinate" {
            return Err(SparseError::UnsupportedFormat(format!(
                "'{}' storage, only 'coordinate' is supported",
                tokens[2]
            )));
        }
        let data_type = match tokens[3].as_str() {
            "real" => DataType::Real,
            "complex" => DataType::Complex,
            other => {
                return Err(SparseError::UnsupportedFormat(format!(
                    "'{other}' values, only 'real' and 'complex' are supported"
                )));
            }
        };
        let symmetry = match tokens[4].as_str() {
            "general" => Symmetry::Unsymmetric,
            "symmetric" => Symmetry::Symmetric,
            "hermitian" => Symmetry::Hermitian,
            "skew-symmetric" => Symmetry::SkewSymmetric,
            other => {
                return Err(SparseError::UnsupportedFormat(format!("symmetry '{other}'")));
            }
        };
        Ok(Self { data_type, symmetry })
    }

    /// Banner line for this header
    pub fn banner(&self) -> String {
        let field = match self.data_type {
            DataType::Real => "real",
            DataType::Complex => "complex",
        };
        let symmetry = match self.symmetry {
            Symmetry::Unsymmetric => "general",
            Symmetry::Symmetric => "symmetric",
            Symmetry::Hermitian => "hermitian",
            Symmetry::SkewSymmetric => "skew-symmetric",
        };
        format!("{BANNER} matrix coordinate {field} {symmetry}")
    }
}

/// Reader and writer for MatrixMarket coordinate files
pub struct MatrixMarketIo;

impl MatrixMarketIo {
    /// Read triplets and the symmetry qualifier.
    ///
    /// A complex file cannot be read into a real matrix; real files read into
    /// complex matrices get zero imaginary parts.
    pub fn read_coo<T: ComplexField, R: BufRead>(reader: R) -> Result<(CooMatrix<T>, Symmetry)> {
        let mut lines = reader.lines().enumerate().map(|(i, l)| (i + 1, l));

        let header = match lines.next() {
            Some((_, line)) => MatrixMarketHeader::parse(&line?)?,
            None => {
                return Err(SparseError::Parse {
                    line: 1,
                    message: "empty input".to_string(),
                });
            }
        };
        if header.data_type == DataType::Complex && T::DATA_TYPE == DataType::Real {
            return Err(SparseError::UnsupportedFormat(
                "complex file cannot be read into a real matrix".to_string(),
            ));
        }

        let mut coo: Option<CooMatrix<T>> = None;
        let mut expected = 0usize;
        let mut last_line = 1;

        for (line_no, line) in lines {
            let line = line?;
            let line = line.trim();
            last_line = line_no;
            if line.is_empty() || line.starts_with('%') {
                continue;
            }
            let parts: Vec<&str> = line.split_whitespace().collect();

            let Some(matrix) = coo.as_mut() else {
                let [rows, cols, nnz] = parse_size_line(&parts, line_no)?;
                if rows == 0 || cols == 0 {
                    return Err(SparseError::Parse {
                        line: line_no,
                        message: format!("dimensions must be positive, got {rows}x{cols}"),
                    });
                }
                if rows.checked_mul(cols).is_some_and(|slots| nnz > slots) {
                    return Err(SparseError::Parse {
                        line: line_no,
                        message: format!("{nnz} entries cannot fit in a {rows}x{cols} matrix"),
                    });
                }
                expected = nnz;
                coo = Some(CooMatrix::with_capacity(
                    rows,
                    cols,
                    nnz.min(MAX_PREALLOCATED_ENTRIES),
                )?);
                continue;
            };

            if matrix.nnz() == expected {
                return Err(SparseError::Parse {
                    line: line_no,
                    message: format!("more than the declared {expected} entries"),
                });
            }
            let (row, col, value) = parse_entry::<T>(&parts, header.data_type, line_no)?;
            if row == 0 || col == 0 || row > matrix.rows() || col > matrix.cols() {
                return Err(SparseError::Parse {
                    line: line_no,
                    message: format!(
                        "index ({row}, {col}) outside 1..={} x 1..={}",
                        matrix.rows(),
                        matrix.cols()
                    ),
                });
            }
            matrix.add_value(row - 1, col - 1, value)?;
        }

        let coo = coo.ok_or_else(|| SparseError::Parse {
            line: last_line,
            message: "missing size line".to_string(),
        })?;
        if coo.nnz() != expected {
            return Err(SparseError::Parse {
                line: last_line,
                message: format!("expected {expected} entries, found {}", coo.nnz()),
            });
        }

        log::info!(
            "read MatrixMarket {}x{} with {} entries ({:?})",
            coo.rows(),
            coo.cols(),
            coo.nnz(),
            header.symmetry
        );
        Ok((coo, header.symmetry))
    }

    /// Read a file into COO triplets
    pub fn read_coo_file<T: ComplexField, P: AsRef<Path>>(
        path: P,
    ) -> Result<(CooMatrix<T>, Symmetry)> {
        let file = File::open(path)?;
        Self::read_coo(BufReader::new(file))
    }

    /// Read and build a CSR matrix (entries as stored)
    pub fn read_csr<T: ComplexField, R: BufRead>(reader: R) -> Result<(CsrMatrix<T>, Symmetry)> {
        let (coo, symmetry) = Self::read_coo(reader)?;
        Ok((CsrMatrix::from_coo(&coo)?, symmetry))
    }

    /// Read a file and build a CSR matrix
    pub fn read_csr_file<T: ComplexField, P: AsRef<Path>>(
        path: P,
    ) -> Result<(CsrMatrix<T>, Symmetry)> {
        let file = File::open(path)?;
        Self::read_csr(BufReader::new(file))
    }

    /// Write COO triplets with the `general` qualifier
    pub fn write_coo<T: ComplexField, W: Write>(writer: W, coo: &CooMatrix<T>) -> Result<()> {
        write_entries(
            writer,
            Symmetry::Unsymmetric,
            (coo.rows(), coo.cols(), coo.nnz()),
            coo.iter(),
        )
    }

    /// Write COO triplets to a file
    pub fn write_coo_file<T: ComplexField, P: AsRef<Path>>(
        path: P,
        coo: &CooMatrix<T>,
    ) -> Result<()> {
        let file = File::create(path)?;
        Self::write_coo(file, coo)
    }

    /// Write a built CSR matrix with the `general` qualifier
    pub fn write_csr<T: ComplexField, W: Write>(writer: W, csr: &CsrMatrix<T>) -> Result<()> {
        let coo = csr.to_coo()?;
        Self::write_coo(writer, &coo)
    }

    /// Write a built CSR matrix to a file
    pub fn write_csr_file<T: ComplexField, P: AsRef<Path>>(
        path: P,
        csr: &CsrMatrix<T>,
    ) -> Result<()> {
        let file = File::create(path)?;
        Self::write_csr(file, csr)
    }

    /// Write the stored lower triangle with the `symmetric` qualifier
    pub fn write_sym_csr<T: ComplexField, W: Write>(
        writer: W,
        matrix: &SymCsrMatrix<T>,
    ) -> Result<()> {
        let coo = matrix.to_coo()?;
        write_entries(
            writer,
            Symmetry::Symmetric,
            (coo.rows(), coo.cols(), coo.nnz()),
            coo.iter(),
        )
    }

    /// Write a symmetric matrix to a file
    pub fn write_sym_csr_file<T: ComplexField, P: AsRef<Path>>(
        path: P,
        matrix: &SymCsrMatrix<T>,
    ) -> Result<()> {
        let file = File::create(path)?;
        Self::write_sym_csr(file, matrix)
    }
}

fn parse_size_line(parts: &[&str], line: usize) -> Result<[usize; 3]> {
    if parts.len() != 3 {
        return Err(SparseError::Parse {
            line,
            message: format!("size line needs 'rows cols nnz', got {} fields", parts.len()),
        });
    }
    let mut out = [0usize; 3];
    for (slot, token) in out.iter_mut().zip(parts) {
        *slot = token.parse().map_err(|_| SparseError::Parse {
            line,
            message: format!("'{token}' is not a non-negative integer"),
        })?;
    }
    Ok(out)
}

fn parse_entry<T: ComplexField>(
    parts: &[&str],
    data_type: DataType,
    line: usize,
) -> Result<(usize, usize, T)> {
    let fields = match data_type {
        DataType::Real => 3,
        DataType::Complex => 4,
    };
    if parts.len() != fields {
        return Err(SparseError::Parse {
            line,
            message: format!("expected {fields} fields, got {}", parts.len()),
        });
    }
    let index = |token: &str| -> Result<usize> {
        token.parse().map_err(|_| SparseError::Parse {
            line,
            message: format!("'{token}' is not a valid index"),
        })
    };
    let number = |token: &str| -> Result<T::Real> {
        token
            .parse::<f64>()
            .ok()
            .and_then(T::Real::from_f64)
            .ok_or_else(|| SparseError::Parse {
                line,
                message: format!("'{token}' is not a valid number"),
            })
    };

    let row = index(parts[0])?;
    let col = index(parts[1])?;
    let re = number(parts[2])?;
    let value = match data_type {
        DataType::Real => T::from_real(re),
        DataType::Complex => T::from_re_im(re, number(parts[3])?),
    };
    Ok((row, col, value))
}

fn write_entries<T: ComplexField, W: Write>(
    writer: W,
    symmetry: Symmetry,
    (rows, cols, nnz): (usize, usize, usize),
    entries: impl Iterator<Item = (usize, usize, T)>,
) -> Result<()> {
    let header = MatrixMarketHeader {
        data_type: T::DATA_TYPE,
        symmetry,
    };
    let mut w = BufWriter::new(writer);
    writeln!(w, "{}", header.banner())?;
    writeln!(w, "{rows} {cols} {nnz}")?;
    for (r, c, v) in entries {
        match T::DATA_TYPE {
            DataType::Real => writeln!(w, "{} {} {}", r + 1, c + 1, v.re())?,
            DataType::Complex => writeln!(w, "{} {} {} {}", r + 1, c + 1, v.re(), v.im())?,
        }
    }
    w.flush()?;
    log::info!("wrote MatrixMarket {rows}x{cols} with {nnz} entries ({symmetry:?})");
    Ok(())
}
