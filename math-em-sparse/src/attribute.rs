//! Matrix attribute classification
//!
//! A [`MatrixAttribute`] records what is known about a system matrix: symmetry,
//! definiteness, scalar type, element type, the physical field it discretizes and
//! whether it is singular. The solver/preconditioner adapter only looks at these
//! tags, never at the matrix itself.

use crate::error::{Result, SparseError};
use crate::sparse::CsrMatrix;
use crate::traits::ComplexField;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Symmetry class of a matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Symmetry {
    /// No symmetry assumed
    #[default]
    Unsymmetric,
    /// A = A^T
    Symmetric,
    /// A = A^H
    Hermitian,
    /// A = -A^T
    SkewSymmetric,
}

/// Definiteness class of a matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Definiteness {
    /// Eigenvalues of both signs, or unknown
    #[default]
    Indefinite,
    /// x^H A x > 0 for x != 0
    PositiveDefinite,
    /// x^H A x >= 0
    PositiveSemidefinite,
    /// x^H A x < 0 for x != 0
    NegativeDefinite,
    /// x^H A x <= 0
    NegativeSemidefinite,
}

/// Scalar type of the stored values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// `f64`
    #[default]
    Real,
    /// `Complex64`
    Complex,
}

/// Finite-element family that produced the matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ElementType {
    /// Nodal scalar elements
    #[default]
    #[serde(rename = "scalar")]
    Scalar,
    /// Two unknowns per node (2D vector elements)
    #[serde(rename = "vector_2d")]
    Vector2D,
    /// Three unknowns per node (3D vector elements)
    #[serde(rename = "vector_3d")]
    Vector3D,
}

impl ElementType {
    /// Block edge length used for this element type, `None` for scalar elements
    pub fn block_dim(self) -> Option<usize> {
        match self {
            ElementType::Scalar => None,
            ElementType::Vector2D => Some(2),
            ElementType::Vector3D => Some(3),
        }
    }
}

/// Physical field discretized by the matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Electric scalar potential
    #[default]
    Electrostatic,
    /// Static magnetic field (curl-curl)
    Magnetostatic,
    /// Time-harmonic low-frequency magnetic field with conduction
    EddyCurrent,
    /// Full-wave time-harmonic field
    Wave,
}

/// Classification record of a system matrix.
///
/// `is_spd` and `is_hermitian` are derived from symmetry, definiteness and data
/// type; every setter recomputes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AttributeTags", into = "AttributeTags")]
pub struct MatrixAttribute {
    symmetry: Symmetry,
    definiteness: Definiteness,
    data_type: DataType,
    element_type: ElementType,
    field_type: FieldType,
    is_singular: bool,
    is_spd: bool,
    is_hermitian: bool,
}

/// Serialized form of [`MatrixAttribute`]; derived flags are never stored.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
struct AttributeTags {
    symmetry: Symmetry,
    definiteness: Definiteness,
    data_type: DataType,
    element_type: ElementType,
    field_type: FieldType,
    is_singular: bool,
}

impl From<AttributeTags> for MatrixAttribute {
    fn from(t: AttributeTags) -> Self {
        MatrixAttribute::new(
            t.symmetry,
            t.definiteness,
            t.data_type,
            t.element_type,
            t.field_type,
            t.is_singular,
        )
    }
}

impl From<MatrixAttribute> for AttributeTags {
    fn from(a: MatrixAttribute) -> Self {
        AttributeTags {
            symmetry: a.symmetry,
            definiteness: a.definiteness,
            data_type: a.data_type,
            element_type: a.element_type,
            field_type: a.field_type,
            is_singular: a.is_singular,
        }
    }
}

impl Default for MatrixAttribute {
    fn default() -> Self {
        AttributeTags::default().into()
    }
}

impl MatrixAttribute {
    /// Create an attribute record from its source tags
    pub fn new(
        symmetry: Symmetry,
        definiteness: Definiteness,
        data_type: DataType,
        element_type: ElementType,
        field_type: FieldType,
        is_singular: bool,
    ) -> Self {
        let mut attr = Self {
            symmetry,
            definiteness,
            data_type,
            element_type,
            field_type,
            is_singular,
            is_spd: false,
            is_hermitian: false,
        };
        attr.update_derived();
        attr
    }

    fn update_derived(&mut self) {
        self.is_spd = matches!(self.symmetry, Symmetry::Symmetric | Symmetry::Hermitian)
            && self.definiteness == Definiteness::PositiveDefinite;
        self.is_hermitian = self.symmetry == Symmetry::Hermitian
            || (self.symmetry == Symmetry::Symmetric && self.data_type == DataType::Real);
    }

    /// Nodal electrostatic potential: real SPD scalar system
    pub fn electrostatic() -> Self {
        Self::new(
            Symmetry::Symmetric,
            Definiteness::PositiveDefinite,
            DataType::Real,
            ElementType::Scalar,
            FieldType::Electrostatic,
            false,
        )
    }

    /// Magnetostatic curl-curl system: real, symmetric positive semidefinite and
    /// singular (gradient null space) without gauging
    pub fn magnetostatic(element_type: ElementType) -> Self {
        Self::new(
            Symmetry::Symmetric,
            Definiteness::PositiveSemidefinite,
            DataType::Real,
            element_type,
            FieldType::Magnetostatic,
            true,
        )
    }

    /// Eddy-current system: complex symmetric (not Hermitian) vector system
    pub fn eddy_current() -> Self {
        Self::new(
            Symmetry::Symmetric,
            Definiteness::Indefinite,
            DataType::Complex,
            ElementType::Vector3D,
            FieldType::EddyCurrent,
            false,
        )
    }

    /// Real symmetric indefinite wave system on vector elements
    pub fn vector_element(element_type: ElementType) -> Self {
        Self::new(
            Symmetry::Symmetric,
            Definiteness::Indefinite,
            DataType::Real,
            element_type,
            FieldType::Wave,
            false,
        )
    }

    /// Symmetry class
    pub fn symmetry(&self) -> Symmetry {
        self.symmetry
    }

    /// Definiteness class
    pub fn definiteness(&self) -> Definiteness {
        self.definiteness
    }

    /// Scalar type
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Element family
    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// Physical field
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Whether the matrix is known to be singular
    pub fn is_singular(&self) -> bool {
        self.is_singular
    }

    /// Symmetric (or Hermitian) positive definite
    pub fn is_spd(&self) -> bool {
        self.is_spd
    }

    /// Equal to its conjugate transpose
    pub fn is_hermitian(&self) -> bool {
        self.is_hermitian
    }

    /// Set the symmetry class
    pub fn set_symmetry(&mut self, symmetry: Symmetry) {
        self.symmetry = symmetry;
        self.update_derived();
    }

    /// Set the definiteness class
    pub fn set_definiteness(&mut self, definiteness: Definiteness) {
        self.definiteness = definiteness;
        self.update_derived();
    }

    /// Set the scalar type
    pub fn set_data_type(&mut self, data_type: DataType) {
        self.data_type = data_type;
        self.update_derived();
    }

    /// Set the element family
    pub fn set_element_type(&mut self, element_type: ElementType) {
        self.element_type = element_type;
    }

    /// Set the physical field
    pub fn set_field_type(&mut self, field_type: FieldType) {
        self.field_type = field_type;
    }

    /// Mark the matrix singular or not
    pub fn set_singular(&mut self, is_singular: bool) {
        self.is_singular = is_singular;
    }

    /// Builder-style element type override
    pub fn with_element_type(mut self, element_type: ElementType) -> Self {
        self.set_element_type(element_type);
        self
    }

    /// Builder-style field type override
    pub fn with_field_type(mut self, field_type: FieldType) -> Self {
        self.set_field_type(field_type);
        self
    }

    /// Conjugate gradient applies: SPD and real
    pub fn suitable_for_cg(&self) -> bool {
        self.is_spd && self.data_type == DataType::Real
    }

    /// Block preconditioners apply to vector elements
    pub fn suitable_for_block_preconditioner(&self) -> bool {
        self.element_type != ElementType::Scalar
    }

    /// ILU needs a nonsingular matrix of known definiteness
    pub fn suitable_for_ilu(&self) -> bool {
        !self.is_singular && self.definiteness != Definiteness::Indefinite
    }

    /// Jacobi needs a matrix of known definiteness
    pub fn suitable_for_jacobi(&self) -> bool {
        self.definiteness != Definiteness::Indefinite
    }

    /// Classify a built square CSR matrix from its entries.
    ///
    /// Symmetry is checked entry by entry against `tol`. Definiteness is a
    /// Gershgorin estimate: a symmetric (Hermitian) matrix whose diagonal has one
    /// sign and dominates its rows is definite when every connected block of the
    /// pattern has a strictly dominant row, semidefinite otherwise; anything else
    /// is reported indefinite. The matrix is flagged singular when a row is empty
    /// or when a semidefinite block has all row sums zero (constant null vector).
    /// Element and field type keep their defaults.
    pub fn analyze<T: ComplexField>(matrix: &CsrMatrix<T>, tol: T::Real) -> Result<Self> {
        if matrix.rows() != matrix.cols() {
            return Err(SparseError::mismatch(
                "square matrix columns",
                matrix.rows(),
                matrix.cols(),
            ));
        }
        let a = matrix.sum_duplicates()?;
        let n = a.rows();

        let mut symmetric = true;
        let mut hermitian = true;
        let mut skew = true;
        'scan: for i in 0..n {
            for (j, v) in a.row_entries(i) {
                let t = a.get(j, i);
                symmetric &= (v - t).is_zero_approx(tol);
                hermitian &= (v - t.conj()).is_zero_approx(tol);
                skew &= (v + t).is_zero_approx(tol);
                if !(symmetric || hermitian || skew) {
                    break 'scan;
                }
            }
        }

        let symmetry = match T::DATA_TYPE {
            DataType::Real if symmetric => Symmetry::Symmetric,
            DataType::Complex if hermitian => Symmetry::Hermitian,
            _ if symmetric => Symmetry::Symmetric,
            _ if skew => Symmetry::SkewSymmetric,
            _ => Symmetry::Unsymmetric,
        };

        let self_adjoint = match T::DATA_TYPE {
            DataType::Real => symmetric,
            DataType::Complex => hermitian,
        };

        let (definiteness, balanced_singular) = if self_adjoint {
            gershgorin_definiteness(&a, tol)
        } else {
            (Definiteness::Indefinite, false)
        };

        let has_empty_row = (0..n).any(|i| a.row_entries(i).all(|(_, v)| v.is_zero_approx(tol)));

        let attr = Self::new(
            symmetry,
            definiteness,
            T::DATA_TYPE,
            ElementType::default(),
            FieldType::default(),
            has_empty_row || balanced_singular,
        );
        log::debug!(
            "analyzed {}x{} matrix: {:?}, {:?}, singular = {}",
            n,
            n,
            attr.symmetry,
            attr.definiteness,
            attr.is_singular
        );
        Ok(attr)
    }
}

/// Definiteness estimate for a self-adjoint matrix with merged duplicates.
/// Returns the class and whether a balanced block makes the matrix singular.
fn gershgorin_definiteness<T: ComplexField>(a: &CsrMatrix<T>, tol: T::Real) -> (Definiteness, bool) {
    let n = a.rows();
    let mut diag = vec![T::Real::zero(); n];
    let mut radius = vec![T::Real::zero(); n];
    let mut row_sum = vec![T::zero(); n];
    for i in 0..n {
        for (j, v) in a.row_entries(i) {
            if j == i {
                diag[i] = v.re();
            } else {
                radius[i] += v.norm();
            }
            row_sum[i] += v;
        }
    }

    let sign = if diag.iter().all(|&d| d > tol) {
        T::Real::one()
    } else if diag.iter().all(|&d| d < -tol) {
        -T::Real::one()
    } else {
        return (Definiteness::Indefinite, false);
    };

    // weak dominance: |a_ii| >= sum_j |a_ij| in every row
    if (0..n).any(|i| sign * diag[i] + tol < radius[i]) {
        return (Definiteness::Indefinite, false);
    }

    let mut component = vec![usize::MAX; n];
    let mut definite = true;
    let mut singular = false;
    for start in 0..n {
        if component[start] != usize::MAX {
            continue;
        }
        let mut members = Vec::new();
        let mut queue = VecDeque::from([start]);
        component[start] = start;
        while let Some(i) = queue.pop_front() {
            members.push(i);
            for (j, _) in a.row_entries(i) {
                if component[j] == usize::MAX {
                    component[j] = start;
                    queue.push_back(j);
                }
            }
        }

        let has_strict_row = members.iter().any(|&i| sign * diag[i] > radius[i] + tol);
        if !has_strict_row {
            definite = false;
            singular |= members.iter().all(|&i| row_sum[i].is_zero_approx(tol));
        }
    }

    let class = match (sign > T::Real::zero(), definite) {
        (true, true) => Definiteness::PositiveDefinite,
        (true, false) => Definiteness::PositiveSemidefinite,
        (false, true) => Definiteness::NegativeDefinite,
        (false, false) => Definiteness::NegativeSemidefinite,
    };
    (class, singular)
}
