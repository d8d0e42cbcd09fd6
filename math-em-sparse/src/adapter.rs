//! Solver and preconditioner selection for electromagnetic systems
//!
//! [`EmAdapter::auto_configure`] turns a [`MatrixAttribute`] into a
//! [`SolverConfiguration`]. The adapter also applies the divergence penalty to
//! singular magnetostatic systems and constructs the chosen preconditioner.

use crate::attribute::{DataType, ElementType, FieldType, MatrixAttribute};
use crate::error::{Result, SparseError};
use crate::preconditioners::{
    BlockIlu0Preconditioner, IdentityPreconditioner, Ilu0Preconditioner, JacobiPreconditioner,
};
use crate::sparse::{BlockCsrMatrix, CsrMatrix};
use crate::traits::{ComplexField, Preconditioner};
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Krylov method recommended for a system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverType {
    /// Conjugate gradient (real SPD)
    Cg,
    /// Restarted GMRES (complex systems)
    Gmres,
    /// MINRES (singular symmetric systems)
    Minres,
    /// BiCGSTAB (everything else)
    Bicgstab,
}

/// Preconditioner recommended for a system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreconditionerType {
    /// Block ILU(0) over the element blocks
    BlockIlu,
    /// Scalar ILU(0)
    Ilu0,
    /// Diagonal scaling
    Jacobi,
    /// No preconditioning
    None,
}

/// Outcome of [`EmAdapter::auto_configure`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverConfiguration {
    /// Krylov method
    pub solver: SolverType,
    /// Preconditioner
    pub preconditioner: PreconditionerType,
    /// Add `penalty * I` before solving
    pub use_divergence_constraint: bool,
    /// Element family, fixes the block size of block preconditioners
    pub element_type: ElementType,
}

/// Numeric knobs of the adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Floor applied to small diagonal entries by Jacobi
    #[serde(default = "default_jacobi_epsilon")]
    pub jacobi_epsilon: f64,
    /// Diagonal shift used by the divergence constraint
    #[serde(default = "default_divergence_penalty")]
    pub divergence_penalty: f64,
    /// Smallest pivot magnitude accepted by ILU(0)
    #[serde(default = "default_ilu_pivot_tolerance")]
    pub ilu_pivot_tolerance: f64,
    /// Tolerance used when classifying matrices
    #[serde(default = "default_symmetry_tolerance")]
    pub symmetry_tolerance: f64,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            jacobi_epsilon: default_jacobi_epsilon(),
            divergence_penalty: default_divergence_penalty(),
            ilu_pivot_tolerance: default_ilu_pivot_tolerance(),
            symmetry_tolerance: default_symmetry_tolerance(),
        }
    }
}

fn default_jacobi_epsilon() -> f64 {
    1e-14
}

fn default_divergence_penalty() -> f64 {
    1.0
}

fn default_ilu_pivot_tolerance() -> f64 {
    1e-30
}

fn default_symmetry_tolerance() -> f64 {
    1e-12
}

impl AdapterConfig {
    /// Parse and validate a JSON document; absent fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| SparseError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Pretty-printed JSON
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| SparseError::Config(e.to_string()))
    }

    /// Every tolerance must be positive and finite; the penalty must be finite
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("jacobi_epsilon", self.jacobi_epsilon),
            ("ilu_pivot_tolerance", self.ilu_pivot_tolerance),
            ("symmetry_tolerance", self.symmetry_tolerance),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(SparseError::Config(format!(
                    "{name} must be positive and finite, got {value}"
                )));
            }
        }
        if !self.divergence_penalty.is_finite() {
            return Err(SparseError::Config(format!(
                "divergence_penalty must be finite, got {}",
                self.divergence_penalty
            )));
        }
        Ok(())
    }
}

/// Maps matrix attributes to solver choices and prepares the system
#[derive(Debug, Clone, Default)]
pub struct EmAdapter {
    config: AdapterConfig,
}

impl EmAdapter {
    /// Create an adapter with validated settings
    pub fn new(config: AdapterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Settings in use
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Pick solver, preconditioner and divergence policy.
    ///
    /// Solver priority: CG when suitable, GMRES for complex data, MINRES for
    /// singular systems, BiCGSTAB otherwise. Preconditioner priority: block
    /// ILU for vector elements, ILU(0), Jacobi, none. The divergence
    /// constraint is enabled for singular magnetostatic systems only.
    pub fn auto_configure(&self, attr: &MatrixAttribute) -> SolverConfiguration {
        let solver = if attr.suitable_for_cg() {
            SolverType::Cg
        } else if attr.data_type() == DataType::Complex {
            SolverType::Gmres
        } else if attr.is_singular() {
            SolverType::Minres
        } else {
            SolverType::Bicgstab
        };

        let preconditioner = if attr.suitable_for_block_preconditioner() {
            PreconditionerType::BlockIlu
        } else if attr.suitable_for_ilu() {
            PreconditionerType::Ilu0
        } else if attr.suitable_for_jacobi() {
            PreconditionerType::Jacobi
        } else {
            PreconditionerType::None
        };

        let use_divergence_constraint =
            attr.field_type() == FieldType::Magnetostatic && attr.is_singular();

        log::info!(
            "{:?} system ({:?}, {:?}): solver {:?}, preconditioner {:?}, divergence constraint {}",
            attr.field_type(),
            attr.symmetry(),
            attr.definiteness(),
            solver,
            preconditioner,
            use_divergence_constraint
        );

        SolverConfiguration {
            solver,
            preconditioner,
            use_divergence_constraint,
            element_type: attr.element_type(),
        }
    }

    /// Classify an assembled matrix with the configured `symmetry_tolerance`
    /// and tag it with the physical field it came from.
    pub fn classify<T: ComplexField>(
        &self,
        matrix: &CsrMatrix<T>,
        field_type: FieldType,
    ) -> Result<MatrixAttribute> {
        let tol = real::<T>(self.config.symmetry_tolerance)?;
        let attr = MatrixAttribute::analyze(matrix, tol)?.with_field_type(field_type);
        log::debug!(
            "classified {}x{} matrix as {:?} {:?} (singular: {})",
            matrix.rows(),
            matrix.cols(),
            attr.symmetry(),
            attr.definiteness(),
            attr.is_singular()
        );
        Ok(attr)
    }

    /// Return `matrix + penalty * I`.
    ///
    /// The matrix triplets and the penalty diagonal are merged in one COO,
    /// duplicates summed and the result rebuilt, so the output stores each
    /// diagonal exactly once even if the input lacked it.
    pub fn add_divergence_constraint<T: ComplexField>(
        matrix: &CsrMatrix<T>,
        penalty: T::Real,
    ) -> Result<CsrMatrix<T>> {
        if matrix.rows() != matrix.cols() {
            return Err(SparseError::mismatch(
                "square matrix columns",
                matrix.rows(),
                matrix.cols(),
            ));
        }
        let mut coo = matrix.to_coo()?;
        let n = matrix.rows();
        coo.reserve(n);
        let shift = T::from_real(penalty);
        for i in 0..n {
            coo.add_value(i, i, shift)?;
        }
        let constrained = CsrMatrix::from_coo(&coo.sum_duplicates())?;
        log::info!(
            "divergence constraint: added {} * I to {}x{} system, nnz {} -> {}",
            penalty,
            n,
            n,
            matrix.nnz(),
            constrained.nnz()
        );
        Ok(constrained)
    }

    /// System matrix to hand to the solver: the divergence-constrained matrix
    /// when the configuration asks for it, otherwise a copy of the input
    pub fn prepare_system<T: ComplexField>(
        &self,
        matrix: &CsrMatrix<T>,
        attr: &MatrixAttribute,
    ) -> Result<CsrMatrix<T>> {
        if self.auto_configure(attr).use_divergence_constraint {
            Self::add_divergence_constraint(matrix, real::<T>(self.config.divergence_penalty)?)
        } else if matrix.is_built() {
            Ok(matrix.clone())
        } else {
            Err(SparseError::NotBuilt {
                operation: "prepare_system",
            })
        }
    }

    /// Construct the preconditioner named by `config` over a built square matrix.
    ///
    /// Block ILU uses the block size of the configured element type; when the
    /// system does not split into whole blocks it falls back to scalar ILU(0).
    pub fn build_preconditioner<T: ComplexField>(
        &self,
        config: &SolverConfiguration,
        matrix: &CsrMatrix<T>,
    ) -> Result<Box<dyn Preconditioner<T>>> {
        if !matrix.is_built() {
            return Err(SparseError::NotBuilt {
                operation: "build_preconditioner",
            });
        }
        let pivot_tol = real::<T>(self.config.ilu_pivot_tolerance)?;

        let precond: Box<dyn Preconditioner<T>> = match config.preconditioner {
            PreconditionerType::BlockIlu => {
                let bd = config.element_type.block_dim().unwrap_or(1);
                if matrix.rows() % bd == 0 && matrix.cols() % bd == 0 {
                    let blocks = BlockCsrMatrix::from_csr(matrix, bd)?;
                    Box::new(BlockIlu0Preconditioner::from_block_csr(&blocks, pivot_tol)?)
                } else {
                    log::warn!(
                        "{}x{} system does not split into {}x{} blocks, using scalar ILU(0)",
                        matrix.rows(),
                        matrix.cols(),
                        bd,
                        bd
                    );
                    Box::new(Ilu0Preconditioner::from_csr(matrix, pivot_tol)?)
                }
            }
            PreconditionerType::Ilu0 => Box::new(Ilu0Preconditioner::from_csr(matrix, pivot_tol)?),
            PreconditionerType::Jacobi => Box::new(JacobiPreconditioner::from_csr(
                matrix,
                real::<T>(self.config.jacobi_epsilon)?,
            )?),
            PreconditionerType::None => {
                if matrix.rows() != matrix.cols() {
                    return Err(SparseError::mismatch(
                        "square matrix columns",
                        matrix.rows(),
                        matrix.cols(),
                    ));
                }
                Box::new(IdentityPreconditioner::new(matrix.rows()))
            }
        };
        log::debug!("built {:?} preconditioner", config.preconditioner);
        Ok(precond)
    }
}

fn real<T: ComplexField>(value: f64) -> Result<T::Real> {
    T::Real::from_f64(value)
        .ok_or_else(|| SparseError::Config(format!("{value} is not representable")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{Definiteness, Symmetry};
    use crate::sparse::CooMatrix;
    use approx::assert_relative_eq;
    use ndarray::{Array1, array};

    fn configure(attr: MatrixAttribute) -> SolverConfiguration {
        EmAdapter::default().auto_configure(&attr)
    }

    #[test]
    fn test_auto_configure_presets() {
        let es = configure(MatrixAttribute::electrostatic());
        assert_eq!(es.solver, SolverType::Cg);
        assert_eq!(es.preconditioner, PreconditionerType::Ilu0);
        assert!(!es.use_divergence_constraint);

        let ms = configure(MatrixAttribute::magnetostatic(ElementType::Vector3D));
        assert_eq!(ms.solver, SolverType::Minres);
        assert_eq!(ms.preconditioner, PreconditionerType::BlockIlu);
        assert!(ms.use_divergence_constraint);

        let ms_scalar = configure(MatrixAttribute::magnetostatic(ElementType::Scalar));
        assert_eq!(ms_scalar.solver, SolverType::Minres);
        assert_eq!(ms_scalar.preconditioner, PreconditionerType::Jacobi);

        let ec = configure(MatrixAttribute::eddy_current());
        assert_eq!(ec.solver, SolverType::Gmres);
        assert_eq!(ec.preconditioner, PreconditionerType::BlockIlu);
        assert!(!ec.use_divergence_constraint);

        let wave = configure(MatrixAttribute::vector_element(ElementType::Vector2D));
        assert_eq!(wave.solver, SolverType::Bicgstab);
        assert_eq!(wave.preconditioner, PreconditionerType::BlockIlu);

        let wave_scalar = configure(MatrixAttribute::vector_element(ElementType::Scalar));
        assert_eq!(wave_scalar.solver, SolverType::Bicgstab);
        assert_eq!(wave_scalar.preconditioner, PreconditionerType::None);
    }

    #[test]
    fn test_divergence_requires_magnetostatic_field() {
        let mut attr = MatrixAttribute::electrostatic();
        attr.set_singular(true);
        attr.set_definiteness(Definiteness::PositiveSemidefinite);
        assert!(!configure(attr).use_divergence_constraint);

        attr.set_field_type(FieldType::Magnetostatic);
        assert!(configure(attr).use_divergence_constraint);

        attr.set_symmetry(Symmetry::Unsymmetric);
        assert_eq!(configure(attr).solver, SolverType::Minres);
    }

    fn singular_laplacian() -> CsrMatrix<f64> {
        let mut coo = CooMatrix::new(3, 3).unwrap();
        for &(r, c, v) in &[
            (0, 0, 1.0),
            (0, 1, -1.0),
            (1, 0, -1.0),
            (1, 1, 2.0),
            (1, 2, -1.0),
            (2, 1, -1.0),
            (2, 2, 1.0),
        ] {
            coo.add_value(r, c, v).unwrap();
        }
        CsrMatrix::from_coo(&coo).unwrap()
    }

    #[test]
    fn test_add_divergence_constraint() {
        let a = singular_laplacian();
        let shifted = EmAdapter::add_divergence_constraint(&a, 0.5).unwrap();
        assert_eq!(shifted.nnz(), a.nnz());
        assert_eq!(shifted.get_diag().unwrap(), array![1.5, 2.5, 1.5]);
        assert_relative_eq!(shifted.get(0, 1), -1.0);

        // the constant vector is no longer in the null space
        let y = shifted.mat_vec(&array![1.0, 1.0, 1.0]).unwrap();
        for v in y.iter() {
            assert_relative_eq!(*v, 0.5, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_add_divergence_constraint_fills_missing_diagonal() {
        let mut coo = CooMatrix::new(2, 2).unwrap();
        coo.add_value(0, 1, 1.0).unwrap();
        coo.add_value(1, 0, 1.0).unwrap();
        let a = CsrMatrix::from_coo(&coo).unwrap();

        let shifted = EmAdapter::add_divergence_constraint(&a, 2.0).unwrap();
        assert_eq!(shifted.nnz(), 4);
        assert_eq!(shifted.get_diag().unwrap(), array![2.0, 2.0]);

        let unbuilt = CsrMatrix::<f64>::new(2, 2).unwrap();
        assert!(
            EmAdapter::add_divergence_constraint(&unbuilt, 1.0)
                .unwrap_err()
                .is_precondition_violation()
        );
    }

    #[test]
    fn test_prepare_system_applies_constraint() {
        let adapter = EmAdapter::default();
        let a = singular_laplacian();

        let constrained = adapter
            .prepare_system(&a, &MatrixAttribute::magnetostatic(ElementType::Scalar))
            .unwrap();
        assert_eq!(constrained.get_diag().unwrap(), array![2.0, 3.0, 2.0]);

        let untouched = adapter
            .prepare_system(&a, &MatrixAttribute::electrostatic())
            .unwrap();
        assert_eq!(untouched.get_diag().unwrap(), a.get_diag().unwrap());
    }

    #[test]
    fn test_build_preconditioner_end_to_end() {
        let adapter = EmAdapter::default();
        let attr = MatrixAttribute::magnetostatic(ElementType::Scalar);
        let config = adapter.auto_configure(&attr);
        let system = adapter.prepare_system(&singular_laplacian(), &attr).unwrap();

        let precond = adapter.build_preconditioner(&config, &system).unwrap();
        assert_eq!(precond.dim(), 3);
        let z = precond.apply(&array![2.0, 3.0, 2.0]).unwrap();
        for v in z.iter() {
            assert_relative_eq!(*v, 1.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_build_every_preconditioner_kind() {
        let adapter = EmAdapter::default();
        let system = EmAdapter::add_divergence_constraint(&singular_laplacian(), 1.0).unwrap();
        let r = Array1::from_elem(3, 1.0);

        for preconditioner in [
            PreconditionerType::BlockIlu,
            PreconditionerType::Ilu0,
            PreconditionerType::Jacobi,
            PreconditionerType::None,
        ] {
            let config = SolverConfiguration {
                solver: SolverType::Bicgstab,
                preconditioner,
                use_divergence_constraint: false,
                // 3 rows do not split into 2x2 blocks: falls back to ILU(0)
                element_type: ElementType::Vector2D,
            };
            let precond = adapter.build_preconditioner(&config, &system).unwrap();
            let z = precond.apply(&r).unwrap();
            assert_eq!(z.len(), 3);
            assert!(z.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_adapter_config_json() {
        let config = AdapterConfig::from_json_str(r#"{"divergence_penalty": 10.0}"#).unwrap();
        assert_relative_eq!(config.divergence_penalty, 10.0);
        assert_relative_eq!(config.jacobi_epsilon, 1e-14);
        assert_relative_eq!(config.ilu_pivot_tolerance, 1e-30);

        let json = config.to_json_string().unwrap();
        assert_eq!(AdapterConfig::from_json_str(&json).unwrap(), config);

        let err = AdapterConfig::from_json_str(r#"{"jacobi_epsilon": -1.0}"#).unwrap_err();
        assert!(matches!(err, SparseError::Config(_)));
        assert!(AdapterConfig::from_json_str("not json").is_err());
        assert!(EmAdapter::new(AdapterConfig {
            symmetry_tolerance: 0.0,
            ..AdapterConfig::default()
        })
        .is_err());
    }

    #[test]
    fn test_classify_uses_symmetry_tolerance() {
        let mut coo = CooMatrix::new(2, 2).unwrap();
        coo.add_value(0, 0, 2.0).unwrap();
        coo.add_value(0, 1, -1.0).unwrap();
        coo.add_value(1, 0, -1.0 + 1e-8).unwrap();
        coo.add_value(1, 1, 2.0).unwrap();
        let csr = CsrMatrix::from_coo(&coo).unwrap();

        let strict = EmAdapter::default()
            .classify(&csr, FieldType::Electrostatic)
            .unwrap();
        assert_eq!(strict.symmetry(), Symmetry::Unsymmetric);

        let loose = EmAdapter::new(AdapterConfig {
            symmetry_tolerance: 1e-6,
            ..AdapterConfig::default()
        })
        .unwrap()
        .classify(&csr, FieldType::Magnetostatic)
        .unwrap();
        assert_eq!(loose.symmetry(), Symmetry::Symmetric);
        assert_eq!(loose.field_type(), FieldType::Magnetostatic);
        assert!(loose.is_spd());
    }

    #[test]
    fn test_adapter_config_json_is_lossless() {
        let config = AdapterConfig::from_json_str(r#"{"ilu_pivot_tolerance": 1e-30}"#).unwrap();
        assert_eq!(config.ilu_pivot_tolerance, 1e-30);

        let custom = AdapterConfig {
            jacobi_epsilon: 3.3e-15,
            divergence_penalty: 0.1,
            ilu_pivot_tolerance: 1e-30,
            symmetry_tolerance: 7.7e-13,
        };
        let back = AdapterConfig::from_json_str(&custom.to_json_string().unwrap()).unwrap();
        assert_eq!(back, custom);
    }

    #[test]
    fn test_adapter_config_file() {
        let path = std::env::temp_dir().join(format!(
            "math_em_sparse_adapter_{}.json",
            std::process::id()
        ));
        std::fs::write(&path, r#"{"jacobi_epsilon": 1e-10}"#).unwrap();
        let config = AdapterConfig::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_relative_eq!(config.jacobi_epsilon, 1e-10);

        let err = AdapterConfig::from_json_file(&path).unwrap_err();
        assert!(matches!(err, SparseError::Io(_)));
    }

    #[test]
    fn test_solver_configuration_serde() {
        let config = configure(MatrixAttribute::eddy_current());
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"gmres\""));
        assert!(json.contains("\"block_ilu\""));
        let back: SolverConfiguration = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
