//! Parameter uncertainty from the Fisher information matrix
//!
//! For normally distributed observations with mean `μ(θ)` and variance `v(θ)` the
//! expected information is
//!
//! `I_ij = Σ_k ∂μ_k/∂θ_i ∂μ_k/∂θ_j / v_k + ½ Σ_k ∂v_k/∂θ_i ∂v_k/∂θ_j / v_k²`
//!
//! The derivatives are central differences of the model predictions, and the
//! covariance of the estimate is the inverse of `I`.

use nalgebra::{Cholesky, DMatrix, SymmetricEigen};
use rayon::prelude::*;
use serde::{Serialize, Serializer};

use crate::{
    data::{DosingSchedule, ObservationSet, ParameterVector},
    simulator::{model::Model, predictions::Predictions},
    Equation, EstimationError,
};

/// Eigenvalues of the diagonally scaled information matrix smaller than this
/// fraction of the largest one make it numerically singular
const CONDITION_LIMIT: f64 = 1e-12;

/// Covariance matrix of the parameter estimate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CovarianceMatrix {
    names: Vec<String>,
    estimates: Vec<f64>,
    #[serde(serialize_with = "serialize_matrix")]
    matrix: DMatrix<f64>,
}

impl CovarianceMatrix {
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The parameter values the covariance was computed at
    pub fn estimates(&self) -> &[f64] {
        &self.estimates
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Covariance of two parameters, by name
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.names.iter().position(|n| n == a)?;
        let j = self.names.iter().position(|n| n == b)?;
        Some(self.matrix[(i, j)])
    }

    /// `sqrt(diag)`
    pub fn standard_errors(&self) -> Vec<f64> {
        self.matrix.diagonal().iter().map(|v| v.sqrt()).collect()
    }

    /// Standard errors in percent of the estimates
    pub fn relative_standard_errors(&self) -> Vec<f64> {
        self.standard_errors()
            .iter()
            .zip(&self.estimates)
            .map(|(se, estimate)| se / estimate.abs() * 100.0)
            .collect()
    }

    pub fn correlation(&self) -> DMatrix<f64> {
        let se = self.standard_errors();
        DMatrix::from_fn(self.len(), self.len(), |i, j| {
            self.matrix[(i, j)] / (se[i] * se[j])
        })
    }
}

pub(crate) fn serialize_matrix<S: Serializer>(
    matrix: &DMatrix<f64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    matrix_rows(matrix).serialize(serializer)
}

pub(crate) fn matrix_rows(matrix: &DMatrix<f64>) -> Vec<Vec<f64>> {
    matrix
        .row_iter()
        .map(|row| row.iter().copied().collect())
        .collect()
}

/// Mean part of the information matrix, structural parameters only
///
/// `mean_sensitivities` has one row per observation and one column per parameter.
/// Columns of parameters with `structural[i] == false` are ignored.
pub fn mean_information(
    mean_sensitivities: &DMatrix<f64>,
    variance: &[f64],
    structural: &[bool],
) -> DMatrix<f64> {
    let p = mean_sensitivities.ncols();
    let mut information = DMatrix::zeros(p, p);
    for i in (0..p).filter(|&i| structural[i]) {
        for j in (i..p).filter(|&j| structural[j]) {
            let value: f64 = variance
                .iter()
                .enumerate()
                .map(|(k, v)| mean_sensitivities[(k, i)] * mean_sensitivities[(k, j)] / v)
                .sum();
            information[(i, j)] = value;
            information[(j, i)] = value;
        }
    }
    information
}

/// Variance part of the information matrix, all parameters
pub fn variance_information(variance_sensitivities: &DMatrix<f64>, variance: &[f64]) -> DMatrix<f64> {
    let p = variance_sensitivities.ncols();
    let mut information = DMatrix::zeros(p, p);
    for i in 0..p {
        for j in i..p {
            let value: f64 = 0.5
                * variance
                    .iter()
                    .enumerate()
                    .map(|(k, v)| {
                        variance_sensitivities[(k, i)] * variance_sensitivities[(k, j)] / (v * v)
                    })
                    .sum::<f64>();
            information[(i, j)] = value;
            information[(j, i)] = value;
        }
    }
    information
}

/// Invert a positive definite information matrix
///
/// # Errors
/// [EstimationError::SingularInformationMatrix] when the matrix is not
/// numerically positive definite or the inverse is not finite.
pub fn invert_information(
    information: &DMatrix<f64>,
    names: &[String],
) -> Result<DMatrix<f64>, EstimationError> {
    for (i, name) in names.iter().enumerate() {
        let d = information[(i, i)];
        if !(d.is_finite() && d > 0.0) {
            return Err(EstimationError::SingularInformationMatrix(format!(
                "no information about parameter {} (diagonal entry {})",
                name, d
            )));
        }
    }

    // Condition of D^-1/2 I D^-1/2, D = diag(I), independent of the parameter scales
    let scale = information.diagonal().map(|d| 1.0 / d.sqrt());
    let scaled = DMatrix::from_fn(information.nrows(), information.ncols(), |i, j| {
        information[(i, j)] * scale[i] * scale[j]
    });
    let eigenvalues = SymmetricEigen::new(scaled).eigenvalues;
    let min = eigenvalues.min();
    let max = eigenvalues.max();
    if !(min > 0.0 && min >= CONDITION_LIMIT * max) {
        tracing::warn!(min, max, "information matrix is not positive definite");
        return Err(EstimationError::SingularInformationMatrix(format!(
            "scaled eigenvalues range from {:e} to {:e}",
            min, max
        )));
    }

    let covariance = Cholesky::new(information.clone())
        .ok_or_else(|| {
            EstimationError::SingularInformationMatrix(
                "Cholesky decomposition failed".to_string(),
            )
        })?
        .inverse();
    if covariance.iter().any(|v| !v.is_finite()) {
        return Err(EstimationError::SingularInformationMatrix(
            "the inverse has non-finite entries".to_string(),
        ));
    }
    // Symmetrise: C = (C + C^T) / 2
    let transposed = covariance.transpose();
    Ok((&covariance + &transposed) * 0.5)
}

/// Covariance of the estimate `params` of `model` fitted to `observed`
///
/// Each parameter is stepped by `h_i = sqrt(rtol) * max(|θ_i|, atol)` in both
/// directions, with `rtol` and `atol` taken from the model's equation. The 2p
/// evaluations run in parallel.
///
/// # Errors
/// Evaluation errors at any of the sampled points are returned unchanged.
/// [EstimationError::SingularInformationMatrix] if the information matrix cannot be
/// inverted.
pub fn covariance<E: Equation>(
    model: &Model<E>,
    params: &ParameterVector,
    observed: &ObservationSet,
    dosing: &DosingSchedule,
) -> Result<CovarianceMatrix, EstimationError> {
    let centre = model.evaluate(params, observed, dosing)?;
    centre.check_variances()?;

    let tolerances = model.tolerances();
    let steps: Vec<f64> = params
        .values()
        .iter()
        .map(|theta| tolerances.rtol.sqrt() * theta.abs().max(tolerances.atol))
        .collect();

    let samples: Vec<(Predictions, Predictions)> = steps
        .par_iter()
        .enumerate()
        .map(|(i, h)| {
            let plus = model.evaluate(&params.perturbed(i, *h), observed, dosing)?;
            let minus = model.evaluate(&params.perturbed(i, -*h), observed, dosing)?;
            Ok((plus, minus))
        })
        .collect::<Result<Vec<_>, EstimationError>>()?;

    let n = centre.len();
    let p = params.len();
    let mut dmean = DMatrix::zeros(n, p);
    let mut dvariance = DMatrix::zeros(n, p);
    for (i, ((plus, minus), h)) in samples.iter().zip(&steps).enumerate() {
        for k in 0..n {
            dmean[(k, i)] = (plus.mean()[k] - minus.mean()[k]) / (2.0 * h);
            dvariance[(k, i)] = (plus.variance()[k] - minus.variance()[k]) / (2.0 * h);
        }
    }

    let information = mean_information(&dmean, centre.variance(), model.structural_mask())
        + variance_information(&dvariance, centre.variance());
    let matrix = invert_information(&information, params.names())?;
    Ok(CovarianceMatrix {
        names: params.names().to_vec(),
        estimates: params.values().to_vec(),
        matrix,
    })
}
