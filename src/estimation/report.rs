use serde::Serialize;

use crate::{
    data::{DosingSchedule, ObservationSet, ParameterVector},
    estimation::{
        objective::NegLogLikelihood,
        optimizer::{minimize, FitOptions, FitResult},
        uncertainty::{covariance, serialize_matrix, CovarianceMatrix},
    },
    simulator::model::Model,
    Equation, EstimationError,
};

/// Point estimate and its uncertainty
#[derive(Debug, Clone, Serialize)]
pub struct EstimationReport {
    pub fit: FitResult,
    pub covariance: CovarianceMatrix,
    pub standard_errors: Vec<f64>,
    /// Standard errors in percent of the estimates
    pub relative_standard_errors: Vec<f64>,
    #[serde(serialize_with = "serialize_matrix")]
    pub correlation: nalgebra::DMatrix<f64>,
}

impl EstimationReport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Fit `model` to `observed` starting from `initial`, then compute the covariance
/// of the estimate
pub fn estimate<E: Equation>(
    model: &Model<E>,
    initial: &ParameterVector,
    observed: &ObservationSet,
    dosing: &DosingSchedule,
    options: &FitOptions,
) -> Result<EstimationReport, EstimationError> {
    model.check_parameters(initial)?;
    let objective = NegLogLikelihood::new(model, observed, dosing);
    let fit = minimize(&objective, initial, options)?;
    if !fit.status.is_converged() {
        tracing::warn!(
            status = fit.status.code(),
            "computing the covariance at an unconverged estimate"
        );
    }
    let covariance = covariance(model, &fit.parameters, observed, dosing)?;
    Ok(EstimationReport {
        standard_errors: covariance.standard_errors(),
        relative_standard_errors: covariance.relative_standard_errors(),
        correlation: covariance.correlation(),
        covariance,
        fit,
    })
}
