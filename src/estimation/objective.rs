use std::f64::consts::PI;

use crate::{
    data::{DosingSchedule, ObservationSet, ParameterVector},
    simulator::{model::Model, predictions::Predictions},
    Equation, EstimationError,
};

/// A scalar function of a [ParameterVector] to be minimized
pub trait Objective {
    fn evaluate(&self, params: &ParameterVector) -> Result<f64, EstimationError>;
}

/// Negative log-likelihood of a fixed data set under a [Model]
#[derive(Debug, Clone)]
pub struct NegLogLikelihood<'a, E: Equation> {
    model: &'a Model<E>,
    observed: &'a ObservationSet,
    dosing: &'a DosingSchedule,
}

impl<'a, E: Equation> NegLogLikelihood<'a, E> {
    pub fn new(
        model: &'a Model<E>,
        observed: &'a ObservationSet,
        dosing: &'a DosingSchedule,
    ) -> Self {
        Self {
            model,
            observed,
            dosing,
        }
    }

    pub fn model(&self) -> &'a Model<E> {
        self.model
    }

    pub fn observed(&self) -> &'a ObservationSet {
        self.observed
    }

    pub fn dosing(&self) -> &'a DosingSchedule {
        self.dosing
    }
}

impl<E: Equation> Objective for NegLogLikelihood<'_, E> {
    fn evaluate(&self, params: &ParameterVector) -> Result<f64, EstimationError> {
        neg_log_likelihood(self.model, params, self.observed, self.dosing)
    }
}

/// Negative log-likelihood of `observed` at `params`
///
/// `-LL = n/2 ln(2π) + 1/2 Σ [(y - f)² / σ² + ln σ²]`
///
/// # Errors
/// Model evaluation errors are returned unchanged. A predicted variance that is
/// zero, negative or not finite gives [EstimationError::InvalidVariance].
pub fn neg_log_likelihood<E: Equation>(
    model: &Model<E>,
    params: &ParameterVector,
    observed: &ObservationSet,
    dosing: &DosingSchedule,
) -> Result<f64, EstimationError> {
    let predictions = model.evaluate(params, observed, dosing)?;
    score(&observed.values(), &predictions)
}

/// Negative log-likelihood of observed values given their predictions
pub fn score(observed: &[f64], predictions: &Predictions) -> Result<f64, EstimationError> {
    if observed.len() != predictions.len() {
        return Err(EstimationError::InvalidData(format!(
            "{} observed values for {} predictions",
            observed.len(),
            predictions.len()
        )));
    }
    predictions.check_variances()?;
    let sum: f64 = observed
        .iter()
        .zip(predictions.mean().iter().zip(predictions.variance()))
        .map(|(y, (mean, variance))| (y - mean).powi(2) / variance + variance.ln())
        .sum();
    Ok(0.5 * observed.len() as f64 * (2.0 * PI).ln() + 0.5 * sum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn standard_normal_at_its_mean() {
        let predictions = Predictions::new(vec![0.0], vec![1.0]).unwrap();
        assert_relative_eq!(
            score(&[0.0], &predictions).unwrap(),
            0.5 * (2.0 * PI).ln(),
            epsilon = 1e-14
        );
    }

    #[test]
    fn permutation_does_not_change_the_value() {
        let observed = [5.746, 9.7379, 15.1815, 28.6089];
        let mean = [6.0, 10.2, 14.8, 27.5];
        let variance = [0.36, 1.04, 2.19, 7.56];
        let forward = score(
            &observed,
            &Predictions::new(mean.to_vec(), variance.to_vec()).unwrap(),
        )
        .unwrap();

        let order = [2, 0, 3, 1];
        let permuted = score(
            &order.map(|i| observed[i]),
            &Predictions::new(
                order.iter().map(|&i| mean[i]).collect(),
                order.iter().map(|&i| variance[i]).collect(),
            )
            .unwrap(),
        )
        .unwrap();
        assert_relative_eq!(forward, permuted, max_relative = 1e-14);
    }

    #[test]
    fn non_positive_variance_is_an_error() {
        let predictions = Predictions::new(vec![1.0, 1.0], vec![1.0, -0.5]).unwrap();
        assert!(matches!(
            score(&[1.0, 1.0], &predictions),
            Err(EstimationError::InvalidVariance { index: 1, .. })
        ));
        assert!(score(&[1.0], &predictions).is_err());
    }
}
