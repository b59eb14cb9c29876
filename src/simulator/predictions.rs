use serde::{Deserialize, Serialize};

use crate::EstimationError;

/// Predicted mean and variance for every observation, aligned index-for-index
/// with the [ObservationSet](crate::ObservationSet) they were computed for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predictions {
    mean: Vec<f64>,
    variance: Vec<f64>,
}

impl Predictions {
    pub fn new(mean: Vec<f64>, variance: Vec<f64>) -> Result<Self, EstimationError> {
        if mean.len() != variance.len() {
            return Err(EstimationError::InvalidData(format!(
                "{} predicted means but {} variances",
                mean.len(),
                variance.len()
            )));
        }
        Ok(Predictions { mean, variance })
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn variance(&self) -> &[f64] {
        &self.variance
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// Fails on the first variance that is zero, negative or not finite
    pub fn check_variances(&self) -> Result<(), EstimationError> {
        match self
            .variance
            .iter()
            .position(|v| !(v.is_finite() && *v > 0.0))
        {
            Some(index) => Err(EstimationError::InvalidVariance {
                index,
                variance: self.variance[index],
            }),
            None => Ok(()),
        }
    }

    /// `(y - mean) / sqrt(variance)` for each observed value
    pub fn weighted_residuals(&self, observed: &[f64]) -> Result<Vec<f64>, EstimationError> {
        if observed.len() != self.len() {
            return Err(EstimationError::InvalidData(format!(
                "{} observed values for {} predictions",
                observed.len(),
                self.len()
            )));
        }
        self.check_variances()?;
        Ok(observed
            .iter()
            .zip(self.mean.iter().zip(self.variance.iter()))
            .map(|(y, (m, v))| (y - m) / v.sqrt())
            .collect())
    }
}
