//! Residual error models
//!
//! The residual error model turns a model prediction into the variance of the
//! corresponding observation. Its coefficients are either fixed numbers or
//! estimated parameters referenced by name.
//!
//! - **Constant**: σ = a
//! - **Proportional**: σ = b · f
//! - **Combined**: σ² = a² + b² · f²
//!
//! Unlike the error models used for assay noise, sigma is computed from the
//! **prediction** f, never from the observation, and no lower cutoff is applied:
//! a zero variance is reported to the caller as an error by the objective.

use serde::{Deserialize, Serialize};

use crate::EstimationError;

/// A coefficient of the residual error model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Sigma {
    /// Known value, not estimated
    Fixed(f64),
    /// Estimated; the name of a declared model parameter
    Estimated(String),
}

impl From<f64> for Sigma {
    fn from(value: f64) -> Self {
        Sigma::Fixed(value)
    }
}

impl From<&str> for Sigma {
    fn from(name: &str) -> Self {
        Sigma::Estimated(name.to_string())
    }
}

impl From<String> for Sigma {
    fn from(name: String) -> Self {
        Sigma::Estimated(name)
    }
}

/// Residual error model for maximum-likelihood estimation.
///
/// # Examples
///
/// ```rust
/// use pmfit::ResidualErrorModel;
///
/// // Proportional error whose coefficient is the model parameter "sigma1"
/// let proportional = ResidualErrorModel::proportional("sigma1");
///
/// // Constant error with a known standard deviation of 0.5
/// let constant = ResidualErrorModel::constant(0.5);
/// assert_eq!(constant.estimated_parameters().count(), 0);
/// assert_eq!(proportional.estimated_parameters().collect::<Vec<_>>(), ["sigma1"]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResidualErrorModel {
    /// σ = a
    Constant { a: Sigma },
    /// σ = b · f
    Proportional { b: Sigma },
    /// σ² = a² + b² · f²
    Combined { a: Sigma, b: Sigma },
}

impl ResidualErrorModel {
    pub fn constant(a: impl Into<Sigma>) -> Self {
        ResidualErrorModel::Constant { a: a.into() }
    }

    pub fn proportional(b: impl Into<Sigma>) -> Self {
        ResidualErrorModel::Proportional { b: b.into() }
    }

    pub fn combined(a: impl Into<Sigma>, b: impl Into<Sigma>) -> Self {
        ResidualErrorModel::Combined {
            a: a.into(),
            b: b.into(),
        }
    }

    /// Names of the model parameters this error model estimates
    pub fn estimated_parameters(&self) -> impl Iterator<Item = &str> {
        let coefficients: Vec<&Sigma> = match self {
            ResidualErrorModel::Constant { a } => vec![a],
            ResidualErrorModel::Proportional { b } => vec![b],
            ResidualErrorModel::Combined { a, b } => vec![a, b],
        };
        coefficients.into_iter().filter_map(|s| match s {
            Sigma::Estimated(name) => Some(name.as_str()),
            Sigma::Fixed(_) => None,
        })
    }

    /// Bind estimated coefficients to positions in the parameter vector
    pub(crate) fn resolve(&self, names: &[String]) -> Result<ResolvedErrorModel, EstimationError> {
        let coefficient = |sigma: &Sigma| -> Result<Coefficient, EstimationError> {
            match sigma {
                Sigma::Fixed(value) => {
                    if value.is_finite() {
                        Ok(Coefficient::Fixed(*value))
                    } else {
                        Err(EstimationError::InvalidModel(format!(
                            "fixed residual error coefficient must be finite, got {}",
                            value
                        )))
                    }
                }
                Sigma::Estimated(name) => names
                    .iter()
                    .position(|n| n == name)
                    .map(Coefficient::Parameter)
                    .ok_or_else(|| {
                        EstimationError::InvalidModel(format!(
                            "residual error parameter {} is not declared by the model",
                            name
                        ))
                    }),
            }
        };
        Ok(match self {
            ResidualErrorModel::Constant { a } => ResolvedErrorModel::Constant(coefficient(a)?),
            ResidualErrorModel::Proportional { b } => {
                ResolvedErrorModel::Proportional(coefficient(b)?)
            }
            ResidualErrorModel::Combined { a, b } => {
                ResolvedErrorModel::Combined(coefficient(a)?, coefficient(b)?)
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Coefficient {
    Fixed(f64),
    Parameter(usize),
}

impl Coefficient {
    #[inline(always)]
    fn value(&self, params: &[f64]) -> f64 {
        match self {
            Coefficient::Fixed(v) => *v,
            Coefficient::Parameter(i) => params[*i],
        }
    }
}

/// [ResidualErrorModel] with its coefficients bound to parameter positions
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ResolvedErrorModel {
    Constant(Coefficient),
    Proportional(Coefficient),
    Combined(Coefficient, Coefficient),
}

impl ResolvedErrorModel {
    /// Variance of an observation whose model prediction is `prediction`
    #[inline(always)]
    pub(crate) fn variance(&self, prediction: f64, params: &[f64]) -> f64 {
        match self {
            ResolvedErrorModel::Constant(a) => a.value(params).powi(2),
            ResolvedErrorModel::Proportional(b) => (prediction * b.value(params)).powi(2),
            ResolvedErrorModel::Combined(a, b) => {
                a.value(params).powi(2) + (prediction * b.value(params)).powi(2)
            }
        }
    }
}
