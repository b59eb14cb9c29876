use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EstimationError {
    #[error("Parameter {name} = {value} is outside its domain ({lower}, {upper})")]
    ParameterDomain {
        name: String,
        value: f64,
        lower: f64,
        upper: f64,
    },
    #[error("The model declares parameters {expected:?} but received {found:?}")]
    ParameterMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("Integration failed: {0}")]
    Integration(String),
    #[error("Predicted variance at observation {index} must be strictly positive, got {variance}")]
    InvalidVariance { index: usize, variance: f64 },
    #[error("Optimization failed: {0}")]
    OptimizationFailed(String),
    #[error("The information matrix is singular or not positive definite: {0}")]
    SingularInformationMatrix(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Invalid model: {0}")]
    InvalidModel(String),
    #[error("Invalid options: {0}")]
    InvalidOptions(String),
}

impl EstimationError {
    /// Failures the optimizer may route around by treating the candidate as infeasible.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EstimationError::Integration(_) | EstimationError::ParameterDomain { .. }
        )
    }
}
