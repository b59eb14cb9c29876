//! Maximum-likelihood estimation: the objective, the simplex search and the
//! uncertainty of the estimate

pub mod objective;
pub mod optimizer;
pub mod report;
mod simplex;
pub mod uncertainty;

pub use objective::{neg_log_likelihood, score, NegLogLikelihood, Objective};
pub use optimizer::{minimize, ConvergenceStatus, FitOptions, FitResult};
pub use report::{estimate, EstimationReport};
pub use uncertainty::{
    covariance, invert_information, mean_information, variance_information, CovarianceMatrix,
};
