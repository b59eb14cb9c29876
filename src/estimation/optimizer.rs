use argmin::core::{CostFunction, Error, Executor, State, TerminationReason};
use serde::{Deserialize, Serialize};

use crate::{
    data::ParameterVector,
    estimation::{
        objective::Objective,
        simplex::{create_initial_simplex, NelderMeadSimplex},
    },
    EstimationError,
};

/// Options of the simplex search
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FitOptions {
    /// Maximum number of objective evaluations (default: 5000)
    ///
    /// Checked between simplex iterations, so a final shrink step may exceed it by
    /// up to the number of parameters.
    pub max_iterations: u64,
    /// Relative spread of the simplex vertices around the best one (default: 1e-8)
    pub x_tolerance: f64,
    /// Relative spread of the objective over the simplex (default: 1e-12)
    pub f_tolerance: f64,
    /// Relative size of the initial simplex (default: 0.05)
    pub initial_step: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iterations: 5000,
            x_tolerance: 1e-8,
            f_tolerance: 1e-12,
            initial_step: 0.05,
        }
    }
}

impl FitOptions {
    pub fn validate(&self) -> Result<(), EstimationError> {
        if self.max_iterations == 0 {
            return Err(EstimationError::InvalidOptions(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            ("x_tolerance", self.x_tolerance),
            ("f_tolerance", self.f_tolerance),
            ("initial_step", self.initial_step),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(EstimationError::InvalidOptions(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// How the search ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConvergenceStatus {
    /// The simplex met the parameter or the objective tolerance
    ToleranceSatisfied,
    /// The evaluation limit was reached first
    IterationLimit,
    /// The solver stopped for another reason
    SolverFailure(String),
}

impl ConvergenceStatus {
    /// Numeric code: 0 converged, 1 limit reached, 2 failure
    pub fn code(&self) -> i32 {
        match self {
            ConvergenceStatus::ToleranceSatisfied => 0,
            ConvergenceStatus::IterationLimit => 1,
            ConvergenceStatus::SolverFailure(_) => 2,
        }
    }

    pub fn is_converged(&self) -> bool {
        matches!(self, ConvergenceStatus::ToleranceSatisfied)
    }
}

/// Outcome of [minimize]
#[derive(Debug, Clone, Serialize)]
pub struct FitResult {
    pub parameters: ParameterVector,
    /// Objective value at `parameters`
    pub objective: f64,
    /// Simplex iterations
    pub iterations: u64,
    /// Objective evaluations
    pub evaluations: u64,
    pub status: ConvergenceStatus,
    pub message: String,
}

impl FitResult {
    /// `-2 log L`, twice the minimized negative log-likelihood
    pub fn minus_two_log_likelihood(&self) -> f64 {
        2.0 * self.objective
    }
}

/// Adapts an [Objective] to argmin, replacing recoverable failures by `+inf`
struct Penalized<'a, O: Objective> {
    objective: &'a O,
    template: &'a ParameterVector,
}

impl<O: Objective> CostFunction for Penalized<'_, O> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, Error> {
        let candidate = self.template.with_values(param.clone())?;
        match self.objective.evaluate(&candidate) {
            Ok(value) if value.is_finite() => Ok(value),
            Ok(value) => {
                tracing::trace!(%candidate, value, "non-finite objective, penalized");
                Ok(f64::INFINITY)
            }
            Err(e) if e.is_recoverable() => {
                tracing::trace!(%candidate, error = %e, "objective failed, penalized");
                Ok(f64::INFINITY)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Map the reason argmin stopped on to a [ConvergenceStatus]
///
/// The solver exits on its own evaluation cap, and the executor's iteration cap is
/// set to the same value, so both count as [ConvergenceStatus::IterationLimit].
fn status_for(reason: Option<&TerminationReason>, converged: bool) -> ConvergenceStatus {
    match reason {
        Some(TerminationReason::SolverConverged) if converged => {
            ConvergenceStatus::ToleranceSatisfied
        }
        Some(TerminationReason::SolverExit(_)) | Some(TerminationReason::MaxItersReached) => {
            ConvergenceStatus::IterationLimit
        }
        Some(reason) => ConvergenceStatus::SolverFailure(format!(
            "the solver stopped early: {}",
            reason.text()
        )),
        None => ConvergenceStatus::SolverFailure(
            "the solver stopped without a termination reason".to_string(),
        ),
    }
}

/// Minimize `objective` with the Nelder-Mead simplex method, starting from `initial`
///
/// Candidates where the objective fails with [EstimationError::Integration] or
/// [EstimationError::ParameterDomain], or returns a non-finite value, are treated
/// as infinitely bad. Any other error ends the search and is returned unchanged.
///
/// # Errors
/// [EstimationError::InvalidOptions] for invalid `options`, and
/// [EstimationError::OptimizationFailed] if no finite objective value was found.
pub fn minimize<O: Objective>(
    objective: &O,
    initial: &ParameterVector,
    options: &FitOptions,
) -> Result<FitResult, EstimationError> {
    options.validate()?;
    tracing::debug!(
        initial = %initial,
        max_iterations = options.max_iterations,
        x_tolerance = options.x_tolerance,
        f_tolerance = options.f_tolerance,
        "starting simplex search"
    );

    let solver = NelderMeadSimplex::new(
        create_initial_simplex(initial.values(), options.initial_step),
        options.x_tolerance,
        options.f_tolerance,
        options.max_iterations,
    );
    let problem = Penalized {
        objective,
        template: initial,
    };
    let res = Executor::new(problem, solver)
        .configure(|state| state.max_iters(options.max_iterations))
        .run()
        .map_err(|err| match err.downcast::<EstimationError>() {
            Ok(e) => e,
            Err(other) => EstimationError::OptimizationFailed(other.to_string()),
        })?;

    let iterations = res.state.get_iter();
    let evaluations = res.solver.evaluations();
    let (best, cost) = res.solver.best().cloned().ok_or_else(|| {
        EstimationError::OptimizationFailed("the search ended without a simplex".to_string())
    })?;
    if !cost.is_finite() {
        return Err(EstimationError::OptimizationFailed(
            "no finite objective value was found".to_string(),
        ));
    }

    let status = status_for(res.state.get_termination_reason(), res.solver.converged());
    let message = match &status {
        ConvergenceStatus::ToleranceSatisfied => format!(
            "converged after {} iterations and {} evaluations",
            iterations, evaluations
        ),
        ConvergenceStatus::IterationLimit => {
            tracing::warn!(
                evaluations,
                limit = options.max_iterations,
                "simplex search stopped on the evaluation limit"
            );
            format!(
                "stopped after {} evaluations without meeting the tolerances",
                evaluations
            )
        }
        ConvergenceStatus::SolverFailure(reason) => {
            tracing::warn!(%reason, "simplex search failed");
            reason.clone()
        }
    };

    let parameters = initial.with_values(best)?;
    tracing::debug!(
        objective = cost,
        iterations,
        evaluations,
        status = status.code(),
        parameters = %parameters,
        "simplex search finished"
    );
    Ok(FitResult {
        parameters,
        objective: cost,
        iterations,
        evaluations,
        status,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Shifted quadratic bowl, undefined for negative `x`
    struct Bowl;

    impl Objective for Bowl {
        fn evaluate(&self, params: &ParameterVector) -> Result<f64, EstimationError> {
            let v = params.values();
            if v[0] <= 0.0 {
                return Err(EstimationError::ParameterDomain {
                    name: "x".to_string(),
                    value: v[0],
                    lower: 0.0,
                    upper: f64::INFINITY,
                });
            }
            Ok((v[0] - 3.0).powi(2) + 2.0 * (v[1] + 1.0).powi(2) + 5.0)
        }
    }

    struct Broken;

    impl Objective for Broken {
        fn evaluate(&self, _params: &ParameterVector) -> Result<f64, EstimationError> {
            Err(EstimationError::InvalidData("no data".to_string()))
        }
    }

    struct Nowhere;

    impl Objective for Nowhere {
        fn evaluate(&self, _params: &ParameterVector) -> Result<f64, EstimationError> {
            Ok(f64::NAN)
        }
    }

    /// Every candidate fails to integrate
    struct Stiff;

    impl Objective for Stiff {
        fn evaluate(&self, _params: &ParameterVector) -> Result<f64, EstimationError> {
            Err(EstimationError::Integration("step size too small".to_string()))
        }
    }

    fn start() -> ParameterVector {
        ParameterVector::from_pairs(&[("x", 1.0), ("y", 1.0)]).unwrap()
    }

    #[test]
    fn minimizes_a_quadratic() {
        let fit = minimize(&Bowl, &start(), &FitOptions::default()).unwrap();
        assert_eq!(fit.status, ConvergenceStatus::ToleranceSatisfied);
        assert_eq!(fit.status.code(), 0);
        assert_relative_eq!(fit.parameters.get("x").unwrap(), 3.0, epsilon = 1e-5);
        assert_relative_eq!(fit.parameters.get("y").unwrap(), -1.0, epsilon = 1e-5);
        assert_relative_eq!(fit.objective, 5.0, epsilon = 1e-10);
        assert_relative_eq!(fit.minus_two_log_likelihood(), 10.0, epsilon = 1e-9);
        assert!(fit.evaluations >= fit.iterations);
        assert_eq!(fit.parameters.names(), ["x", "y"]);
    }

    #[test]
    fn evaluation_limit_is_reported() {
        let options = FitOptions {
            max_iterations: 20,
            ..Default::default()
        };
        let fit = minimize(&Bowl, &start(), &options).unwrap();
        assert_eq!(fit.status, ConvergenceStatus::IterationLimit);
        assert_eq!(fit.status.code(), 1);
        assert!(fit.evaluations >= 20);
    }

    #[test]
    fn unrecoverable_errors_surface_unchanged() {
        let err = minimize(&Broken, &start(), &FitOptions::default()).unwrap_err();
        assert_eq!(err, EstimationError::InvalidData("no data".to_string()));
    }

    #[test]
    fn infeasible_start_fails() {
        let err = minimize(&Nowhere, &start(), &FitOptions::default()).unwrap_err();
        assert!(matches!(err, EstimationError::OptimizationFailed(_)));
    }

    #[test]
    fn integration_failure_everywhere_fails() {
        let err = minimize(&Stiff, &start(), &FitOptions::default()).unwrap_err();
        assert!(matches!(err, EstimationError::OptimizationFailed(_)));
    }

    #[test]
    fn termination_reasons_map_to_status() {
        assert_eq!(
            status_for(Some(&TerminationReason::SolverConverged), true),
            ConvergenceStatus::ToleranceSatisfied
        );
        assert_eq!(
            status_for(Some(&TerminationReason::MaxItersReached), false),
            ConvergenceStatus::IterationLimit
        );
        assert_eq!(
            status_for(Some(&TerminationReason::SolverExit("cap".to_string())), false),
            ConvergenceStatus::IterationLimit
        );
        for reason in [
            Some(&TerminationReason::TargetCostReached),
            Some(&TerminationReason::Interrupt),
            Some(&TerminationReason::Timeout),
            None,
        ] {
            let status = status_for(reason, false);
            assert!(matches!(status, ConvergenceStatus::SolverFailure(_)));
            assert_eq!(status.code(), 2);
        }
    }

    #[test]
    fn options_are_validated() {
        let options = FitOptions {
            x_tolerance: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            minimize(&Bowl, &start(), &options),
            Err(EstimationError::InvalidOptions(_))
        ));
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: FitOptions = serde_json::from_str(r#"{"max_iterations": 200}"#).unwrap();
        assert_eq!(options.max_iterations, 200);
        assert_eq!(options.initial_step, 0.05);
    }
}
