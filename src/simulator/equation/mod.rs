pub mod analytical;
pub mod ode;
pub use analytical::*;
pub use ode::*;

use crate::{
    data::{DosingSchedule, ObservationSet},
    simulator::Tolerances,
    EstimationError,
};

/// Structural model of a [Model](crate::Model).
///
/// An equation turns a parameter vector, a dosing schedule and a set of
/// observation times into one prediction per observation. Predictions must be
/// returned in the order of `observations`, and must depend only on the inputs:
/// identical arguments give identical results.
///
/// [Analytical] and [ODE] cover closed-form and numerically integrated models;
/// any other type can take part in estimation by implementing this trait.
pub trait Equation: Sync {
    /// Number of state variables (compartments)
    fn nstates(&self) -> usize;

    /// Number of output equations
    fn nouteqs(&self) -> usize;

    /// Numerical tolerances of the predictions.
    ///
    /// Also used to size the finite-difference steps of the uncertainty estimate.
    fn tolerances(&self) -> Tolerances {
        Tolerances::default()
    }

    /// Predict the output `observations[i].outeq()` at `observations[i].time()`
    /// for every observation.
    ///
    /// # Errors
    /// [EstimationError::Integration] when the model cannot be solved and
    /// [EstimationError::InvalidData] when a dose or observation refers to a
    /// compartment or output the equation does not have.
    fn predict(
        &self,
        params: &[f64],
        observations: &ObservationSet,
        dosing: &DosingSchedule,
    ) -> Result<Vec<f64>, EstimationError>;
}
