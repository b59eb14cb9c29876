pub mod equation;
pub mod model;
pub mod predictions;
pub(crate) mod timeline;

use serde::{Deserialize, Serialize};

pub type T = f64;
pub type V = nalgebra::DVector<T>;
pub type M = nalgebra::DMatrix<T>;

/// This closure represents the differential equation of the model:
/// Params:
/// - x: The state vector at time t
/// - p: The parameters of the model; Use the [fetch_params!] macro to extract the parameters
/// - t: The time at which the differential equation is evaluated
/// - dx: A mutable reference to the derivative of the state vector at time t (zeroed before the call)
/// - rateiv: A vector of infusion rates at time t
/// Example:
/// ```ignore
/// use pmfit::*;
/// let diff_eq = |x, p, _t, dx, rateiv| {
///  fetch_params!(p, cl, vc, ka);
///  dx[0] = -ka * x[0];
///  dx[1] = ka * x[0] - cl / vc * x[1] + rateiv[1];
/// };
/// ```
pub type DiffEq = fn(&V, &V, T, &mut V, &V);

/// This closure represents an Analytical solution of the model, see the
/// [equation::analytical] module for examples.
/// Params:
/// - x: The state vector at the start of the interval
/// - p: The parameters returned by the secondary equation
/// - dt: The length of the interval
/// - rateiv: A vector of infusion rates, constant over the interval
///
/// Returns the state vector at the end of the interval.
pub type AnalyticalEq = fn(&V, &V, T, &V) -> V;

/// This closure maps the model parameters to the parameters expected by an
/// [AnalyticalEq], e.g. clearance and volume to an elimination rate constant.
/// Example:
/// ```ignore
/// use pmfit::*;
/// let sec_eq = |p: &V| {
///    fetch_params!(p, cl, vc, ka);
///    V::from_vec(vec![ka, cl / vc])
/// };
/// ```
pub type SecEq = fn(&V) -> V;

/// This closure represents the output equation of the model:
/// Params:
/// - x: The state vector at time t
/// - p: The parameters of the model; Use the [fetch_params!] macro to extract the parameters
/// - t: The time at which the output equation is evaluated
/// - y: A mutable reference to the output vector at time t
/// Example:
/// ```ignore
/// use pmfit::*;
/// let out = |x, p, _t, y| {
///   fetch_params!(p, _cl, vc);
///   y[0] = x[1] / vc;
/// };
/// ```
pub type Out = fn(&V, &V, T, &mut V);

/// The number of states and output equations of the model
/// The first element is the number of states and the second element is the number of output equations
/// Example:
/// ```ignore
/// let neqs = (2, 1);
/// ```
/// This means that the system of equations has 2 states and there is only 1 output equation.
pub type Neqs = (usize, usize);

/// Numerical tolerances of the structural model.
///
/// For ODE models these are the integrator tolerances. They also set the
/// finite-difference step used by the uncertainty estimator,
/// `h = sqrt(rtol) * max(|theta|, atol)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    pub rtol: f64,
    pub atol: f64,
}

impl Tolerances {
    pub fn new(rtol: f64, atol: f64) -> Self {
        Tolerances { rtol, atol }
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Tolerances {
            rtol: 1e-8,
            atol: 1e-8,
        }
    }
}
