pub mod one_compartment_models;

pub use one_compartment_models::*;

use crate::{
    data::{DosingSchedule, ObservationSet},
    simulator::{timeline::Timeline, AnalyticalEq, Neqs, Out, SecEq, Tolerances, V},
    Equation, EstimationError,
};

/// Model equation using analytical solutions.
///
/// This implementation uses closed-form analytical solutions for the model
/// equations rather than numerical integration. The secondary equation maps the
/// model parameters to the parameters the closed form expects, the output
/// equation receives the model parameters unchanged.
#[repr(C)]
#[derive(Clone, Debug)]
pub struct Analytical {
    eq: AnalyticalEq,
    seq_eq: SecEq,
    out: Out,
    neqs: Neqs,
}

impl Analytical {
    /// Create a new Analytical equation model.
    ///
    /// # Parameters
    /// - `eq`: The analytical equation function
    /// - `seq_eq`: The secondary equation function
    /// - `out`: The output equation function
    /// - `neqs`: The number of states and output equations
    ///
    /// # Example
    /// ```
    /// use pmfit::fetch_params;
    /// use pmfit::prelude::*;
    ///
    /// let analytical = Analytical::new(
    ///     one_compartment_with_absorption,
    ///     |p| {
    ///         fetch_params!(p, cl, vc, ka);
    ///         V::from_vec(vec![ka, cl / vc])
    ///     },
    ///     |x, p, _t, y| {
    ///         fetch_params!(p, _cl, vc, _ka);
    ///         y[0] = x[1] / vc;
    ///     },
    ///     (2, 1),
    /// );
    /// assert_eq!(analytical.nstates(), 2);
    /// ```
    pub fn new(eq: AnalyticalEq, seq_eq: SecEq, out: Out, neqs: Neqs) -> Self {
        Self {
            eq,
            seq_eq,
            out,
            neqs,
        }
    }
}

impl Equation for Analytical {
    fn nstates(&self) -> usize {
        self.neqs.0
    }

    fn nouteqs(&self) -> usize {
        self.neqs.1
    }

    fn tolerances(&self) -> Tolerances {
        Tolerances::new(1e-10, 1e-10)
    }

    fn predict(
        &self,
        params: &[f64],
        observations: &ObservationSet,
        dosing: &DosingSchedule,
    ) -> Result<Vec<f64>, EstimationError> {
        let (nstates, nouteqs) = self.neqs;
        let timeline = Timeline::new(dosing, observations, nstates, nouteqs)?;
        let p = V::from_column_slice(params);
        let sp = (self.seq_eq)(&p);
        timeline.run(
            nstates,
            nouteqs,
            &p,
            self.out,
            observations.len(),
            |x, rateiv, from, to| {
                *x = (self.eq)(x, &sp, to - from, rateiv);
                Ok(())
            },
        )
    }
}
