mod closure;

use crate::{
    data::{DosingSchedule, ObservationSet},
    simulator::{timeline::Timeline, DiffEq, Neqs, Out, Tolerances, M, T, V},
    Equation, EstimationError,
};

use closure::PmProblem;
use diffsol::{NalgebraLU, OdeBuilder, OdeSolverMethod, OdeSolverStopReason};

/// Model equation integrated numerically with a BDF solver.
///
/// A new initial value problem is solved between every pair of consecutive
/// events, so boluses and infusion boundaries never fall inside a solver step.
#[repr(C)]
#[derive(Clone, Debug)]
pub struct ODE {
    diffeq: DiffEq,
    out: Out,
    neqs: Neqs,
    tolerances: Tolerances,
}

impl ODE {
    pub fn new(diffeq: DiffEq, out: Out, neqs: Neqs) -> Self {
        Self {
            diffeq,
            out,
            neqs,
            tolerances: Tolerances::default(),
        }
    }

    /// Replace the default integrator tolerances (`rtol = atol = 1e-8`)
    pub fn with_tolerances(mut self, tolerances: Tolerances) -> Self {
        self.tolerances = tolerances;
        self
    }

    fn solve(&self, x: &mut V, p: &V, rateiv: &V, from: T, to: T) -> Result<(), EstimationError> {
        let problem = OdeBuilder::<M>::new()
            .atol(vec![self.tolerances.atol; x.len()])
            .rtol(self.tolerances.rtol)
            .t0(from)
            .h0(1e-3)
            .p(p.iter().copied().collect::<Vec<f64>>())
            .build_from_eqn(PmProblem::new(
                self.diffeq,
                p.clone(),
                rateiv.clone(),
                x.clone(),
            ))
            .map_err(|e| EstimationError::Integration(e.to_string()))?;

        let mut solver = problem
            .bdf::<NalgebraLU<f64>>()
            .map_err(|e| EstimationError::Integration(e.to_string()))?;

        solver
            .set_stop_time(to)
            .map_err(|e| EstimationError::Integration(e.to_string()))?;
        loop {
            match solver.step() {
                Ok(OdeSolverStopReason::InternalTimestep) => continue,
                Ok(OdeSolverStopReason::TstopReached) => break,
                Ok(reason) => {
                    return Err(EstimationError::Integration(format!(
                        "unexpected solver stop {:?} before time {}",
                        reason, to
                    )))
                }
                Err(e) => {
                    return Err(EstimationError::Integration(format!(
                        "integration from {} to {} failed: {}",
                        from, to, e
                    )))
                }
            }
        }
        x.copy_from(solver.state().y);
        Ok(())
    }
}

impl Equation for ODE {
    fn nstates(&self) -> usize {
        self.neqs.0
    }

    fn nouteqs(&self) -> usize {
        self.neqs.1
    }

    fn tolerances(&self) -> Tolerances {
        self.tolerances
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
        timeline.run(
            nstates,
            nouteqs,
            &p,
            self.out,
            observations.len(),
            |x, rateiv, from, to| self.solve(x, &p, rateiv, from, to),
        )
    }
}
