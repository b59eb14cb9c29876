use crate::{
    data::{Dose, DosingSchedule, ObservationSet},
    simulator::{Out, T, V},
    EstimationError,
};

/// What happens to the system at a given time
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Action {
    InfusionStop { input: usize, rate: f64 },
    Bolus { input: usize, amount: f64 },
    InfusionStart { input: usize, rate: f64 },
    Observe { index: usize, outeq: usize },
}

impl Action {
    // At equal times: stop running infusions, give doses, then observe
    fn priority(&self) -> u8 {
        match self {
            Action::InfusionStop { .. } => 0,
            Action::Bolus { .. } => 1,
            Action::InfusionStart { .. } => 2,
            Action::Observe { .. } => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Step {
    pub(crate) time: T,
    pub(crate) action: Action,
}

/// Doses, infusion boundaries and observations merged into one time-ordered sequence
#[derive(Debug, Clone)]
pub(crate) struct Timeline {
    steps: Vec<Step>,
}

impl Timeline {
    pub(crate) fn new(
        dosing: &DosingSchedule,
        observations: &ObservationSet,
        nstates: usize,
        nouteqs: usize,
    ) -> Result<Self, EstimationError> {
        let mut steps = Vec::with_capacity(observations.len() + 2 * dosing.len());
        for dose in dosing.doses() {
            if dose.input() >= nstates {
                return Err(EstimationError::InvalidData(format!(
                    "dose at time {} targets compartment {} but the model has {} states",
                    dose.time(),
                    dose.input(),
                    nstates
                )));
            }
            match dose {
                Dose::Bolus(bolus) => steps.push(Step {
                    time: bolus.time(),
                    action: Action::Bolus {
                        input: bolus.input(),
                        amount: bolus.amount(),
                    },
                }),
                Dose::Infusion(infusion) => {
                    steps.push(Step {
                        time: infusion.time(),
                        action: Action::InfusionStart {
                            input: infusion.input(),
                            rate: infusion.rate(),
                        },
                    });
                    steps.push(Step {
                        time: infusion.time() + infusion.duration(),
                        action: Action::InfusionStop {
                            input: infusion.input(),
                            rate: infusion.rate(),
                        },
                    });
                }
            }
        }
        for (index, obs) in observations.observations().iter().enumerate() {
            if obs.outeq() >= nouteqs {
                return Err(EstimationError::InvalidData(format!(
                    "observation {} uses output {} but the model has {} outputs",
                    index,
                    obs.outeq(),
                    nouteqs
                )));
            }
            steps.push(Step {
                time: obs.time(),
                action: Action::Observe {
                    index,
                    outeq: obs.outeq(),
                },
            });
        }
        steps.sort_by(|a, b| {
            a.time
                .total_cmp(&b.time)
                .then(a.action.priority().cmp(&b.action.priority()))
        });
        // Nothing after the last observation can change a prediction
        if let Some(last) = steps
            .iter()
            .rposition(|s| matches!(s.action, Action::Observe { .. }))
        {
            steps.truncate(last + 1);
        }
        Ok(Timeline { steps })
    }

    pub(crate) fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Walk the timeline, advancing the state between steps with `advance`
    ///
    /// `advance(x, rateiv, from, to)` must move `x` from time `from` to `to` with the
    /// infusion rates held constant. Returns the prediction for every observation, in
    /// observation order.
    pub(crate) fn run<F>(
        &self,
        nstates: usize,
        nouteqs: usize,
        p: &V,
        out: Out,
        nobs: usize,
        mut advance: F,
    ) -> Result<Vec<f64>, EstimationError>
    where
        F: FnMut(&mut V, &V, T, T) -> Result<(), EstimationError>,
    {
        let mut predictions = vec![f64::NAN; nobs];
        let mut x = V::zeros(nstates);
        let mut rateiv = V::zeros(nstates);
        let mut y = V::zeros(nouteqs);
        let mut t = match self.steps.first() {
            Some(step) => step.time,
            None => return Ok(predictions),
        };

        for step in &self.steps {
            if step.time > t {
                advance(&mut x, &rateiv, t, step.time)?;
                if x.iter().any(|v| !v.is_finite()) {
                    return Err(EstimationError::Integration(format!(
                        "non-finite state at time {}",
                        step.time
                    )));
                }
                t = step.time;
            }
            match step.action {
                Action::Bolus { input, amount } => x[input] += amount,
                Action::InfusionStart { input, rate } => rateiv[input] += rate,
                Action::InfusionStop { input, rate } => rateiv[input] -= rate,
                Action::Observe { index, outeq } => {
                    y.fill(0.0);
                    (out)(&x, p, t, &mut y);
                    predictions[index] = y[outeq];
                }
            }
        }
        Ok(predictions)
    }
}
