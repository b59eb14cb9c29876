use crate::data::*;
use crate::EstimationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The doses administered to a subject, in the order they were given
///
/// The schedule is validated on construction: times are finite and non-negative,
/// amounts are finite and infusion durations are strictly positive.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct DosingSchedule {
    doses: Vec<Dose>,
}

impl DosingSchedule {
    /// Constructs a new [DosingSchedule] from a vector of [Dose]s
    pub fn new(doses: Vec<Dose>) -> Result<Self, EstimationError> {
        for dose in &doses {
            validate_dose(dose)?;
        }
        Ok(DosingSchedule { doses })
    }

    /// A schedule with a single bolus
    pub fn bolus(time: f64, amount: f64, input: usize) -> Result<Self, EstimationError> {
        Self::new(vec![Dose::Bolus(Bolus::new(time, amount, input))])
    }

    /// Get the doses of the schedule
    pub fn doses(&self) -> &[Dose] {
        &self.doses
    }

    /// Number of doses in the schedule
    pub fn len(&self) -> usize {
        self.doses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doses.is_empty()
    }
}

fn validate_dose(dose: &Dose) -> Result<(), EstimationError> {
    if !dose.time().is_finite() || dose.time() < 0.0 {
        return Err(EstimationError::InvalidData(format!(
            "dose time must be finite and non-negative, got {}",
            dose.time()
        )));
    }
    if !dose.amount().is_finite() {
        return Err(EstimationError::InvalidData(format!(
            "dose amount must be finite, got {}",
            dose.amount()
        )));
    }
    if let Dose::Infusion(infusion) = dose {
        if !infusion.duration().is_finite() || infusion.duration() <= 0.0 {
            return Err(EstimationError::InvalidData(format!(
                "infusion duration must be strictly positive, got {}",
                infusion.duration()
            )));
        }
    }
    Ok(())
}

/// Observed measurements, one entry per (time, value, output channel)
///
/// Observations keep the order in which they were supplied; predictions are
/// returned index-for-index in the same order. Within a channel, times must be
/// non-decreasing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ObservationSet {
    observations: Vec<Observation>,
}

impl ObservationSet {
    /// Constructs a new [ObservationSet], validating its invariants
    pub fn new(observations: Vec<Observation>) -> Result<Self, EstimationError> {
        if observations.is_empty() {
            return Err(EstimationError::InvalidData(
                "at least one observation is required".to_string(),
            ));
        }
        // Last time seen on each channel
        let mut last: Vec<Option<f64>> = Vec::new();
        for (index, obs) in observations.iter().enumerate() {
            if !obs.time().is_finite() || obs.time() < 0.0 {
                return Err(EstimationError::InvalidData(format!(
                    "observation {} has time {}, times must be finite and non-negative",
                    index,
                    obs.time()
                )));
            }
            if !obs.value().is_finite() {
                return Err(EstimationError::InvalidData(format!(
                    "observation {} has non-finite value {}",
                    index,
                    obs.value()
                )));
            }
            if last.len() <= obs.outeq() {
                last.resize(obs.outeq() + 1, None);
            }
            if let Some(previous) = last[obs.outeq()] {
                if obs.time() < previous {
                    return Err(EstimationError::InvalidData(format!(
                        "observation {} at time {} precedes time {} on output {}",
                        index,
                        obs.time(),
                        previous,
                        obs.outeq()
                    )));
                }
            }
            last[obs.outeq()] = Some(obs.time());
        }
        Ok(ObservationSet { observations })
    }

    /// Single-channel set from parallel time and value slices
    pub fn from_times_values(times: &[f64], values: &[f64]) -> Result<Self, EstimationError> {
        if times.len() != values.len() {
            return Err(EstimationError::InvalidData(format!(
                "{} times but {} values",
                times.len(),
                values.len()
            )));
        }
        Self::new(
            times
                .iter()
                .zip(values)
                .map(|(&t, &y)| Observation::new(t, y, 0))
                .collect(),
        )
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn times(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.time()).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.value()).collect()
    }

    /// Number of output channels referenced (highest `outeq` + 1)
    pub fn nchannels(&self) -> usize {
        self.observations
            .iter()
            .map(|o| o.outeq() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Same times and channels, new values
    pub(crate) fn with_values(&self, values: &[f64]) -> Self {
        let observations = self
            .observations
            .iter()
            .zip(values)
            .map(|(o, &v)| Observation::new(o.time(), v, o.outeq()))
            .collect();
        ObservationSet { observations }
    }
}

/// A single individual: an identifier, the observed data and the dosing history
///
/// Subjects are usually assembled with [crate::SubjectBuilder].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Subject {
    id: String,
    observations: ObservationSet,
    dosing: DosingSchedule,
}

impl Subject {
    pub(crate) fn new(id: String, observations: ObservationSet, dosing: DosingSchedule) -> Self {
        Subject {
            id,
            observations,
            dosing,
        }
    }

    /// Get the subject identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn observations(&self) -> &ObservationSet {
        &self.observations
    }

    pub fn dosing(&self) -> &DosingSchedule {
        &self.dosing
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Subject ID: {}", self.id)?;
        writeln!(f, "{}", self.dosing)?;
        writeln!(f, "{}", self.observations)?;
        Ok(())
    }
}

impl fmt::Display for DosingSchedule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Doses:")?;
        for dose in &self.doses {
            match dose {
                Dose::Bolus(b) => writeln!(
                    f,
                    "  Bolus at {:.4}: {} into compartment {}",
                    b.time(),
                    b.amount(),
                    b.input()
                )?,
                Dose::Infusion(i) => writeln!(
                    f,
                    "  Infusion at {:.4}: {} into compartment {} over {}",
                    i.time(),
                    i.amount(),
                    i.input(),
                    i.duration()
                )?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for ObservationSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Observations:")?;
        for obs in &self.observations {
            writeln!(
                f,
                "  {:.4}\t{}\t(outeq {})",
                obs.time(),
                obs.value(),
                obs.outeq()
            )?;
        }
        Ok(())
    }
}
