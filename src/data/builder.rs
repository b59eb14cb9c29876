use crate::data::*;
use crate::EstimationError;

#[derive(Debug, Clone)]
enum Entry {
    Dose(Dose),
    Observation(Observation),
}

impl Subject {
    /// Start building a [Subject] with the given identifier
    ///
    /// # Example
    /// ```
    /// use pmfit::*;
    ///
    /// let subject = Subject::builder("patient_001")
    ///     .bolus(0.0, 1000.0, 0)
    ///     .observation(1.0, 15.2, 0)
    ///     .repeat(2, 2.0)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(subject.observations().len(), 3);
    /// ```
    pub fn builder(id: impl Into<String>) -> SubjectBuilder {
        SubjectBuilder {
            id: id.into(),
            entries: Vec::new(),
        }
    }
}

pub struct SubjectBuilder {
    id: String,
    entries: Vec<Entry>,
}

impl SubjectBuilder {
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn dose(mut self, dose: Dose) -> Self {
        self.entries.push(Entry::Dose(dose));
        self
    }

    pub fn bolus(self, time: f64, amount: f64, input: usize) -> Self {
        self.dose(Dose::Bolus(Bolus::new(time, amount, input)))
    }

    pub fn infusion(self, time: f64, amount: f64, input: usize, duration: f64) -> Self {
        self.dose(Dose::Infusion(Infusion::new(time, amount, input, duration)))
    }

    pub fn observation(mut self, time: f64, value: f64, outeq: usize) -> Self {
        self.entries
            .push(Entry::Observation(Observation::new(time, value, outeq)));
        self
    }

    /// Repeat the last event `n` times, `delta` time units apart
    pub fn repeat(mut self, n: usize, delta: f64) -> Self {
        let Some(last) = self.entries.last().cloned() else {
            return self;
        };
        for i in 1..=n {
            let mut entry = last.clone();
            match &mut entry {
                Entry::Dose(dose) => dose.inc_time(delta * i as f64),
                Entry::Observation(obs) => obs.inc_time(delta * i as f64),
            }
            self.entries.push(entry);
        }
        self
    }

    /// Finish the subject, sorting doses and observations by time
    pub fn build(self) -> Result<Subject, EstimationError> {
        let mut doses = Vec::new();
        let mut observations = Vec::new();
        for entry in self.entries {
            match entry {
                Entry::Dose(dose) => doses.push(dose),
                Entry::Observation(obs) => observations.push(obs),
            }
        }
        doses.sort_by(|a, b| a.time().total_cmp(&b.time()));
        observations.sort_by(|a, b| a.time().total_cmp(&b.time()));
        Ok(Subject::new(
            self.id,
            ObservationSet::new(observations)?,
            DosingSchedule::new(doses)?,
        ))
    }
}
