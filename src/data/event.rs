use serde::{Deserialize, Serialize};

/// A dose administered to the system
///
/// Doses are consumed by the model evaluator only; the objective function,
/// optimizer and uncertainty estimator never look inside them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Dose {
    /// A bolus dose (instantaneous drug input)
    Bolus(Bolus),
    /// An infusion (continuous drug input over a duration)
    Infusion(Infusion),
}

impl Dose {
    /// Get the time at which the dose starts
    pub fn time(&self) -> f64 {
        match self {
            Dose::Bolus(bolus) => bolus.time,
            Dose::Infusion(infusion) => infusion.time,
        }
    }

    /// Get the compartment number (zero-indexed) receiving the dose
    pub fn input(&self) -> usize {
        match self {
            Dose::Bolus(bolus) => bolus.input,
            Dose::Infusion(infusion) => infusion.input,
        }
    }

    /// Get the total amount delivered by the dose
    pub fn amount(&self) -> f64 {
        match self {
            Dose::Bolus(bolus) => bolus.amount,
            Dose::Infusion(infusion) => infusion.amount,
        }
    }

    /// Shift the dose by `dt` time units
    pub(crate) fn inc_time(&mut self, dt: f64) {
        match self {
            Dose::Bolus(bolus) => bolus.time += dt,
            Dose::Infusion(infusion) => infusion.time += dt,
        }
    }
}

/// Represents an instantaneous input of drug
///
/// A [Bolus] is a discrete amount of drug added to a specific compartment at a specific time.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Bolus {
    time: f64,
    amount: f64,
    input: usize,
}

impl Bolus {
    /// Create a new bolus event
    ///
    /// # Arguments
    ///
    /// * `time` - Time of the bolus dose
    /// * `amount` - Amount of drug administered
    /// * `input` - The compartment number (zero-indexed) receiving the dose
    pub fn new(time: f64, amount: f64, input: usize) -> Self {
        Bolus {
            time,
            amount,
            input,
        }
    }
    /// Get the amount of drug in the bolus
    pub fn amount(&self) -> f64 {
        self.amount
    }
    /// Get the compartment number (zero-indexed) that receives the bolus
    pub fn input(&self) -> usize {
        self.input
    }
    /// Get the time of the bolus administration
    pub fn time(&self) -> f64 {
        self.time
    }
}

/// Represents a continuous dose of drug over time
///
/// An [Infusion] administers drug at a constant rate over a specified duration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Infusion {
    time: f64,
    amount: f64,
    input: usize,
    duration: f64,
}

impl Infusion {
    /// Create a new infusion event
    ///
    /// # Arguments
    ///
    /// * `time` - Start time of the infusion
    /// * `amount` - Total amount of drug to be administered
    /// * `input` - The compartment number (zero-indexed) receiving the dose
    /// * `duration` - Duration of the infusion in time units
    pub fn new(time: f64, amount: f64, input: usize, duration: f64) -> Self {
        Infusion {
            time,
            amount,
            input,
            duration,
        }
    }
    /// Get the total amount of drug provided over the infusion
    pub fn amount(&self) -> f64 {
        self.amount
    }
    /// Get the compartment number (zero-indexed) that receives the infusion
    pub fn input(&self) -> usize {
        self.input
    }
    /// Get the duration of the infusion
    pub fn duration(&self) -> f64 {
        self.duration
    }
    /// Get the start time of the infusion
    ///
    /// The infusion continues from this time until time + duration.
    pub fn time(&self) -> f64 {
        self.time
    }
    /// Constant delivery rate while the infusion is running
    pub fn rate(&self) -> f64 {
        self.amount / self.duration
    }
}

/// Represents an observation of drug concentration or other measured value
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Observation {
    time: f64,
    value: f64,
    outeq: usize,
}

impl Observation {
    /// Create a new observation
    ///
    /// # Arguments
    ///
    /// * `time` - Time of the observation
    /// * `value` - Observed value (e.g., drug concentration)
    /// * `outeq` - Output equation number (zero-indexed) corresponding to this observation
    pub fn new(time: f64, value: f64, outeq: usize) -> Self {
        Observation { time, value, outeq }
    }
    /// Get the time of the observation
    pub fn time(&self) -> f64 {
        self.time
    }
    /// Get the observed value
    pub fn value(&self) -> f64 {
        self.value
    }
    /// Get the output equation number (zero-indexed)
    pub fn outeq(&self) -> usize {
        self.outeq
    }
    pub(crate) fn inc_time(&mut self, dt: f64) {
        self.time += dt;
    }
}
