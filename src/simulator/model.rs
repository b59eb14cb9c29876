use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::{
    data::{
        residual_error::ResolvedErrorModel, DosingSchedule, ObservationSet, Parameter,
        ParameterVector, ResidualErrorModel,
    },
    simulator::{predictions::Predictions, Tolerances},
    Equation, EstimationError,
};

/// A structural [Equation] together with its parameter declarations and a
/// residual error model.
///
/// This is the model evaluator of an estimation run: given a
/// [ParameterVector], a dosing schedule and observation times it returns the
/// predicted mean and variance of every observation. Evaluation has no side
/// effects, so a model can be shared between threads.
///
/// # Example
/// ```
/// use pmfit::fetch_params;
/// use pmfit::prelude::*;
///
/// let equation = Analytical::new(
///     one_compartment_with_absorption,
///     |p| {
///         fetch_params!(p, cl, vc, ka, _sigma);
///         V::from_vec(vec![ka, cl / vc])
///     },
///     |x, p, _t, y| {
///         fetch_params!(p, _cl, vc, _ka, _sigma);
///         y[0] = x[1] / vc;
///     },
///     (2, 1),
/// );
/// let model = Model::new(
///     equation,
///     vec![
///         Parameter::positive("cl"),
///         Parameter::positive("vc"),
///         Parameter::positive("ka"),
///         Parameter::positive("sigma"),
///     ],
///     ResidualErrorModel::proportional("sigma"),
/// )
/// .unwrap();
///
/// let subject = Subject::builder("1")
///     .bolus(0.0, 1000.0, 0)
///     .observation(1.0, 15.0, 0)
///     .build()
///     .unwrap();
/// let theta = model.parameter_vector(vec![1.0, 20.0, 0.6, 0.1]).unwrap();
/// let predictions = model
///     .evaluate(&theta, subject.observations(), subject.dosing())
///     .unwrap();
/// assert_eq!(predictions.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Model<E: Equation> {
    equation: E,
    parameters: Vec<Parameter>,
    names: Vec<String>,
    error_model: ResidualErrorModel,
    resolved: ResolvedErrorModel,
    structural: Vec<bool>,
}

impl<E: Equation> Model<E> {
    /// Declare a model. Parameters are passed to the equation in the order given here.
    ///
    /// Parameters referenced by the residual error model are error parameters, all
    /// others are structural.
    pub fn new(
        equation: E,
        parameters: Vec<Parameter>,
        error_model: ResidualErrorModel,
    ) -> Result<Self, EstimationError> {
        if parameters.is_empty() {
            return Err(EstimationError::InvalidModel(
                "a model needs at least one parameter".to_string(),
            ));
        }
        let names: Vec<String> = parameters.iter().map(|p| p.name().to_string()).collect();
        for (i, parameter) in parameters.iter().enumerate() {
            if names[..i].iter().any(|n| n == parameter.name()) {
                return Err(EstimationError::InvalidModel(format!(
                    "parameter {} is declared twice",
                    parameter.name()
                )));
            }
            if parameter.lower().is_nan()
                || parameter.upper().is_nan()
                || parameter.lower() >= parameter.upper()
            {
                return Err(EstimationError::InvalidModel(format!(
                    "parameter {} has an empty domain ({}, {})",
                    parameter.name(),
                    parameter.lower(),
                    parameter.upper()
                )));
            }
        }
        let resolved = error_model.resolve(&names)?;
        let error_parameters: Vec<&str> = error_model.estimated_parameters().collect();
        let structural = names
            .iter()
            .map(|n| !error_parameters.contains(&n.as_str()))
            .collect();
        Ok(Model {
            equation,
            parameters,
            names,
            error_model,
            resolved,
            structural,
        })
    }

    pub fn equation(&self) -> &E {
        &self.equation
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn parameter_names(&self) -> &[String] {
        &self.names
    }

    pub fn error_model(&self) -> &ResidualErrorModel {
        &self.error_model
    }

    /// `true` for every parameter that does not enter the residual error model
    pub fn structural_mask(&self) -> &[bool] {
        &self.structural
    }

    pub fn tolerances(&self) -> Tolerances {
        self.equation.tolerances()
    }

    /// A [ParameterVector] carrying this model's parameter names
    pub fn parameter_vector(&self, values: Vec<f64>) -> Result<ParameterVector, EstimationError> {
        if values.len() != self.names.len() {
            return Err(EstimationError::ParameterMismatch {
                expected: self.names.clone(),
                found: vec![format!("{} values", values.len())],
            });
        }
        ParameterVector::new(self.names.clone(), values)
    }

    /// Check that `params` names this model's parameters in order and lies in their domains
    pub fn check_parameters(&self, params: &ParameterVector) -> Result<(), EstimationError> {
        if params.names() != self.names.as_slice() {
            return Err(EstimationError::ParameterMismatch {
                expected: self.names.clone(),
                found: params.names().to_vec(),
            });
        }
        for (parameter, value) in self.parameters.iter().zip(params.values()) {
            parameter.check(*value)?;
        }
        Ok(())
    }

    /// Predicted mean and variance of every observation in `observations`
    ///
    /// Only the times and output channels of `observations` are used.
    pub fn evaluate(
        &self,
        params: &ParameterVector,
        observations: &ObservationSet,
        dosing: &DosingSchedule,
    ) -> Result<Predictions, EstimationError> {
        self.check_parameters(params)?;
        let values = params.values();
        let mean = self.equation.predict(values, observations, dosing)?;
        if mean.len() != observations.len() {
            return Err(EstimationError::InvalidModel(format!(
                "the equation returned {} predictions for {} observations",
                mean.len(),
                observations.len()
            )));
        }
        if let Some(index) = mean.iter().position(|m| !m.is_finite()) {
            return Err(EstimationError::Integration(format!(
                "prediction {} for the observation at time {} is not finite",
                mean[index],
                observations.observations()[index].time()
            )));
        }
        let variance = mean
            .iter()
            .map(|m| self.resolved.variance(*m, values))
            .collect();
        Predictions::new(mean, variance)
    }

    /// Draw a synthetic data set at the times of `observations`
    ///
    /// Each value is sampled from a normal distribution with the predicted mean and
    /// variance. A zero variance reproduces the mean.
    pub fn simulate<R: Rng + ?Sized>(
        &self,
        params: &ParameterVector,
        observations: &ObservationSet,
        dosing: &DosingSchedule,
        rng: &mut R,
    ) -> Result<ObservationSet, EstimationError> {
        let predictions = self.evaluate(params, observations, dosing)?;
        let mut values = Vec::with_capacity(predictions.len());
        for (index, (mean, variance)) in predictions
            .mean()
            .iter()
            .zip(predictions.variance())
            .enumerate()
        {
            let normal = Normal::new(*mean, variance.sqrt()).map_err(|_| {
                EstimationError::InvalidVariance {
                    index,
                    variance: *variance,
                }
            })?;
            values.push(normal.sample(rng));
        }
        Ok(observations.with_values(&values))
    }
}
