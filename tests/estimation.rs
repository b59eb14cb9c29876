use approx::assert_relative_eq;
use pmfit::fetch_params;
use pmfit::prelude::*;
use pmfit::{CovarianceMatrix, NegLogLikelihood, Predictions};

const TIMES: [f64; 6] = [0.2864, 0.5155, 1.0309, 2.0619, 6.0710, 8.0756];
const VALUES: [f64; 6] = [5.746, 9.7379, 15.1815, 28.6089, 24.9798, 25.3427];

fn oral_equation() -> Analytical {
    Analytical::new(
        one_compartment_with_absorption,
        |p| {
            fetch_params!(p, cl, vc, ka);
            V::from_vec(vec![ka, cl / vc])
        },
        |x, p, _t, y| {
            fetch_params!(p, _cl, vc);
            y[0] = x[1] / vc;
        },
        (2, 1),
    )
}

fn oral_model() -> Model<Analytical> {
    Model::new(
        oral_equation(),
        vec![
            Parameter::positive("cl"),
            Parameter::positive("vc"),
            Parameter::positive("ka"),
            Parameter::positive("sigma"),
        ],
        ResidualErrorModel::proportional("sigma"),
    )
    .unwrap()
}

fn oral_data() -> (ObservationSet, DosingSchedule) {
    (
        ObservationSet::from_times_values(&TIMES, &VALUES).unwrap(),
        DosingSchedule::bolus(0.0, 1000.0, 0).unwrap(),
    )
}

#[test]
fn one_compartment_oral_fit() {
    let model = oral_model();
    let (observed, dosing) = oral_data();
    let initial = model.parameter_vector(vec![1.0, 10.0, 0.6, 0.1]).unwrap();

    let report = estimate(&model, &initial, &observed, &dosing, &FitOptions::default()).unwrap();
    let fit = &report.fit;

    assert_eq!(fit.status, ConvergenceStatus::ToleranceSatisfied);
    assert!(fit.evaluations <= FitOptions::default().max_iterations);
    assert_relative_eq!(fit.parameters.get("cl").unwrap(), 2.29275, max_relative = 1e-3);
    assert_relative_eq!(fit.parameters.get("vc").unwrap(), 21.6315, max_relative = 1e-3);
    assert_relative_eq!(fit.parameters.get("ka").unwrap(), 0.469330, max_relative = 1e-3);
    assert_relative_eq!(fit.parameters.get("sigma").unwrap(), 0.0814262, max_relative = 1e-3);
    assert_relative_eq!(fit.objective, 10.0340, epsilon = 1e-4);
    assert_relative_eq!(fit.minus_two_log_likelihood(), 20.0680, epsilon = 2e-4);

    let expected_rse = [38.85, 40.21, 45.15, 29.06];
    for (rse, expected) in report.relative_standard_errors.iter().zip(expected_rse) {
        assert!(
            (rse - expected).abs() < 0.5,
            "relative standard error {} differs from {}",
            rse,
            expected
        );
    }

    let covariance = &report.covariance;
    assert_eq!(covariance.names(), ["cl", "vc", "ka", "sigma"]);
    for i in 0..4 {
        assert!(covariance.matrix()[(i, i)] > 0.0);
        assert_relative_eq!(report.correlation[(i, i)], 1.0, epsilon = 1e-12);
        for j in 0..4 {
            assert_eq!(covariance.matrix()[(i, j)], covariance.matrix()[(j, i)]);
            assert!(report.correlation[(i, j)].abs() <= 1.0 + 1e-12);
        }
    }
}

#[test]
fn estimation_is_repeatable() {
    let model = oral_model();
    let (observed, dosing) = oral_data();
    let initial = model.parameter_vector(vec![1.0, 10.0, 0.6, 0.1]).unwrap();
    let options = FitOptions::default();

    let first = estimate(&model, &initial, &observed, &dosing, &options).unwrap();
    let second = estimate(&model, &initial, &observed, &dosing, &options).unwrap();

    assert_eq!(first.fit.parameters, second.fit.parameters);
    assert_eq!(first.fit.objective, second.fit.objective);
    assert_eq!(first.fit.evaluations, second.fit.evaluations);
    assert_eq!(first.covariance, second.covariance);
}

#[test]
fn report_serializes_to_json() {
    let model = oral_model();
    let (observed, dosing) = oral_data();
    let initial = model.parameter_vector(vec![1.0, 10.0, 0.6, 0.1]).unwrap();
    let report = estimate(&model, &initial, &observed, &dosing, &FitOptions::default()).unwrap();

    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["fit"]["status"], "ToleranceSatisfied");
    assert!(json["fit"]["parameters"]["vc"].as_f64().unwrap() > 20.0);
    assert_eq!(json["covariance"]["names"][3], "sigma");
    assert_eq!(json["covariance"]["matrix"].as_array().unwrap().len(), 4);
    assert_eq!(json["relative_standard_errors"].as_array().unwrap().len(), 4);
    assert_eq!(json["correlation"][2].as_array().unwrap().len(), 4);
}

#[test]
fn objective_matches_the_normal_likelihood() {
    let model = oral_model();
    let (observed, dosing) = oral_data();
    let theta = model
        .parameter_vector(vec![2.29274769, 21.6315415, 0.46932981, 0.08142617])
        .unwrap();

    let predictions = model.evaluate(&theta, &observed, &dosing).unwrap();
    let expected: f64 = VALUES
        .iter()
        .zip(predictions.mean())
        .zip(predictions.variance())
        .map(|((y, mean), variance)| {
            0.5 * ((2.0 * std::f64::consts::PI).ln() + variance.ln() + (y - mean).powi(2) / variance)
        })
        .sum();

    let value = neg_log_likelihood(&model, &theta, &observed, &dosing).unwrap();
    assert_relative_eq!(value, expected, max_relative = 1e-12);
    assert_relative_eq!(value, 10.0340248, epsilon = 1e-5);
}

#[test]
fn noiseless_data_recovers_the_truth() {
    let model = Model::new(
        oral_equation(),
        vec![
            Parameter::positive("cl"),
            Parameter::positive("vc"),
            Parameter::positive("ka"),
        ],
        ResidualErrorModel::constant(0.1),
    )
    .unwrap();
    let dosing = DosingSchedule::bolus(0.0, 1000.0, 0).unwrap();
    let truth = model.parameter_vector(vec![1.0, 20.0, 0.6]).unwrap();

    let template = ObservationSet::from_times_values(&TIMES, &[0.0; 6]).unwrap();
    let exact = model.evaluate(&truth, &template, &dosing).unwrap();
    let observed = ObservationSet::from_times_values(&TIMES, exact.mean()).unwrap();

    let fit = minimize(
        &NegLogLikelihood::new(&model, &observed, &dosing),
        &truth,
        &FitOptions::default(),
    )
    .unwrap();

    let n = TIMES.len() as f64;
    let expected = 0.5 * n * (2.0 * std::f64::consts::PI).ln() + 0.5 * n * 0.01f64.ln();
    assert!(fit.status.is_converged());
    assert_relative_eq!(fit.objective, expected, epsilon = 1e-9);
    for (value, truth) in fit.parameters.values().iter().zip(truth.values()) {
        assert_relative_eq!(*value, *truth, max_relative = 1e-6);
    }
}

/// `a + b * t`, with no dosing
#[derive(Debug, Clone)]
struct Line {
    nparams: usize,
}

impl Equation for Line {
    fn nstates(&self) -> usize {
        0
    }

    fn nouteqs(&self) -> usize {
        1
    }

    fn predict(
        &self,
        params: &[f64],
        observations: &ObservationSet,
        _dosing: &DosingSchedule,
    ) -> Result<Vec<f64>, EstimationError> {
        assert_eq!(params.len(), self.nparams);
        Ok(observations
            .observations()
            .iter()
            .map(|obs| params[0] + params[1] * obs.time())
            .collect())
    }
}

const LINE_TIMES: [f64; 8] = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
const LINE_VALUES: [f64; 8] = [1.1, 2.9, 5.2, 6.8, 9.1, 11.0, 12.8, 15.2];

#[test]
fn linear_regression_covariance() {
    let model = Model::new(
        Line { nparams: 3 },
        vec![
            Parameter::unbounded("a"),
            Parameter::unbounded("b"),
            Parameter::positive("sigma"),
        ],
        ResidualErrorModel::constant("sigma"),
    )
    .unwrap();
    let observed = ObservationSet::from_times_values(&LINE_TIMES, &LINE_VALUES).unwrap();
    let dosing = DosingSchedule::default();
    let initial = model.parameter_vector(vec![0.5, 1.5, 1.0]).unwrap();

    let report = estimate(&model, &initial, &observed, &dosing, &FitOptions::default()).unwrap();
    assert!(report.fit.status.is_converged());

    // Ordinary least squares
    let n = LINE_TIMES.len() as f64;
    let st: f64 = LINE_TIMES.iter().sum();
    let stt: f64 = LINE_TIMES.iter().map(|t| t * t).sum();
    let sy: f64 = LINE_VALUES.iter().sum();
    let sty: f64 = LINE_TIMES.iter().zip(LINE_VALUES).map(|(t, y)| t * y).sum();
    let det = n * stt - st * st;
    let b = (n * sty - st * sy) / det;
    let a = (sy - b * st) / n;
    let rss: f64 = LINE_TIMES
        .iter()
        .zip(LINE_VALUES)
        .map(|(t, y)| (y - a - b * t).powi(2))
        .sum();

    let theta = report.fit.parameters.values();
    assert_relative_eq!(theta[0], a, max_relative = 1e-4);
    assert_relative_eq!(theta[1], b, max_relative = 1e-4);
    assert_relative_eq!(theta[2], (rss / n).sqrt(), max_relative = 1e-4);

    // sigma^2 (X^T X)^-1 and sigma^2 / 2n at the fitted values
    let s2 = theta[2] * theta[2];
    let covariance: &CovarianceMatrix = &report.covariance;
    assert_relative_eq!(covariance.get("a", "a").unwrap(), s2 * stt / det, max_relative = 1e-3);
    assert_relative_eq!(covariance.get("b", "b").unwrap(), s2 * n / det, max_relative = 1e-3);
    assert_relative_eq!(covariance.get("a", "b").unwrap(), -s2 * st / det, max_relative = 1e-3);
    assert_relative_eq!(
        covariance.get("sigma", "sigma").unwrap(),
        s2 / (2.0 * n),
        max_relative = 1e-3
    );
    assert!(covariance.get("a", "sigma").unwrap().abs() < 1e-10);
}

#[test]
fn covariance_does_not_depend_on_parameter_scale() {
    let model = Model::new(
        Line { nparams: 3 },
        vec![
            Parameter::unbounded("a"),
            Parameter::unbounded("b"),
            Parameter::positive("sigma"),
        ],
        ResidualErrorModel::constant("sigma"),
    )
    .unwrap();
    // Same design with time in units a million times smaller
    let times: Vec<f64> = LINE_TIMES.iter().map(|t| t * 1e6).collect();
    let observed = ObservationSet::from_times_values(&times, &LINE_VALUES).unwrap();
    let theta = model.parameter_vector(vec![1.05, 2e-6, 0.2]).unwrap();

    let covariance = covariance(&model, &theta, &observed, &DosingSchedule::default()).unwrap();

    let n = times.len() as f64;
    let st: f64 = times.iter().sum();
    let stt: f64 = times.iter().map(|t| t * t).sum();
    let det = n * stt - st * st;
    let s2 = 0.2 * 0.2;
    assert_relative_eq!(covariance.get("a", "a").unwrap(), s2 * stt / det, max_relative = 1e-3);
    assert_relative_eq!(covariance.get("b", "b").unwrap(), s2 * n / det, max_relative = 1e-3);
    assert_relative_eq!(covariance.get("a", "b").unwrap(), -s2 * st / det, max_relative = 1e-3);
    assert_relative_eq!(
        covariance.get("sigma", "sigma").unwrap(),
        s2 / (2.0 * n),
        max_relative = 1e-3
    );
}

#[test]
fn unidentifiable_parameter_gives_a_singular_information_matrix() {
    let model = Model::new(
        Line { nparams: 4 },
        vec![
            Parameter::unbounded("a"),
            Parameter::unbounded("b"),
            Parameter::positive("unused"),
            Parameter::positive("sigma"),
        ],
        ResidualErrorModel::constant("sigma"),
    )
    .unwrap();
    let observed = ObservationSet::from_times_values(&LINE_TIMES, &LINE_VALUES).unwrap();
    let theta = model.parameter_vector(vec![1.0, 2.0, 5.0, 0.2]).unwrap();

    let result = covariance(&model, &theta, &observed, &DosingSchedule::default());
    assert!(matches!(
        result,
        Err(EstimationError::SingularInformationMatrix(_))
    ));
}

#[test]
fn non_positive_variance_is_reported() {
    let model = Model::new(
        Line { nparams: 2 },
        vec![Parameter::unbounded("a"), Parameter::unbounded("b")],
        ResidualErrorModel::proportional(0.1),
    )
    .unwrap();
    let observed = ObservationSet::from_times_values(&LINE_TIMES, &LINE_VALUES).unwrap();
    let theta = model.parameter_vector(vec![0.0, 2.0]).unwrap();

    let predictions: Predictions = model
        .evaluate(&theta, &observed, &DosingSchedule::default())
        .unwrap();
    assert_eq!(predictions.variance()[0], 0.0);
    assert!(matches!(
        neg_log_likelihood(&model, &theta, &observed, &DosingSchedule::default()),
        Err(EstimationError::InvalidVariance { index: 0, .. })
    ));
}

#[test]
fn out_of_domain_start_is_rejected() {
    let model = oral_model();
    let (observed, dosing) = oral_data();
    let initial = model.parameter_vector(vec![-1.0, 10.0, 0.6, 0.1]).unwrap();

    let result = estimate(&model, &initial, &observed, &dosing, &FitOptions::default());
    assert!(matches!(
        result,
        Err(EstimationError::ParameterDomain { ref name, .. }) if name == "cl"
    ));
}
