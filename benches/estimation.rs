use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use pmfit::prelude::*;
use pmfit::{diffeq, fetch_params, out, NegLogLikelihood, Objective};
use std::hint::black_box;

const TIMES: [f64; 6] = [0.2864, 0.5155, 1.0309, 2.0619, 6.0710, 8.0756];
const VALUES: [f64; 6] = [5.746, 9.7379, 15.1815, 28.6089, 24.9798, 25.3427];

fn parameters() -> Vec<Parameter> {
    vec![
        Parameter::positive("cl"),
        Parameter::positive("vc"),
        Parameter::positive("ka"),
        Parameter::positive("sigma"),
    ]
}

fn analytical_model() -> Model<Analytical> {
    let equation = Analytical::new(
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
    );
    Model::new(equation, parameters(), ResidualErrorModel::proportional("sigma")).unwrap()
}

fn ode_model() -> Model<ODE> {
    let equation = ODE::new(
        diffeq!(|x, dx, rateiv| params: [cl, vc, ka] => {
            dx[0] = -ka * x[0] + rateiv[0];
            dx[1] = ka * x[0] - cl / vc * x[1] + rateiv[1];
        }),
        out!(|x, y| params: [_cl, vc] => {
            y[0] = x[1] / vc;
        }),
        (2, 1),
    );
    Model::new(equation, parameters(), ResidualErrorModel::proportional("sigma")).unwrap()
}

fn estimation_benchmark(c: &mut Criterion) {
    let observed = ObservationSet::from_times_values(&TIMES, &VALUES).unwrap();
    let dosing = DosingSchedule::bolus(0.0, 1000.0, 0).unwrap();
    let analytical = analytical_model();
    let ode = ode_model();
    let initial = analytical
        .parameter_vector(vec![1.0, 10.0, 0.6, 0.1])
        .unwrap();
    let estimate_at = analytical
        .parameter_vector(vec![2.29, 21.6, 0.47, 0.081])
        .unwrap();

    let mut group = c.benchmark_group("estimation");

    group.bench_function(BenchmarkId::new("objective", "Analytical"), |b| {
        let objective = NegLogLikelihood::new(&analytical, &observed, &dosing);
        b.iter(|| black_box(objective.evaluate(black_box(&estimate_at)).unwrap()))
    });
    group.bench_function(BenchmarkId::new("objective", "ODE"), |b| {
        let objective = NegLogLikelihood::new(&ode, &observed, &dosing);
        b.iter(|| black_box(objective.evaluate(black_box(&estimate_at)).unwrap()))
    });
    group.bench_function(BenchmarkId::new("fit", "Analytical"), |b| {
        b.iter(|| {
            black_box(
                estimate(
                    &analytical,
                    &initial,
                    &observed,
                    &dosing,
                    &FitOptions::default(),
                )
                .unwrap(),
            )
        })
    });
    group.bench_function(BenchmarkId::new("covariance", "ODE"), |b| {
        b.iter(|| black_box(covariance(&ode, &estimate_at, &observed, &dosing).unwrap()))
    });

    group.finish();
}

criterion_group!(benches, estimation_benchmark);
criterion_main!(benches);
