//! Fit a one-compartment model with first-order absorption to a single oral dose,
//! then refit a simulated replicate of the same design.

use pmfit::fetch_params;
use pmfit::prelude::*;
use pmfit::EstimationReport;
use rand::{rngs::StdRng, SeedableRng};

fn print_report(report: &EstimationReport) {
    let fit = &report.fit;
    println!("{}", fit.message);
    println!("-LL = {:.6}, -2LL = {:.6}", fit.objective, fit.minus_two_log_likelihood());
    println!("{:<8}{:>14}{:>14}{:>10}", "param", "estimate", "se", "rse%");
    for (i, (name, value)) in fit.parameters.iter().enumerate() {
        println!(
            "{:<8}{:>14.6}{:>14.6}{:>10.2}",
            name, value, report.standard_errors[i], report.relative_standard_errors[i]
        );
    }
    println!("correlation:\n{:.3}", report.correlation);
}

fn main() -> anyhow::Result<()> {
    let subject = Subject::builder("1")
        .bolus(0.0, 1000.0, 0)
        .observation(0.2864, 5.746, 0)
        .observation(0.5155, 9.7379, 0)
        .observation(1.0309, 15.1815, 0)
        .observation(2.0619, 28.6089, 0)
        .observation(6.0710, 24.9798, 0)
        .observation(8.0756, 25.3427, 0)
        .build()?;

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
    let model = Model::new(
        equation,
        vec![
            Parameter::positive("cl"),
            Parameter::positive("vc"),
            Parameter::positive("ka"),
            Parameter::positive("sigma"),
        ],
        ResidualErrorModel::proportional("sigma"),
    )?;

    let initial = model.parameter_vector(vec![1.0, 10.0, 0.6, 0.1])?;
    let options = FitOptions::default();
    println!("Subject {}\n", subject);

    let report = estimate(
        &model,
        &initial,
        subject.observations(),
        subject.dosing(),
        &options,
    )?;
    print_report(&report);

    let mut rng = StdRng::seed_from_u64(2024);
    let replicate = model.simulate(
        &report.fit.parameters,
        subject.observations(),
        subject.dosing(),
        &mut rng,
    )?;
    println!("\nSimulated replicate:\n{}", replicate);
    let refit = estimate(&model, &initial, &replicate, subject.dosing(), &options)?;
    print_report(&refit);

    println!("\n{}", report.to_json()?);
    Ok(())
}
