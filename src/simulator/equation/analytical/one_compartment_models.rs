use crate::simulator::*;

/// Analytical solution for one compartment model.
///
/// # Assumptions
/// - `p` is a vector of length 1 with the value of the elimination constant
/// - `rateiv` is a vector of length 1 with the value of the infusion rate (only one drug)
/// - `x` is a vector of length 1
pub fn one_compartment(x: &V, p: &V, t: T, rateiv: &V) -> V {
    let mut xout = x.clone();
    let ke = p[0];

    xout[0] = x[0] * (-ke * t).exp() + rateiv[0] / ke * (1.0 - (-ke * t).exp());
    xout
}

/// Analytical solution for one compartment model with first-order absorption.
///
/// # Assumptions
/// - `p` is a vector of length 2 with ka and ke in that order
/// - `rateiv` is a vector of length 2; infusions into the depot (index 0) are
///   absorbed, infusions into the central compartment (index 1) are not
/// - `x` is a vector of length 2, the depot amount then the central amount
pub fn one_compartment_with_absorption(x: &V, p: &V, t: T, rateiv: &V) -> V {
    let mut xout = x.clone();
    let ka = p[0];
    let ke = p[1];
    let eka = (-ka * t).exp();
    let eke = (-ke * t).exp();

    // Depot: x0' = -ka x0 + r0
    xout[0] = x[0] * eka + rateiv[0] / ka * (1.0 - eka);

    // Response of the central compartment to the depot content and the depot infusion
    let (from_depot, from_depot_infusion) = if ((ka - ke) / ka).abs() < 1e-6 {
        // ka == ke limit
        (
            x[0] * ka * t * eke,
            rateiv[0] * ((1.0 - eke) / ke - t * eke),
        )
    } else {
        (
            x[0] * ka / (ka - ke) * (eke - eka),
            rateiv[0] * ((1.0 - eke) / ke - (eke - eka) / (ka - ke)),
        )
    };

    xout[1] = x[1] * eke + rateiv[1] / ke * (1.0 - eke) + from_depot + from_depot_infusion;

    xout
}
