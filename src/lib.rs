pub mod data;
pub mod error;
pub mod estimation;
pub mod simulator;

pub use crate::data::*;
pub use crate::error::EstimationError;
pub use crate::estimation::{
    covariance, estimate, minimize, neg_log_likelihood, ConvergenceStatus, CovarianceMatrix,
    EstimationReport, FitOptions, FitResult, NegLogLikelihood, Objective,
};
pub use crate::simulator::equation::{self, Analytical, Equation, ODE};
pub use crate::simulator::model::Model;
pub use crate::simulator::predictions::Predictions;
pub use crate::simulator::{Neqs, Tolerances};
pub use nalgebra::dmatrix;

pub mod prelude {
    pub mod data {
        pub use crate::data::{
            Bolus, Dose, DosingSchedule, Infusion, Observation, ObservationSet, Parameter,
            ParameterVector, ResidualErrorModel, Sigma, Subject,
        };
    }
    pub mod simulator {
        pub use crate::simulator::{
            equation,
            equation::analytical::Analytical,
            equation::ode::ODE,
            equation::Equation,
            model::Model,
            predictions::Predictions,
            Tolerances, T, V,
        };
    }
    pub mod models {
        pub use crate::simulator::equation::analytical::one_compartment;
        pub use crate::simulator::equation::analytical::one_compartment_with_absorption;
    }
    pub mod estimation {
        pub use crate::estimation::*;
    }

    pub use crate::data::*;
    pub use crate::estimation::{
        covariance, estimate, minimize, neg_log_likelihood, ConvergenceStatus, FitOptions,
        FitResult,
    };
    pub use crate::simulator::equation::{Analytical, Equation, ODE};
    pub use crate::simulator::equation::analytical::{
        one_compartment, one_compartment_with_absorption,
    };
    pub use crate::simulator::{model::Model, Tolerances, T, V};
    pub use crate::EstimationError;

    #[macro_export]
    macro_rules! fetch_params {
        ($p:expr, $($name:ident),*) => {
            let p = $p;
            let mut idx = 0;
            $(
                #[allow(unused_mut)]
                let mut $name = p[idx];
                idx += 1;
            )*
            let _ = idx; // Consume idx to avoid unused_assignments warning
        };
    }

    /// Macro for defining differential equations with cleaner syntax.
    ///
    /// This macro reduces boilerplate by letting you specify only the variables
    /// and parameters you need.
    ///
    /// ```ignore
    /// diffeq!(|x, dx, rateiv| params: [ke, v] => {
    ///     dx[0] = -ke * x[0] + rateiv[0];
    /// })
    /// ```
    ///
    /// # Available Variables to Request
    ///
    /// - `x` - Current state vector (read-only)
    /// - `dx` - Derivative vector (write to this)
    /// - `t` - Current time
    /// - `rateiv` - Infusion rates
    /// - `p` - Raw parameter vector (if needed)
    #[macro_export]
    macro_rules! diffeq {
        (|$($var:ident),* $(,)?| params: [$($param:ident),* $(,)?] => $body:block) => {
            |_x: &$crate::simulator::V,
             _p: &$crate::simulator::V,
             _t: $crate::simulator::T,
             _dx: &mut $crate::simulator::V,
             _rateiv: &$crate::simulator::V|
            {
                $(let $var = $crate::__diffeq_var!($var, _x, _p, _t, _dx, _rateiv);)*
                $crate::fetch_params!(_p, $($param),*);

                $body
            }
        };
        (|$($var:ident),* $(,)?| $body:block) => {
            |_x: &$crate::simulator::V,
             _p: &$crate::simulator::V,
             _t: $crate::simulator::T,
             _dx: &mut $crate::simulator::V,
             _rateiv: &$crate::simulator::V|
            {
                $(let $var = $crate::__diffeq_var!($var, _x, _p, _t, _dx, _rateiv);)*

                $body
            }
        };
    }

    // Helper macro to map user variable names to internal ones
    #[macro_export]
    #[doc(hidden)]
    macro_rules! __diffeq_var {
        (x, $x:expr, $p:expr, $t:expr, $dx:expr, $rateiv:expr) => {
            $x
        };
        (p, $x:expr, $p:expr, $t:expr, $dx:expr, $rateiv:expr) => {
            $p
        };
        (t, $x:expr, $p:expr, $t:expr, $dx:expr, $rateiv:expr) => {
            $t
        };
        (dx, $x:expr, $p:expr, $t:expr, $dx:expr, $rateiv:expr) => {
            $dx
        };
        (rateiv, $x:expr, $p:expr, $t:expr, $dx:expr, $rateiv:expr) => {
            $rateiv
        };
    }

    /// Macro for defining output equations with cleaner syntax.
    ///
    /// ```ignore
    /// out!(|x, y| params: [ke, v] => {
    ///     y[0] = x[0] / v;
    /// })
    /// ```
    ///
    /// # Available Variables to Request
    ///
    /// - `x` - Current state vector (read-only)
    /// - `y` - Output vector (write to this)
    /// - `t` - Current time
    /// - `p` - Raw parameter vector (if needed)
    #[macro_export]
    macro_rules! out {
        (|$($var:ident),* $(,)?| params: [$($param:ident),* $(,)?] => $body:block) => {
            |_x: &$crate::simulator::V,
             _p: &$crate::simulator::V,
             _t: $crate::simulator::T,
             _y: &mut $crate::simulator::V|
            {
                $(let $var = $crate::__out_var!($var, _x, _p, _t, _y);)*
                $crate::fetch_params!(_p, $($param),*);

                $body
            }
        };
        (|$($var:ident),* $(,)?| $body:block) => {
            |_x: &$crate::simulator::V,
             _p: &$crate::simulator::V,
             _t: $crate::simulator::T,
             _y: &mut $crate::simulator::V|
            {
                $(let $var = $crate::__out_var!($var, _x, _p, _t, _y);)*

                $body
            }
        };
    }

    #[macro_export]
    #[doc(hidden)]
    macro_rules! __out_var {
        (x, $x:expr, $p:expr, $t:expr, $y:expr) => {
            $x
        };
        (p, $x:expr, $p:expr, $t:expr, $y:expr) => {
            $p
        };
        (t, $x:expr, $p:expr, $t:expr, $y:expr) => {
            $t
        };
        (y, $x:expr, $p:expr, $t:expr, $y:expr) => {
            $y
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_params_macro() {
        // Test basic parameter fetching
        let params = vec![1.0, 2.5, 3.7];

        fetch_params!(params, ka, ke, v);

        assert_eq!(ka, 1.0);
        assert_eq!(ke, 2.5);
        assert_eq!(v, 3.7);
    }

    #[test]
    fn test_diffeq_and_out_macros() {
        let ode = ODE::new(
            diffeq!(|x, dx, rateiv| params: [ke, _v] => {
                dx[0] = -ke * x[0] + rateiv[0];
            }),
            out!(|x, y| params: [_ke, v] => {
                y[0] = x[0] / v;
            }),
            (1, 1),
        );
        let subject = Subject::builder("macros")
            .bolus(0.0, 100.0, 0)
            .observation(0.0, 0.0, 0)
            .observation(2.0, 0.0, 0)
            .build()
            .unwrap();
        let preds = ode
            .predict(&[0.5, 10.0], subject.observations(), subject.dosing())
            .unwrap();
        approx::assert_relative_eq!(preds[0], 10.0, max_relative = 1e-8);
        approx::assert_relative_eq!(preds[1], 10.0 * (-1.0f64).exp(), max_relative = 1e-5);
    }
}
