//! Nelder-Mead simplex search as an [argmin] solver
//!
//! Vertices are kept sorted by cost. Every iteration replaces the worst vertex by a
//! reflected, expanded or contracted point, or shrinks the whole simplex towards the
//! best vertex when none of those improve on it.

use argmin::core::{
    CostFunction, Error, IterState, Problem, Solver, State, TerminationReason, TerminationStatus,
    KV,
};
use argmin_math::{ArgminAdd, ArgminMul, ArgminSub};
use serde::{Deserialize, Serialize};

use crate::EstimationError;

pub(crate) type SimplexState = IterState<Vec<f64>, (), (), (), (), f64>;

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Vertices of the starting simplex: the initial point plus one vertex per
/// dimension, perturbed by `step` relative to that component
pub(crate) fn create_initial_simplex(initial_point: &[f64], step: f64) -> Vec<Vec<f64>> {
    let mut vertices = Vec::with_capacity(initial_point.len() + 1);
    vertices.push(initial_point.to_vec());
    for i in 0..initial_point.len() {
        let perturbation = if initial_point[i] == 0.0 {
            0.00025 // Special case for components equal to 0
        } else {
            step * initial_point[i]
        };
        let mut perturbed_point = initial_point.to_vec();
        perturbed_point[i] += perturbation;
        vertices.push(perturbed_point);
    }
    vertices
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Action {
    Reflection,
    Expansion,
    OutsideContraction,
    InsideContraction,
    Shrink,
}

impl Action {
    fn as_str(&self) -> &'static str {
        match self {
            Action::Reflection => "reflection",
            Action::Expansion => "expansion",
            Action::OutsideContraction => "outside contraction",
            Action::InsideContraction => "inside contraction",
            Action::Shrink => "shrink",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct NelderMeadSimplex {
    initial: Vec<Vec<f64>>,
    vertices: Vec<(Vec<f64>, f64)>,
    x_tolerance: f64,
    f_tolerance: f64,
    max_evaluations: u64,
    evaluations: u64,
    converged: bool,
}

impl NelderMeadSimplex {
    pub(crate) fn new(
        initial: Vec<Vec<f64>>,
        x_tolerance: f64,
        f_tolerance: f64,
        max_evaluations: u64,
    ) -> Self {
        NelderMeadSimplex {
            initial,
            vertices: Vec::new(),
            x_tolerance,
            f_tolerance,
            max_evaluations,
            evaluations: 0,
            converged: false,
        }
    }

    /// Number of objective evaluations so far
    pub(crate) fn evaluations(&self) -> u64 {
        self.evaluations
    }

    /// Whether the search stopped because the simplex met a tolerance
    pub(crate) fn converged(&self) -> bool {
        self.converged
    }

    /// Lowest-cost vertex
    pub(crate) fn best(&self) -> Option<&(Vec<f64>, f64)> {
        self.vertices.first()
    }

    fn evaluate<O>(&mut self, problem: &mut Problem<O>, x: &Vec<f64>) -> Result<f64, Error>
    where
        O: CostFunction<Param = Vec<f64>, Output = f64>,
    {
        self.evaluations += 1;
        problem.cost(x)
    }

    fn sort(&mut self) {
        self.vertices.sort_by(|a, b| a.1.total_cmp(&b.1));
    }

    fn centroid(&self) -> Vec<f64> {
        let n = self.vertices.len() - 1;
        let sum = self.vertices[..n]
            .iter()
            .skip(1)
            .fold(self.vertices[0].0.clone(), |acc, (x, _)| acc.add(x));
        sum.mul(&(1.0 / n as f64))
    }

    /// `from + coefficient * (to - from)`
    fn towards(from: &Vec<f64>, to: &Vec<f64>, coefficient: f64) -> Vec<f64> {
        from.add(&to.sub(from).mul(&coefficient))
    }

    /// Spread of the simplex around its best vertex, relative to that vertex
    fn within_tolerance(&self) -> bool {
        let (best, fbest) = &self.vertices[0];
        let others = &self.vertices[1..];
        let f_spread = others
            .iter()
            .map(|(_, f)| (f - fbest).abs())
            .fold(0.0, f64::max);
        if f_spread <= self.f_tolerance * fbest.abs() {
            return true;
        }
        others.iter().all(|(x, _)| {
            x.iter()
                .zip(best)
                .all(|(xi, bi)| (xi - bi).abs() <= self.x_tolerance * bi.abs())
        })
    }
}

impl<O> Solver<O, SimplexState> for NelderMeadSimplex
where
    O: CostFunction<Param = Vec<f64>, Output = f64>,
{
    const NAME: &'static str = "Nelder-Mead";

    fn init(
        &mut self,
        problem: &mut Problem<O>,
        state: SimplexState,
    ) -> Result<(SimplexState, Option<KV>), Error> {
        if self.initial.len() < 2 {
            return Err(EstimationError::OptimizationFailed(
                "the simplex needs at least one parameter".to_string(),
            )
            .into());
        }
        let initial = std::mem::take(&mut self.initial);
        let mut vertices = Vec::with_capacity(initial.len());
        for x in initial {
            let cost = self.evaluate(problem, &x)?;
            vertices.push((x, cost));
        }
        self.vertices = vertices;
        self.sort();
        let (best, cost) = self.vertices[0].clone();
        if !cost.is_finite() {
            return Err(EstimationError::OptimizationFailed(
                "the objective could not be evaluated at any vertex of the initial simplex"
                    .to_string(),
            )
            .into());
        }
        Ok((state.param(best).cost(cost), None))
    }

    fn next_iter(
        &mut self,
        problem: &mut Problem<O>,
        state: SimplexState,
    ) -> Result<(SimplexState, Option<KV>), Error> {
        let n = self.vertices.len() - 1;
        let centroid = self.centroid();
        let (worst, fworst) = self.vertices[n].clone();
        let fbest = self.vertices[0].1;
        let fsecond = self.vertices[n - 1].1;

        let reflected = Self::towards(&centroid, &worst, -REFLECTION);
        let freflected = self.evaluate(problem, &reflected)?;

        let action = if freflected < fbest {
            let expanded = Self::towards(&centroid, &reflected, EXPANSION);
            let fexpanded = self.evaluate(problem, &expanded)?;
            if fexpanded < freflected {
                self.vertices[n] = (expanded, fexpanded);
                Action::Expansion
            } else {
                self.vertices[n] = (reflected, freflected);
                Action::Reflection
            }
        } else if freflected < fsecond {
            self.vertices[n] = (reflected, freflected);
            Action::Reflection
        } else {
            let (contracted, fcontracted, accepted, action) = if freflected < fworst {
                let contracted = Self::towards(&centroid, &reflected, CONTRACTION);
                let fcontracted = self.evaluate(problem, &contracted)?;
                let accepted = fcontracted <= freflected;
                (contracted, fcontracted, accepted, Action::OutsideContraction)
            } else {
                let contracted = Self::towards(&centroid, &worst, CONTRACTION);
                let fcontracted = self.evaluate(problem, &contracted)?;
                let accepted = fcontracted < fworst;
                (contracted, fcontracted, accepted, Action::InsideContraction)
            };
            if accepted {
                self.vertices[n] = (contracted, fcontracted);
                action
            } else {
                let best = self.vertices[0].0.clone();
                for i in 1..=n {
                    let shrunk = Self::towards(&best, &self.vertices[i].0, SHRINK);
                    let cost = self.evaluate(problem, &shrunk)?;
                    self.vertices[i] = (shrunk, cost);
                }
                Action::Shrink
            }
        };
        self.sort();

        let (best, cost) = self.vertices[0].clone();
        tracing::trace!(
            iteration = state.get_iter(),
            action = action.as_str(),
            best = cost,
            evaluations = self.evaluations,
            "simplex step"
        );
        Ok((state.param(best).cost(cost), None))
    }

    fn terminate(&mut self, _state: &SimplexState) -> TerminationStatus {
        if self.vertices.is_empty() {
            return TerminationStatus::NotTerminated;
        }
        if self.within_tolerance() {
            self.converged = true;
            return TerminationStatus::Terminated(TerminationReason::SolverConverged);
        }
        if self.evaluations >= self.max_evaluations {
            return TerminationStatus::Terminated(TerminationReason::SolverExit(format!(
                "reached the limit of {} objective evaluations",
                self.max_evaluations
            )));
        }
        TerminationStatus::NotTerminated
    }
}
