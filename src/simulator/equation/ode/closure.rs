use crate::simulator::{DiffEq, M, T, V};
use diffsol::{
    ConstantOp, LinearOp, NonLinearOp, NonLinearOpJacobian, OdeEquations, OdeEquationsRef, Op,
};

pub struct PmRhs<'a> {
    problem: &'a PmProblem,
}

impl Op for PmRhs<'_> {
    type T = T;
    type V = V;
    type M = M;
    fn nstates(&self) -> usize {
        self.problem.nstates
    }
    fn nout(&self) -> usize {
        self.problem.nstates
    }
    fn nparams(&self) -> usize {
        self.problem.p.len()
    }
}

impl NonLinearOp for PmRhs<'_> {
    fn call_inplace(&self, x: &Self::V, t: Self::T, y: &mut Self::V) {
        self.problem.eval_rhs(x, t, y);
    }
}

impl NonLinearOpJacobian for PmRhs<'_> {
    // Forward difference of the right-hand side along v
    fn jac_mul_inplace(&self, x: &Self::V, t: Self::T, v: &Self::V, y: &mut Self::V) {
        let vnorm = v.amax();
        if vnorm == 0.0 {
            y.fill(0.0);
            return;
        }
        let eps = f64::EPSILON.sqrt() * (1.0 + x.amax()) / vnorm;
        let shifted = x + v * eps;
        let mut base = V::zeros(self.problem.nstates);
        self.problem.eval_rhs(x, t, &mut base);
        self.problem.eval_rhs(&shifted, t, y);
        *y -= &base;
        *y /= eps;
    }
}

pub struct PmMass {
    nstates: usize,
    nparams: usize,
}

impl Op for PmMass {
    type T = T;
    type V = V;
    type M = M;
    fn nstates(&self) -> usize {
        self.nstates
    }
    fn nout(&self) -> usize {
        self.nstates
    }
    fn nparams(&self) -> usize {
        self.nparams
    }
}

impl LinearOp for PmMass {
    fn gemv_inplace(&self, _x: &Self::V, _t: Self::T, _beta: Self::T, _y: &mut Self::V) {}
}

pub struct PmInit {
    nstates: usize,
    nparams: usize,
    init: V,
}

impl Op for PmInit {
    type T = T;
    type V = V;
    type M = M;
    fn nstates(&self) -> usize {
        self.nstates
    }
    fn nout(&self) -> usize {
        self.nstates
    }
    fn nparams(&self) -> usize {
        self.nparams
    }
}

impl ConstantOp for PmInit {
    fn call_inplace(&self, _t: Self::T, y: &mut Self::V) {
        y.copy_from(&self.init);
    }
}

pub struct PmRoot {
    nstates: usize,
    nparams: usize,
}

impl Op for PmRoot {
    type T = T;
    type V = V;
    type M = M;
    fn nstates(&self) -> usize {
        self.nstates
    }
    fn nout(&self) -> usize {
        0
    }
    fn nparams(&self) -> usize {
        self.nparams
    }
}

impl NonLinearOp for PmRoot {
    fn call_inplace(&self, _x: &Self::V, _t: Self::T, _y: &mut Self::V) {}
}

pub struct PmOut {
    nstates: usize,
    nparams: usize,
}

impl Op for PmOut {
    type T = T;
    type V = V;
    type M = M;
    fn nstates(&self) -> usize {
        self.nstates
    }
    fn nout(&self) -> usize {
        0
    }
    fn nparams(&self) -> usize {
        self.nparams
    }
}

impl NonLinearOp for PmOut {
    fn call_inplace(&self, _x: &Self::V, _t: Self::T, _y: &mut Self::V) {}
}

/// The system integrated between two consecutive events: the model right-hand
/// side with fixed parameters and infusion rates, started from the current state
pub struct PmProblem {
    func: DiffEq,
    nstates: usize,
    p: V,
    rateiv: V,
    init: V,
}

impl PmProblem {
    pub fn new(func: DiffEq, p: V, rateiv: V, init: V) -> Self {
        Self {
            func,
            nstates: init.len(),
            p,
            rateiv,
            init,
        }
    }

    #[inline(always)]
    fn eval_rhs(&self, x: &V, t: T, dx: &mut V) {
        dx.fill(0.0);
        (self.func)(x, &self.p, t, dx, &self.rateiv);
    }
}

impl Op for PmProblem {
    type T = T;
    type V = V;
    type M = M;
    fn nstates(&self) -> usize {
        self.nstates
    }
    fn nout(&self) -> usize {
        self.nstates
    }
    fn nparams(&self) -> usize {
        self.p.len()
    }
}

impl<'b> OdeEquationsRef<'b> for PmProblem {
    type Rhs = PmRhs<'b>;
    type Mass = PmMass;
    type Init = PmInit;
    type Root = PmRoot;
    type Out = PmOut;
}

impl OdeEquations for PmProblem {
    fn rhs(&self) -> PmRhs<'_> {
        PmRhs { problem: self }
    }

    fn mass(&self) -> Option<PmMass> {
        None
    }

    fn init(&self) -> PmInit {
        PmInit {
            nstates: self.nstates,
            nparams: self.p.len(),
            init: self.init.clone(),
        }
    }

    fn get_params(&self, p: &mut V) {
        p.copy_from(&self.p);
    }

    fn root(&self) -> Option<PmRoot> {
        None
    }

    fn out(&self) -> Option<PmOut> {
        None
    }

    fn set_params(&mut self, p: &V) {
        self.p.copy_from(p);
    }
}
