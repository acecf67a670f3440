//! Linear-programming boundary.
//!
//! The allocation engine only talks to [`LpSolver`]: build a
//! [`LinearProgram`] (objective sense, non-negative variables, named
//! linear constraints), call `solve()`, read back status, primal values
//! and constraint duals. [`ClarabelSolver`] is the default backend.
//!
//! Solving is side-effect free: no solver state survives a call.

use clarabel::solver::SolverStatus;
use good_lp::{
    constraint::{self, ConstraintReference},
    variable, DualValues, Expression, ProblemVariables, ResolutionError, Solution,
    SolutionWithDual, SolverModel, Variable,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sense {
    Maximize,
    Minimize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relation {
    Le,
    Ge,
    Eq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstraintId(usize);

#[derive(Debug, Clone)]
pub struct Constraint {
    pub name: String,
    pub terms: Vec<(VarId, f64)>,
    pub relation: Relation,
    pub rhs: f64,
}

/// A linear program over variables bounded below by zero.
#[derive(Debug, Clone)]
pub struct LinearProgram {
    pub name: String,
    pub sense: Sense,
    var_names: Vec<String>,
    objective: Vec<f64>,
    constraints: Vec<Constraint>,
}

impl LinearProgram {
    pub fn new(name: impl Into<String>, sense: Sense) -> Self {
        Self {
            name: name.into(),
            sense,
            var_names: Vec::new(),
            objective: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// Add a variable `x >= 0` with the given objective coefficient.
    pub fn add_var(&mut self, name: impl Into<String>, objective_coeff: f64) -> VarId {
        self.var_names.push(name.into());
        self.objective.push(objective_coeff);
        VarId(self.objective.len() - 1)
    }

    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        terms: Vec<(VarId, f64)>,
        relation: Relation,
        rhs: f64,
    ) -> ConstraintId {
        self.constraints.push(Constraint {
            name: name.into(),
            terms,
            relation,
            rhs,
        });
        ConstraintId(self.constraints.len() - 1)
    }

    pub fn var_count(&self) -> usize {
        self.objective.len()
    }

    pub fn objective(&self) -> &[f64] {
        &self.objective
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LpStatus {
    Optimal,
    Infeasible,
    Unbounded,
    /// The solver stopped before converging (iteration budget or numerical
    /// trouble); all values and duals are zero.
    IterationLimit,
}

#[derive(Debug, Clone)]
pub struct LpSolution {
    pub status: LpStatus,
    pub objective: f64,
    values: Vec<f64>,
    duals: Vec<f64>,
}

impl LpSolution {
    /// A solution with every value and dual at zero.
    pub fn empty(status: LpStatus, vars: usize, constraints: usize) -> Self {
        Self {
            status,
            objective: 0.0,
            values: vec![0.0; vars],
            duals: vec![0.0; constraints],
        }
    }

    pub fn value(&self, var: VarId) -> f64 {
        self.values.get(var.0).copied().unwrap_or(0.0)
    }

    /// Shadow price: change in the objective per unit increase of the
    /// constraint's right-hand side.
    pub fn dual(&self, constraint: ConstraintId) -> f64 {
        self.duals.get(constraint.0).copied().unwrap_or(0.0)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

pub trait LpSolver {
    fn solve(&self, lp: &LinearProgram) -> LpSolution;
}

/// Interior-point backend: good_lp over the pure-Rust clarabel solver.
///
/// Interior-point values carry round-off near 1e-8; callers snap them to
/// whole seats. On a degenerate optimum the dual is a point inside the
/// range of valid shadow prices rather than a vertex.
#[derive(Debug, Clone)]
pub struct ClarabelSolver {
    pub max_iterations: u32,
}

impl ClarabelSolver {
    pub fn new(max_iterations: u32) -> Self {
        Self { max_iterations }
    }
}

impl Default for ClarabelSolver {
    fn default() -> Self {
        Self::new(200)
    }
}

impl LpSolver for ClarabelSolver {
    fn solve(&self, lp: &LinearProgram) -> LpSolution {
        let n = lp.var_count();
        let m = lp.constraints.len();
        if n == 0 {
            return LpSolution::empty(trivial_status(lp), 0, m);
        }

        let mut problem = ProblemVariables::new();
        let vars: Vec<Variable> = lp
            .var_names
            .iter()
            .map(|name| problem.add(variable().min(0.0).name(name.as_str())))
            .collect();
        let objective = linear_expr(
            &vars,
            lp.objective.iter().enumerate().map(|(j, &c)| (VarId(j), c)),
        );
        let unsolved = match lp.sense {
            Sense::Maximize => problem.maximise(objective),
            Sense::Minimize => problem.minimise(objective),
        };
        let mut model = unsolved.using(good_lp::clarabel);
        model.settings().max_iter(self.max_iterations);

        let rows: Vec<ConstraintReference> = lp
            .constraints
            .iter()
            .map(|con| {
                let lhs = linear_expr(&vars, con.terms.iter().copied());
                let row = match con.relation {
                    Relation::Le => constraint::leq(lhs, con.rhs),
                    Relation::Ge => constraint::geq(lhs, con.rhs),
                    Relation::Eq => constraint::eq(lhs, con.rhs),
                };
                model.add_constraint(row)
            })
            .collect();

        let mut solved = match model.solve() {
            Ok(solved) => solved,
            Err(err) => {
                let status = match err {
                    ResolutionError::Infeasible => LpStatus::Infeasible,
                    ResolutionError::Unbounded => LpStatus::Unbounded,
                    other => {
                        log::warn!("lp {}: solver stopped early: {other}", lp.name);
                        LpStatus::IterationLimit
                    }
                };
                return LpSolution::empty(status, n, m);
            }
        };
        if matches!(
            solved.inner().status,
            SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible
        ) {
            return LpSolution::empty(LpStatus::Unbounded, n, m);
        }

        let values: Vec<f64> = vars.iter().map(|&v| solved.value(v).max(0.0)).collect();
        let objective = lp.objective.iter().zip(&values).map(|(c, x)| c * x).sum();

        // Clarabel minimises and reports non-negative multipliers on `lhs - rhs <= 0`
        // rows. Rescale to d(objective)/d(rhs) in the caller's sense.
        let sense_sign = match lp.sense {
            Sense::Maximize => 1.0,
            Sense::Minimize => -1.0,
        };
        let multipliers = solved.compute_dual();
        let duals = lp
            .constraints
            .iter()
            .zip(&rows)
            .map(|(con, row)| {
                let relation_sign = match con.relation {
                    Relation::Ge => -1.0,
                    Relation::Le | Relation::Eq => 1.0,
                };
                sense_sign * relation_sign * multipliers.dual(row.clone())
            })
            .collect();

        LpSolution {
            status: LpStatus::Optimal,
            objective,
            values,
            duals,
        }
    }
}

fn linear_expr(vars: &[Variable], terms: impl Iterator<Item = (VarId, f64)>) -> Expression {
    let mut expr = Expression::with_capacity(vars.len());
    for (VarId(j), a) in terms {
        if let Some(&var) = vars.get(j) {
            expr.add_mul(a, var);
        }
    }
    expr
}

/// Feasibility of a program without variables: every row reads `0 rel rhs`.
fn trivial_status(lp: &LinearProgram) -> LpStatus {
    let feasible = lp.constraints.iter().all(|con| match con.relation {
        Relation::Le => con.rhs >= 0.0,
        Relation::Ge => con.rhs <= 0.0,
        Relation::Eq => con.rhs == 0.0,
    });
    if feasible {
        LpStatus::Optimal
    } else {
        LpStatus::Infeasible
    }
}
