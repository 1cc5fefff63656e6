//! `good_lp` 求解後端（純 Rust 的 microlp）

use good_lp::solvers::microlp::microlp;
use good_lp::{
    constraint, variable, Expression, ProblemVariables, ResolutionError, Solution, SolverModel,
    Variable,
};
use planner_calc::{LinearExpr, MilpProblem, Relation, Sense, VarKind};
use planner_core::SolveStatus;

use crate::solver::{MilpSolver, SolveOutcome};

/// 以 `good_lp` + microlp 求解
#[derive(Debug, Clone, Copy, Default)]
pub struct GoodLpSolver;

impl GoodLpSolver {
    pub fn new() -> Self {
        Self
    }
}

impl MilpSolver for GoodLpSolver {
    fn name(&self) -> &str {
        "good_lp/microlp"
    }

    fn solve(&self, problem: &MilpProblem) -> SolveOutcome {
        let mut vars = ProblemVariables::new();
        let handles: Vec<Variable> = problem
            .variables()
            .iter()
            .map(|def| match def.kind {
                VarKind::Binary => vars.add(variable().binary().name(def.name.clone())),
                VarKind::Continuous => vars.add(variable().min(0.0).name(def.name.clone())),
            })
            .collect();

        let objective = to_expression(problem.objective(), &handles);
        let mut model = match problem.sense() {
            Sense::Maximize => vars.maximise(objective),
            Sense::Minimize => vars.minimise(objective),
        }
        .using(microlp);

        for c in problem.constraints() {
            let lhs = to_expression(&c.lhs, &handles);
            let built = match c.relation {
                Relation::LessEq => constraint::leq(lhs, c.rhs),
                Relation::GreaterEq => constraint::geq(lhs, c.rhs),
                Relation::Equal => constraint::eq(lhs, c.rhs),
            };
            model = model.with(built);
        }

        tracing::debug!(
            "{} 求解 {}：變數 {} 個，約束 {} 條",
            self.name(),
            problem.name(),
            problem.variable_count(),
            problem.constraint_count()
        );

        match model.solve() {
            Ok(solution) => {
                let values: Vec<f64> = handles.iter().map(|v| solution.value(*v)).collect();
                let objective_value = problem.objective().evaluate(&values);
                SolveOutcome::optimal(objective_value, values)
            }
            Err(ResolutionError::Infeasible) => {
                SolveOutcome::failed(SolveStatus::Infeasible, "問題無可行解")
            }
            Err(ResolutionError::Unbounded) => {
                SolveOutcome::failed(SolveStatus::Unbounded, "目標無界")
            }
            Err(other) => SolveOutcome::failed(SolveStatus::Error, other.to_string()),
        }
    }
}

fn to_expression(expr: &LinearExpr, handles: &[Variable]) -> Expression {
    let mut out = Expression::from(expr.constant_value());
    for &(var, coef) in expr.terms() {
        out += coef * handles[var.index()];
    }
    out
}
