//! 求解器中立的 0/1 整數規劃表示
//!
//! 只描述變數、線性約束與目標，不做任何求解。
//! 外部求解器依此結構建立自己的模型。

use std::fmt;

/// 變數索引
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// 變數類型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    /// 0/1 決策變數
    Binary,
    /// 非負連續變數
    Continuous,
}

/// 變數宣告
#[derive(Debug, Clone, PartialEq)]
pub struct VarDef {
    pub name: String,
    pub kind: VarKind,
}

/// 線性表達式 Σ(coef · var) + constant
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    terms: Vec<(VarId, f64)>,
    constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    /// 常數表達式
    pub fn constant(value: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    /// 加入一項（係數為 0 時略過）
    pub fn add_term(&mut self, var: VarId, coef: f64) {
        if coef != 0.0 {
            self.terms.push((var, coef));
        }
    }

    /// 建構器模式：加入一項
    pub fn with_term(mut self, var: VarId, coef: f64) -> Self {
        self.add_term(var, coef);
        self
    }

    pub fn add_constant(&mut self, value: f64) {
        self.constant += value;
    }

    /// 加入另一個表達式的 scale 倍
    pub fn add_scaled(&mut self, other: &LinearExpr, scale: f64) {
        for &(var, coef) in &other.terms {
            self.add_term(var, coef * scale);
        }
        self.constant += other.constant * scale;
    }

    pub fn terms(&self) -> &[(VarId, f64)] {
        &self.terms
    }

    pub fn constant_value(&self) -> f64 {
        self.constant
    }

    /// 以變數值計算表達式
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|&(var, coef)| coef * values.get(var.index()).copied().unwrap_or(0.0))
            .sum::<f64>()
            + self.constant
    }
}

/// 約束關係
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    LessEq,
    GreaterEq,
    Equal,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Relation::LessEq => "<=",
            Relation::GreaterEq => ">=",
            Relation::Equal => "==",
        })
    }
}

/// 線性約束 lhs (<=|>=|==) rhs
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    pub name: String,
    pub lhs: LinearExpr,
    pub relation: Relation,
    pub rhs: f64,
}

impl LinearConstraint {
    pub fn new(name: impl Into<String>, lhs: LinearExpr, relation: Relation, rhs: f64) -> Self {
        Self {
            name: name.into(),
            lhs,
            relation,
            rhs,
        }
    }

    pub fn le(name: impl Into<String>, lhs: LinearExpr, rhs: f64) -> Self {
        Self::new(name, lhs, Relation::LessEq, rhs)
    }

    pub fn ge(name: impl Into<String>, lhs: LinearExpr, rhs: f64) -> Self {
        Self::new(name, lhs, Relation::GreaterEq, rhs)
    }

    pub fn equal(name: impl Into<String>, lhs: LinearExpr, rhs: f64) -> Self {
        Self::new(name, lhs, Relation::Equal, rhs)
    }

    /// 在容差內是否成立
    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs = self.lhs.evaluate(values);
        match self.relation {
            Relation::LessEq => lhs <= self.rhs + tolerance,
            Relation::GreaterEq => lhs >= self.rhs - tolerance,
            Relation::Equal => (lhs - self.rhs).abs() <= tolerance,
        }
    }
}

/// 優化方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Maximize,
    Minimize,
}

/// 0/1 混合整數規劃問題
#[derive(Debug, Clone)]
pub struct MilpProblem {
    name: String,
    sense: Sense,
    variables: Vec<VarDef>,
    constraints: Vec<LinearConstraint>,
    objective: LinearExpr,
}

impl MilpProblem {
    /// 創建空問題（目標預設為 0）
    pub fn new(name: impl Into<String>, sense: Sense) -> Self {
        Self {
            name: name.into(),
            sense,
            variables: Vec::new(),
            constraints: Vec::new(),
            objective: LinearExpr::new(),
        }
    }

    /// 宣告二元變數
    pub fn add_binary(&mut self, name: impl Into<String>) -> VarId {
        self.add_variable(name.into(), VarKind::Binary)
    }

    /// 宣告非負連續變數
    pub fn add_continuous(&mut self, name: impl Into<String>) -> VarId {
        self.add_variable(name.into(), VarKind::Continuous)
    }

    fn add_variable(&mut self, name: String, kind: VarKind) -> VarId {
        self.variables.push(VarDef { name, kind });
        VarId(self.variables.len() - 1)
    }

    pub fn add_constraint(&mut self, constraint: LinearConstraint) {
        self.constraints.push(constraint);
    }

    pub fn set_objective(&mut self, objective: LinearExpr) {
        self.objective = objective;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sense(&self) -> Sense {
        self.sense
    }

    pub fn variables(&self) -> &[VarDef] {
        &self.variables
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    pub fn binary_count(&self) -> usize {
        self.variables
            .iter()
            .filter(|v| v.kind == VarKind::Binary)
            .count()
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// 依名稱查約束
    pub fn constraint(&self, name: &str) -> Option<&LinearConstraint> {
        self.constraints.iter().find(|c| c.name == name)
    }

    /// 將求解器回傳值中的二元變數依門檻取整為 0/1，連續變數不變
    pub fn snap_binaries(&self, values: &[f64], threshold: f64) -> Vec<f64> {
        self.variables
            .iter()
            .zip(values)
            .map(|(def, &value)| match def.kind {
                VarKind::Binary if value > threshold => 1.0,
                VarKind::Binary => 0.0,
                VarKind::Continuous => value,
            })
            .collect()
    }

    /// 列出在給定值下不成立的約束名稱
    pub fn violated_constraints(&self, values: &[f64], tolerance: f64) -> Vec<&str> {
        self.constraints
            .iter()
            .filter(|c| !c.is_satisfied(values, tolerance))
            .map(|c| c.name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expression_evaluate() {
        let mut problem = MilpProblem::new("t", Sense::Minimize);
        let x = problem.add_binary("x");
        let t = problem.add_continuous("t");

        let mut expr = LinearExpr::constant(1.5).with_term(x, 2.0).with_term(t, -1.0);
        expr.add_term(x, 0.0);
        assert_eq!(expr.terms().len(), 2);
        assert_eq!(expr.evaluate(&[1.0, 3.0]), 0.5);

        let mut doubled = LinearExpr::new();
        doubled.add_scaled(&expr, 2.0);
        assert_eq!(doubled.evaluate(&[1.0, 3.0]), 1.0);
        assert_eq!(doubled.constant_value(), 3.0);
    }

    #[test]
    fn test_problem_bookkeeping() {
        let mut problem = MilpProblem::new("p", Sense::Maximize);
        let x = problem.add_binary("x");
        let y = problem.add_binary("y");
        let t = problem.add_continuous("t");
        problem.add_constraint(LinearConstraint::le(
            "pair",
            LinearExpr::new().with_term(x, 1.0).with_term(y, 1.0),
            1.0,
        ));
        problem.add_constraint(LinearConstraint::ge("floor", LinearExpr::new().with_term(t, 1.0), 2.0));

        assert_eq!(problem.variable_count(), 3);
        assert_eq!(problem.binary_count(), 2);
        assert_eq!(problem.constraint_count(), 2);
        assert_eq!(problem.constraint("pair").map(|c| c.relation), Some(Relation::LessEq));
        assert!(problem.constraint("missing").is_none());

        assert!(problem.violated_constraints(&[1.0, 0.0, 2.0], 1e-9).is_empty());
        assert_eq!(problem.violated_constraints(&[1.0, 1.0, 1.0], 1e-9), vec!["pair", "floor"]);
    }

    #[test]
    fn test_snap_binaries() {
        let mut problem = MilpProblem::new("s", Sense::Minimize);
        problem.add_binary("a");
        problem.add_binary("b");
        problem.add_continuous("c");

        let snapped = problem.snap_binaries(&[0.9999996, 3e-7, 11.1], 0.5);
        assert_eq!(snapped, vec![1.0, 0.0, 11.1]);
    }

    #[test]
    fn test_equality_tolerance() {
        let x = VarId(0);
        let c = LinearConstraint::equal("e", LinearExpr::new().with_term(x, 1.0), 1.0);
        assert!(c.is_satisfied(&[1.0 + 1e-8], 1e-6));
        assert!(!c.is_satisfied(&[1.1], 1e-6));
        assert_eq!(Relation::Equal.to_string(), "==");
    }
}
