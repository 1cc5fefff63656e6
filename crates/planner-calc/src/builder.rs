//! 分階段模型建構
//!
//! 把領域模型轉成某一階段的 0/1 整數規劃：
//! - X_j: 工段 j 是否被選中
//! - Y_jik: 任務 k 是否指派到工段 j 的機台 i
//! - T_j: 工段 j 的總工時（非負連續）
//!
//! 兩個階段的約束結構相同，只差在目標與利潤鎖定約束。

use planner_core::{
    MachineId, PlannerError, ProductionModel, Result, SectionId, SolverConfig, TaskId,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::milp::{LinearConstraint, LinearExpr, MilpProblem, Sense, VarId};

/// 可被鎖定的評價準則
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    /// 訂單利潤 = 收入 − 變動成本 − 開線成本
    Profit,
    /// 各工段工時總和（不含平手項）
    Time,
    /// 使用到的不同機台數 ΣU
    Machines,
}

impl Criterion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Criterion::Profit => "profit",
            Criterion::Time => "time",
            Criterion::Machines => "machines",
        }
    }
}

/// 階段目標
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageObjective {
    /// 利潤最大化
    MaxProfit,
    /// 工時最小化（附平手項）
    MinTime,
    /// 不同機台數最小化
    MinMachines,
}

impl StageObjective {
    /// 該目標對應、供後續階段鎖定的準則
    pub fn criterion(&self) -> Criterion {
        match self {
            StageObjective::MaxProfit => Criterion::Profit,
            StageObjective::MinTime => Criterion::Time,
            StageObjective::MinMachines => Criterion::Machines,
        }
    }

    pub fn sense(&self) -> Sense {
        match self {
            StageObjective::MaxProfit => Sense::Maximize,
            StageObjective::MinTime | StageObjective::MinMachines => Sense::Minimize,
        }
    }
}

/// 準則鎖定：target − tolerance ≤ 準則 ≤ target + tolerance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectiveLock {
    pub criterion: Criterion,
    pub target: f64,
    pub tolerance: f64,
}

/// 建模模式
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BuildMode {
    /// 第一階段：利潤最大化
    ProfitMax,
    /// 第二階段：鎖定利潤後最小化工時
    TimeMinWithLock { profit_target: f64 },
}

/// 模型中各決策變數的索引
#[derive(Debug, Clone, Default)]
pub struct ModelVars {
    /// X_j
    pub chosen: BTreeMap<SectionId, VarId>,
    /// Y_jik
    pub assign: BTreeMap<(SectionId, MachineId, TaskId), VarId>,
    /// T_j
    pub section_time: BTreeMap<SectionId, VarId>,
    /// U_ji（僅在最小化或鎖定機台數的階段建立）
    pub machine_usage: BTreeMap<(SectionId, MachineId), VarId>,
}

/// 建好的一個階段模型
#[derive(Debug, Clone)]
pub struct StageModel {
    pub objective: StageObjective,
    pub problem: MilpProblem,
    pub vars: ModelVars,
    pub gating_constant: f64,
    profit: LinearExpr,
    time: LinearExpr,
    machines: LinearExpr,
}

impl StageModel {
    /// 取得準則表達式（供評價與鎖定）
    pub fn criterion_expr(&self, criterion: Criterion) -> &LinearExpr {
        match criterion {
            Criterion::Profit => &self.profit,
            Criterion::Time => &self.time,
            Criterion::Machines => &self.machines,
        }
    }
}

/// 單一三元組的目標/約束係數
#[derive(Debug, Clone, Copy)]
struct Coefficients {
    cost: f64,
    time: f64,
}

/// 模型建構器
pub struct ModelBuilder<'a> {
    model: &'a ProductionModel,
    config: &'a SolverConfig,
}

impl<'a> ModelBuilder<'a> {
    /// 創建建構器
    pub fn new(model: &'a ProductionModel, config: &'a SolverConfig) -> Self {
        Self { model, config }
    }

    /// 依模式建立兩階段中的一個
    pub fn build(&self, mode: &BuildMode) -> Result<StageModel> {
        match *mode {
            BuildMode::ProfitMax => self.build_stage(StageObjective::MaxProfit, &[]),
            BuildMode::TimeMinWithLock { profit_target } => self.build_stage(
                StageObjective::MinTime,
                &[ObjectiveLock {
                    criterion: Criterion::Profit,
                    target: profit_target,
                    tolerance: self.config.profit_tolerance,
                }],
            ),
        }
    }

    /// 建立任一階段：給定目標與之前各階段的鎖定
    pub fn build_stage(
        &self,
        objective: StageObjective,
        locks: &[ObjectiveLock],
    ) -> Result<StageModel> {
        let params = self.model.params();
        let price = to_coef(params.order_price)?;
        let time_limit = to_coef(params.time_limit)?;
        let cost_limit = to_coef(params.cost_limit)?;
        let big_m = self.gating_constant()?;
        let with_usage = objective == StageObjective::MinMachines
            || locks.iter().any(|l| l.criterion == Criterion::Machines);

        let name = match objective {
            StageObjective::MaxProfit => "stage_max_profit",
            StageObjective::MinTime => "stage_min_time",
            StageObjective::MinMachines => "stage_min_machines",
        };
        let mut problem = MilpProblem::new(name, objective.sense());
        let mut vars = ModelVars::default();

        tracing::debug!(
            "建立模型 {}：工段 {} 個，機台 {} 台，任務 {} 個，M = {}",
            name,
            self.model.sections().len(),
            self.model.machines().len(),
            params.num_tasks,
            big_m
        );

        // 變數
        for section in self.model.sections() {
            let j = section.section_id;
            vars.chosen.insert(j, problem.add_binary(format!("X_{j}")));
        }
        for section in self.model.sections() {
            let j = section.section_id;
            for machine in self.model.machines_in(j) {
                let i = machine.machine_id;
                for k in self.model.task_ids() {
                    vars.assign
                        .insert((j, i, k), problem.add_binary(format!("Y_{j}_{i}_{k}")));
                }
                if with_usage {
                    vars.machine_usage
                        .insert((j, i), problem.add_binary(format!("U_{j}_{i}")));
                }
            }
        }
        for section in self.model.sections() {
            let j = section.section_id;
            vars.section_time
                .insert(j, problem.add_continuous(format!("T_{j}")));
        }

        // 準則表達式
        let mut profit = LinearExpr::new();
        let mut time = LinearExpr::new();
        let mut assignment_total = LinearExpr::new();
        let mut machines = LinearExpr::new();
        for &u in vars.machine_usage.values() {
            machines.add_term(u, 1.0);
        }

        // 恰選一個工段
        let mut choose_one = LinearExpr::new();
        for &x in vars.chosen.values() {
            choose_one.add_term(x, 1.0);
        }
        problem.add_constraint(LinearConstraint::equal("choose_one_section", choose_one, 1.0));

        for section in self.model.sections() {
            let j = section.section_id;
            let x = vars.chosen[&j];
            let t = vars.section_time[&j];
            let fixed = to_coef(section.fixed_setup_cost)?;

            profit.add_term(x, price - fixed);
            time.add_term(t, 1.0);

            let mut routed_time = LinearExpr::new().with_term(t, 1.0);
            let mut routed_cost = LinearExpr::new();
            let mut routed_count = LinearExpr::new();
            let mut coverage: BTreeMap<TaskId, LinearExpr> = BTreeMap::new();

            for machine in self.model.machines_in(j) {
                let i = machine.machine_id;
                let available = if machine.available { 1.0 } else { 0.0 };

                for k in self.model.task_ids() {
                    let y = vars.assign[&(j, i, k)];
                    let coef = self.coefficients(j, i, k)?;

                    profit.add_term(y, -coef.cost);
                    routed_time.add_term(y, -coef.time);
                    routed_cost.add_term(y, coef.cost);
                    routed_count.add_term(y, 1.0);
                    assignment_total.add_term(y, 1.0);
                    coverage.entry(k).or_default().add_term(y, 1.0);

                    // 只能指派到被選中工段的可用機台
                    problem.add_constraint(LinearConstraint::le(
                        format!("gate_{j}_{i}_{k}"),
                        LinearExpr::new().with_term(y, 1.0).with_term(x, -1.0),
                        0.0,
                    ));
                    problem.add_constraint(LinearConstraint::le(
                        format!("avail_{j}_{i}_{k}"),
                        LinearExpr::new().with_term(y, 1.0),
                        available,
                    ));

                    if let Some(&u) = vars.machine_usage.get(&(j, i)) {
                        problem.add_constraint(LinearConstraint::le(
                            format!("usage_{j}_{i}_{k}"),
                            LinearExpr::new().with_term(y, 1.0).with_term(u, -1.0),
                            0.0,
                        ));
                    }
                }
            }

            // T_j ≥ Σ t·Y
            problem.add_constraint(LinearConstraint::ge(
                format!("time_def_{j}"),
                routed_time,
                0.0,
            ));

            // T_j ≤ T_desired · X_j
            problem.add_constraint(LinearConstraint::le(
                format!("deadline_{j}"),
                LinearExpr::new()
                    .with_term(t, 1.0)
                    .with_term(x, -time_limit),
                0.0,
            ));

            // Σ c·Y + f_j ≤ C_desired + M(1 − X_j)
            routed_cost.add_term(x, big_m);
            problem.add_constraint(LinearConstraint::le(
                format!("cost_cap_{j}"),
                routed_cost,
                cost_limit + big_m - fixed,
            ));

            // Σ Y ≤ Cap_j + M(1 − X_j)
            routed_count.add_term(x, big_m);
            problem.add_constraint(LinearConstraint::le(
                format!("capacity_{j}"),
                routed_count,
                f64::from(section.capacity) + big_m,
            ));

            // 每個任務在選中工段內恰好指派一次
            for k in self.model.task_ids() {
                let mut cover = coverage.remove(&k).unwrap_or_default();
                cover.add_term(x, -1.0);
                problem.add_constraint(LinearConstraint::equal(
                    format!("cover_{j}_{k}"),
                    cover,
                    0.0,
                ));
            }
        }

        for lock in locks {
            let expr = match lock.criterion {
                Criterion::Profit => &profit,
                Criterion::Time => &time,
                Criterion::Machines => &machines,
            };
            let label = lock.criterion.as_str();
            problem.add_constraint(LinearConstraint::ge(
                format!("lock_{label}_lower"),
                expr.clone(),
                lock.target - lock.tolerance,
            ));
            problem.add_constraint(LinearConstraint::le(
                format!("lock_{label}_upper"),
                expr.clone(),
                lock.target + lock.tolerance,
            ));
        }

        let objective_expr = match objective {
            StageObjective::MaxProfit => profit.clone(),
            StageObjective::MinTime => {
                let mut expr = time.clone();
                expr.add_scaled(&assignment_total, self.config.tie_break);
                expr
            }
            StageObjective::MinMachines => machines.clone(),
        };
        problem.set_objective(objective_expr);

        tracing::debug!(
            "模型 {} 完成：變數 {} 個（二元 {}），約束 {} 條",
            name,
            problem.variable_count(),
            problem.binary_count(),
            problem.constraint_count()
        );

        Ok(StageModel {
            objective,
            problem,
            vars,
            gating_constant: big_m,
            profit,
            time,
            machines,
        })
    }

    /// 實際使用的閘控常數：配置值優先，否則由實例推導
    pub fn gating_constant(&self) -> Result<f64> {
        let required = self.required_gating_constant()?;
        match self.config.gating_constant {
            Some(configured) => {
                if configured < required {
                    tracing::warn!(
                        "配置的閘控常數 {} 小於實例所需 {}，未選中工段可能被錯誤約束",
                        configured,
                        required
                    );
                }
                Ok(configured)
            }
            None => Ok(required + 1.0),
        }
    }

    /// 讓未選中工段的成本/產能約束失效所需的最小常數
    ///
    /// 取各工段「開線成本 + 全部變動成本 − 成本上限」與
    /// 「全部指派數 − 產能」的最大值（不小於 0）。
    pub fn required_gating_constant(&self) -> Result<f64> {
        let cost_limit = to_coef(self.model.params().cost_limit)?;
        let mut required: f64 = 0.0;

        for section in self.model.sections() {
            let j = section.section_id;
            let mut cost_upper = to_coef(section.fixed_setup_cost)?;
            let mut count_upper = 0.0;

            for machine in self.model.machines_in(j) {
                for k in self.model.task_ids() {
                    cost_upper += self.coefficients(j, machine.machine_id, k)?.cost.max(0.0);
                    count_upper += 1.0;
                }
            }

            required = required
                .max(cost_upper - cost_limit)
                .max(count_upper - f64::from(section.capacity));
        }

        Ok(required)
    }

    /// 三元組係數：可達者嚴格查表，不可達者（機台停用）以 0 代入
    fn coefficients(&self, j: SectionId, i: MachineId, k: TaskId) -> Result<Coefficients> {
        if self.model.is_reachable(j, i) {
            Ok(Coefficients {
                cost: to_coef(self.model.variable_cost(j, i, k)?)?,
                time: to_coef(self.model.processing_time(j, i, k)?)?,
            })
        } else {
            Ok(Coefficients {
                cost: 0.0,
                time: 0.0,
            })
        }
    }
}

/// Decimal → 求解器係數
pub fn to_coef(value: Decimal) -> Result<f64> {
    value
        .to_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| PlannerError::config(format!("數值無法轉為浮點係數: {value}")))
}
