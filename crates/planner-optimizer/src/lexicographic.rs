//! 字典序多階段求解
//!
//! 依序求解各階段；每個階段完成後，把該階段的準則值鎖定為後續階段的約束。
//! 預設兩階段：先最大化利潤，再在利潤不變下最小化總工時；
//! `DistinctMachines` 時再鎖定工時，最小化使用的機台數。

use chrono::Utc;
use planner_calc::{
    builder::to_coef, diagnose, Criterion, ModelBuilder, ObjectiveLock, SolutionExtractor,
    StageModel, StageObjective,
};
use planner_core::{
    PlannerError, ProductionModel, Result, SolveStatus, SolverConfig, TieBreakBasis,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::solver::{MilpSolver, SolveOutcome};
use crate::{OptimizationReport, StageRecord};

/// 階段定義
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagePlan {
    /// 階段名稱（出現在錯誤與報告中）
    pub name: String,

    /// 階段目標
    pub objective: StageObjective,
}

impl StagePlan {
    pub fn new(name: impl Into<String>, objective: StageObjective) -> Self {
        Self {
            name: name.into(),
            objective,
        }
    }

    /// 預設兩階段：利潤最大化 → 工時最小化
    pub fn default_plan() -> Vec<StagePlan> {
        vec![
            StagePlan::new("max_profit", StageObjective::MaxProfit),
            StagePlan::new("min_time", StageObjective::MinTime),
        ]
    }

    /// 依配置決定階段：`DistinctMachines` 時追加機台數最小化
    pub fn plan_for(config: &SolverConfig) -> Vec<StagePlan> {
        let mut plan = Self::default_plan();
        if config.tie_break_basis == TieBreakBasis::DistinctMachines {
            plan.push(StagePlan::new("min_machines", StageObjective::MinMachines));
        }
        plan
    }
}

/// 字典序優化器
pub struct LexicographicOptimizer<S: MilpSolver> {
    solver: S,
    config: SolverConfig,
    stages: Vec<StagePlan>,
}

impl<S: MilpSolver> LexicographicOptimizer<S> {
    /// 以配置對應的階段序列創建
    pub fn new(solver: S, config: SolverConfig) -> Self {
        let stages = StagePlan::plan_for(&config);
        Self {
            solver,
            config,
            stages,
        }
    }

    /// 自訂階段序列
    pub fn with_stages(mut self, stages: Vec<StagePlan>) -> Self {
        self.stages = stages;
        self
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn stages(&self) -> &[StagePlan] {
        &self.stages
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// 求解一張訂單
    ///
    /// 第一階段非最優 → `Stage1Infeasible`（附診斷摘要）；
    /// 後續階段非最優、讀回失敗或利潤退化 → `Stage2Anomaly`。
    pub fn optimize(&self, model: &ProductionModel) -> Result<OptimizationReport> {
        self.config.validate()?;
        self.validate_stages()?;

        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("optimize", %run_id, solver = self.solver.name());
        let _guard = span.enter();

        tracing::info!(
            "開始求解：工段 {} 個，機台 {} 台，任務 {} 個，階段 {} 個",
            model.sections().len(),
            model.machines().len(),
            model.params().num_tasks,
            self.stages.len()
        );

        let builder = ModelBuilder::new(model, &self.config);
        let mut locks: Vec<ObjectiveLock> = Vec::with_capacity(self.stages.len());
        let mut records: Vec<StageRecord> = Vec::with_capacity(self.stages.len());
        let mut last: Option<(StageModel, Vec<f64>)> = None;

        for (index, plan) in self.stages.iter().enumerate() {
            let stage = builder.build_stage(plan.objective, &locks)?;
            let outcome = self.solver.solve(&stage.problem);

            if !outcome.is_optimal() {
                return Err(self.stage_failure(index, plan, &outcome, model));
            }
            if outcome.values.len() != stage.problem.variable_count() {
                let note = format!(
                    "求解器回傳 {} 個變數值，模型有 {} 個",
                    outcome.values.len(),
                    stage.problem.variable_count()
                );
                return Err(failure(index, plan, SolveStatus::Error, note));
            }

            let snapped = stage
                .problem
                .snap_binaries(&outcome.values, self.config.binary_threshold);
            let criterion = plan.objective.criterion();
            let criterion_value = stage.criterion_expr(criterion).evaluate(&snapped);

            tracing::info!(
                "階段 {} 完成：{} = {:.6}",
                plan.name,
                criterion.as_str(),
                criterion_value
            );

            records.push(StageRecord {
                name: plan.name.clone(),
                objective: plan.objective,
                status: outcome.status,
                objective_value: outcome.objective_value,
                criterion,
                criterion_value,
                variables: stage.problem.variable_count(),
                constraints: stage.problem.constraint_count(),
            });
            locks.push(ObjectiveLock {
                criterion,
                target: criterion_value,
                tolerance: self.config.profit_tolerance,
            });
            last = Some((stage, snapped));
        }

        let (stage, values) = last.ok_or_else(|| PlannerError::config("未定義任何求解階段"))?;
        let final_name = records
            .last()
            .map(|r| r.name.clone())
            .unwrap_or_default();

        let extracted = SolutionExtractor::new(model, &self.config).extract(
            &final_name,
            &stage.vars,
            &values,
        )?;

        // 利潤不得低於先前鎖定的最優值
        let profit = to_coef(extracted.summary.total_profit)?;
        for lock in locks.iter().filter(|l| l.criterion == Criterion::Profit) {
            let slack = self.config.profit_tolerance + 1e-9 * lock.target.abs().max(1.0);
            if profit < lock.target - slack {
                return Err(PlannerError::Stage2Anomaly {
                    stage: final_name,
                    status: SolveStatus::Optimal,
                    note: format!("利潤退化：{} < 鎖定值 {}", profit, lock.target),
                });
            }
        }

        tracing::info!(
            "求解完成：工段 {}，利潤 {}，工時 {}，機台 {} 台",
            extracted.summary.chosen_section,
            extracted.summary.total_profit,
            extracted.summary.time,
            extracted.summary.active_machines
        );

        Ok(OptimizationReport {
            run_id,
            solved_at: Utc::now(),
            solver: self.solver.name().to_string(),
            gating_constant: stage.gating_constant,
            stages: records,
            summary: extracted.summary,
            assignments: extracted.assignments,
        })
    }

    fn validate_stages(&self) -> Result<()> {
        let first = self
            .stages
            .first()
            .ok_or_else(|| PlannerError::config("未定義任何求解階段"))?;
        if first.objective != StageObjective::MaxProfit {
            return Err(PlannerError::config(format!(
                "第一階段必須為利潤最大化，收到 {:?}",
                first.objective
            )));
        }
        for (index, plan) in self.stages.iter().enumerate() {
            if self.stages[..index]
                .iter()
                .any(|earlier| earlier.objective == plan.objective)
            {
                return Err(PlannerError::config(format!(
                    "階段 {} 的目標 {:?} 已在先前階段出現",
                    plan.name, plan.objective
                )));
            }
        }
        Ok(())
    }

    fn stage_failure(
        &self,
        index: usize,
        plan: &StagePlan,
        outcome: &SolveOutcome,
        model: &ProductionModel,
    ) -> PlannerError {
        let mut note = outcome
            .message
            .clone()
            .unwrap_or_else(|| "求解器未回傳最優解".to_string());

        if index == 0 {
            let diagnosis = diagnose(model);
            let blocking = diagnosis.render_blocking();
            if !blocking.is_empty() {
                note = format!("{note}；診斷：{blocking}");
            }
            tracing::warn!("階段 {} 無可行解：{}", plan.name, note);
        } else {
            tracing::warn!("階段 {} 在鎖定後失敗：{}", plan.name, note);
        }

        failure(index, plan, outcome.status, note)
    }
}

fn failure(index: usize, plan: &StagePlan, status: SolveStatus, note: String) -> PlannerError {
    if index == 0 {
        PlannerError::Stage1Infeasible {
            stage: plan.name.clone(),
            status,
            note,
        }
    } else {
        PlannerError::Stage2Anomaly {
            stage: plan.name.clone(),
            status,
            note,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GoodLpSolver;
    use planner_calc::MilpProblem;
    use planner_core::{CostTable, Machine, OrderParams, Section, TimeTable};
    use rstest::rstest;
    use rust_decimal::Decimal;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// 依序回放預先準備的結果；用完後改用真正的求解器
    struct ScriptedSolver {
        script: Mutex<VecDeque<SolveOutcome>>,
    }

    impl ScriptedSolver {
        fn new(script: Vec<SolveOutcome>) -> Self {
            Self {
                script: Mutex::new(script.into()),
            }
        }
    }

    impl MilpSolver for ScriptedSolver {
        fn name(&self) -> &str {
            "scripted"
        }

        fn solve(&self, problem: &MilpProblem) -> SolveOutcome {
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or_else(|| GoodLpSolver.solve(problem))
        }
    }

    /// 工段 1 只有機台 1 可用；工段 2 產能不足
    fn sample_model() -> ProductionModel {
        let params = OrderParams::new(2, Decimal::from(1000), Decimal::from(10), Decimal::from(400));
        let sections = vec![
            Section::new(1, Decimal::from(100), 5),
            Section::new(2, Decimal::from(150), 1),
        ];
        let machines = vec![
            Machine::new(1, 1).with_time_per_task(Decimal::from(2)),
            Machine::new(1, 2)
                .with_time_per_task(Decimal::from(1))
                .with_available(false),
            Machine::new(2, 1).with_time_per_task(Decimal::from(3)),
        ];
        let costs = CostTable::new()
            .with_entry(1, 1, 1, Decimal::from(10))
            .with_entry(1, 1, 2, Decimal::from(20))
            .with_entry(2, 1, 1, Decimal::from(5))
            .with_entry(2, 1, 2, Decimal::from(6));
        ProductionModel::new(params, sections, machines, costs, None).unwrap()
    }

    /// 兩工段利潤相同，工段 2 較快
    fn equal_profit_model() -> ProductionModel {
        let params = OrderParams::new(3, Decimal::from(500), Decimal::from(20), Decimal::from(300));
        let sections = vec![
            Section::new(1, Decimal::from(50), 3),
            Section::new(2, Decimal::from(50), 3),
        ];
        let machines = vec![
            Machine::new(1, 1).with_time_per_task(Decimal::from(3)),
            Machine::new(2, 1).with_time_per_task(Decimal::from(2)),
        ];
        let mut costs = CostTable::new();
        for j in 1..=2 {
            for k in 1..=3 {
                costs.insert(j, 1, k, Decimal::from(10));
            }
        }
        ProductionModel::new(params, sections, machines, costs, None).unwrap()
    }

    #[test]
    fn test_two_stage_solution() {
        let model = sample_model();
        let optimizer = LexicographicOptimizer::new(GoodLpSolver, SolverConfig::default());
        let report = optimizer.optimize(&model).unwrap();

        assert_eq!(report.summary.chosen_section, 1);
        assert_eq!(report.summary.total_cost, Decimal::from(130));
        assert_eq!(report.summary.total_profit, Decimal::from(870));
        assert_eq!(report.summary.time, Decimal::from(4));
        assert_eq!(report.summary.active_machines, 1);
        assert!(report.assignments.iter().all(|r| r.machine_id == 1));

        assert_eq!(report.stages.len(), 2);
        assert_eq!(report.stages[0].name, "max_profit");
        assert!((report.stages[0].criterion_value - 870.0).abs() < 1e-6);
        assert!((report.stages[1].criterion_value - 4.0).abs() < 1e-6);
        assert_eq!(report.solver, "good_lp/microlp");
    }

    #[test]
    fn test_second_stage_breaks_profit_tie_by_time() {
        let model = equal_profit_model();
        let optimizer = LexicographicOptimizer::new(GoodLpSolver, SolverConfig::default());
        let report = optimizer.optimize(&model).unwrap();

        assert_eq!(report.summary.chosen_section, 2);
        assert_eq!(report.summary.time, Decimal::from(6));
        assert_eq!(report.summary.total_profit, Decimal::from(420));
    }

    /// 單一工段兩台同價機台；兩個任務的工時由參數給定
    fn two_machine_model(first: [i64; 2], second: [i64; 2]) -> ProductionModel {
        let params = OrderParams::new(2, Decimal::from(100), Decimal::from(10), Decimal::from(100));
        let mut costs = CostTable::new();
        let mut times = TimeTable::new();
        for (i, row) in [(1, first), (2, second)] {
            for (k, ticks) in (1..=2).zip(row) {
                costs.insert(1, i, k, Decimal::ONE);
                times.insert(1, i, k, Decimal::new(ticks, 4));
            }
        }
        ProductionModel::new(
            params,
            vec![Section::new(1, Decimal::ZERO, 2)],
            vec![
                Machine::new(1, 1).with_time_per_task(Decimal::ONE),
                Machine::new(1, 2).with_time_per_task(Decimal::ONE),
            ],
            costs,
            Some(times),
        )
        .unwrap()
    }

    #[rstest]
    // 各自在一個任務上快 0.0004：最短工時必須用兩台
    #[case::cross_faster([10_000, 10_004], [10_004, 10_000], 2)]
    // 工時完全相同：一台即可
    #[case::identical([10_000, 10_000], [10_000, 10_000], 1)]
    fn test_machine_count_never_costs_time(
        #[case] first: [i64; 2],
        #[case] second: [i64; 2],
        #[case] machines: usize,
    ) {
        let model = two_machine_model(first, second);
        let config = SolverConfig::default().with_tie_break_basis(TieBreakBasis::DistinctMachines);
        let report = LexicographicOptimizer::new(GoodLpSolver, config)
            .optimize(&model)
            .unwrap();

        assert_eq!(report.stages.len(), 3);
        assert_eq!(report.stages[2].objective, StageObjective::MinMachines);
        assert_eq!(report.summary.time, Decimal::from(2));
        assert_eq!(report.summary.active_machines, machines);
        assert!((report.stages[2].criterion_value - machines as f64).abs() < 1e-6);
    }

    #[test]
    fn test_distinct_machine_basis_adds_stage() {
        let config = SolverConfig::default().with_tie_break_basis(TieBreakBasis::DistinctMachines);
        let optimizer = LexicographicOptimizer::new(GoodLpSolver, config);
        let objectives: Vec<StageObjective> =
            optimizer.stages().iter().map(|s| s.objective).collect();
        assert_eq!(
            objectives,
            vec![
                StageObjective::MaxProfit,
                StageObjective::MinTime,
                StageObjective::MinMachines
            ]
        );

        let report = optimizer.optimize(&equal_profit_model()).unwrap();
        assert_eq!(report.summary.chosen_section, 2);
        assert_eq!(report.summary.active_machines, 1);
    }

    #[test]
    fn test_stage_one_failure_carries_diagnosis() {
        let params = OrderParams::new(2, Decimal::from(1000), Decimal::from(10), Decimal::from(50));
        let model = ProductionModel::new(
            params,
            vec![Section::new(1, Decimal::from(100), 5)],
            vec![Machine::new(1, 1).with_time_per_task(Decimal::from(1))],
            CostTable::new()
                .with_entry(1, 1, 1, Decimal::from(1))
                .with_entry(1, 1, 2, Decimal::from(1)),
            None,
        )
        .unwrap();

        let err = LexicographicOptimizer::new(GoodLpSolver, SolverConfig::default())
            .optimize(&model)
            .unwrap_err();
        match err {
            PlannerError::Stage1Infeasible { stage, status, note } => {
                assert_eq!(stage, "max_profit");
                assert_eq!(status, SolveStatus::Infeasible);
                assert!(note.contains("診斷"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_stage_two_failure_is_anomaly() {
        let model = sample_model();
        let solver = ScriptedSolver::new(Vec::new());

        // 先用真正的求解器跑第一階段，再讓第二階段回報失敗
        let config = SolverConfig::default();
        let first = ModelBuilder::new(&model, &config)
            .build_stage(StageObjective::MaxProfit, &[])
            .unwrap();
        let first_outcome = GoodLpSolver.solve(&first.problem);
        solver.script.lock().unwrap().extend([
            first_outcome,
            SolveOutcome::failed(SolveStatus::Infeasible, "locked model infeasible"),
        ]);

        let err = LexicographicOptimizer::new(solver, config)
            .optimize(&model)
            .unwrap_err();
        match err {
            PlannerError::Stage2Anomaly { stage, status, note } => {
                assert_eq!(stage, "min_time");
                assert_eq!(status, SolveStatus::Infeasible);
                assert_eq!(note, "locked model infeasible");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_short_value_vector_is_rejected() {
        let model = sample_model();
        let solver = ScriptedSolver::new(vec![SolveOutcome::optimal(0.0, vec![1.0])]);
        let err = LexicographicOptimizer::new(solver, SolverConfig::default())
            .optimize(&model)
            .unwrap_err();
        assert!(matches!(
            err,
            PlannerError::Stage1Infeasible {
                status: SolveStatus::Error,
                ..
            }
        ));
    }

    #[rstest]
    #[case::empty(vec![])]
    #[case::time_first(vec![StageObjective::MinTime])]
    #[case::machines_first(vec![StageObjective::MinMachines, StageObjective::MaxProfit])]
    #[case::repeated(vec![StageObjective::MaxProfit, StageObjective::MaxProfit])]
    fn test_invalid_stage_plans(#[case] objectives: Vec<StageObjective>) {
        let stages = objectives
            .into_iter()
            .enumerate()
            .map(|(idx, objective)| StagePlan::new(format!("s{idx}"), objective))
            .collect();
        let optimizer = LexicographicOptimizer::new(GoodLpSolver, SolverConfig::default())
            .with_stages(stages);
        assert!(matches!(
            optimizer.optimize(&sample_model()),
            Err(PlannerError::Configuration(_))
        ));
    }

    #[test]
    fn test_single_stage_plan() {
        let model = sample_model();
        let report = LexicographicOptimizer::new(GoodLpSolver, SolverConfig::default())
            .with_stages(vec![StagePlan::new("only", StageObjective::MaxProfit)])
            .optimize(&model)
            .unwrap();
        assert_eq!(report.stages.len(), 1);
        assert_eq!(report.summary.total_profit, Decimal::from(870));
    }

    #[test]
    fn test_invalid_config_is_rejected_before_solving() {
        let model = sample_model();
        let config = SolverConfig::default().with_tie_break(-1.0);
        let err = LexicographicOptimizer::new(GoodLpSolver, config)
            .optimize(&model)
            .unwrap_err();
        assert!(matches!(err, PlannerError::Configuration(_)));
    }
}
