//! 解的讀回與彙總
//!
//! 從第二階段的變數值讀出選中工段與指派，
//! 成本與工時一律重新查原始表計算，不讀求解器內部的目標值。

use planner_core::{
    MachineId, PlannerError, ProductionModel, Result, SectionId, SolveStatus, SolverConfig, TaskId,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::builder::ModelVars;

/// 單筆指派明細
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRow {
    pub section_id: SectionId,
    pub machine_id: MachineId,
    pub task_id: TaskId,
    pub variable_cost: Decimal,
    pub time: Decimal,
}

/// 解的彙總
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionSummary {
    pub chosen_section: SectionId,
    pub total_revenue: Decimal,
    pub variable_cost: Decimal,
    pub fixed_setup_cost: Decimal,
    pub total_cost: Decimal,
    pub total_profit: Decimal,
    pub time: Decimal,
    pub time_limit: Decimal,
    pub cost_limit: Decimal,
    pub assignments: usize,
    pub active_machines: usize,
    pub tasks_enforced: u32,
    pub tasks_scheduled: u32,
    pub capacity_of_chosen: u32,
    /// 產出評分 / (工時 × 指派數)；條件不足時為 None
    pub efficiency_proxy: Option<f64>,
}

/// 讀回結果
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedSolution {
    pub summary: SolutionSummary,
    pub assignments: Vec<AssignmentRow>,
}

/// 解讀器
pub struct SolutionExtractor<'a> {
    model: &'a ProductionModel,
    config: &'a SolverConfig,
}

impl<'a> SolutionExtractor<'a> {
    pub fn new(model: &'a ProductionModel, config: &'a SolverConfig) -> Self {
        Self { model, config }
    }

    /// 讀回選中工段與指派，並重新計算彙總指標
    ///
    /// 選中工段必須唯一，且每個任務恰好被指派一次；
    /// 否則視為最終階段異常，不回傳部分結果。
    pub fn extract(&self, stage: &str, vars: &ModelVars, values: &[f64]) -> Result<ExtractedSolution> {
        let value_of = |index: usize| values.get(index).copied().unwrap_or(0.0);

        let chosen: Vec<SectionId> = vars
            .chosen
            .iter()
            .filter(|(_, var)| self.config.is_set(value_of(var.index())))
            .map(|(&section_id, _)| section_id)
            .collect();

        let chosen_section = match chosen.as_slice() {
            [only] => *only,
            _ => {
                return Err(anomaly(
                    stage,
                    format!("選中工段數為 {}（應為 1）: {:?}", chosen.len(), chosen),
                ))
            }
        };
        let section = self
            .model
            .section(chosen_section)
            .ok_or_else(|| anomaly(stage, format!("選中的工段 {chosen_section} 不在模型中")))?;

        // BTreeMap 以 (工段, 機台, 任務) 排序，同一工段內即為 (機台, 任務) 順序
        let mut assignments = Vec::new();
        for (&(j, i, k), var) in vars.assign.range((chosen_section, 0, 0)..) {
            if j != chosen_section {
                break;
            }
            if self.config.is_set(value_of(var.index())) {
                assignments.push(AssignmentRow {
                    section_id: j,
                    machine_id: i,
                    task_id: k,
                    variable_cost: self.model.variable_cost(j, i, k)?,
                    time: self.model.processing_time(j, i, k)?,
                });
            }
        }

        let covered: BTreeSet<TaskId> = assignments.iter().map(|r| r.task_id).collect();
        let tasks_enforced = self.model.params().num_tasks;
        if assignments.len() != tasks_enforced as usize || covered.len() != assignments.len() {
            return Err(anomaly(
                stage,
                format!(
                    "任務覆蓋不完整：指派 {} 筆，涵蓋任務 {} 個，應為 {}",
                    assignments.len(),
                    covered.len(),
                    tasks_enforced
                ),
            ));
        }

        let variable_cost: Decimal = assignments.iter().map(|r| r.variable_cost).sum();
        let time: Decimal = assignments.iter().map(|r| r.time).sum();
        let total_revenue = self.model.params().order_price;
        let total_cost = variable_cost + section.fixed_setup_cost;
        let active_machines = assignments
            .iter()
            .map(|r| r.machine_id)
            .collect::<BTreeSet<_>>()
            .len();

        let efficiency_proxy = efficiency_proxy(section.output_score, time, assignments.len());

        let summary = SolutionSummary {
            chosen_section,
            total_revenue,
            variable_cost,
            fixed_setup_cost: section.fixed_setup_cost,
            total_cost,
            total_profit: total_revenue - total_cost,
            time,
            time_limit: self.model.params().time_limit,
            cost_limit: self.model.params().cost_limit,
            assignments: assignments.len(),
            active_machines,
            tasks_enforced,
            tasks_scheduled: covered.len() as u32,
            capacity_of_chosen: section.capacity,
            efficiency_proxy,
        };

        tracing::debug!(
            "讀回完成：工段 {}，指派 {} 筆，機台 {} 台，成本 {}，工時 {}",
            chosen_section,
            summary.assignments,
            active_machines,
            total_cost,
            time
        );

        Ok(ExtractedSolution {
            summary,
            assignments,
        })
    }
}

/// 效率指標：僅在產出評分 > 0、工時 > 0 且有指派時定義
pub fn efficiency_proxy(output_score: Option<Decimal>, time: Decimal, count: usize) -> Option<f64> {
    let score = output_score.filter(|s| *s > Decimal::ZERO)?;
    if time <= Decimal::ZERO || count == 0 {
        return None;
    }
    let ratio = score.to_f64()? / (time.to_f64()? * count as f64);
    ratio.is_finite().then_some(ratio)
}

fn anomaly(stage: &str, note: String) -> PlannerError {
    PlannerError::Stage2Anomaly {
        stage: stage.to_string(),
        status: SolveStatus::Optimal,
        note,
    }
}
