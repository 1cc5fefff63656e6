//! 求解前的可行性診斷
//!
//! 不呼叫求解器，只用查表計算各工段的必要條件下界：
//! 最低成本、最短工時、產能與可用機台。任一下界超限的工段
//! 必然不可能被選中。

use planner_core::model::MissingEntry;
use planner_core::{ProductionModel, SectionId};
use rust_decimal::Decimal;
use std::fmt;

/// 單一工段的診斷結果
#[derive(Debug, Clone, PartialEq)]
pub struct SectionDiagnosis {
    pub section_id: SectionId,
    pub machines_total: usize,
    pub machines_available: usize,
    pub fixed_setup_cost: Decimal,
    pub capacity: u32,
    /// 每個任務取最便宜可用機台的成本總和
    pub min_variable_cost: Option<Decimal>,
    /// 開線成本 + 最低變動成本
    pub min_total_cost: Option<Decimal>,
    /// 每個任務取最快可用機台的工時總和
    pub min_time: Option<Decimal>,
    /// 訂單總價 − 最低總成本
    pub profit_potential: Option<Decimal>,
}

/// 可行性問題
#[derive(Debug, Clone, PartialEq)]
pub enum FeasibilityIssue {
    NoAvailableMachines {
        section_id: SectionId,
    },
    CostExceedsLimit {
        section_id: SectionId,
        min_cost: Decimal,
        limit: Decimal,
    },
    TimeExceedsLimit {
        section_id: SectionId,
        min_time: Decimal,
        limit: Decimal,
    },
    CapacityTooSmall {
        section_id: SectionId,
        tasks: u32,
        capacity: u32,
    },
    /// 僅提示，不阻擋（利潤最大化仍會選出虧損最小的工段）
    Unprofitable {
        section_id: SectionId,
        profit_potential: Decimal,
    },
    MissingData(MissingEntry),
}

impl FeasibilityIssue {
    pub fn section_id(&self) -> SectionId {
        match self {
            FeasibilityIssue::NoAvailableMachines { section_id }
            | FeasibilityIssue::CostExceedsLimit { section_id, .. }
            | FeasibilityIssue::TimeExceedsLimit { section_id, .. }
            | FeasibilityIssue::CapacityTooSmall { section_id, .. }
            | FeasibilityIssue::Unprofitable { section_id, .. } => *section_id,
            FeasibilityIssue::MissingData(entry) => entry.section_id,
        }
    }

    /// 是否使該工段不可能被選中
    pub fn is_blocking(&self) -> bool {
        !matches!(self, FeasibilityIssue::Unprofitable { .. })
    }
}

impl fmt::Display for FeasibilityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeasibilityIssue::NoAvailableMachines { section_id } => {
                write!(f, "工段 {section_id}: 沒有可用機台")
            }
            FeasibilityIssue::CostExceedsLimit {
                section_id,
                min_cost,
                limit,
            } => write!(f, "工段 {section_id}: 最低成本 {min_cost} 超過上限 {limit}"),
            FeasibilityIssue::TimeExceedsLimit {
                section_id,
                min_time,
                limit,
            } => write!(f, "工段 {section_id}: 最短工時 {min_time} 超過上限 {limit}"),
            FeasibilityIssue::CapacityTooSmall {
                section_id,
                tasks,
                capacity,
            } => write!(f, "工段 {section_id}: 任務數 {tasks} 超過產能 {capacity}"),
            FeasibilityIssue::Unprofitable {
                section_id,
                profit_potential,
            } => write!(f, "工段 {section_id}: 最佳情況利潤為 {profit_potential}"),
            FeasibilityIssue::MissingData(entry) => write!(
                f,
                "工段 {}: {} 缺少 (機台 {}, 任務 {})",
                entry.section_id, entry.table, entry.machine_id, entry.task_id
            ),
        }
    }
}

/// 整張訂單的診斷
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnosis {
    pub sections: Vec<SectionDiagnosis>,
    pub issues: Vec<FeasibilityIssue>,
}

impl Diagnosis {
    pub fn blocking_issues(&self) -> impl Iterator<Item = &FeasibilityIssue> + '_ {
        self.issues.iter().filter(|i| i.is_blocking())
    }

    pub fn issues_for(&self, section_id: SectionId) -> impl Iterator<Item = &FeasibilityIssue> + '_ {
        self.issues
            .iter()
            .filter(move |i| i.section_id() == section_id)
    }

    /// 每個工段都至少有一個阻擋性問題（沒有工段時亦成立）
    pub fn all_sections_blocked(&self) -> bool {
        self.sections.iter().all(|s| {
            self.blocking_issues()
                .any(|issue| issue.section_id() == s.section_id)
        })
    }

    /// 以分號串接阻擋性問題
    pub fn render_blocking(&self) -> String {
        self.blocking_issues()
            .map(|issue| issue.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// 對領域模型做求解前診斷
pub fn diagnose(model: &ProductionModel) -> Diagnosis {
    let params = model.params();
    let missing = model.missing_entries();
    let mut diagnosis = Diagnosis::default();

    for section in model.sections() {
        let j = section.section_id;
        let machines: Vec<_> = model.machines_in(j).collect();
        let available: Vec<_> = machines.iter().filter(|m| m.available).collect();

        let mut min_variable_cost = Some(Decimal::ZERO);
        let mut min_time = Some(Decimal::ZERO);

        for k in model.task_ids() {
            let cheapest = available
                .iter()
                .filter_map(|m| model.variable_cost(j, m.machine_id, k).ok())
                .min();
            let fastest = available
                .iter()
                .filter_map(|m| model.processing_time(j, m.machine_id, k).ok())
                .min();

            min_variable_cost = min_variable_cost.zip(cheapest).map(|(acc, c)| acc + c);
            min_time = min_time.zip(fastest).map(|(acc, t)| acc + t);
        }

        let min_total_cost = min_variable_cost.map(|c| c + section.fixed_setup_cost);
        let profit_potential = min_total_cost.map(|c| params.order_price - c);

        if available.is_empty() {
            diagnosis
                .issues
                .push(FeasibilityIssue::NoAvailableMachines { section_id: j });
        }
        if params.num_tasks > section.capacity {
            diagnosis.issues.push(FeasibilityIssue::CapacityTooSmall {
                section_id: j,
                tasks: params.num_tasks,
                capacity: section.capacity,
            });
        }
        // 開線成本本身超限時，不論變動成本都不可行
        let cost_floor = min_total_cost.unwrap_or(section.fixed_setup_cost);
        if cost_floor > params.cost_limit {
            diagnosis.issues.push(FeasibilityIssue::CostExceedsLimit {
                section_id: j,
                min_cost: cost_floor,
                limit: params.cost_limit,
            });
        }
        if let Some(time) = min_time.filter(|t| *t > params.time_limit) {
            diagnosis.issues.push(FeasibilityIssue::TimeExceedsLimit {
                section_id: j,
                min_time: time,
                limit: params.time_limit,
            });
        }
        if let Some(profit) = profit_potential.filter(|p| p.is_sign_negative() && !p.is_zero()) {
            diagnosis.issues.push(FeasibilityIssue::Unprofitable {
                section_id: j,
                profit_potential: profit,
            });
        }
        diagnosis.issues.extend(
            missing
                .iter()
                .filter(|m| m.section_id == j)
                .map(|m| FeasibilityIssue::MissingData(*m)),
        );

        diagnosis.sections.push(SectionDiagnosis {
            section_id: j,
            machines_total: machines.len(),
            machines_available: available.len(),
            fixed_setup_cost: section.fixed_setup_cost,
            capacity: section.capacity,
            min_variable_cost,
            min_total_cost,
            min_time,
            profit_potential,
        });
    }

    tracing::debug!(
        "診斷完成：工段 {} 個，問題 {} 項",
        diagnosis.sections.len(),
        diagnosis.issues.len()
    );

    diagnosis
}
