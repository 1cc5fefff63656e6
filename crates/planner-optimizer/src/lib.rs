//! # Planner Optimizer
//!
//! 求解流程：外部求解器介面、字典序多階段求解與多訂單平行求解

pub mod batch;
pub mod good_lp_backend;
pub mod lexicographic;
pub mod solver;

use chrono::{DateTime, Utc};
use planner_calc::{AssignmentRow, Criterion, SolutionSummary, StageObjective};
use planner_core::SolveStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Re-export 主要類型
pub use batch::{BatchOptimizer, OrderOutcome, OrderRequest};
pub use good_lp_backend::GoodLpSolver;
pub use lexicographic::{LexicographicOptimizer, StagePlan};
pub use solver::{MilpSolver, SolveOutcome};

/// 單一階段的求解紀錄
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    pub name: String,
    pub objective: StageObjective,
    pub status: SolveStatus,

    /// 求解器目標值（含平手項）
    pub objective_value: Option<f64>,

    /// 鎖定給後續階段的準則
    pub criterion: Criterion,

    /// 以取整後的二元值重新評價的準則值
    pub criterion_value: f64,

    pub variables: usize,
    pub constraints: usize,
}

/// 優化結果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationReport {
    /// 本次求解識別碼
    pub run_id: Uuid,

    /// 完成時間
    pub solved_at: DateTime<Utc>,

    /// 求解器後端名稱
    pub solver: String,

    /// 實際使用的閘控常數 M
    pub gating_constant: f64,

    /// 各階段紀錄（依求解順序）
    pub stages: Vec<StageRecord>,

    /// 彙總指標
    pub summary: SolutionSummary,

    /// 指派明細（依機台、任務排序）
    pub assignments: Vec<AssignmentRow>,
}

impl OptimizationReport {
    /// 第一階段鎖定的利潤值
    pub fn profit_target(&self) -> Option<f64> {
        self.stages
            .iter()
            .find(|s| s.criterion == Criterion::Profit)
            .map(|s| s.criterion_value)
    }

    /// 最後一個階段
    pub fn final_stage(&self) -> Option<&StageRecord> {
        self.stages.last()
    }
}
