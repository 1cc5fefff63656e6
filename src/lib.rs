//! # Section Planner
//!
//! 單張訂單的工段選擇與任務指派：
//! 先最大化訂單利潤，再在利潤不變下最小化總工時。
//!
//! ## 模組
//! - `planner-core`: 領域模型、配置、錯誤
//! - `planner-calc`: 建模、求解前診斷、解的讀回
//! - `planner-optimizer`: 求解器介面、字典序求解、批次求解
//! - 本 crate: 訂單目錄載入、結果輸出、日誌

pub mod export;
pub mod loader;
pub mod logging;

use std::path::Path;

pub use planner_calc::{
    diagnose, AssignmentRow, Diagnosis, FeasibilityIssue, SolutionSummary, StageObjective,
};
pub use planner_core::{
    Machine, OrderParams, PlannerError, ProductionModel, Result, Section, SolveStatus,
    SolverConfig, TieBreakBasis,
};
pub use planner_optimizer::{
    BatchOptimizer, GoodLpSolver, LexicographicOptimizer, MilpSolver, OptimizationReport,
    OrderRequest, StagePlan,
};

/// 載入訂單目錄並以 `good_lp` 後端求解
pub fn solve_order_dir(
    dir: impl AsRef<Path>,
    config: &SolverConfig,
) -> Result<OptimizationReport> {
    let model = loader::load_order_dir(dir)?;
    LexicographicOptimizer::new(GoodLpSolver::new(), config.clone()).optimize(&model)
}
