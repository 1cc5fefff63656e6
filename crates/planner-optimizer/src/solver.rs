//! 外部求解器介面
//!
//! 核心只負責建模與解讀；0/1 整數規劃的求解交給實作此 trait 的後端。

use planner_calc::MilpProblem;
use planner_core::SolveStatus;

/// 求解結果
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    /// 求解狀態
    pub status: SolveStatus,

    /// 目標值（僅最優時有值）
    pub objective_value: Option<f64>,

    /// 依變數宣告順序的取值（僅最優時非空）
    pub values: Vec<f64>,

    /// 後端附帶訊息
    pub message: Option<String>,
}

impl SolveOutcome {
    /// 創建最優解結果
    pub fn optimal(objective_value: f64, values: Vec<f64>) -> Self {
        Self {
            status: SolveStatus::Optimal,
            objective_value: Some(objective_value),
            values,
            message: None,
        }
    }

    /// 創建非最優結果
    pub fn failed(status: SolveStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            objective_value: None,
            values: Vec::new(),
            message: Some(message.into()),
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status.is_optimal()
    }
}

/// 0/1 整數規劃求解器
///
/// 每次呼叫同步阻塞直到回傳；實作不得在呼叫之間保留可變狀態，
/// 以便不同訂單可平行求解。
pub trait MilpSolver: Send + Sync {
    /// 後端名稱
    fn name(&self) -> &str;

    /// 求解問題；任何非最優狀態都以 `SolveOutcome` 回報，不 panic
    fn solve(&self, problem: &MilpProblem) -> SolveOutcome;
}

impl<S: MilpSolver + ?Sized> MilpSolver for &S {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn solve(&self, problem: &MilpProblem) -> SolveOutcome {
        (**self).solve(problem)
    }
}
