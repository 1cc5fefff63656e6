//! 外部求解器狀態

use serde::{Deserialize, Serialize};
use std::fmt;

/// 外部求解器回報的求解狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    /// 找到最優解
    Optimal,
    /// 約束無可行解
    Infeasible,
    /// 目標無界
    Unbounded,
    /// 求解器內部錯誤或未能完成
    Error,
}

impl SolveStatus {
    /// 是否為最優
    pub fn is_optimal(&self) -> bool {
        *self == SolveStatus::Optimal
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SolveStatus::Optimal => "Optimal",
            SolveStatus::Infeasible => "Infeasible",
            SolveStatus::Unbounded => "Unbounded",
            SolveStatus::Error => "Error",
        }
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
