//! # Planner Core
//!
//! 核心資料模型與類型定義（工段、機台、任務、成本/工時表、訂單參數）

pub mod config;
pub mod model;
pub mod order;
pub mod section;
pub mod status;
pub mod tables;

// Re-export 主要類型
pub use config::{SolverConfig, TieBreakBasis};
pub use model::ProductionModel;
pub use order::OrderParams;
pub use section::{Machine, Section};
pub use status::SolveStatus;
pub use tables::{CostTable, TimeTable, TripleTable};

/// 工段識別碼
pub type SectionId = u32;

/// 機台識別碼（僅在所屬工段內唯一）
pub type MachineId = u32;

/// 任務識別碼（1..=p）
pub type TaskId = u32;

/// 排產優化錯誤類型
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlannerError {
    #[error("配置錯誤: {0}")]
    Configuration(String),

    #[error("資料完整性錯誤: {table} 缺少 (工段 {section_id}, 機台 {machine_id}, 任務 {task_id})")]
    DataIntegrity {
        table: &'static str,
        section_id: SectionId,
        machine_id: MachineId,
        task_id: TaskId,
    },

    #[error("第一階段無最優解 ({stage}): 狀態 {status}，{note}")]
    Stage1Infeasible {
        stage: String,
        status: SolveStatus,
        note: String,
    },

    #[error("第二階段異常 ({stage}): 狀態 {status}，{note}")]
    Stage2Anomaly {
        stage: String,
        status: SolveStatus,
        note: String,
    },
}

impl PlannerError {
    /// 建立配置錯誤
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// 是否為「無法滿足約束」類型（呼叫端應理解為訂單不可行）
    pub fn is_infeasible(&self) -> bool {
        matches!(self, Self::Stage1Infeasible { .. })
    }
}

pub type Result<T> = std::result::Result<T, PlannerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PlannerError::DataIntegrity {
            table: "costs",
            section_id: 2,
            machine_id: 3,
            task_id: 4,
        };
        let text = err.to_string();
        assert!(text.contains("costs"));
        assert!(text.contains("工段 2"));
        assert!(text.contains("任務 4"));
    }

    #[test]
    fn test_is_infeasible() {
        let err = PlannerError::Stage1Infeasible {
            stage: "max_profit".to_string(),
            status: SolveStatus::Infeasible,
            note: String::new(),
        };
        assert!(err.is_infeasible());
        assert!(!PlannerError::config("x").is_infeasible());
    }
}
