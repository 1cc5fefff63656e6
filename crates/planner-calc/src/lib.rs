//! # Planner Calc
//!
//! 建模、診斷與解讀：
//! - `milp`: 求解器中立的 0/1 整數規劃表示
//! - `builder`: 依階段（利潤最大化 / 鎖利潤後工時最小化）建模
//! - `diagnostics`: 求解前的可行性下界檢查
//! - `extract`: 由變數值讀回選中工段、指派與彙總指標

pub mod builder;
pub mod diagnostics;
pub mod extract;
pub mod milp;

// Re-export 主要類型
pub use builder::{
    BuildMode, Criterion, ModelBuilder, ModelVars, ObjectiveLock, StageModel, StageObjective,
};
pub use diagnostics::{diagnose, Diagnosis, FeasibilityIssue, SectionDiagnosis};
pub use extract::{AssignmentRow, ExtractedSolution, SolutionExtractor, SolutionSummary};
pub use milp::{LinearConstraint, LinearExpr, MilpProblem, Relation, Sense, VarDef, VarId, VarKind};
