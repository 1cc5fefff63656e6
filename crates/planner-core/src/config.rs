//! 求解配置

use serde::{Deserialize, Serialize};

use crate::{PlannerError, Result};

/// 工時平手時的偏好基準
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TieBreakBasis {
    /// 只在工時階段加上 ε Σ 指派變數
    #[default]
    AssignmentCount,

    /// 另加第三階段：鎖定利潤與工時後，最小化使用到的不同機台數
    DistinctMachines,
}

/// 求解參數配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// 第二階段平手項係數 ε（必須小到不會蓋過真實工時差異）
    pub tie_break: f64,

    /// 工時平手時是否再以機台數分出先後
    pub tie_break_basis: TieBreakBasis,

    /// 利潤鎖定容差（上下各一條約束）
    pub profit_tolerance: f64,

    /// 二元變數讀回門檻（> 門檻視為 1）
    pub binary_threshold: f64,

    /// 閘控大常數 M；未設置時依實例規模推導
    pub gating_constant: Option<f64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tie_break: 1e-3,
            tie_break_basis: TieBreakBasis::AssignmentCount,
            profit_tolerance: 1e-6,
            binary_threshold: 0.5,
            gating_constant: None,
        }
    }
}

impl SolverConfig {
    /// 創建預設配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 由 JSON 字串讀取（缺欄位使用預設值）
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SolverConfig = serde_json::from_str(json)
            .map_err(|e| PlannerError::config(format!("求解配置解析失敗: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// 建構器模式：設置平手項係數
    pub fn with_tie_break(mut self, tie_break: f64) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// 建構器模式：設置平手項基準
    pub fn with_tie_break_basis(mut self, basis: TieBreakBasis) -> Self {
        self.tie_break_basis = basis;
        self
    }

    /// 建構器模式：設置利潤鎖定容差
    pub fn with_profit_tolerance(mut self, tolerance: f64) -> Self {
        self.profit_tolerance = tolerance;
        self
    }

    /// 建構器模式：設置二元讀回門檻
    pub fn with_binary_threshold(mut self, threshold: f64) -> Self {
        self.binary_threshold = threshold;
        self
    }

    /// 建構器模式：指定閘控大常數
    pub fn with_gating_constant(mut self, big_m: f64) -> Self {
        self.gating_constant = Some(big_m);
        self
    }

    /// 驗證配置值
    pub fn validate(&self) -> Result<()> {
        if !(self.tie_break.is_finite() && self.tie_break > 0.0) {
            return Err(PlannerError::config(format!(
                "tie_break 必須為正有限值，實際為 {}",
                self.tie_break
            )));
        }
        if !(self.profit_tolerance.is_finite() && self.profit_tolerance >= 0.0) {
            return Err(PlannerError::config(format!(
                "profit_tolerance 必須為非負有限值，實際為 {}",
                self.profit_tolerance
            )));
        }
        if !(self.binary_threshold > 0.0 && self.binary_threshold < 1.0) {
            return Err(PlannerError::config(format!(
                "binary_threshold 必須介於 0 與 1 之間，實際為 {}",
                self.binary_threshold
            )));
        }
        if let Some(big_m) = self.gating_constant {
            if !(big_m.is_finite() && big_m > 0.0) {
                return Err(PlannerError::config(format!(
                    "gating_constant 必須為正有限值，實際為 {big_m}"
                )));
            }
        }
        Ok(())
    }

    /// 以配置門檻判斷求解器回傳的二元值
    pub fn is_set(&self, value: f64) -> bool {
        value > self.binary_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let config = SolverConfig::default();
        assert_eq!(config.tie_break, 1e-3);
        assert_eq!(config.profit_tolerance, 1e-6);
        assert_eq!(config.binary_threshold, 0.5);
        assert_eq!(config.gating_constant, None);
        assert_eq!(config.tie_break_basis, TieBreakBasis::AssignmentCount);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = SolverConfig::new()
            .with_tie_break(1e-4)
            .with_profit_tolerance(1e-5)
            .with_binary_threshold(0.4)
            .with_gating_constant(5e4)
            .with_tie_break_basis(TieBreakBasis::DistinctMachines);

        assert_eq!(config.tie_break, 1e-4);
        assert_eq!(config.profit_tolerance, 1e-5);
        assert_eq!(config.binary_threshold, 0.4);
        assert_eq!(config.gating_constant, Some(5e4));
        assert_eq!(config.tie_break_basis, TieBreakBasis::DistinctMachines);
    }

    #[rstest]
    #[case(SolverConfig::new().with_tie_break(0.0))]
    #[case(SolverConfig::new().with_tie_break(f64::NAN))]
    #[case(SolverConfig::new().with_profit_tolerance(-1.0))]
    #[case(SolverConfig::new().with_binary_threshold(1.0))]
    #[case(SolverConfig::new().with_gating_constant(f64::INFINITY))]
    #[case(SolverConfig::new().with_gating_constant(0.0))]
    fn test_invalid_configs(#[case] config: SolverConfig) {
        assert!(matches!(config.validate(), Err(PlannerError::Configuration(_))));
    }

    #[test]
    fn test_from_json_partial() {
        let config = SolverConfig::from_json(r#"{ "tie_break": 0.0005 }"#).unwrap();
        assert_eq!(config.tie_break, 0.0005);
        assert_eq!(config.profit_tolerance, 1e-6);

        assert!(SolverConfig::from_json(r#"{ "binary_threshold": 2.0 }"#).is_err());
        assert!(SolverConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_is_set() {
        let config = SolverConfig::default();
        assert!(config.is_set(0.9999997));
        assert!(!config.is_set(0.5));
        assert!(!config.is_set(1e-9));
    }
}
