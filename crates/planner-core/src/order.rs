//! 訂單參數

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{PlannerError, Result};

/// 任務數參數名
pub const PARAM_NUM_TASKS: &str = "num_tasks_p";

/// 訂單總價參數名（主要）
pub const PARAM_ORDER_PRICE: &str = "order_price_Cc";

/// 訂單總價參數名（舊名稱，同樣解讀為整張訂單總價）
pub const PARAM_ORDER_PRICE_LEGACY: &str = "customer_price_per_unit_Cc";

/// 交期上限參數名
pub const PARAM_TIME_LIMIT: &str = "time_limit_Tdesired";

/// 成本上限參數名
pub const PARAM_COST_LIMIT: &str = "cost_limit_Cdesired";

/// 客戶訂單參數
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderParams {
    /// 任務（零件/CAD 檔）數 p
    pub num_tasks: u32,

    /// 整張訂單總價 Cc（非單價）
    pub order_price: Decimal,

    /// 期望完工時間上限 T_desired
    pub time_limit: Decimal,

    /// 成本上限 C_desired
    pub cost_limit: Decimal,
}

impl OrderParams {
    /// 創建訂單參數
    pub fn new(num_tasks: u32, order_price: Decimal, time_limit: Decimal, cost_limit: Decimal) -> Self {
        Self {
            num_tasks,
            order_price,
            time_limit,
            cost_limit,
        }
    }

    /// 由 `param -> value` 對照表建立
    ///
    /// 訂單總價接受 `order_price_Cc` 或 `customer_price_per_unit_Cc`；
    /// 兩者皆缺、或兩者同時出現但數值不同時回傳配置錯誤。
    pub fn from_param_map(params: &HashMap<String, Decimal>) -> Result<Self> {
        let order_price = match (
            params.get(PARAM_ORDER_PRICE),
            params.get(PARAM_ORDER_PRICE_LEGACY),
        ) {
            (Some(price), None) | (None, Some(price)) => *price,
            (Some(price), Some(legacy)) if price == legacy => *price,
            (Some(price), Some(legacy)) => {
                return Err(PlannerError::config(format!(
                    "訂單總價參數衝突: {PARAM_ORDER_PRICE}={price}, {PARAM_ORDER_PRICE_LEGACY}={legacy}"
                )))
            }
            (None, None) => {
                return Err(PlannerError::config(format!(
                    "缺少訂單總價參數 '{PARAM_ORDER_PRICE}'（或 '{PARAM_ORDER_PRICE_LEGACY}'）"
                )))
            }
        };

        let raw_tasks = required(params, PARAM_NUM_TASKS)?;
        let num_tasks = if raw_tasks.fract().is_zero() {
            raw_tasks.to_u32()
        } else {
            None
        }
        .ok_or_else(|| PlannerError::config(format!("{PARAM_NUM_TASKS} 必須為非負整數，實際為 {raw_tasks}")))?;

        Ok(Self {
            num_tasks,
            order_price,
            time_limit: required(params, PARAM_TIME_LIMIT)?,
            cost_limit: required(params, PARAM_COST_LIMIT)?,
        })
    }
}

fn required(params: &HashMap<String, Decimal>, key: &str) -> Result<Decimal> {
    params
        .get(key)
        .copied()
        .ok_or_else(|| PlannerError::config(format!("缺少必要參數 '{key}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_params() -> HashMap<String, Decimal> {
        let mut params = HashMap::new();
        params.insert(PARAM_NUM_TASKS.to_string(), Decimal::from(6));
        params.insert(PARAM_TIME_LIMIT.to_string(), Decimal::from(24));
        params.insert(PARAM_COST_LIMIT.to_string(), Decimal::from(4200));
        params
    }

    #[test]
    fn test_from_param_map_primary_name() {
        let mut params = base_params();
        params.insert(PARAM_ORDER_PRICE.to_string(), Decimal::from(6000));

        let order = OrderParams::from_param_map(&params).unwrap();
        assert_eq!(order.num_tasks, 6);
        assert_eq!(order.order_price, Decimal::from(6000));
        assert_eq!(order.time_limit, Decimal::from(24));
        assert_eq!(order.cost_limit, Decimal::from(4200));
    }

    #[test]
    fn test_from_param_map_legacy_name() {
        let mut params = base_params();
        params.insert(PARAM_ORDER_PRICE_LEGACY.to_string(), Decimal::from(5500));

        let order = OrderParams::from_param_map(&params).unwrap();
        assert_eq!(order.order_price, Decimal::from(5500));
    }

    #[test]
    fn test_missing_price_is_configuration_error() {
        let err = OrderParams::from_param_map(&base_params()).unwrap_err();
        assert!(matches!(err, PlannerError::Configuration(_)));
    }

    #[test]
    fn test_conflicting_price_names() {
        let mut params = base_params();
        params.insert(PARAM_ORDER_PRICE.to_string(), Decimal::from(6000));
        params.insert(PARAM_ORDER_PRICE_LEGACY.to_string(), Decimal::from(100));
        assert!(matches!(
            OrderParams::from_param_map(&params),
            Err(PlannerError::Configuration(_))
        ));

        // 兩者相同則接受
        params.insert(PARAM_ORDER_PRICE_LEGACY.to_string(), Decimal::from(6000));
        assert!(OrderParams::from_param_map(&params).is_ok());
    }

    #[test]
    fn test_fractional_task_count_rejected() {
        let mut params = base_params();
        params.insert(PARAM_ORDER_PRICE.to_string(), Decimal::from(6000));
        params.insert(PARAM_NUM_TASKS.to_string(), Decimal::new(65, 1));
        assert!(OrderParams::from_param_map(&params).is_err());
    }

    #[test]
    fn test_missing_limit() {
        let mut params = base_params();
        params.insert(PARAM_ORDER_PRICE.to_string(), Decimal::from(6000));
        params.remove(PARAM_COST_LIMIT);
        let err = OrderParams::from_param_map(&params).unwrap_err();
        assert!(err.to_string().contains(PARAM_COST_LIMIT));
    }
}
