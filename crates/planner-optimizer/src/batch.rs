//! 多訂單平行求解
//!
//! 訂單之間互不依賴，各自建模、各自求解；單張訂單失敗不影響其他訂單。

use planner_core::{PlannerError, ProductionModel};
use rayon::prelude::*;

use crate::lexicographic::LexicographicOptimizer;
use crate::solver::MilpSolver;
use crate::OptimizationReport;

/// 一張待求解的訂單
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub order_id: String,
    pub model: ProductionModel,
}

impl OrderRequest {
    pub fn new(order_id: impl Into<String>, model: ProductionModel) -> Self {
        Self {
            order_id: order_id.into(),
            model,
        }
    }
}

/// 單張訂單的求解結果
#[derive(Debug)]
pub struct OrderOutcome {
    pub order_id: String,
    pub result: Result<OptimizationReport, PlannerError>,
}

impl OrderOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// 批次求解器
pub struct BatchOptimizer<S: MilpSolver> {
    optimizer: LexicographicOptimizer<S>,
}

impl<S: MilpSolver> BatchOptimizer<S> {
    pub fn new(optimizer: LexicographicOptimizer<S>) -> Self {
        Self { optimizer }
    }

    /// 平行求解所有訂單，結果順序與輸入一致
    pub fn solve_all(&self, orders: &[OrderRequest]) -> Vec<OrderOutcome> {
        tracing::info!("批次求解 {} 張訂單", orders.len());

        let outcomes: Vec<OrderOutcome> = orders
            .par_iter()
            .map(|order| {
                let span = tracing::info_span!("order", order_id = %order.order_id);
                let _guard = span.enter();
                OrderOutcome {
                    order_id: order.order_id.clone(),
                    result: self.optimizer.optimize(&order.model),
                }
            })
            .collect();

        let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
        if failed > 0 {
            tracing::warn!("批次完成：{} 張失敗，共 {} 張", failed, outcomes.len());
        } else {
            tracing::info!("批次完成：{} 張全部成功", outcomes.len());
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GoodLpSolver;
    use planner_core::{CostTable, Machine, OrderParams, Section, SolverConfig};
    use rust_decimal::Decimal;

    fn order(cost_limit: i64) -> ProductionModel {
        let params = OrderParams::new(
            2,
            Decimal::from(400),
            Decimal::from(10),
            Decimal::from(cost_limit),
        );
        ProductionModel::new(
            params,
            vec![Section::new(1, Decimal::from(60), 4)],
            vec![
                Machine::new(1, 1).with_time_per_task(Decimal::from(2)),
                Machine::new(1, 2).with_time_per_task(Decimal::from(3)),
            ],
            CostTable::new()
                .with_entry(1, 1, 1, Decimal::from(10))
                .with_entry(1, 1, 2, Decimal::from(10))
                .with_entry(1, 2, 1, Decimal::from(8))
                .with_entry(1, 2, 2, Decimal::from(8)),
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_batch_keeps_order_and_isolates_failures() {
        let orders = vec![
            OrderRequest::new("A", order(500)),
            OrderRequest::new("B", order(10)),
            OrderRequest::new("C", order(500)),
        ];
        let batch = BatchOptimizer::new(LexicographicOptimizer::new(
            GoodLpSolver,
            SolverConfig::default(),
        ));

        let outcomes = batch.solve_all(&orders);
        let ids: Vec<&str> = outcomes.iter().map(|o| o.order_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);

        assert!(outcomes[0].is_ok());
        assert!(matches!(
            outcomes[1].result,
            Err(PlannerError::Stage1Infeasible { .. })
        ));

        // 機台 2 較便宜：兩個任務都交給它
        let report = outcomes[2].result.as_ref().unwrap();
        assert_eq!(report.summary.variable_cost, Decimal::from(16));
        assert_eq!(report.summary.total_profit, Decimal::from(324));
        assert!(report.assignments.iter().all(|r| r.machine_id == 2));
    }
}
