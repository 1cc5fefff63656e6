//! 求解單張訂單
//!
//! 用法：`solve_order [ORDER_DIR] [OUT_DIR]`（預設 `./data` 與 `.`）

use anyhow::Context;
use section_planner::{export, logging, solve_order_dir, OptimizationReport, SolverConfig};
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    logging::init();

    let mut args = std::env::args().skip(1);
    let order_dir = PathBuf::from(args.next().unwrap_or_else(|| "./data".to_string()));
    let out_dir = PathBuf::from(args.next().unwrap_or_else(|| ".".to_string()));

    let report = solve_order_dir(&order_dir, &SolverConfig::default())
        .with_context(|| format!("求解訂單 {} 失敗", order_dir.display()))?;

    print_metrics(&report);

    let (summary_path, assignments_path) =
        export::write_report(&report, &out_dir).context("寫出結果失敗")?;
    println!();
    println!("彙總: {}", summary_path.display());
    println!("明細: {}", assignments_path.display());
    Ok(())
}

fn print_metrics(report: &OptimizationReport) {
    let s = &report.summary;
    let efficiency = s
        .efficiency_proxy
        .map_or_else(|| "-".to_string(), |v| format!("{v:.4}"));

    let rows = [
        ("run_id", report.run_id.to_string()),
        ("chosen_section", s.chosen_section.to_string()),
        ("total_revenue", s.total_revenue.to_string()),
        ("variable_cost", s.variable_cost.to_string()),
        ("fixed_setup_cost", s.fixed_setup_cost.to_string()),
        ("total_cost", format!("{} / {}", s.total_cost, s.cost_limit)),
        ("total_profit", s.total_profit.to_string()),
        ("time", format!("{} / {}", s.time, s.time_limit)),
        ("tasks", format!("{} / {}", s.tasks_scheduled, s.tasks_enforced)),
        ("capacity_of_chosen", s.capacity_of_chosen.to_string()),
        ("active_machines", s.active_machines.to_string()),
        ("efficiency_proxy", efficiency),
    ];

    let width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    println!("{:<width$}  value", "metric");
    println!("{}", "-".repeat(width + 16));
    for (key, value) in rows {
        println!("{key:<width$}  {value}");
    }
    for stage in &report.stages {
        println!(
            "{:<width$}  {} ({} = {:.6})",
            format!("stage:{}", stage.name),
            stage.status,
            stage.criterion.as_str(),
            stage.criterion_value
        );
    }
}
