//! 結果輸出：彙總 JSON 與指派明細 CSV

use chrono::{DateTime, Utc};
use planner_calc::{AssignmentRow, SolutionSummary};
use planner_optimizer::{OptimizationReport, StageRecord};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

pub const SUMMARY_FILE: &str = "solution_summary.json";
pub const ASSIGNMENTS_FILE: &str = "solution_assignments.csv";

/// 輸出錯誤
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO 錯誤 ({path}): {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON 序列化失敗: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV 寫入失敗: {0}")]
    Csv(#[from] csv::Error),
}

/// 彙總文件（不含逐筆指派）
#[derive(Serialize)]
struct SummaryDocument<'a> {
    run_id: Uuid,
    solved_at: DateTime<Utc>,
    solver: &'a str,
    gating_constant: f64,
    stages: &'a [StageRecord],
    summary: &'a SolutionSummary,
}

/// 寫出彙總 JSON（縮排格式）
pub fn write_summary_json<W: Write>(
    report: &OptimizationReport,
    writer: W,
) -> Result<(), ExportError> {
    let document = SummaryDocument {
        run_id: report.run_id,
        solved_at: report.solved_at,
        solver: &report.solver,
        gating_constant: report.gating_constant,
        stages: &report.stages,
        summary: &report.summary,
    };
    serde_json::to_writer_pretty(writer, &document)?;
    Ok(())
}

/// 寫出指派明細 CSV
pub fn write_assignments_csv<W: Write>(
    rows: &[AssignmentRow],
    writer: W,
) -> Result<(), ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    if rows.is_empty() {
        csv_writer.write_record(["section_id", "machine_id", "task_id", "variable_cost", "time"])?;
    }
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// 把兩個檔案寫到輸出目錄，回傳 (彙總路徑, 明細路徑)
pub fn write_report(
    report: &OptimizationReport,
    out_dir: &Path,
) -> Result<(PathBuf, PathBuf), ExportError> {
    std::fs::create_dir_all(out_dir).map_err(|source| ExportError::Io {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let summary_path = out_dir.join(SUMMARY_FILE);
    write_summary_json(report, create(&summary_path)?)?;

    let assignments_path = out_dir.join(ASSIGNMENTS_FILE);
    write_assignments_csv(&report.assignments, create(&assignments_path)?)?;

    tracing::info!(
        "結果已寫出：{}、{}",
        summary_path.display(),
        assignments_path.display()
    );
    Ok((summary_path, assignments_path))
}

fn create(path: &Path) -> Result<File, ExportError> {
    File::create(path).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}
