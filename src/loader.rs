//! 訂單目錄載入
//!
//! 一張訂單是一個目錄，內含：
//! - `sections.csv`: section_id, fixed_setup_cost, capacity[, output_score_optional]
//! - `machines.csv`: section_id, machine_id, available, time_per_task
//! - `costs.csv`: section_id, machine_id, task_id, variable_cost
//! - `params.csv`: param, value
//! - `times.csv`（可選）: section_id, machine_id, task_id, time_per_task
//!
//! 缺檔、缺欄、值無法解析都回報為配置錯誤，並指出檔名。

use csv::{ReaderBuilder, StringRecord, Trim};
use planner_core::{
    Machine, OrderParams, PlannerError, ProductionModel, Result, Section, TripleTable,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

pub const SECTIONS_FILE: &str = "sections.csv";
pub const MACHINES_FILE: &str = "machines.csv";
pub const COSTS_FILE: &str = "costs.csv";
pub const PARAMS_FILE: &str = "params.csv";
pub const TIMES_FILE: &str = "times.csv";

/// 載入整個訂單目錄
pub fn load_order_dir(dir: impl AsRef<Path>) -> Result<ProductionModel> {
    let dir = dir.as_ref();
    tracing::debug!("載入訂單目錄 {}", dir.display());

    let params = load_params(&CsvTable::open(dir, PARAMS_FILE)?)?;
    let sections = load_sections(&CsvTable::open(dir, SECTIONS_FILE)?)?;
    let machines = load_machines(&CsvTable::open(dir, MACHINES_FILE)?)?;
    let costs = load_triples(&CsvTable::open(dir, COSTS_FILE)?, "variable_cost")?;

    let times = if dir.join(TIMES_FILE).exists() {
        let table = load_triples(&CsvTable::open(dir, TIMES_FILE)?, "time_per_task")?;
        // 只有表頭視同未提供
        (!table.is_empty()).then_some(table)
    } else {
        None
    };

    tracing::info!(
        "訂單載入完成：工段 {} 個，機台 {} 台，成本 {} 筆，逐任務工時 {}",
        sections.len(),
        machines.len(),
        costs.len(),
        times.as_ref().map_or(0, |t| t.len())
    );

    ProductionModel::new(params, sections, machines, costs, times)
}

fn load_params(table: &CsvTable) -> Result<OrderParams> {
    let param = table.column("param")?;
    let value = table.column("value")?;

    let mut map = HashMap::new();
    for (line, record) in table.rows() {
        let name = table.text(record, param, line)?.to_string();
        let parsed = table.decimal(record, value, line)?;
        if map.contains_key(&name) {
            return Err(table.error(line, format!("重複的參數 {name}")));
        }
        map.insert(name, parsed);
    }
    OrderParams::from_param_map(&map)
}

fn load_sections(table: &CsvTable) -> Result<Vec<Section>> {
    let id = table.column("section_id")?;
    let fixed = table.column("fixed_setup_cost")?;
    let capacity = table.column("capacity")?;
    let score = table.optional_column("output_score_optional");

    table
        .rows()
        .map(|(line, record)| {
            let mut section = Section::new(
                table.integer(record, id, line)?,
                table.decimal(record, fixed, line)?,
                table.integer(record, capacity, line)?,
            );
            if let Some(col) = score {
                if let Some(value) = table.optional_decimal(record, col, line)? {
                    section = section.with_output_score(value);
                }
            }
            Ok(section)
        })
        .collect()
}

fn load_machines(table: &CsvTable) -> Result<Vec<Machine>> {
    let section = table.column("section_id")?;
    let machine = table.column("machine_id")?;
    let available = table.column("available")?;
    let time = table.optional_column("time_per_task");

    table
        .rows()
        .map(|(line, record)| {
            let mut m = Machine::new(
                table.integer(record, section, line)?,
                table.integer(record, machine, line)?,
            )
            .with_available(table.flag(record, available, line)?);
            if let Some(col) = time {
                if let Some(value) = table.optional_decimal(record, col, line)? {
                    m = m.with_time_per_task(value);
                }
            }
            Ok(m)
        })
        .collect()
}

fn load_triples(table: &CsvTable, value_column: &str) -> Result<TripleTable> {
    let section = table.column("section_id")?;
    let machine = table.column("machine_id")?;
    let task = table.column("task_id")?;
    let value = table.column(value_column)?;

    let mut out = TripleTable::new();
    for (line, record) in table.rows() {
        let key = (
            table.integer(record, section, line)?,
            table.integer(record, machine, line)?,
            table.integer(record, task, line)?,
        );
        if out
            .insert(key.0, key.1, key.2, table.decimal(record, value, line)?)
            .is_some()
        {
            return Err(table.error(line, format!("重複的鍵 {key:?}")));
        }
    }
    Ok(out)
}

/// 已讀入記憶體的 CSV 檔
struct CsvTable {
    file: &'static str,
    headers: HashMap<String, usize>,
    records: Vec<StringRecord>,
}

impl CsvTable {
    fn open(dir: &Path, file: &'static str) -> Result<Self> {
        let path = dir.join(file);
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_path(&path)
            .map_err(|e| PlannerError::config(format!("無法讀取 {}: {e}", path.display())))?;

        let headers = reader
            .headers()
            .map_err(|e| PlannerError::config(format!("{file}: 表頭無法解析: {e}")))?
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.to_string(), idx))
            .collect();

        let records = reader
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| PlannerError::config(format!("{file}: {e}")))?;

        Ok(Self {
            file,
            headers,
            records,
        })
    }

    /// 資料列與其在檔案中的行號（表頭為第 1 行）
    fn rows(&self) -> impl Iterator<Item = (usize, &StringRecord)> + '_ {
        self.records.iter().enumerate().map(|(idx, r)| (idx + 2, r))
    }

    fn column(&self, name: &str) -> Result<usize> {
        self.optional_column(name)
            .ok_or_else(|| PlannerError::config(format!("{}: 缺少欄位 {name}", self.file)))
    }

    fn optional_column(&self, name: &str) -> Option<usize> {
        self.headers.get(name).copied()
    }

    fn error(&self, line: usize, message: String) -> PlannerError {
        PlannerError::config(format!("{} 第 {line} 行: {message}", self.file))
    }

    fn text<'r>(&self, record: &'r StringRecord, col: usize, line: usize) -> Result<&'r str> {
        match record.get(col) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(self.error(line, format!("第 {} 欄為空", col + 1))),
        }
    }

    fn decimal(&self, record: &StringRecord, col: usize, line: usize) -> Result<Decimal> {
        let raw = self.text(record, col, line)?;
        parse_decimal(raw).ok_or_else(|| self.error(line, format!("無法解析數值 {raw:?}")))
    }

    fn optional_decimal(
        &self,
        record: &StringRecord,
        col: usize,
        line: usize,
    ) -> Result<Option<Decimal>> {
        match record.get(col) {
            None | Some("") => Ok(None),
            Some(_) => self.decimal(record, col, line).map(Some),
        }
    }

    /// 整數欄位；容許 "3.0" 這類帶零小數的寫法
    fn integer(&self, record: &StringRecord, col: usize, line: usize) -> Result<u32> {
        let value = self.decimal(record, col, line)?;
        if !value.fract().is_zero() {
            return Err(self.error(line, format!("{value} 不是整數")));
        }
        value
            .to_u32()
            .ok_or_else(|| self.error(line, format!("{value} 超出範圍")))
    }

    fn flag(&self, record: &StringRecord, col: usize, line: usize) -> Result<bool> {
        let raw = self.text(record, col, line)?;
        match raw.to_ascii_lowercase().as_str() {
            "1" | "1.0" | "true" => Ok(true),
            "0" | "0.0" | "false" => Ok(false),
            _ => Err(self.error(line, format!("available 必須為 0 或 1，收到 {raw:?}"))),
        }
    }
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}
