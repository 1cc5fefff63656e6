//! 單次優化的領域模型快照
//!
//! 由外部輸入（製造商配置 + 一張客戶訂單）建立一次，
//! 之後只讀，不被任何元件修改。

use rust_decimal::Decimal;
use std::collections::HashSet;

use crate::{
    CostTable, Machine, MachineId, OrderParams, PlannerError, Result, Section, SectionId, TaskId,
    TimeTable,
};

/// 成本表名稱（用於資料完整性錯誤）
pub const COST_TABLE: &str = "variable_cost";

/// 工時表名稱（用於資料完整性錯誤）
pub const TIME_TABLE: &str = "time_per_task";

/// 缺漏的查表項目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingEntry {
    pub table: &'static str,
    pub section_id: SectionId,
    pub machine_id: MachineId,
    pub task_id: TaskId,
}

impl From<MissingEntry> for PlannerError {
    fn from(entry: MissingEntry) -> Self {
        PlannerError::DataIntegrity {
            table: entry.table,
            section_id: entry.section_id,
            machine_id: entry.machine_id,
            task_id: entry.task_id,
        }
    }
}

/// 領域模型
#[derive(Debug, Clone)]
pub struct ProductionModel {
    params: OrderParams,
    sections: Vec<Section>,
    machines: Vec<Machine>,
    costs: CostTable,
    times: Option<TimeTable>,
}

impl ProductionModel {
    /// 創建並驗證領域模型
    ///
    /// `times` 為 `None` 或空表時使用機台固定工時。
    pub fn new(
        params: OrderParams,
        sections: Vec<Section>,
        machines: Vec<Machine>,
        costs: CostTable,
        times: Option<TimeTable>,
    ) -> Result<Self> {
        if params.num_tasks == 0 {
            return Err(PlannerError::config("訂單至少需要一個任務"));
        }

        let mut section_ids = HashSet::new();
        for section in &sections {
            if !section_ids.insert(section.section_id) {
                return Err(PlannerError::config(format!(
                    "重複的工段ID: {}",
                    section.section_id
                )));
            }
        }

        let mut machine_keys = HashSet::new();
        for machine in &machines {
            if !section_ids.contains(&machine.section_id) {
                return Err(PlannerError::config(format!(
                    "機台 {} 指向不存在的工段 {}",
                    machine.machine_id, machine.section_id
                )));
            }
            if !machine_keys.insert(machine.key()) {
                return Err(PlannerError::config(format!(
                    "重複的機台: 工段 {} 機台 {}",
                    machine.section_id, machine.machine_id
                )));
            }
        }

        Ok(Self {
            params,
            sections,
            machines,
            costs,
            times: times.filter(|t| !t.is_empty()),
        })
    }

    pub fn params(&self) -> &OrderParams {
        &self.params
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn machines(&self) -> &[Machine] {
        &self.machines
    }

    pub fn costs(&self) -> &CostTable {
        &self.costs
    }

    /// 任務別工時表（若有）
    pub fn times(&self) -> Option<&TimeTable> {
        self.times.as_ref()
    }

    pub fn section(&self, section_id: SectionId) -> Option<&Section> {
        self.sections.iter().find(|s| s.section_id == section_id)
    }

    pub fn machine(&self, section_id: SectionId, machine_id: MachineId) -> Option<&Machine> {
        self.machines
            .iter()
            .find(|m| m.section_id == section_id && m.machine_id == machine_id)
    }

    /// 某工段內的機台（依輸入順序）
    pub fn machines_in(&self, section_id: SectionId) -> impl Iterator<Item = &Machine> + '_ {
        self.machines
            .iter()
            .filter(move |m| m.section_id == section_id)
    }

    /// 任務序列 1..=p
    pub fn task_ids(&self) -> impl Iterator<Item = TaskId> {
        1..=self.params.num_tasks
    }

    /// 機台是否可能接任務（可用才算可達）
    pub fn is_reachable(&self, section_id: SectionId, machine_id: MachineId) -> bool {
        self.machine(section_id, machine_id)
            .map(|m| m.available)
            .unwrap_or(false)
    }

    /// 查詢變動成本；缺漏即為資料完整性錯誤
    pub fn variable_cost(
        &self,
        section_id: SectionId,
        machine_id: MachineId,
        task_id: TaskId,
    ) -> Result<Decimal> {
        self.costs
            .get(section_id, machine_id, task_id)
            .ok_or_else(|| {
                MissingEntry {
                    table: COST_TABLE,
                    section_id,
                    machine_id,
                    task_id,
                }
                .into()
            })
    }

    /// 查詢處理工時
    ///
    /// 有任務別工時表時以該表為準（缺項為資料完整性錯誤，不回退），
    /// 否則使用機台固定工時。
    pub fn processing_time(
        &self,
        section_id: SectionId,
        machine_id: MachineId,
        task_id: TaskId,
    ) -> Result<Decimal> {
        let value = match &self.times {
            Some(times) => times.get(section_id, machine_id, task_id),
            None => self
                .machine(section_id, machine_id)
                .and_then(|m| m.time_per_task),
        };

        value.ok_or_else(|| {
            MissingEntry {
                table: TIME_TABLE,
                section_id,
                machine_id,
                task_id,
            }
            .into()
        })
    }

    /// 列出所有可達三元組缺漏的成本/工時項目
    pub fn missing_entries(&self) -> Vec<MissingEntry> {
        let mut missing = Vec::new();

        for machine in self.machines.iter().filter(|m| m.available) {
            for task_id in self.task_ids() {
                let (section_id, machine_id) = machine.key();
                if self.variable_cost(section_id, machine_id, task_id).is_err() {
                    missing.push(MissingEntry {
                        table: COST_TABLE,
                        section_id,
                        machine_id,
                        task_id,
                    });
                }
                if self.processing_time(section_id, machine_id, task_id).is_err() {
                    missing.push(MissingEntry {
                        table: TIME_TABLE,
                        section_id,
                        machine_id,
                        task_id,
                    });
                }
            }
        }

        missing
    }

    /// (工段, 機台, 任務) 決策三元組總數
    pub fn triple_count(&self) -> usize {
        self.machines.len() * self.params.num_tasks as usize
    }
}
