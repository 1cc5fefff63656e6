//! 工段與機台模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{MachineId, SectionId};

/// 工段（一組機台，每張訂單只選一個）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// 工段ID
    pub section_id: SectionId,

    /// 固定開線成本（選中才發生）
    pub fixed_setup_cost: Decimal,

    /// 可承接的任務指派數上限
    pub capacity: u32,

    /// 產出評分（僅用於效率指標，不參與約束）
    pub output_score: Option<Decimal>,
}

impl Section {
    /// 創建新的工段
    pub fn new(section_id: SectionId, fixed_setup_cost: Decimal, capacity: u32) -> Self {
        Self {
            section_id,
            fixed_setup_cost,
            capacity,
            output_score: None,
        }
    }

    /// 建構器模式：設置產出評分
    pub fn with_output_score(mut self, score: Decimal) -> Self {
        self.output_score = Some(score);
        self
    }
}

/// 機台
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    /// 所屬工段
    pub section_id: SectionId,

    /// 機台ID
    pub machine_id: MachineId,

    /// 是否可用（不可用機台永遠不接任務）
    pub available: bool,

    /// 單一任務的固定工時（無任務別工時表時使用）
    pub time_per_task: Option<Decimal>,
}

impl Machine {
    /// 創建新的可用機台
    pub fn new(section_id: SectionId, machine_id: MachineId) -> Self {
        Self {
            section_id,
            machine_id,
            available: true,
            time_per_task: None,
        }
    }

    /// 建構器模式：設置固定工時
    pub fn with_time_per_task(mut self, time: Decimal) -> Self {
        self.time_per_task = Some(time);
        self
    }

    /// 建構器模式：設置可用狀態
    pub fn with_available(mut self, available: bool) -> Self {
        self.available = available;
        self
    }

    /// (工段, 機台) 複合鍵
    pub fn key(&self) -> (SectionId, MachineId) {
        (self.section_id, self.machine_id)
    }
}
