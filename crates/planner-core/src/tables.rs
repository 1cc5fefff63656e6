//! 成本表與任務別工時表

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::{MachineId, SectionId, TaskId};

/// (工段, 機台, 任務) 三元鍵
pub type TripleKey = (SectionId, MachineId, TaskId);

/// 以 (工段, 機台, 任務) 為鍵的數值表
///
/// 有序存放，確保遍歷順序穩定。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripleTable {
    entries: BTreeMap<TripleKey, Decimal>,
}

/// 變動成本表 `variable_cost(section, machine, task)`
pub type CostTable = TripleTable;

/// 任務別工時表 `time(section, machine, task)`
pub type TimeTable = TripleTable;

impl TripleTable {
    /// 創建空表
    pub fn new() -> Self {
        Self::default()
    }

    /// 寫入一筆；重複鍵以最後一筆為準，回傳被覆蓋的舊值
    pub fn insert(
        &mut self,
        section_id: SectionId,
        machine_id: MachineId,
        task_id: TaskId,
        value: Decimal,
    ) -> Option<Decimal> {
        self.entries.insert((section_id, machine_id, task_id), value)
    }

    /// 建構器模式：寫入一筆
    pub fn with_entry(
        mut self,
        section_id: SectionId,
        machine_id: MachineId,
        task_id: TaskId,
        value: Decimal,
    ) -> Self {
        self.insert(section_id, machine_id, task_id, value);
        self
    }

    pub fn get(&self, section_id: SectionId, machine_id: MachineId, task_id: TaskId) -> Option<Decimal> {
        self.entries.get(&(section_id, machine_id, task_id)).copied()
    }

    pub fn contains(&self, section_id: SectionId, machine_id: MachineId, task_id: TaskId) -> bool {
        self.entries.contains_key(&(section_id, machine_id, task_id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 依鍵順序遍歷
    pub fn iter(&self) -> impl Iterator<Item = (TripleKey, Decimal)> + '_ {
        self.entries.iter().map(|(k, v)| (*k, *v))
    }
}

impl FromIterator<(TripleKey, Decimal)> for TripleTable {
    fn from_iter<I: IntoIterator<Item = (TripleKey, Decimal)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_lookup() {
        let mut table = CostTable::new();
        assert!(table.is_empty());

        assert_eq!(table.insert(1, 2, 3, Decimal::new(4123, 2)), None);
        assert_eq!(table.get(1, 2, 3), Some(Decimal::new(4123, 2)));
        assert_eq!(table.get(1, 2, 4), None);
        assert!(table.contains(1, 2, 3));

        // 重複鍵覆蓋
        let old = table.insert(1, 2, 3, Decimal::from(50));
        assert_eq!(old, Some(Decimal::new(4123, 2)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_iteration_is_ordered() {
        let table: TimeTable = vec![
            ((2, 1, 1), Decimal::ONE),
            ((1, 2, 1), Decimal::TWO),
            ((1, 1, 2), Decimal::TEN),
        ]
        .into_iter()
        .collect();

        let keys: Vec<TripleKey> = table.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![(1, 1, 2), (1, 2, 1), (2, 1, 1)]);
    }
}
