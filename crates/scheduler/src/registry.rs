//! Registry of owned units and their per-type counters.

use std::collections::{BTreeMap, HashMap};

use skirmish_core::{UnitDef, UnitGroup, UnitId};
use tracing::{debug, warn};

use crate::unit::{TaskUnit, UnitProfile};

/// Tracks every owned unit from creation to destruction.
///
/// Units under construction live in the created map; once finished they move
/// to the finished map and join their groups. Destroyed units are retired
/// until [`TaskUnitHandler::discard`] so tasks still bound to them can report
/// back.
#[derive(Debug, Default)]
pub struct TaskUnitHandler {
    created: BTreeMap<UnitId, TaskUnit>,
    finished: BTreeMap<UnitId, TaskUnit>,
    retired: BTreeMap<UnitId, TaskUnit>,
    all_count: HashMap<String, usize>,
    finished_count: HashMap<String, usize>,
    anti_air_count: usize,
    groups: HashMap<UnitGroup, Vec<UnitId>>,
}

impl TaskUnitHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unit_created(&mut self, id: UnitId, def: &UnitDef, builder: Option<UnitId>) {
        if self.contains(id) {
            warn!(unit = %id, "unit registered twice");
            return;
        }
        let profile = UnitProfile::from(def);
        *self.all_count.entry(profile.def.clone()).or_default() += 1;
        if profile.anti_air && profile.mobile {
            self.anti_air_count += 1;
        }
        debug!(unit = %id, def = %profile.def, builder = ?builder, "unit created");
        self.created.insert(id, TaskUnit::new(id, profile));
    }

    /// Returns false if the unit was not waiting for completion.
    pub fn unit_finished(&mut self, id: UnitId) -> bool {
        let Some(unit) = self.created.remove(&id) else {
            return false;
        };
        let def = unit.def().to_string();
        for group in &unit.profile().groups {
            self.groups.entry(*group).or_default().push(id);
        }
        *self.finished_count.entry(def.clone()).or_default() += 1;
        debug!(unit = %id, %def, "unit finished");
        self.finished.insert(id, unit);
        true
    }

    /// Returns false if the unit was unknown or already destroyed.
    pub fn unit_destroyed(&mut self, id: UnitId) -> bool {
        let (mut unit, was_finished) = match self.finished.remove(&id) {
            Some(unit) => (unit, true),
            None => match self.created.remove(&id) {
                Some(unit) => (unit, false),
                None => return false,
            },
        };
        unit.destroy();

        let def = unit.def().to_string();
        decrement(&mut self.all_count, &def);
        if was_finished {
            decrement(&mut self.finished_count, &def);
            for group in &unit.profile().groups {
                if let Some(members) = self.groups.get_mut(group) {
                    members.retain(|m| *m != id);
                }
            }
        }
        if unit.profile().anti_air && unit.profile().mobile {
            self.anti_air_count = self.anti_air_count.saturating_sub(1);
        }
        debug!(unit = %id, %def, was_finished, "unit destroyed");
        self.retired.insert(id, unit);
        true
    }

    /// Forget a retired unit.
    pub fn discard(&mut self, id: UnitId) -> Option<TaskUnit> {
        self.retired.remove(&id)
    }

    pub fn contains(&self, id: UnitId) -> bool {
        self.created.contains_key(&id)
            || self.finished.contains_key(&id)
            || self.retired.contains_key(&id)
    }

    /// Any known unit, including ones under construction and retired ones.
    pub fn get(&self, id: UnitId) -> Option<&TaskUnit> {
        self.finished
            .get(&id)
            .or_else(|| self.created.get(&id))
            .or_else(|| self.retired.get(&id))
    }

    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut TaskUnit> {
        if self.finished.contains_key(&id) {
            return self.finished.get_mut(&id);
        }
        if self.created.contains_key(&id) {
            return self.created.get_mut(&id);
        }
        self.retired.get_mut(&id)
    }

    pub fn is_finished(&self, id: UnitId) -> bool {
        self.finished.contains_key(&id)
    }

    /// Finished units, ordered by id.
    pub fn finished_units(&self) -> impl Iterator<Item = &TaskUnit> {
        self.finished.values()
    }

    /// Finished, free units of `def`, ordered by id.
    pub fn free_units_by_def<'a>(&'a self, def: &'a str) -> impl Iterator<Item = &'a TaskUnit> + 'a {
        self.finished
            .values()
            .filter(move |u| u.def() == def && u.is_free())
    }

    pub fn nr_finished(&self, def: &str) -> usize {
        self.finished_count.get(def).copied().unwrap_or(0)
    }

    /// Units of `def` alive, finished or not.
    pub fn nr_all(&self, def: &str) -> usize {
        self.all_count.get(def).copied().unwrap_or(0)
    }

    /// Mobile anti-air units alive.
    pub fn nr_anti_air(&self) -> usize {
        self.anti_air_count
    }

    pub fn units_by_group(&self, group: UnitGroup) -> &[UnitId] {
        self.groups.get(&group).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Finished, free members of `group`, ordered by id.
    pub fn free_units_by_group(&self, group: UnitGroup) -> Vec<UnitId> {
        let mut free: Vec<UnitId> = self
            .units_by_group(group)
            .iter()
            .copied()
            .filter(|id| self.finished.get(id).is_some_and(TaskUnit::is_free))
            .collect();
        free.sort();
        free
    }

    pub fn len(&self) -> usize {
        self.created.len() + self.finished.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn decrement(counts: &mut HashMap<String, usize>, def: &str) {
    if let Some(count) = counts.get_mut(def) {
        *count = count.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use skirmish_core::UnitCatalog;

    use super::*;
    use crate::types::{TaskId, TaskPriority};

    fn catalog() -> UnitCatalog {
        UnitCatalog::bundled().unwrap()
    }

    #[test]
    fn created_then_finished_updates_counts_and_groups() {
        let catalog = catalog();
        let mut reg = TaskUnitHandler::new();
        reg.unit_created(UnitId(1), catalog.require("engineer").unwrap(), None);

        assert_eq!(reg.nr_all("engineer"), 1);
        assert_eq!(reg.nr_finished("engineer"), 0);
        assert!(reg.units_by_group(UnitGroup::Builder).is_empty());

        assert!(reg.unit_finished(UnitId(1)));
        assert_eq!(reg.nr_finished("engineer"), 1);
        assert_eq!(reg.units_by_group(UnitGroup::Builder), &[UnitId(1)]);
        assert!(!reg.unit_finished(UnitId(1)));
    }

    #[test]
    fn destroying_unfinished_unit_keeps_finished_count() {
        let catalog = catalog();
        let mut reg = TaskUnitHandler::new();
        let def = catalog.require("light_tank").unwrap();
        reg.unit_created(UnitId(1), def, None);
        reg.unit_created(UnitId(2), def, None);
        reg.unit_finished(UnitId(1));

        assert!(reg.unit_destroyed(UnitId(2)));
        assert_eq!(reg.nr_all("light_tank"), 1);
        assert_eq!(reg.nr_finished("light_tank"), 1);

        assert!(reg.unit_destroyed(UnitId(1)));
        assert_eq!(reg.nr_all("light_tank"), 0);
        assert_eq!(reg.nr_finished("light_tank"), 0);
        assert!(reg.units_by_group(UnitGroup::AttackForce).is_empty());
        assert!(!reg.unit_destroyed(UnitId(1)));
    }

    #[test]
    fn anti_air_count_only_tracks_mobile_units() {
        let catalog = catalog();
        let mut reg = TaskUnitHandler::new();
        reg.unit_created(UnitId(1), catalog.require("flak_tank").unwrap(), None);
        reg.unit_created(UnitId(2), catalog.require("aa_turret").unwrap(), None);
        assert_eq!(reg.nr_anti_air(), 1);
        reg.unit_destroyed(UnitId(1));
        reg.unit_destroyed(UnitId(1));
        assert_eq!(reg.nr_anti_air(), 0);
    }

    #[test]
    fn retired_units_stay_reachable_until_discarded() {
        let catalog = catalog();
        let mut reg = TaskUnitHandler::new();
        reg.unit_created(UnitId(1), catalog.require("engineer").unwrap(), None);
        reg.unit_finished(UnitId(1));
        reg.get_mut(UnitId(1))
            .unwrap()
            .set_task(TaskId(1), TaskPriority::Medium)
            .unwrap();

        reg.unit_destroyed(UnitId(1));
        let unit = reg.get(UnitId(1)).unwrap();
        assert!(unit.is_destroyed());
        assert_eq!(unit.task(TaskPriority::Medium), Some(TaskId(1)));
        assert_eq!(reg.len(), 0);

        assert!(reg.discard(UnitId(1)).is_some());
        assert!(reg.get(UnitId(1)).is_none());
    }

    #[test]
    fn free_units_exclude_busy_ones() {
        let catalog = catalog();
        let mut reg = TaskUnitHandler::new();
        let def = catalog.require("engineer").unwrap();
        for id in [3, 1, 2] {
            reg.unit_created(UnitId(id), def, None);
            reg.unit_finished(UnitId(id));
        }
        reg.get_mut(UnitId(2))
            .unwrap()
            .set_task(TaskId(9), TaskPriority::Medium)
            .unwrap();

        assert_eq!(
            reg.free_units_by_group(UnitGroup::Builder),
            vec![UnitId(1), UnitId(3)]
        );
        let free: Vec<_> = reg.free_units_by_def("engineer").map(TaskUnit::id).collect();
        assert_eq!(free, vec![UnitId(1), UnitId(3)]);
    }
}
