//! Hand the ranked build list out to idle builders.

use serde::Serialize;
use skirmish_core::tuning::SpecialDefs;
use skirmish_core::{Position, UnitGroup, UnitId, World};
use skirmish_scheduler::tasks::BuildUnitTask;
use skirmish_scheduler::{Observer, TaskHandler, TaskId, TaskPriority};
use tracing::{debug, info};

use crate::extraction::{ExtractionPointMap, SpotOwner};
use crate::generator::RankedEntry;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub builder: UnitId,
    pub def: String,
    pub task: TaskId,
    pub position: Option<Position>,
}

/// Give every free builder the highest ranked type it can build.
///
/// Builders are visited in ascending id order. Extractors go to the free spot
/// closest to the builder, and no spot is handed out twice in one call; a
/// builder with no spot left moves on to the next entry it can build.
pub fn assign_builders(
    handler: &mut TaskHandler,
    world: &mut dyn World,
    ranked: &[RankedEntry],
    extraction: &ExtractionPointMap,
    special: &SpecialDefs,
    observer: Option<Observer>,
) -> Vec<Assignment> {
    let mut claimed: Vec<Position> = Vec::new();
    let mut assignments = Vec::new();
    if ranked.is_empty() {
        return assignments;
    }

    for builder in handler.units().free_units_by_group(UnitGroup::Builder) {
        let Some(builder_def) = handler.units().get(builder).map(|u| u.def().to_string()) else {
            continue;
        };
        let from = world.unit_position(builder);

        let choice = ranked
            .iter()
            .filter(|entry| world.can_build(&builder_def, &entry.def))
            .find_map(|entry| {
                if entry.def != special.metal_extractor {
                    return Some((entry, None));
                }
                let from = from?;
                free_spot(extraction, from, &claimed).map(|spot| (entry, Some(spot)))
            });
        let Some((entry, position)) = choice else {
            debug!(%builder, %builder_def, "nothing ranked this builder can build");
            continue;
        };

        let task = match position {
            Some(spot) => BuildUnitTask::at(builder, entry.def.as_str(), spot),
            None => BuildUnitTask::new(builder, entry.def.as_str()),
        };
        let id = handler.insert(Box::new(task));
        if !handler.run_on_unit(world, id, observer, builder, TaskPriority::Medium) {
            handler.discard(id);
            debug!(%builder, def = %entry.def, "builder refused the build task");
            continue;
        }
        if let Some(spot) = position {
            claimed.push(spot);
        }
        info!(%builder, def = %entry.def, score = entry.score, task = %id, "builder assigned");
        assignments.push(Assignment {
            builder,
            def: entry.def.clone(),
            task: id,
            position,
        });
    }
    assignments
}

fn free_spot(extraction: &ExtractionPointMap, from: Position, claimed: &[Position]) -> Option<Position> {
    extraction
        .positions_by_owner(Some(SpotOwner::Free))
        .into_iter()
        .filter(|spot| !claimed.contains(spot))
        .min_by(|a, b| a.distance_2d(&from).total_cmp(&b.distance_2d(&from)))
}
