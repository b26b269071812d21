use skirmish_core::tuning::ThreatTuning;
use skirmish_core::{EnemySighting, Position, UnitId};

use super::*;
use crate::extraction::SpotOwner;

struct Fixture {
    catalog: UnitCatalog,
    units: TaskUnitHandler,
    threat: SightedEnemies,
    extraction: ExtractionPointMap,
    economy: EconomyState,
    next_id: u32,
}

impl Fixture {
    fn new() -> Self {
        Self {
            catalog: UnitCatalog::bundled().unwrap(),
            units: TaskUnitHandler::new(),
            threat: SightedEnemies::new(&ThreatTuning::default()),
            extraction: ExtractionPointMap::new(
                (0..10).map(|i| Position::flat(i as f64 * 500.0, 0.0)).collect(),
            ),
            economy: EconomyState {
                minutes_since_initial_build: 2.0,
                game_minutes: 3.0,
                metal_current: 1000.0,
                metal_income: 0.0,
                energy_income: 0.0,
            },
            next_id: 1,
        }
    }

    fn own(&mut self, def: &str) -> UnitId {
        let id = UnitId(self.next_id);
        self.next_id += 1;
        let def = self.catalog.require(def).unwrap().clone();
        self.units.unit_created(id, &def, None);
        self.units.unit_finished(id);
        id
    }

    fn sight(&mut self, def: &str, count: u32) {
        for _ in 0..count {
            let d = self.catalog.require(def).unwrap();
            let sighting = EnemySighting {
                id: UnitId(1000 + self.next_id),
                def: def.to_string(),
                position: Position::flat(8000.0, 0.0),
                max_health: d.max_health,
                dps: d.dps,
                flying: d.flying,
            };
            self.next_id += 1;
            self.threat.enemy_sighted(&self.catalog, &sighting, 0.0);
        }
    }

    fn inputs(&self) -> PriorityInputs<'_> {
        PriorityInputs {
            catalog: &self.catalog,
            units: &self.units,
            threat: &self.threat,
            extraction: &self.extraction,
            economy: self.economy,
        }
    }

    fn score(&self, generator: &PriorityGenerator, def: &str) -> f64 {
        generator.score(self.catalog.get(def).unwrap(), &self.inputs())
    }
}

fn generator() -> PriorityGenerator {
    PriorityGenerator::new(&Tuning::default())
}

fn entry(def: &str, score: f64) -> RankedEntry {
    RankedEntry {
        def: def.to_string(),
        score,
        forced: false,
    }
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn heavy_enemies_favour_piercing_damage() {
    let mut fx = Fixture::new();
    fx.sight("heavy_tank", 2);
    let mut gen = generator();
    gen.refresh_threat_matrices(&fx.threat);

    assert_eq!(gen.damage_axis(DamageType::Piercing), 20.0);
    assert_eq!(gen.damage_axis(DamageType::Light), 15.0);
    assert_eq!(gen.damage_axis(DamageType::Explosive), 15.0);
    let medium = gen.damage_axis(DamageType::Medium);
    assert!(close(medium, 10.0 - 10.0 * (6400.0 / 0.75) / 12800.0 + 15.0));
    assert!(gen.damage_axis(DamageType::Piercing) > medium);

    // Enemy piercing DPS hurts eco armor most.
    assert_eq!(gen.armor_axis(ArmorType::Eco), 10.0);
    assert!(gen.armor_axis(ArmorType::Heavy) > gen.armor_axis(ArmorType::Building));
    assert!(close(
        gen.attack_force_priority(ArmorType::Heavy, DamageType::Piercing),
        20.0 * gen.armor_axis(ArmorType::Heavy)
    ));
}

#[test]
fn no_threat_puts_every_damage_type_at_max() {
    let fx = Fixture::new();
    let mut gen = generator();
    gen.refresh_threat_matrices(&fx.threat);
    for damage in DamageType::ALL {
        assert_eq!(gen.damage_axis(damage), 25.0);
        assert_eq!(gen.armored_building_priority(damage), 0.0);
    }
}

#[test]
fn early_game_ranks_only_economy() {
    let mut fx = Fixture::new();
    fx.economy.minutes_since_initial_build = 0.0;
    fx.economy.game_minutes = 1.0;
    let mut gen = generator();
    let ranked: Vec<_> = gen.generate(&fx.inputs()).to_vec();

    let defs: Vec<_> = ranked.iter().map(|e| e.def.as_str()).collect();
    assert_eq!(
        defs,
        vec!["metal_extractor", "fusion_reactor", "storage", "metal_maker"]
    );
    assert_eq!(ranked[0].score, 250.0);
    // Equal scores keep catalog order.
    assert_eq!(ranked[1].score, ranked[2].score);
    assert_eq!(ranked[3].score, 110.0);
    assert_eq!(gen.evaluations(), 1);
}

#[test]
fn missing_scout_is_forced_to_the_top() {
    let mut fx = Fixture::new();
    let mut gen = generator();
    assert_eq!(gen.generate(&fx.inputs())[0].def, "scout_plane");
    assert_eq!(gen.ranked()[0].score, 10_000.0);

    fx.own("scout_plane");
    let ranked = gen.generate(&fx.inputs());
    assert!(ranked.iter().all(|e| e.def != "scout_plane"));
}

#[test]
fn no_entry_falls_below_the_floor() {
    let mut fx = Fixture::new();
    fx.own("scout_plane");
    for _ in 0..60 {
        fx.own("light_tank");
    }
    let mut gen = generator();
    let ranked = gen.generate(&fx.inputs());
    assert!(!ranked.is_empty());
    assert!(ranked.iter().all(|e| e.score >= 50.0));
    assert!(ranked.iter().all(|e| e.def != "light_tank"));
    assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
fn economy_and_defense_scores_are_clamped() {
    let mut fx = Fixture::new();
    fx.economy.minutes_since_initial_build = 100.0;
    fx.sight("heavy_tank", 20);
    let mut gen = generator();
    gen.refresh_threat_matrices(&fx.threat);

    assert_eq!(fx.score(&gen, "metal_extractor"), 800.0);
    assert_eq!(fx.score(&gen, "heavy_turret"), 400.0);
}

#[test]
fn extractor_bonus_drops_once_enough_spots_are_owned() {
    let mut fx = Fixture::new();
    let gen = generator();
    let few_owned = fx.score(&gen, "metal_extractor");
    assert_eq!(few_owned, 150.0 + 100.0 + 40.0 * 3.0);

    for i in 0..5 {
        fx.extraction
            .set_owner_near(Position::flat(i as f64 * 500.0, 0.0), SpotOwner::SelfOwned);
    }
    // Half owned, half free: multiplier scaled by the free part.
    let half_owned = fx.score(&gen, "metal_extractor");
    assert_eq!(half_owned, 150.0 + 10.0 * 2.5 * 3.0);
}

#[test]
fn makers_replace_extractors_when_spots_run_out() {
    let mut fx = Fixture::new();
    fx.extraction = ExtractionPointMap::default();
    let gen = generator();

    assert_eq!(fx.score(&gen, "metal_extractor"), 150.0);
    assert_eq!(fx.score(&gen, "metal_maker"), 150.0 + 3.0 - 40.0);
}

#[test]
fn extractors_under_construction_count_as_income() {
    let mut fx = Fixture::new();
    let gen = generator();
    let before = fx.score(&gen, "metal_extractor");

    let def = fx.catalog.require("metal_extractor").unwrap().clone();
    fx.units.unit_created(UnitId(500), &def, None);
    let after = fx.score(&gen, "metal_extractor");
    assert_eq!(before - after, 40.0);
}

#[test]
fn anti_air_demand_follows_flying_health() {
    let mut fx = Fixture::new();
    fx.sight("bomber", 2);
    let mut gen = generator();
    gen.refresh_threat_matrices(&fx.threat);

    // 2200 flying hp / 50 = 44 wanted anti-air units.
    let fighter = fx.score(&gen, "fighter");
    let light_tank = fx.score(&gen, "light_tank");
    assert!(close(fighter - light_tank, 440.0));

    let aa = fx.score(&gen, "aa_turret");
    let light = fx.score(&gen, "light_turret");
    assert!(close(aa - light, 44.0));
    assert!(close(light, 100.0 + 2200.0 * 0.5 * 50.0 / 2000.0 + 44.0));
}

#[test]
fn executioner_gets_extra_priority() {
    let mut fx = Fixture::new();
    fx.sight("light_tank", 1);
    let mut gen = generator();
    gen.refresh_threat_matrices(&fx.threat);

    let artillery = fx.score(&gen, "artillery_emplacement");
    let heavy = fx.score(&gen, "heavy_turret");
    assert!(close(artillery - heavy, 10.0));
}

#[test]
fn factories_and_flying_builders_scale_with_game_time() {
    let mut fx = Fixture::new();
    fx.economy.game_minutes = 10.0;
    let gen = generator();

    assert_eq!(fx.score(&gen, "vehicle_plant"), 100.0 + 300.0 * 2.0);
    fx.own("vehicle_plant");
    assert_eq!(fx.score(&gen, "vehicle_plant"), 100.0 + 300.0);

    fx.economy.game_minutes = 6.0;
    assert_eq!(fx.score(&gen, "air_engineer"), 100.0 + 200.0 * 2.0);
    assert_eq!(fx.score(&gen, "engineer"), 100.0);
}

#[test]
fn escalation_forces_producer_when_no_owned_builder_can_help() {
    let mut fx = Fixture::new();
    fx.own("engineer");
    fx.economy.metal_current = 10.0;
    let mut gen = generator();
    let mut ranked = vec![
        entry("heavy_tank", 500.0),
        entry("aircraft_plant", 300.0),
        entry("vehicle_plant", 200.0),
    ];

    let forced = gen.escalate(&fx.inputs(), &mut ranked);
    assert_eq!(forced.as_deref(), Some("vehicle_plant"));
    assert_eq!(ranked[0].def, "vehicle_plant");
    assert_eq!(ranked[0].score, 10_000.0);
    assert!(ranked[0].forced);
    assert_eq!(ranked[1].def, "heavy_tank");
}

#[test]
fn owned_producer_suppresses_escalation_even_when_busy() {
    let mut fx = Fixture::new();
    fx.own("engineer");
    fx.own("vehicle_plant");
    fx.economy.metal_current = 10.0;
    let mut gen = generator();
    let mut ranked = vec![entry("heavy_tank", 500.0), entry("vehicle_plant", 200.0)];

    assert_eq!(gen.escalate(&fx.inputs(), &mut ranked), None);
    assert_eq!(ranked[0].def, "heavy_tank");
}

#[test]
fn escalation_needs_low_metal_and_a_ranked_producer() {
    let mut fx = Fixture::new();
    let mut gen = generator();
    let mut ranked = vec![entry("heavy_tank", 500.0), entry("vehicle_plant", 200.0)];
    assert_eq!(gen.escalate(&fx.inputs(), &mut ranked), None);

    fx.economy.metal_current = 10.0;
    let mut lonely = vec![entry("heavy_tank", 500.0)];
    assert_eq!(gen.escalate(&fx.inputs(), &mut lonely), None);
    assert_eq!(gen.escalate(&fx.inputs(), &mut []), None);
}

#[test]
fn escalation_cools_down_per_producer() {
    let mut fx = Fixture::new();
    fx.economy.metal_current = 10.0;
    fx.economy.minutes_since_initial_build = 1.0;
    let mut gen = generator();
    let fresh = || vec![entry("heavy_tank", 500.0), entry("vehicle_plant", 200.0)];

    assert!(gen.escalate(&fx.inputs(), &mut fresh()).is_some());

    fx.economy.minutes_since_initial_build = 65.0 / 60.0;
    let mut ranked = fresh();
    assert_eq!(gen.escalate(&fx.inputs(), &mut ranked), None);
    assert!(!ranked[1].forced);

    fx.economy.minutes_since_initial_build = 71.0 / 60.0;
    assert!(gen.escalate(&fx.inputs(), &mut fresh()).is_some());
}

#[test]
fn evaluation_interval_gates_generation() {
    let mut gen = generator();
    assert!(!gen.is_due(0.5));
    assert!(gen.is_due(0.6));
    gen.mark_evaluated(0.6);
    assert!(!gen.is_due(1.0));
    assert!(gen.is_due(1.2));
}
