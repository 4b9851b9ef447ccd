//! Succession and gender-law resolution over hand-built family trees.

use dynastygen_core::{
    character::{Character, Sex},
    config::DynastyConfig,
    dynasty::{Dynasty, GenderLaw, NameInheritance, SuccessionLaw},
    event::SimEvent,
    registry::Registry,
    succession,
    types::{CharacterId, Year},
};
use std::collections::{BTreeMap, BTreeSet};

const DYNASTY: &str = "dynasty_blackwood";

fn registry(law: SuccessionLaw, gender_law: GenderLaw) -> Registry {
    let mut registry = Registry::new(1);
    registry.insert_dynasty(Dynasty::from_config(&DynastyConfig {
        id: DYNASTY.into(),
        name: "Blackwood".into(),
        motto: String::new(),
        culture: "forest_folk".into(),
        faith: "old_gods".into(),
        succession: law,
        gender_law,
        progenitor_birth_year: 950,
        progenitor_sex: Sex::Male,
        is_house: false,
        parent_dynasty: None,
        allow_cousin_marriage: false,
        lowborn_priority: false,
        name_inheritance: NameInheritance {
            grandparent: 0.0,
            parent: 0.0,
            none: 1.0,
        },
        blood_tier: None,
    }));
    registry
}

fn add(
    registry: &mut Registry,
    id: CharacterId,
    sex: Sex,
    birth_year: Year,
    father: Option<CharacterId>,
    mother: Option<CharacterId>,
) {
    registry
        .insert_character(Character {
            id,
            name: format!("c{id}"),
            sex,
            birth_year,
            death_year: None,
            death_reason: None,
            culture: "forest_folk".into(),
            faith: "old_gods".into(),
            dynasty: Some(DYNASTY.into()),
            house: None,
            father,
            mother,
            spouse: None,
            traits: BTreeSet::new(),
            skills: BTreeMap::new(),
            generation: 1,
            is_progenitor: false,
            is_bastard: false,
        })
        .unwrap();
}

fn resolve(registry: &mut Registry, deceased: CharacterId, year: Year) -> Vec<SimEvent> {
    let mut events = Vec::new();
    succession::resolve(registry, DYNASTY, deceased, year, &mut events).unwrap();
    events
}

fn head(registry: &Registry) -> Option<CharacterId> {
    registry.dynasty(DYNASTY).unwrap().head
}

#[test]
fn primogeniture_descends_into_the_eldest_line() {
    let mut r = registry(SuccessionLaw::Primogeniture, GenderLaw::Agnatic);
    add(&mut r, 1, Sex::Male, 950, None, None);
    add(&mut r, 2, Sex::Male, 975, Some(1), None); // elder son
    add(&mut r, 3, Sex::Male, 980, Some(1), None); // younger son
    add(&mut r, 4, Sex::Male, 1000, Some(2), None); // grandson via elder line
    r.set_head(DYNASTY, Some(1)).unwrap();

    // The elder son predeceases his father; his own son still ranks
    // ahead of the younger brother.
    r.mark_dead(2, 1004, "death_natural_causes").unwrap();
    r.mark_dead(1, 1005, "death_natural_causes").unwrap();
    let events = resolve(&mut r, 1, 1005);

    assert_eq!(head(&r), Some(4));
    assert!(events
        .iter()
        .any(|e| matches!(e, SimEvent::SuccessionResolved { heir: 4, year: 1005, .. })));
}

#[test]
fn primogeniture_falls_back_to_the_younger_line() {
    let mut r = registry(SuccessionLaw::Primogeniture, GenderLaw::Agnatic);
    add(&mut r, 1, Sex::Male, 950, None, None);
    add(&mut r, 2, Sex::Male, 975, Some(1), None);
    add(&mut r, 3, Sex::Male, 980, Some(1), None);
    add(&mut r, 4, Sex::Male, 1000, Some(2), None);
    r.set_head(DYNASTY, Some(1)).unwrap();

    // The whole elder line is gone.
    r.mark_dead(2, 1003, "death_natural_causes").unwrap();
    r.mark_dead(4, 1004, "death_ill").unwrap();
    r.mark_dead(1, 1005, "death_natural_causes").unwrap();
    resolve(&mut r, 1, 1005);

    assert_eq!(head(&r), Some(3));
}

#[test]
fn ultimogeniture_prefers_the_youngest_child() {
    let mut r = registry(SuccessionLaw::Ultimogeniture, GenderLaw::Agnatic);
    add(&mut r, 1, Sex::Male, 950, None, None);
    add(&mut r, 2, Sex::Male, 975, Some(1), None);
    add(&mut r, 3, Sex::Male, 980, Some(1), None);
    r.set_head(DYNASTY, Some(1)).unwrap();

    r.mark_dead(1, 1005, "death_natural_causes").unwrap();
    resolve(&mut r, 1, 1005);

    assert_eq!(head(&r), Some(3));
}

#[test]
fn seniority_picks_the_oldest_living_member() {
    let mut r = registry(SuccessionLaw::Seniority, GenderLaw::Agnatic);
    add(&mut r, 1, Sex::Male, 960, None, None);
    add(&mut r, 2, Sex::Male, 955, None, None); // elder kinsman, not in line
    add(&mut r, 3, Sex::Male, 985, Some(1), None); // son of the head
    r.set_head(DYNASTY, Some(1)).unwrap();

    r.mark_dead(1, 1010, "death_natural_causes").unwrap();
    resolve(&mut r, 1, 1010);

    assert_eq!(head(&r), Some(2), "seniority ignores the direct line");
}

#[test]
fn seniority_birth_year_ties_break_by_ascending_id() {
    let mut r = registry(SuccessionLaw::Seniority, GenderLaw::Agnatic);
    add(&mut r, 1, Sex::Male, 950, None, None);
    add(&mut r, 2, Sex::Male, 980, None, None);
    add(&mut r, 3, Sex::Male, 980, None, None);
    r.set_head(DYNASTY, Some(1)).unwrap();

    r.mark_dead(1, 1010, "death_natural_causes").unwrap();
    resolve(&mut r, 1, 1010);

    assert_eq!(head(&r), Some(2));
}

#[test]
fn agnatic_law_passes_over_daughters() {
    let mut r = registry(SuccessionLaw::Primogeniture, GenderLaw::Agnatic);
    add(&mut r, 1, Sex::Male, 950, None, None);
    add(&mut r, 2, Sex::Female, 970, Some(1), None); // elder daughter
    add(&mut r, 3, Sex::Male, 980, Some(1), None); // younger son
    r.set_head(DYNASTY, Some(1)).unwrap();

    r.mark_dead(1, 1005, "death_natural_causes").unwrap();
    resolve(&mut r, 1, 1005);

    assert_eq!(head(&r), Some(3));
}

#[test]
fn agnatic_cognatic_admits_a_daughter_when_no_males_remain() {
    let mut r = registry(SuccessionLaw::Primogeniture, GenderLaw::AgnaticCognatic);
    add(&mut r, 1, Sex::Male, 950, None, None);
    add(&mut r, 2, Sex::Female, 970, Some(1), None);
    r.set_head(DYNASTY, Some(1)).unwrap();

    r.mark_dead(1, 1005, "death_natural_causes").unwrap();
    let events = resolve(&mut r, 1, 1005);

    assert_eq!(head(&r), Some(2));
    assert!(!events
        .iter()
        .any(|e| matches!(e, SimEvent::DynastyExtinct { .. })));
}

#[test]
fn enatic_cognatic_climbs_the_maternal_line() {
    let mut r = registry(SuccessionLaw::Primogeniture, GenderLaw::EnaticCognatic);
    add(&mut r, 1, Sex::Female, 950, None, None); // grandmother
    add(&mut r, 2, Sex::Female, 975, None, Some(1)); // head
    add(&mut r, 3, Sex::Female, 978, None, Some(1)); // head's sister
    r.set_head(DYNASTY, Some(2)).unwrap();

    r.mark_dead(1, 1000, "death_natural_causes").unwrap();
    r.mark_dead(2, 1005, "death_natural_causes").unwrap();
    resolve(&mut r, 2, 1005);

    assert_eq!(head(&r), Some(3));
}

#[test]
fn absolute_cognatic_ranks_purely_by_birth_order() {
    let mut r = registry(SuccessionLaw::Primogeniture, GenderLaw::AbsoluteCognatic);
    add(&mut r, 1, Sex::Male, 950, None, None);
    add(&mut r, 2, Sex::Female, 970, Some(1), None); // elder daughter
    add(&mut r, 3, Sex::Male, 980, Some(1), None); // younger son
    r.set_head(DYNASTY, Some(1)).unwrap();

    r.mark_dead(1, 1005, "death_natural_causes").unwrap();
    resolve(&mut r, 1, 1005);

    assert_eq!(head(&r), Some(2), "no gender filter under absolute cognatic");
}

#[test]
fn extinction_is_flagged_and_permanent() {
    let mut r = registry(SuccessionLaw::Primogeniture, GenderLaw::Agnatic);
    add(&mut r, 1, Sex::Male, 950, None, None);
    r.set_head(DYNASTY, Some(1)).unwrap();

    r.mark_dead(1, 1005, "death_natural_causes").unwrap();
    let events = resolve(&mut r, 1, 1005);

    assert_eq!(head(&r), None);
    assert!(r.dynasty(DYNASTY).unwrap().extinct);
    assert!(events
        .iter()
        .any(|e| matches!(e, SimEvent::DynastyExtinct { year: 1005, .. })));

    // A later member never revives the line.
    add(&mut r, 2, Sex::Male, 990, None, None);
    let events = resolve(&mut r, 1, 1006);
    assert!(events.is_empty());
    assert_eq!(head(&r), None);
    assert!(r.dynasty(DYNASTY).unwrap().extinct);
}
