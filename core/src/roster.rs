//! Final roster extraction.
//!
//! A completed (or cancelled) run collapses into a Roster: one record
//! per character, one per dynasty, and the family graph as flat edge
//! lists. Everything is ordered by ascending id so two runs with the
//! same seed serialize byte-identically.

use crate::{
    character::Sex,
    registry::Registry,
    types::{CharacterId, DynastyId, RunId, Year},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A dated event block on a character record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventBlock {
    pub year: Year,
    /// Empty for births; the death reason tag for deaths.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterRecord {
    pub id: CharacterId,
    pub name: String,
    pub female: bool,
    pub dynasty: Option<DynastyId>,
    pub house: Option<DynastyId>,
    pub culture: String,
    pub faith: String,
    pub father: Option<CharacterId>,
    pub mother: Option<CharacterId>,
    pub spouse: Option<CharacterId>,
    pub traits: Vec<String>,
    pub skills: BTreeMap<String, u8>,
    pub generation: u32,
    pub bastard: bool,
    pub birth: EventBlock,
    pub death: Option<EventBlock>,
}

impl CharacterRecord {
    /// Render the record as a script block, the exchange format used
    /// by grand-strategy history files.
    pub fn script_block(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("{} = {{\n", self.id));
        out.push_str(&format!("\tname = \"{}\"\n", self.name));
        if self.female {
            out.push_str("\tfemale = yes\n");
        }
        if let Some(group) = self.house.as_ref().or(self.dynasty.as_ref()) {
            out.push_str(&format!("\tdynasty = {group}\n"));
        }
        out.push_str(&format!("\tculture = {}\n", self.culture));
        out.push_str(&format!("\treligion = {}\n", self.faith));
        if let Some(father) = self.father {
            out.push_str(&format!("\tfather = {father}\n"));
        }
        if let Some(mother) = self.mother {
            out.push_str(&format!("\tmother = {mother}\n"));
        }
        for t in &self.traits {
            out.push_str(&format!("\ttrait = {t}\n"));
        }
        for (skill, level) in &self.skills {
            out.push_str(&format!("\t{skill} = {level}\n"));
        }
        out.push_str(&format!("\t{}.1.1 = {{ birth = yes }}\n", self.birth.year));
        if let Some(death) = &self.death {
            match &death.reason {
                Some(reason) => out.push_str(&format!(
                    "\t{}.1.1 = {{ death = {{ death_reason = {reason} }} }}\n",
                    death.year
                )),
                None => out.push_str(&format!("\t{}.1.1 = {{ death = yes }}\n", death.year)),
            }
        }
        out.push_str("}\n");
        out
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynastyRecord {
    pub id: DynastyId,
    pub name: String,
    pub motto: String,
    pub culture: String,
    pub faith: String,
    pub is_house: bool,
    pub parent_dynasty: Option<DynastyId>,
    pub head: Option<CharacterId>,
    pub extinct: bool,
    pub blood_tier: Option<u8>,
    pub members: Vec<CharacterId>,
}

/// Parent/child and spouse links as flat edge lists. Spouse edges are
/// stored once, smaller id first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FamilyGraph {
    pub parent_edges: Vec<(CharacterId, CharacterId)>,
    pub spouse_edges: Vec<(CharacterId, CharacterId)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Roster {
    pub run_id: RunId,
    pub seed: u64,
    pub characters: Vec<CharacterRecord>,
    pub dynasties: Vec<DynastyRecord>,
    pub graph: FamilyGraph,
}

impl Roster {
    pub fn from_registry(run_id: RunId, seed: u64, registry: &Registry) -> Self {
        let mut characters = Vec::with_capacity(registry.character_count());
        let mut graph = FamilyGraph::default();

        for c in registry.characters() {
            for parent in [c.father, c.mother].into_iter().flatten() {
                graph.parent_edges.push((parent, c.id));
            }
            if let Some(spouse) = c.spouse {
                if c.id < spouse {
                    graph.spouse_edges.push((c.id, spouse));
                }
            }
            characters.push(CharacterRecord {
                id: c.id,
                name: c.name.clone(),
                female: c.sex == Sex::Female,
                dynasty: c.dynasty.clone(),
                house: c.house.clone(),
                culture: c.culture.clone(),
                faith: c.faith.clone(),
                father: c.father,
                mother: c.mother,
                spouse: c.spouse,
                traits: c.traits.iter().cloned().collect(),
                skills: c.skills.clone(),
                generation: c.generation,
                bastard: c.is_bastard,
                birth: EventBlock {
                    year: c.birth_year,
                    reason: None,
                },
                death: c.death_year.map(|year| EventBlock {
                    year,
                    reason: c.death_reason.clone(),
                }),
            });
        }
        graph.parent_edges.sort_unstable();
        graph.spouse_edges.sort_unstable();

        let dynasties = registry
            .dynasties()
            .map(|d| DynastyRecord {
                id: d.id.clone(),
                name: d.name.clone(),
                motto: d.motto.clone(),
                culture: d.culture.clone(),
                faith: d.faith.clone(),
                is_house: d.is_house,
                parent_dynasty: d.parent_dynasty.clone(),
                head: d.head,
                extinct: d.extinct,
                blood_tier: d.blood_tier,
                members: d.members.iter().copied().collect(),
            })
            .collect();

        Self {
            run_id,
            seed,
            characters,
            dynasties,
            graph,
        }
    }
}
