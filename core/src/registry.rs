//! The character and dynasty registry — the single source of truth.
//!
//! RULE: Only the registry mutates character and dynasty records.
//! Engines call registry methods; they never hold references into the
//! arena across mutations. Iteration orders are always ascending id,
//! which is what makes per-year processing deterministic.

use crate::{
    character::Character,
    dynasty::Dynasty,
    error::{SimError, SimResult},
    types::{CharacterId, DynastyId, Year},
};
use std::collections::{BTreeMap, BTreeSet};

pub struct Registry {
    characters: BTreeMap<CharacterId, Character>,
    dynasties: BTreeMap<DynastyId, Dynasty>,
    /// Parent id -> child ids, in insertion (= birth) order.
    children: BTreeMap<CharacterId, Vec<CharacterId>>,
    next_id: CharacterId,
}

impl Registry {
    pub fn new(initial_id: CharacterId) -> Self {
        Self {
            characters: BTreeMap::new(),
            dynasties: BTreeMap::new(),
            children: BTreeMap::new(),
            next_id: initial_id,
        }
    }

    /// Hand out the next character id. Strictly increasing; ids are
    /// never reused, even across deaths.
    pub fn allocate_id(&mut self) -> CharacterId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // ── Insertion ─────────────────────────────────────────────────

    /// Insert a character, wiring the child index and dynasty/house
    /// member sets. The id must come from allocate_id(). References
    /// are checked before anything mutates, so a rejected insert
    /// leaves no trace.
    pub fn insert_character(&mut self, character: Character) -> SimResult<()> {
        let id = character.id;
        for parent in [character.father, character.mother].into_iter().flatten() {
            let record = self
                .characters
                .get(&parent)
                .ok_or(SimError::CharacterNotFound(parent))?;
            if record.birth_year >= character.birth_year {
                return Err(SimError::ParentBornLater { child: id, parent });
            }
        }
        for group in [&character.dynasty, &character.house].into_iter().flatten() {
            if !self.dynasties.contains_key(group) {
                return Err(SimError::DynastyNotFound(group.clone()));
            }
        }

        for parent in [character.father, character.mother].into_iter().flatten() {
            self.children.entry(parent).or_default().push(id);
        }
        for group in [&character.dynasty, &character.house].into_iter().flatten() {
            if let Some(dynasty) = self.dynasties.get_mut(group) {
                dynasty.members.insert(id);
            }
        }
        self.characters.insert(id, character);
        Ok(())
    }

    pub fn insert_dynasty(&mut self, dynasty: Dynasty) {
        self.dynasties.insert(dynasty.id.clone(), dynasty);
    }

    // ── Lookup ────────────────────────────────────────────────────

    pub fn character(&self, id: CharacterId) -> SimResult<&Character> {
        self.characters
            .get(&id)
            .ok_or(SimError::CharacterNotFound(id))
    }

    pub fn character_mut(&mut self, id: CharacterId) -> SimResult<&mut Character> {
        self.characters
            .get_mut(&id)
            .ok_or(SimError::CharacterNotFound(id))
    }

    pub fn dynasty(&self, id: &str) -> SimResult<&Dynasty> {
        self.dynasties
            .get(id)
            .ok_or_else(|| SimError::DynastyNotFound(id.to_string()))
    }

    pub fn dynasty_mut(&mut self, id: &str) -> SimResult<&mut Dynasty> {
        self.dynasties
            .get_mut(id)
            .ok_or_else(|| SimError::DynastyNotFound(id.to_string()))
    }

    /// All characters, ascending id.
    pub fn characters(&self) -> impl Iterator<Item = &Character> {
        self.characters.values()
    }

    /// All dynasties, ascending id.
    pub fn dynasties(&self) -> impl Iterator<Item = &Dynasty> {
        self.dynasties.values()
    }

    pub fn character_count(&self) -> usize {
        self.characters.len()
    }

    /// Ids of every living character, ascending. Snapshot — safe to
    /// hold across mutations.
    pub fn living_ids(&self) -> Vec<CharacterId> {
        self.characters
            .values()
            .filter(|c| c.alive())
            .map(|c| c.id)
            .collect()
    }

    pub fn living_count(&self) -> usize {
        self.characters.values().filter(|c| c.alive()).count()
    }

    /// Living members of a dynasty or house, ascending id.
    pub fn living_members_of(&self, dynasty_id: &str) -> SimResult<Vec<CharacterId>> {
        let dynasty = self.dynasty(dynasty_id)?;
        Ok(dynasty
            .members
            .iter()
            .copied()
            .filter(|id| {
                self.characters
                    .get(id)
                    .map(|c| c.alive())
                    .unwrap_or(false)
            })
            .collect())
    }

    /// Children of a character, in birth order.
    pub fn children_of(&self, id: CharacterId) -> &[CharacterId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    // ── Mutation ──────────────────────────────────────────────────

    /// Record a death. Clears the spouse link on both sides so the
    /// survivor becomes eligible to remarry.
    pub fn mark_dead(&mut self, id: CharacterId, year: Year, reason: &str) -> SimResult<()> {
        let spouse = {
            let character = self.character_mut(id)?;
            character.death_year = Some(year);
            character.death_reason = Some(reason.to_string());
            character.spouse.take()
        };
        if let Some(spouse_id) = spouse {
            self.character_mut(spouse_id)?.spouse = None;
        }
        Ok(())
    }

    /// Link two characters as spouses. Symmetric: both records point
    /// at each other afterwards.
    pub fn set_spouse(&mut self, a: CharacterId, b: CharacterId) -> SimResult<()> {
        self.character(b)?;
        self.character_mut(a)?.spouse = Some(b);
        self.character_mut(b)?.spouse = Some(a);
        Ok(())
    }

    pub fn set_head(&mut self, dynasty_id: &str, head: Option<CharacterId>) -> SimResult<()> {
        self.dynasty_mut(dynasty_id)?.head = head;
        Ok(())
    }

    // ── Kinship traversal ─────────────────────────────────────────

    /// Whether `ancestor` appears anywhere in `id`'s parent chains.
    pub fn is_ancestor_of(&self, ancestor: CharacterId, id: CharacterId) -> bool {
        let mut frontier = vec![id];
        let mut seen = BTreeSet::new();
        while let Some(current) = frontier.pop() {
            if !seen.insert(current) {
                continue;
            }
            let Some(character) = self.characters.get(&current) else {
                continue;
            };
            for parent in [character.father, character.mother].into_iter().flatten() {
                if parent == ancestor {
                    return true;
                }
                frontier.push(parent);
            }
        }
        false
    }

    fn parents_of(&self, id: CharacterId) -> Vec<CharacterId> {
        self.characters
            .get(&id)
            .map(|c| [c.father, c.mother].into_iter().flatten().collect())
            .unwrap_or_default()
    }

    /// Whether two characters share a recorded parent.
    pub fn shares_parent(&self, a: CharacterId, b: CharacterId) -> bool {
        let parents_a: BTreeSet<CharacterId> = self.parents_of(a).into_iter().collect();
        self.parents_of(b).iter().any(|p| parents_a.contains(p))
    }

    /// Whether two characters are within two generations of a common
    /// person. This is the incest screen for marriage: it covers
    /// parent/child, siblings, half-siblings, first cousins, and
    /// aunt/uncle pairs within recorded ancestry. Each character's
    /// kin set contains themselves, so a shared member means a shared
    /// ancestor at grandparent depth or closer.
    pub fn closely_related(&self, a: CharacterId, b: CharacterId) -> bool {
        let near_kin = |id: CharacterId| -> BTreeSet<CharacterId> {
            let mut kin = BTreeSet::from([id]);
            for parent in self.parents_of(id) {
                kin.insert(parent);
                for grandparent in self.parents_of(parent) {
                    kin.insert(grandparent);
                }
            }
            kin
        };
        !near_kin(a).is_disjoint(&near_kin(b))
    }
}
