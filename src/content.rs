//! The static content source: read-only skill, monster and item definitions.

use crate::errors::{ContentError, ContentResult};
use schema::{ItemData, MonsterData, SkillData};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const BUILTIN_SKILLS: &str = include_str!("../data/skills.ron");
const BUILTIN_MONSTERS: &str = include_str!("../data/monsters.ron");
const BUILTIN_ITEMS: &str = include_str!("../data/items.ron");

/// Definition records keyed by id. The battle only ever reads from this.
#[derive(Debug, Clone, Default)]
pub struct ContentLibrary {
    skills: HashMap<String, SkillData>,
    monsters: HashMap<String, MonsterData>,
    items: HashMap<String, ItemData>,
}

impl ContentLibrary {
    /// The content shipped with the crate.
    pub fn builtin() -> ContentResult<Self> {
        Self::from_ron_strs(BUILTIN_SKILLS, BUILTIN_MONSTERS, BUILTIN_ITEMS)
    }

    /// Loads `skills.ron`, `monsters.ron` and `items.ron` from a directory.
    pub fn load_from_dir(data_path: &Path) -> ContentResult<Self> {
        let read = |name: &str| {
            let path = data_path.join(name);
            fs::read_to_string(&path).map_err(|e| ContentError::Io {
                file: path.display().to_string(),
                details: e.to_string(),
            })
        };
        let skills = read("skills.ron")?;
        let monsters = read("monsters.ron")?;
        let items = read("items.ron")?;
        Self::from_ron_strs(&skills, &monsters, &items)
    }

    pub fn from_ron_strs(skills: &str, monsters: &str, items: &str) -> ContentResult<Self> {
        let skills: Vec<SkillData> = parse_list("skills.ron", skills)?;
        let monsters: Vec<MonsterData> = parse_list("monsters.ron", monsters)?;
        let items: Vec<ItemData> = parse_list("items.ron", items)?;

        let library = Self {
            skills: skills.into_iter().map(|s| (s.id.clone(), s)).collect(),
            monsters: monsters.into_iter().map(|m| (m.id.clone(), m)).collect(),
            items: items.into_iter().map(|i| (i.id.clone(), i)).collect(),
        };
        library.check_references()?;

        tracing::debug!(
            skills = library.skills.len(),
            monsters = library.monsters.len(),
            items = library.items.len(),
            "content library loaded"
        );
        Ok(library)
    }

    pub fn skill(&self, id: &str) -> ContentResult<&SkillData> {
        self.skills
            .get(id)
            .ok_or_else(|| ContentError::SkillNotFound(id.to_string()))
    }

    pub fn monster(&self, id: &str) -> ContentResult<&MonsterData> {
        self.monsters
            .get(id)
            .ok_or_else(|| ContentError::MonsterNotFound(id.to_string()))
    }

    pub fn item(&self, id: &str) -> ContentResult<&ItemData> {
        self.items
            .get(id)
            .ok_or_else(|| ContentError::ItemNotFound(id.to_string()))
    }

    pub fn insert_skill(&mut self, skill: SkillData) {
        self.skills.insert(skill.id.clone(), skill);
    }

    pub fn insert_monster(&mut self, monster: MonsterData) {
        self.monsters.insert(monster.id.clone(), monster);
    }

    /// Every skill a monster lists and every summon key must resolve.
    fn check_references(&self) -> ContentResult<()> {
        for monster in self.monsters.values() {
            for skill in &monster.skills {
                self.skill(skill)?;
            }
        }
        for skill in self.skills.values() {
            if let Some(key) = &skill.summon {
                self.monster(key)?;
            }
        }
        Ok(())
    }
}

fn parse_list<T: DeserializeOwned>(file: &str, text: &str) -> ContentResult<Vec<T>> {
    ron::from_str(text).map_err(|e| ContentError::MalformedData {
        file: file.to_string(),
        details: e.to_string(),
    })
}
