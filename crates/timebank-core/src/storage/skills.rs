//! Skill listing storage

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::parse_timestamp;
use crate::catalog::{NewSkill, Skill};
use crate::error::{MarketError, Result};

const SKILL_COLUMNS: &str =
    "id, provider_id, title, description, category, difficulty, duration, created_at";

pub struct SkillStore<'a> {
    conn: &'a Connection,
}

impl<'a> SkillStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn create(&self, provider_id: &str, new_skill: &NewSkill) -> Result<Skill> {
        new_skill.validate()?;

        let skill = Skill {
            id: uuid::Uuid::new_v4().to_string(),
            provider_id: provider_id.to_string(),
            title: new_skill.title.trim().to_string(),
            description: new_skill.description.trim().to_string(),
            category: new_skill.category,
            difficulty: new_skill.difficulty,
            duration: new_skill.duration,
            created_at: Utc::now(),
        };

        self.conn.execute(
            "INSERT INTO skills (id, provider_id, title, description, category, difficulty, duration, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                skill.id,
                skill.provider_id,
                skill.title,
                skill.description,
                skill.category.as_str(),
                skill.difficulty.as_str(),
                skill.duration,
                skill.created_at.to_rfc3339()
            ],
        )?;

        tracing::info!(skill_id = %skill.id, provider_id = %provider_id, title = %skill.title, "Listed skill");
        Ok(skill)
    }

    pub fn get(&self, id: &str) -> Result<Option<Skill>> {
        let sql = format!("SELECT {} FROM skills WHERE id = ?1", SKILL_COLUMNS);
        let row = self
            .conn
            .query_row(&sql, [id], Self::map_row)
            .optional()?;
        row.map(SkillRow::into_skill).transpose()
    }

    pub fn require(&self, id: &str) -> Result<Skill> {
        self.get(id)?
            .ok_or_else(|| MarketError::not_found("skill", id))
    }

    /// All skills in listing order, optionally only one provider's
    pub fn list(&self, provider_id: Option<&str>) -> Result<Vec<Skill>> {
        let rows = match provider_id {
            Some(pid) => {
                let sql = format!(
                    "SELECT {} FROM skills WHERE provider_id = ?1 ORDER BY created_at, rowid",
                    SKILL_COLUMNS
                );
                let mut stmt = self.conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([pid], Self::map_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM skills ORDER BY created_at, rowid",
                    SKILL_COLUMNS
                );
                let mut stmt = self.conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([], Self::map_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
        };
        rows.into_iter().map(SkillRow::into_skill).collect()
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<SkillRow> {
        Ok(SkillRow {
            id: row.get(0)?,
            provider_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            category: row.get(4)?,
            difficulty: row.get(5)?,
            duration: row.get(6)?,
            created_at: row.get(7)?,
        })
    }
}

struct SkillRow {
    id: String,
    provider_id: String,
    title: String,
    description: String,
    category: String,
    difficulty: String,
    duration: i64,
    created_at: String,
}

impl SkillRow {
    fn into_skill(self) -> Result<Skill> {
        Ok(Skill {
            category: self.category.parse()?,
            difficulty: self.difficulty.parse()?,
            created_at: parse_timestamp(&self.created_at),
            id: self.id,
            provider_id: self.provider_id,
            title: self.title,
            description: self.description,
            duration: self.duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::catalog::{Category, Difficulty};
    use crate::storage::{Database, NewUser, UserStore};

    fn setup() -> (Database, TempDir, String) {
        let temp = TempDir::new().unwrap();
        let db = Database::new(&temp.path().join("test.db")).unwrap();
        let provider = UserStore::new(db.conn())
            .create(&NewUser {
                username: "chef".to_string(),
                email: "chef@example.com".to_string(),
                hourly_rate: None,
            })
            .unwrap();
        (db, temp, provider.id)
    }

    fn listing(title: &str, category: Category) -> NewSkill {
        NewSkill {
            title: title.to_string(),
            description: format!("Learn {}", title),
            category,
            difficulty: Difficulty::Intermediate,
            duration: 3,
        }
    }

    #[test]
    fn test_create_get_and_list_in_order() {
        let (db, _temp, provider_id) = setup();
        let store = SkillStore::new(db.conn());

        let pasta = store.create(&provider_id, &listing("Fresh pasta", Category::Cooking)).unwrap();
        let knots = store.create(&provider_id, &listing("Sailing knots", Category::Sports)).unwrap();

        let fetched = store.require(&pasta.id).unwrap();
        assert_eq!(fetched.category, Category::Cooking);
        assert_eq!(fetched.duration, 3);

        let all = store.list(None).unwrap();
        assert_eq!(
            all.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
            vec![pasta.id.as_str(), knots.id.as_str()]
        );
        assert_eq!(store.list(Some(&provider_id)).unwrap().len(), 2);
        assert!(store.list(Some("someone-else")).unwrap().is_empty());
    }

    #[test]
    fn test_missing_skill_is_not_found() {
        let (db, _temp, _) = setup();
        let store = SkillStore::new(db.conn());
        assert!(matches!(
            store.require("nope"),
            Err(MarketError::NotFound { entity: "skill", .. })
        ));
    }
}
