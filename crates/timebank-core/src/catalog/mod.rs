//! Skill catalog
//!
//! Skills are teachable offerings listed by a provider. Each has a fixed
//! category and difficulty and an offered duration in whole hours; an
//! exchange against a listed skill may not request more hours than offered.

mod search;

pub use search::SkillFilter;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MarketError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Technology,
    #[serde(rename = "Arts & Crafts")]
    ArtsAndCrafts,
    Cooking,
    Music,
    Language,
    Sports,
    Academic,
    Professional,
}

impl Category {
    pub fn all() -> &'static [Category] {
        &[
            Category::Technology,
            Category::ArtsAndCrafts,
            Category::Cooking,
            Category::Music,
            Category::Language,
            Category::Sports,
            Category::Academic,
            Category::Professional,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Technology => "Technology",
            Category::ArtsAndCrafts => "Arts & Crafts",
            Category::Cooking => "Cooking",
            Category::Music => "Music",
            Category::Language => "Language",
            Category::Sports => "Sports",
            Category::Academic => "Academic",
            Category::Professional => "Professional",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::all()
            .iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| MarketError::validation(format!("unknown category '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "Beginner",
            Difficulty::Intermediate => "Intermediate",
            Difficulty::Advanced => "Advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            _ => Err(MarketError::validation(format!(
                "unknown difficulty '{}'",
                s
            ))),
        }
    }
}

/// A listed skill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub id: String,
    pub provider_id: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub difficulty: Difficulty,
    /// Offered hours per exchange
    pub duration: i64,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by a provider when listing a skill
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSkill {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub difficulty: Difficulty,
    pub duration: i64,
}

impl NewSkill {
    pub fn validate(&self) -> Result<(), MarketError> {
        if self.title.trim().is_empty() {
            return Err(MarketError::validation("skill title must not be empty"));
        }
        if self.duration < 1 {
            return Err(MarketError::InvalidDuration {
                requested: self.duration,
                reason: "a skill must offer at least one hour".to_string(),
            });
        }
        Ok(())
    }
}
