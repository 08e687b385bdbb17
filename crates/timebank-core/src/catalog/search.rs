//! Skill search filter

use serde::{Deserialize, Serialize};

use super::{Category, Difficulty, Skill};
use crate::error::Result;

/// Predicate filter over listed skills.
///
/// `None` for category or difficulty means "all". Matching keeps input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillFilter {
    pub search: String,
    pub category: Option<Category>,
    pub difficulty: Option<Difficulty>,
}

impl SkillFilter {
    /// Build a filter from raw query parameters where `"all"` or an empty
    /// value disables that constraint.
    pub fn from_params(
        search: Option<&str>,
        category: Option<&str>,
        difficulty: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            search: search.unwrap_or_default().to_string(),
            category: parse_choice(category)?,
            difficulty: parse_choice(difficulty)?,
        })
    }

    pub fn matches(&self, skill: &Skill) -> bool {
        let needle = self.search.to_lowercase();
        let matches_search = needle.is_empty()
            || skill.title.to_lowercase().contains(&needle)
            || skill.description.to_lowercase().contains(&needle);

        matches_search
            && self.category.map_or(true, |c| skill.category == c)
            && self.difficulty.map_or(true, |d| skill.difficulty == d)
    }

    pub fn apply<'a, I>(&self, skills: I) -> Vec<Skill>
    where
        I: IntoIterator<Item = &'a Skill>,
    {
        skills
            .into_iter()
            .filter(|skill| self.matches(skill))
            .cloned()
            .collect()
    }
}

fn parse_choice<T>(value: Option<&str>) -> Result<Option<T>>
where
    T: std::str::FromStr<Err = crate::MarketError>,
{
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) if v.eq_ignore_ascii_case("all") => Ok(None),
        Some(v) => v.parse().map(Some),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn skill(id: &str, title: &str, description: &str, category: Category, difficulty: Difficulty) -> Skill {
        Skill {
            id: id.to_string(),
            provider_id: "p1".to_string(),
            title: title.to_string(),
            description: description.to_string(),
            category,
            difficulty,
            duration: 2,
            created_at: Utc::now(),
        }
    }

    fn sample() -> Vec<Skill> {
        vec![
            skill("1", "Rust for beginners", "Ownership and borrowing", Category::Technology, Difficulty::Beginner),
            skill("2", "Watercolor", "Loose landscapes", Category::ArtsAndCrafts, Difficulty::Intermediate),
            skill("3", "Advanced async RUST", "Pinning, executors", Category::Technology, Difficulty::Advanced),
            skill("4", "Guitar basics", "Chords and strumming", Category::Music, Difficulty::Beginner),
        ]
    }

    fn ids(skills: &[Skill]) -> Vec<&str> {
        skills.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn test_empty_filter_keeps_everything_in_order() {
        let skills = sample();
        let result = SkillFilter::default().apply(&skills);
        assert_eq!(ids(&result), vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_search_is_case_insensitive_over_title_and_description() {
        let skills = sample();
        let filter = SkillFilter::from_params(Some("rust"), None, None).unwrap();
        assert_eq!(ids(&filter.apply(&skills)), vec!["1", "3"]);

        let filter = SkillFilter::from_params(Some("CHORDS"), None, None).unwrap();
        assert_eq!(ids(&filter.apply(&skills)), vec!["4"]);
    }

    #[test]
    fn test_category_and_difficulty_combine() {
        let skills = sample();
        let filter =
            SkillFilter::from_params(None, Some("Technology"), Some("Advanced")).unwrap();
        assert_eq!(ids(&filter.apply(&skills)), vec!["3"]);

        let filter = SkillFilter::from_params(Some(""), Some("all"), Some("Beginner")).unwrap();
        assert_eq!(ids(&filter.apply(&skills)), vec!["1", "4"]);
    }

    #[test]
    fn test_filtering_is_idempotent() {
        let skills = sample();
        let filter = SkillFilter::from_params(Some("s"), Some("all"), Some("beginner")).unwrap();
        let once = filter.apply(&skills);
        let twice = filter.apply(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        assert!(SkillFilter::from_params(None, Some("Gardening"), None).is_err());
    }
}
