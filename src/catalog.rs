//! Problem catalog
//!
//! A JSON array of problem definitions. Filtering and sorting never reorder
//! problems that compare equal: catalog order breaks every tie.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context};
use tracing::info;

use crate::core::{Difficulty, Problem};

/// Criteria for [`Catalog::filter`]; `None` matches everything.
#[derive(Debug, Clone, Default)]
pub struct ProblemFilter {
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub tag: Option<String>,
    /// Case-insensitive substring of the title or summary
    pub query: Option<String>,
}

impl ProblemFilter {
    pub fn matches(&self, problem: &Problem) -> bool {
        let category = self
            .category
            .as_deref()
            .map_or(true, |wanted| problem.category.as_deref() == Some(wanted));
        let difficulty = self
            .difficulty
            .map_or(true, |wanted| problem.difficulty == Some(wanted));
        let tag = self
            .tag
            .as_deref()
            .map_or(true, |wanted| problem.tags.iter().any(|t| t == wanted));
        let query = match self.query.as_deref().map(|q| q.trim().to_lowercase()) {
            Some(q) if !q.is_empty() => {
                problem.title.to_lowercase().contains(&q)
                    || problem.summary.to_lowercase().contains(&q)
            }
            _ => true,
        };
        category && difficulty && tag && query
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Catalog order
    #[default]
    Default,
    DifficultyAsc,
    DifficultyDesc,
    TitleAsc,
    TitleDesc,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(SortOrder::Default),
            "difficulty-asc" => Ok(SortOrder::DifficultyAsc),
            "difficulty-desc" => Ok(SortOrder::DifficultyDesc),
            "title-asc" => Ok(SortOrder::TitleAsc),
            "title-desc" => Ok(SortOrder::TitleDesc),
            _ => Err(format!(
                "Unknown sort order: {} (expected default, difficulty-asc, difficulty-desc, title-asc or title-desc)",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    problems: Vec<Problem>,
}

impl Catalog {
    pub fn new(problems: Vec<Problem>) -> anyhow::Result<Self> {
        let mut seen = HashSet::new();
        for problem in &problems {
            if problem.function_name.trim().is_empty() {
                bail!("Problem {} has no functionName", problem.id);
            }
            if !seen.insert(problem.id.as_str()) {
                bail!("Duplicate problem id: {}", problem.id);
            }
        }
        Ok(Self { problems })
    }

    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let problems: Vec<Problem> =
            serde_json::from_str(content).context("Invalid problem catalog")?;
        Self::new(problems)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read problem catalog: {}", path.display()))?;
        let catalog = Self::from_str(&content)?;
        info!(
            "Loaded {} problems from {}",
            catalog.problems.len(),
            path.display()
        );
        Ok(catalog)
    }

    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Problem> {
        self.problems.iter().find(|p| p.id == id)
    }

    /// Problems matching `filter`, in catalog order
    pub fn filter(&self, filter: &ProblemFilter) -> Vec<&Problem> {
        self.problems.iter().filter(|p| filter.matches(p)).collect()
    }

    /// Categories in order of first appearance
    pub fn categories(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.problems
            .iter()
            .filter_map(|p| p.category.as_deref())
            .filter(|c| seen.insert(*c))
            .collect()
    }

    /// Every tag, sorted and deduplicated
    pub fn tags(&self) -> Vec<&str> {
        self.problems
            .iter()
            .flat_map(|p| p.tags.iter().map(String::as_str))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Stable sort of `problems`; ties keep their current (catalog) order.
pub fn sort_problems(problems: &mut [&Problem], order: SortOrder) {
    let by_title = |a: &&Problem, b: &&Problem| -> Ordering {
        a.title
            .to_lowercase()
            .cmp(&b.title.to_lowercase())
            .then_with(|| a.title.cmp(&b.title))
    };
    match order {
        SortOrder::Default => {}
        SortOrder::DifficultyAsc => problems.sort_by(|a, b| a.difficulty.cmp(&b.difficulty)),
        SortOrder::DifficultyDesc => problems.sort_by(|a, b| b.difficulty.cmp(&a.difficulty)),
        SortOrder::TitleAsc => problems.sort_by(by_title),
        SortOrder::TitleDesc => problems.sort_by(|a, b| by_title(b, a)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CATALOG: &str = r#"[
      { "id": "reverse-string", "title": "Reverse a string", "summary": "Return the characters in reverse order.",
        "difficulty": "Easy", "category": "Strings", "tags": ["string", "fundamental"],
        "functionName": "reverseString", "tests": [] },
      { "id": "two-sum", "title": "Two sum", "summary": "Find two indices whose values add up to a target.",
        "difficulty": "Medium", "category": "Arrays", "tags": ["array", "hash-map"],
        "functionName": "twoSum", "tests": [] },
      { "id": "camelize", "title": "Camelize", "summary": "Convert kebab-case to camelCase.",
        "difficulty": "Easy", "category": "Strings", "tags": ["string", "regex"],
        "functionName": "camelize", "tests": [] }
    ]"#;

    fn catalog() -> Catalog {
        Catalog::from_str(CATALOG).unwrap()
    }

    fn ids(problems: &[&Problem]) -> Vec<String> {
        problems.iter().map(|p| p.id.clone()).collect()
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(CATALOG.as_bytes()).unwrap();
        let catalog = Catalog::load(file.path()).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.get("two-sum").unwrap().function_name, "twoSum");
        assert!(catalog.get("missing").is_none());
    }

    #[test]
    fn test_load_errors() {
        assert!(Catalog::load(Path::new("/nonexistent/problems.json")).is_err());
        assert!(Catalog::from_str("{").is_err());
        let duplicate = r#"[{ "id": "a", "functionName": "f", "tests": [] },
                            { "id": "a", "functionName": "g", "tests": [] }]"#;
        assert!(Catalog::from_str(duplicate)
            .unwrap_err()
            .to_string()
            .contains("Duplicate problem id"));
        let unnamed = r#"[{ "id": "a", "functionName": " ", "tests": [] }]"#;
        assert!(Catalog::from_str(unnamed).is_err());
    }

    #[test]
    fn test_filter_preserves_catalog_order() {
        let catalog = catalog();
        let strings = ProblemFilter {
            category: Some("Strings".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&catalog.filter(&strings)), vec!["reverse-string", "camelize"]);

        let easy_regex = ProblemFilter {
            difficulty: Some(Difficulty::Easy),
            tag: Some("regex".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&catalog.filter(&easy_regex)), vec!["camelize"]);

        let query = ProblemFilter {
            query: Some("  INDICES ".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&catalog.filter(&query)), vec!["two-sum"]);

        assert_eq!(catalog.filter(&ProblemFilter::default()).len(), 3);
    }

    #[test]
    fn test_categories_and_tags() {
        let catalog = catalog();
        assert_eq!(catalog.categories(), vec!["Strings", "Arrays"]);
        assert_eq!(
            catalog.tags(),
            vec!["array", "fundamental", "hash-map", "regex", "string"]
        );
    }

    #[test]
    fn test_sort_orders() {
        let catalog = catalog();
        let mut problems = catalog.filter(&ProblemFilter::default());
        sort_problems(&mut problems, SortOrder::DifficultyDesc);
        assert_eq!(ids(&problems), vec!["two-sum", "reverse-string", "camelize"]);
        sort_problems(&mut problems, SortOrder::TitleAsc);
        assert_eq!(ids(&problems), vec!["camelize", "reverse-string", "two-sum"]);
        assert_eq!("title-desc".parse::<SortOrder>(), Ok(SortOrder::TitleDesc));
        assert!("random".parse::<SortOrder>().is_err());
    }

    #[test]
    fn test_bundled_catalog() {
        let catalog = Catalog::from_str(include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/files/problems.json"
        )))
        .unwrap();
        assert_eq!(catalog.len(), 50);
        assert_eq!(
            catalog.categories(),
            vec!["Strings", "Arrays", "Numbers", "Collections", "Algorithms"]
        );
        assert!(catalog.problems().iter().all(|p| !p.tests.is_empty()));

        let deep_get = catalog.get("collection-deep-get").unwrap();
        assert_eq!(deep_get.tests[1].expected, None);
        let two_sum = catalog.get("algo-two-sum-indices").unwrap();
        assert_eq!(two_sum.tests[2].expected, Some(serde_json::Value::Null));
    }
}
