//! Catalog lookup seam.
//!
//! Resolving a free-text query into course candidates is an external
//! concern; real deployments plug in a proper fuzzy matcher. The shipped
//! [`SubstringIndex`] only does case-insensitive containment so the
//! `search` command works out of the box.

use crate::model::CourseSummary;

/// Resolves free-text queries against a course catalog.
pub trait CatalogIndex: Send + Sync {
    /// Return up to `limit` matching summaries, best first.
    fn search(&self, catalog: &[CourseSummary], query: &str, limit: usize) -> Vec<CourseSummary>;
}

/// Naive containment matcher over "name abbr".
#[derive(Debug, Default)]
pub struct SubstringIndex;

impl SubstringIndex {
    /// Create a new substring index.
    pub fn new() -> Self {
        Self
    }
}

impl CatalogIndex for SubstringIndex {
    fn search(&self, catalog: &[CourseSummary], query: &str, limit: usize) -> Vec<CourseSummary> {
        let query = query.to_lowercase();
        catalog
            .iter()
            .filter(|summary| {
                let haystack = format!("{} {}", summary.name, summary.abbr).to_lowercase();
                haystack.contains(&query)
            })
            .take(limit)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CourseId;

    fn summary(id: i64, name: &str, abbr: &str) -> CourseSummary {
        CourseSummary {
            id: CourseId(id),
            name: name.to_string(),
            abbr: abbr.to_string(),
            majors: vec![],
        }
    }

    #[test]
    fn test_matches_name_case_insensitive() {
        let catalog = vec![summary(1, "Linear Algebra", "la"), summary(2, "Analysis", "ana")];
        let hits = SubstringIndex::new().search(&catalog, "ALGEBRA", 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, CourseId(1));
    }

    #[test]
    fn test_matches_abbreviation() {
        let catalog = vec![summary(1, "Linear Algebra", "la"), summary(2, "Analysis", "ana")];
        let hits = SubstringIndex::new().search(&catalog, "ana", 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, CourseId(2));
    }

    #[test]
    fn test_limit_respected() {
        let catalog: Vec<_> = (0..20).map(|i| summary(i, "Course", "c")).collect();
        let hits = SubstringIndex::new().search(&catalog, "course", 5);
        assert_eq!(hits.len(), 5);
    }

    #[test]
    fn test_no_match() {
        let catalog = vec![summary(1, "Analysis", "ana")];
        assert!(SubstringIndex::new().search(&catalog, "chemistry", 10).is_empty());
    }
}
