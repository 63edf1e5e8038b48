use std::collections::BTreeSet;

use dataclear_core::{FkGraph, split_table_name};

/// Tables the caller wants kept. Membership is case-insensitive.
///
/// A pattern containing a dot (`public.users`) matches that exact key; a bare
/// name (`users`) matches a table of that name in any schema, and also an
/// unqualified key of the same name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtectedSet {
    qualified: BTreeSet<String>,
    bare: BTreeSet<String>,
}

impl ProtectedSet {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = ProtectedSet::default();
        for pattern in patterns {
            set.insert(pattern.as_ref());
        }
        set
    }

    pub fn insert(&mut self, pattern: &str) {
        let pattern = pattern.trim().to_lowercase();
        if pattern.is_empty() {
            return;
        }
        if pattern.contains('.') {
            self.qualified.insert(pattern);
        } else {
            self.bare.insert(pattern);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.qualified.is_empty() && self.bare.is_empty()
    }

    pub fn contains(&self, table: &str) -> bool {
        let lowered = table.to_lowercase();
        if self.qualified.contains(&lowered) || self.bare.contains(&lowered) {
            return true;
        }
        match split_table_name(&lowered) {
            Ok((_, name)) => self.bare.contains(name),
            Err(_) => false,
        }
    }

    /// Normalised patterns, qualified ones first.
    pub fn patterns(&self) -> Vec<String> {
        self.qualified
            .iter()
            .chain(self.bare.iter())
            .cloned()
            .collect()
    }

    /// Patterns that match no table of `graph`, usually a typo in configuration.
    pub fn unmatched(&self, graph: &FkGraph) -> Vec<String> {
        self.patterns()
            .into_iter()
            .filter(|pattern| {
                !graph
                    .tables()
                    .iter()
                    .any(|table| pattern_matches(pattern, &table.to_lowercase()))
            })
            .collect()
    }
}

fn pattern_matches(pattern: &str, table: &str) -> bool {
    if pattern == table {
        return true;
    }
    !pattern.contains('.')
        && split_table_name(table).is_ok_and(|(_, name)| name == pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_case_insensitively() {
        let protected = ProtectedSet::new(["Public.Users"]);
        assert!(protected.contains("public.users"));
        assert!(protected.contains("PUBLIC.USERS"));
        assert!(!protected.contains("public.orders"));
    }

    #[test]
    fn bare_names_match_any_schema() {
        let protected = ProtectedSet::new(["Settings"]);
        assert!(protected.contains("app.settings"));
        assert!(protected.contains("billing.SETTINGS"));
        assert!(protected.contains("settings"));
        assert!(!protected.contains("app.settings_history"));
    }

    #[test]
    fn ignores_blank_patterns() {
        let protected = ProtectedSet::new(["", "  "]);
        assert!(protected.is_empty());
    }

    #[test]
    fn reports_unmatched_patterns() {
        let graph = FkGraph::build(["app.users", "app.orders"], Vec::<(&str, &str)>::new());
        let protected = ProtectedSet::new(["app.users", "usres", "orders"]);
        assert_eq!(protected.unmatched(&graph), vec!["usres"]);
    }
}
