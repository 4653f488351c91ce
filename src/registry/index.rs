//! Detection index built from mapping snapshots.
//!
//! Each table maps a token to the syntax names declaring it. Lists are ordered
//! so that names only present in the user layer come before bundled names;
//! within each group names follow case-insensitive order. The first entry of a
//! list wins detection.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::mapping::{MappingKind, MappingSnapshot};
use crate::model::definition::caseless_cmp;

/// Token -> ordered owning names
pub type MappingTable = HashMap<String, Vec<String>>;

/// Names in detection preference order: names the bundled layer does not
/// know first, then bundled names, each group sorted case-insensitively.
pub fn ordered_names<'a>(
    bundled: &'a HashMap<String, MappingSnapshot>,
    user: &'a HashMap<String, MappingSnapshot>,
) -> Vec<&'a str> {
    let mut added: Vec<&str> = user
        .keys()
        .filter(|name| !bundled.contains_key(*name))
        .map(String::as_str)
        .collect();
    added.sort_by(|a, b| caseless_cmp(a, b));

    let mut builtin: Vec<&str> = bundled.keys().map(String::as_str).collect();
    builtin.sort_by(|a, b| caseless_cmp(a, b));

    added.extend(builtin);
    added
}

/// The three detection tables.
#[derive(Debug, Clone, Default)]
pub struct MappingTables {
    pub extensions: MappingTable,
    pub filenames: MappingTable,
    pub interpreters: MappingTable,
    /// Lowercased extension -> names, for case-insensitive fallback
    extensions_caseless: MappingTable,
}

impl MappingTables {
    /// Merge `user` over `bundled` and invert the result.
    ///
    /// A user snapshot replaces the bundled snapshot of the same name entirely.
    pub fn build(
        bundled: &HashMap<String, MappingSnapshot>,
        user: &HashMap<String, MappingSnapshot>,
    ) -> Self {
        let mut merged: HashMap<&str, &MappingSnapshot> = bundled
            .iter()
            .map(|(name, snapshot)| (name.as_str(), snapshot))
            .collect();
        for (name, snapshot) in user {
            merged.insert(name.as_str(), snapshot);
        }

        let mut tables = Self::default();
        for name in ordered_names(bundled, user) {
            let Some(snapshot) = merged.get(name) else {
                continue;
            };
            for kind in MappingKind::ALL {
                for token in snapshot.tokens(kind) {
                    push_unique(tables.table_mut(kind), token, name);
                }
            }
            for ext in &snapshot.extensions {
                push_unique(&mut tables.extensions_caseless, &ext.to_lowercase(), name);
            }
        }

        tables
    }

    /// Table for one token kind.
    pub fn table(&self, kind: MappingKind) -> &MappingTable {
        match kind {
            MappingKind::Extension => &self.extensions,
            MappingKind::Filename => &self.filenames,
            MappingKind::Interpreter => &self.interpreters,
        }
    }

    fn table_mut(&mut self, kind: MappingKind) -> &mut MappingTable {
        match kind {
            MappingKind::Extension => &mut self.extensions,
            MappingKind::Filename => &mut self.filenames,
            MappingKind::Interpreter => &mut self.interpreters,
        }
    }

    /// Winning name for an exact token.
    pub fn lookup(&self, kind: MappingKind, token: &str) -> Option<&str> {
        self.table(kind)
            .get(token)
            .and_then(|names| names.first())
            .map(String::as_str)
    }

    /// Winning name for an extension compared case-insensitively.
    pub fn lookup_extension_caseless(&self, extension: &str) -> Option<&str> {
        self.extensions_caseless
            .get(&extension.to_lowercase())
            .and_then(|names| names.first())
            .map(String::as_str)
    }

    /// Tokens claimed by more than one name.
    pub fn conflicts(&self) -> MappingConflicts {
        fn collect(table: &MappingTable) -> BTreeMap<String, Vec<String>> {
            table
                .iter()
                .filter(|(_, names)| names.len() > 1)
                .map(|(token, names)| (token.clone(), names.clone()))
                .collect()
        }

        MappingConflicts {
            extensions: collect(&self.extensions),
            filenames: collect(&self.filenames),
            interpreters: collect(&self.interpreters),
        }
    }
}

fn push_unique(table: &mut MappingTable, token: &str, name: &str) {
    let names = table.entry(token.to_string()).or_default();
    if !names.iter().any(|n| n == name) {
        names.push(name.to_string());
    }
}

/// Tokens declared by several syntaxes, for diagnostics.
///
/// Resolution never consults this; it always takes the first listed name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingConflicts {
    pub extensions: BTreeMap<String, Vec<String>>,
    pub filenames: BTreeMap<String, Vec<String>>,
    pub interpreters: BTreeMap<String, Vec<String>>,
}

impl MappingConflicts {
    pub fn get(&self, kind: MappingKind) -> &BTreeMap<String, Vec<String>> {
        match kind {
            MappingKind::Extension => &self.extensions,
            MappingKind::Filename => &self.filenames,
            MappingKind::Interpreter => &self.interpreters,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty() && self.filenames.is_empty() && self.interpreters.is_empty()
    }

    /// Names involved in any conflict.
    pub fn names(&self) -> HashSet<&str> {
        MappingKind::ALL
            .iter()
            .flat_map(|kind| self.get(*kind).values())
            .flatten()
            .map(String::as_str)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(extensions: &[&str], filenames: &[&str], interpreters: &[&str]) -> MappingSnapshot {
        MappingSnapshot {
            extensions: extensions.iter().map(|s| s.to_string()).collect(),
            filenames: filenames.iter().map(|s| s.to_string()).collect(),
            interpreters: interpreters.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn bundled() -> HashMap<String, MappingSnapshot> {
        HashMap::from([
            (
                "Makefile".to_string(),
                snapshot(&["mk"], &["Makefile"], &["make"]),
            ),
            ("C".to_string(), snapshot(&["c", "h"], &[], &[])),
            ("C++".to_string(), snapshot(&["C", "cpp", "h"], &[], &[])),
        ])
    }

    #[test]
    fn test_ordered_names_puts_added_names_first() {
        let bundled = bundled();
        let user = HashMap::from([
            ("zed".to_string(), MappingSnapshot::default()),
            ("Apex".to_string(), MappingSnapshot::default()),
            ("C".to_string(), MappingSnapshot::default()),
        ]);
        assert_eq!(
            ordered_names(&bundled, &user),
            vec!["Apex", "zed", "C", "C++", "Makefile"]
        );
    }

    #[test]
    fn test_user_defined_name_wins_shared_token() {
        let user = HashMap::from([(
            "My Make".to_string(),
            snapshot(&[], &["Makefile"], &[]),
        )]);
        let tables = MappingTables::build(&bundled(), &user);

        assert_eq!(
            tables.filenames["Makefile"],
            vec!["My Make".to_string(), "Makefile".to_string()]
        );
        assert_eq!(
            tables.lookup(MappingKind::Filename, "Makefile"),
            Some("My Make")
        );
    }

    #[test]
    fn test_user_snapshot_replaces_bundled_entirely() {
        let user = HashMap::from([("Makefile".to_string(), snapshot(&["mak"], &[], &[]))]);
        let tables = MappingTables::build(&bundled(), &user);

        assert_eq!(tables.lookup(MappingKind::Extension, "mak"), Some("Makefile"));
        assert_eq!(tables.lookup(MappingKind::Extension, "mk"), None);
        assert_eq!(tables.lookup(MappingKind::Filename, "Makefile"), None);
        assert_eq!(tables.lookup(MappingKind::Interpreter, "make"), None);
    }

    #[test]
    fn test_caseless_extension_lookup() {
        let tables = MappingTables::build(&bundled(), &HashMap::new());

        assert_eq!(tables.lookup(MappingKind::Extension, "C"), Some("C++"));
        assert_eq!(tables.lookup(MappingKind::Extension, "c"), Some("C"));
        assert_eq!(tables.lookup(MappingKind::Extension, "CPP"), None);
        assert_eq!(tables.lookup_extension_caseless("CPP"), Some("C++"));
        assert_eq!(tables.lookup_extension_caseless("H"), Some("C"));
    }

    #[test]
    fn test_conflicts_only_list_shared_tokens() {
        let tables = MappingTables::build(&bundled(), &HashMap::new());
        let conflicts = tables.conflicts();

        assert_eq!(conflicts.extensions.len(), 1);
        assert_eq!(
            conflicts.extensions["h"],
            vec!["C".to_string(), "C++".to_string()]
        );
        assert!(conflicts.filenames.is_empty());
        assert!(conflicts.interpreters.is_empty());
        assert_eq!(conflicts.names(), HashSet::from(["C", "C++"]));
    }

    #[test]
    fn test_empty_layers_build_empty_tables() {
        let tables = MappingTables::build(&HashMap::new(), &HashMap::new());
        assert!(tables.extensions.is_empty());
        assert!(tables.conflicts().is_empty());
    }
}
