//! Syntax definition document model.
//!
//! A `Definition` is the parsed form of one syntax file: highlight rule groups,
//! comment delimiters, outline rules, completion words and the file
//! associations that feed detection. It carries no behavior beyond structural
//! equality and `sanitized()`, which produces the canonical ordering written to
//! disk on save.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::registry::MappingSnapshot;

/// Compare two strings ignoring case, falling back to a byte comparison so the
/// order is total and deterministic.
pub fn caseless_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Broad category of a syntax. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyntaxKind {
    #[default]
    General,
    Code,
}

/// The semantic classes a highlight rule can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightCategory {
    Keywords,
    Commands,
    Types,
    Attributes,
    Variables,
    Values,
    Numbers,
    Strings,
    Characters,
    Comments,
}

impl HighlightCategory {
    /// All categories in display order.
    pub const ALL: [HighlightCategory; 10] = [
        HighlightCategory::Keywords,
        HighlightCategory::Commands,
        HighlightCategory::Types,
        HighlightCategory::Attributes,
        HighlightCategory::Variables,
        HighlightCategory::Values,
        HighlightCategory::Numbers,
        HighlightCategory::Strings,
        HighlightCategory::Characters,
        HighlightCategory::Comments,
    ];

    /// Key used for this category in syntax files.
    pub fn as_str(self) -> &'static str {
        match self {
            HighlightCategory::Keywords => "keywords",
            HighlightCategory::Commands => "commands",
            HighlightCategory::Types => "types",
            HighlightCategory::Attributes => "attributes",
            HighlightCategory::Variables => "variables",
            HighlightCategory::Values => "values",
            HighlightCategory::Numbers => "numbers",
            HighlightCategory::Strings => "strings",
            HighlightCategory::Characters => "characters",
            HighlightCategory::Comments => "comments",
        }
    }
}

impl std::fmt::Display for HighlightCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single highlight rule.
///
/// `begin` is either a literal word or, when `is_regular_expression` is set, a
/// pattern. With an `end` the rule spans from `begin` to `end`. Patterns are not
/// compiled or checked here.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    pub begin: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub is_regular_expression: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub ignore_case: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Highlight {
    /// Literal word rule
    pub fn word(begin: impl Into<String>) -> Self {
        Self {
            begin: begin.into(),
            ..Self::default()
        }
    }

    /// Regular expression rule
    pub fn regex(begin: impl Into<String>) -> Self {
        Self {
            begin: begin.into(),
            is_regular_expression: true,
            ..Self::default()
        }
    }

    /// Builder: set the closing pattern
    pub fn with_end(mut self, end: impl Into<String>) -> Self {
        self.end = Some(end.into());
        self
    }
}

/// Block comment delimiters. Both ends are always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDelimiters {
    pub begin: String,
    pub end: String,
}

/// Comment markers of a syntax.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommentDelimiters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<BlockDelimiters>,
}

impl CommentDelimiters {
    /// Build delimiters from loose parts. The block pair is kept only when both
    /// of its ends are non-empty.
    pub fn new(inline: Option<String>, block_begin: Option<String>, block_end: Option<String>) -> Self {
        let block = match (block_begin, block_end) {
            (Some(begin), Some(end)) if !begin.is_empty() && !end.is_empty() => {
                Some(BlockDelimiters { begin, end })
            }
            _ => None,
        };
        Self {
            inline: inline.filter(|s| !s.is_empty()),
            block,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inline.is_none() && self.block.is_none()
    }
}

/// Rule extracting outline (document structure) items.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outline {
    pub pattern: String,

    /// Substitution template applied to the match (`$1` etc.)
    #[serde(default)]
    pub template: String,

    #[serde(default, skip_serializing_if = "is_false")]
    pub ignore_case: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub underline: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Provenance fields. Never consulted by resolution.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

/// Parsed syntax definition.
///
/// Equality is structural and order-sensitive: two definitions differing only
/// in rule order compare unequal until both are sanitized.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Definition {
    pub kind: SyntaxKind,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<Highlight>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<Highlight>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<Highlight>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Highlight>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<Highlight>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<Highlight>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub numbers: Vec<Highlight>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub strings: Vec<Highlight>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub characters: Vec<Highlight>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<Highlight>,

    #[serde(skip_serializing_if = "CommentDelimiters::is_empty")]
    pub comment_delimiters: CommentDelimiters,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outlines: Vec<Outline>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub completions: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filenames: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub interpreters: Vec<String>,

    pub metadata: Metadata,
}

impl Definition {
    /// Rules of one category.
    pub fn highlights(&self, category: HighlightCategory) -> &[Highlight] {
        match category {
            HighlightCategory::Keywords => &self.keywords,
            HighlightCategory::Commands => &self.commands,
            HighlightCategory::Types => &self.types,
            HighlightCategory::Attributes => &self.attributes,
            HighlightCategory::Variables => &self.variables,
            HighlightCategory::Values => &self.values,
            HighlightCategory::Numbers => &self.numbers,
            HighlightCategory::Strings => &self.strings,
            HighlightCategory::Characters => &self.characters,
            HighlightCategory::Comments => &self.comments,
        }
    }

    /// Mutable rules of one category.
    pub fn highlights_mut(&mut self, category: HighlightCategory) -> &mut Vec<Highlight> {
        match category {
            HighlightCategory::Keywords => &mut self.keywords,
            HighlightCategory::Commands => &mut self.commands,
            HighlightCategory::Types => &mut self.types,
            HighlightCategory::Attributes => &mut self.attributes,
            HighlightCategory::Variables => &mut self.variables,
            HighlightCategory::Values => &mut self.values,
            HighlightCategory::Numbers => &mut self.numbers,
            HighlightCategory::Strings => &mut self.strings,
            HighlightCategory::Characters => &mut self.characters,
            HighlightCategory::Comments => &mut self.comments,
        }
    }

    /// The association tokens of this definition.
    pub fn mapping(&self) -> MappingSnapshot {
        MappingSnapshot {
            extensions: self.extensions.clone(),
            filenames: self.filenames.clone(),
            interpreters: self.interpreters.clone(),
        }
    }

    /// Canonical copy for persistence.
    ///
    /// Rules with an empty `begin`, outlines with an empty `pattern` and blank
    /// completions are dropped; highlight groups are ordered by `begin`,
    /// outlines by `pattern` and completions by value, all case-insensitively.
    /// Applying it twice yields the same result as applying it once.
    pub fn sanitized(&self) -> Self {
        let mut definition = self.clone();

        for category in HighlightCategory::ALL {
            let rules = definition.highlights_mut(category);
            rules.retain(|rule| !rule.begin.is_empty());
            rules.sort_by(|a, b| caseless_cmp(&a.begin, &b.begin));
        }

        definition.outlines.retain(|outline| !outline.pattern.is_empty());
        definition
            .outlines
            .sort_by(|a, b| caseless_cmp(&a.pattern, &b.pattern));

        definition.completions.retain(|word| !word.trim().is_empty());
        definition.completions.sort_by(|a, b| caseless_cmp(a, b));

        definition
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_caseless_cmp_orders_ignoring_case() {
        assert_eq!(caseless_cmp("apple", "Banana"), Ordering::Less);
        assert_eq!(caseless_cmp("Zeta", "alpha"), Ordering::Greater);
        // Ties on case are broken deterministically
        assert_ne!(caseless_cmp("abc", "ABC"), Ordering::Equal);
    }

    #[test]
    fn test_highlights_cover_every_category() {
        let mut definition = Definition::default();
        for (index, category) in HighlightCategory::ALL.iter().enumerate() {
            definition
                .highlights_mut(*category)
                .push(Highlight::word(format!("w{index}")));
        }

        assert!(HighlightCategory::ALL
            .iter()
            .all(|category| definition.highlights(*category).len() == 1));
        assert_eq!(definition.keywords[0].begin, "w0");
        assert_eq!(definition.comments[0].begin, "w9");
        assert_eq!(
            definition.highlights(HighlightCategory::Strings)[0].begin,
            "w7"
        );
    }

    #[test]
    fn test_sanitized_sorts_rules_case_insensitively() {
        let definition = Definition {
            keywords: vec![
                Highlight::word("while"),
                Highlight::word("Break"),
                Highlight::word("if"),
            ],
            outlines: vec![
                Outline {
                    pattern: "^fn".to_string(),
                    ..Outline::default()
                },
                Outline {
                    pattern: "^CLASS".to_string(),
                    ..Outline::default()
                },
            ],
            completions: vec!["zip".to_string(), "Map".to_string(), "apply".to_string()],
            ..Definition::default()
        };

        let sanitized = definition.sanitized();
        let keywords: Vec<_> = sanitized.keywords.iter().map(|h| h.begin.as_str()).collect();
        assert_eq!(keywords, vec!["Break", "if", "while"]);
        assert_eq!(sanitized.outlines[0].pattern, "^CLASS");
        assert_eq!(sanitized.completions, vec!["apply", "Map", "zip"]);
        // Loaded order is untouched
        assert_eq!(definition.keywords[0].begin, "while");
    }

    #[test]
    fn test_sanitized_drops_blank_entries() {
        let definition = Definition {
            strings: vec![Highlight::word(""), Highlight::word("\"").with_end("\"")],
            outlines: vec![Outline::default()],
            completions: vec!["  ".to_string(), "print".to_string()],
            ..Definition::default()
        };

        let sanitized = definition.sanitized();
        assert_eq!(sanitized.strings.len(), 1);
        assert!(sanitized.outlines.is_empty());
        assert_eq!(sanitized.completions, vec!["print"]);
    }

    #[test]
    fn test_equality_is_order_sensitive() {
        let a = Definition {
            keywords: vec![Highlight::word("a"), Highlight::word("b")],
            ..Definition::default()
        };
        let b = Definition {
            keywords: vec![Highlight::word("b"), Highlight::word("a")],
            ..Definition::default()
        };
        assert_ne!(a, b);
        assert_eq!(a.sanitized(), b.sanitized());
    }

    #[test]
    fn test_comment_delimiters_require_both_block_ends() {
        let only_begin = CommentDelimiters::new(Some("//".to_string()), Some("/*".to_string()), None);
        assert_eq!(only_begin.inline.as_deref(), Some("//"));
        assert!(only_begin.block.is_none());

        let both = CommentDelimiters::new(None, Some("/*".to_string()), Some("*/".to_string()));
        assert_eq!(
            both.block,
            Some(BlockDelimiters {
                begin: "/*".to_string(),
                end: "*/".to_string()
            })
        );

        let empty_end = CommentDelimiters::new(None, Some("/*".to_string()), Some(String::new()));
        assert!(empty_end.is_empty());
    }

    #[test]
    fn test_mapping_projects_association_fields() {
        let definition = Definition {
            extensions: vec!["rb".to_string()],
            filenames: vec!["Rakefile".to_string()],
            interpreters: vec!["ruby".to_string()],
            ..Definition::default()
        };
        let mapping = definition.mapping();
        assert_eq!(mapping.extensions, vec!["rb"]);
        assert_eq!(mapping.filenames, vec!["Rakefile"]);
        assert_eq!(mapping.interpreters, vec!["ruby"]);
    }

    fn highlight_strategy() -> impl Strategy<Value = Highlight> {
        ("[a-zA-Z]{0,6}", any::<bool>(), any::<bool>()).prop_map(|(begin, regex, ignore_case)| {
            Highlight {
                begin,
                end: None,
                is_regular_expression: regex,
                ignore_case,
                description: None,
            }
        })
    }

    fn definition_strategy() -> impl Strategy<Value = Definition> {
        (
            prop::collection::vec(highlight_strategy(), 0..8),
            prop::collection::vec(highlight_strategy(), 0..8),
            prop::collection::vec("[a-zA-Z ]{0,5}", 0..8),
            prop::collection::vec("[a-zA-Z^$]{0,5}", 0..5),
        )
            .prop_map(|(keywords, comments, completions, patterns)| Definition {
                keywords,
                comments,
                completions,
                outlines: patterns
                    .into_iter()
                    .map(|pattern| Outline {
                        pattern,
                        ..Outline::default()
                    })
                    .collect(),
                ..Definition::default()
            })
    }

    proptest! {
        #[test]
        fn prop_sanitized_is_idempotent(definition in definition_strategy()) {
            let once = definition.sanitized();
            prop_assert_eq!(once.sanitized(), once);
        }
    }
}
