//! Encoding of syntax files and the bundled manifest.
//!
//! Syntax definitions are YAML documents; the bundled manifest is JSON.

use std::collections::HashMap;

use super::error::SyntaxError;
use super::mapping::MappingSnapshot;
use crate::model::definition::Definition;

/// Parse a full syntax definition.
pub fn parse_definition(bytes: &[u8]) -> Result<Definition, serde_yaml::Error> {
    serde_yaml::from_slice(bytes)
}

/// Parse only the association fields of a syntax file.
pub fn parse_mapping(bytes: &[u8]) -> Result<MappingSnapshot, serde_yaml::Error> {
    serde_yaml::from_slice(bytes)
}

/// Encode a definition for writing to disk.
pub fn serialize_definition(definition: &Definition) -> Result<Vec<u8>, SyntaxError> {
    serde_yaml::to_string(definition)
        .map(String::into_bytes)
        .map_err(|e| SyntaxError::Serialize(e.to_string()))
}

/// Parse a manifest mapping each syntax name to its associations.
pub fn parse_manifest(bytes: &[u8]) -> Result<HashMap<String, MappingSnapshot>, SyntaxError> {
    serde_json::from_slice(bytes).map_err(|e| SyntaxError::Serialize(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::definition::{Highlight, SyntaxKind};

    const RUBY: &str = r#"
kind: code
keywords:
- begin: def
- begin: end
strings:
- begin: '"'
  end: '"'
commentDelimiters:
  inline: '#'
extensions:
- rb
interpreters:
- ruby
metadata:
  author: someone
"#;

    #[test]
    fn test_parse_definition() {
        let definition = parse_definition(RUBY.as_bytes()).unwrap();
        assert_eq!(definition.kind, SyntaxKind::Code);
        assert_eq!(definition.keywords.len(), 2);
        assert_eq!(definition.strings[0].end.as_deref(), Some("\""));
        assert_eq!(definition.comment_delimiters.inline.as_deref(), Some("#"));
        assert_eq!(definition.metadata.author.as_deref(), Some("someone"));
        assert!(definition.filenames.is_empty());
    }

    #[test]
    fn test_parse_mapping_ignores_rule_groups() {
        let mapping = parse_mapping(RUBY.as_bytes()).unwrap();
        assert_eq!(mapping.extensions, vec!["rb"]);
        assert_eq!(mapping.interpreters, vec!["ruby"]);
        assert!(mapping.filenames.is_empty());
    }

    #[test]
    fn test_serialized_definition_parses_back() {
        let definition = Definition {
            keywords: vec![Highlight::regex(r"\bfn\b")],
            extensions: vec!["rs".to_string()],
            ..Definition::default()
        };
        let bytes = serialize_definition(&definition).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.contains("isRegularExpression: true"));
        assert!(!text.contains("ignoreCase"));
        assert_eq!(parse_definition(&bytes).unwrap(), definition);
    }

    #[test]
    fn test_malformed_yaml_is_an_error() {
        assert!(parse_definition(b"keywords: [unterminated").is_err());
        assert!(parse_mapping(b"extensions: {a: [").is_err());
    }

    #[test]
    fn test_parse_manifest() {
        let manifest = parse_manifest(
            br#"{"Go": {"extensions": ["go"], "filenames": [], "interpreters": []}}"#,
        )
        .unwrap();
        assert_eq!(manifest["Go"].extensions, vec!["go"]);
        assert!(parse_manifest(b"[1, 2").is_err());
    }
}
