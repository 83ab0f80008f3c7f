//! Chain specification loading
//!
//! Each `(rollup, execution environment)` pair has one JSON file holding an ordered list of
//! forks. Forks are deltas: applying them in file order yields the current opcode, precompile
//! and system contract tables of the chain.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::SourceError;

/// One opcode, precompile or system contract entry
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChainSpecElement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    // Unknown fields, and known ones that are not strings, are passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn take_string(object: &mut Map<String, Value>, key: &str) -> Option<String> {
    if !object.get(key).is_some_and(Value::is_string) {
        return None;
    }
    match object.remove(key) {
        Some(Value::String(value)) => Some(value),
        _ => None,
    }
}

impl From<Map<String, Value>> for ChainSpecElement {
    fn from(mut object: Map<String, Value>) -> Self {
        Self {
            name: take_string(&mut object, "name"),
            description: take_string(&mut object, "description"),
            description2: take_string(&mut object, "description2"),
            url: take_string(&mut object, "url"),
            extra: object,
        }
    }
}

/// Code (hex opcode or address) to element, in insertion order
pub type ElementMap = IndexMap<String, ChainSpecElement>;

/// Entries of one fork section. Anything that is not an object is skipped.
fn element_map(section: Option<Value>) -> ElementMap {
    let Some(Value::Object(section)) = section else {
        return ElementMap::new();
    };

    section
        .into_iter()
        .filter_map(|(code, element)| match element {
            Value::Object(object) => Some((code, ChainSpecElement::from(object))),
            other => {
                debug!(code = %code, value = %other, "skipping non-object element");
                None
            }
        })
        .collect()
}

/// A single delta layer of a chain specification
#[derive(Debug, Clone, Default)]
pub struct Fork {
    pub opcodes: ElementMap,
    pub precompiles: ElementMap,
    pub system_contracts: ElementMap,
}

impl Fork {
    /// Read a fork from its JSON value. A fork that is not an object contributes nothing.
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut fork) = value else {
            return Self::default();
        };

        Self {
            opcodes: element_map(fork.remove("opcodes")),
            precompiles: element_map(fork.remove("precompiles")),
            system_contracts: element_map(fork.remove("system_contracts")),
        }
    }
}

/// Flattened view of a chain after every fork has been applied
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChainSpec {
    #[serde(rename = "chainId")]
    pub chain_id: Option<u64>,
    pub description: Option<String>,
    pub opcodes: ElementMap,
    pub precompiles: ElementMap,
    pub system_contracts: ElementMap,
}

impl ChainSpec {
    /// Overlay a fork on top of the current state.
    ///
    /// Later entries replace earlier ones wholesale; a replaced code keeps the position it was
    /// first inserted at.
    pub fn apply_fork(&mut self, fork: Fork) {
        self.opcodes.extend(fork.opcodes);
        self.precompiles.extend(fork.precompiles);
        self.system_contracts.extend(fork.system_contracts);
    }
}

/// Path of the specification file for a rollup and optional environment suffix
pub fn spec_path(specs_dir: &Path, rollup: &str, exec_env: Option<&str>) -> PathBuf {
    let stem = match exec_env {
        Some(env) => format!("{}_{}", rollup, env),
        None => rollup.to_string(),
    };
    specs_dir.join(format!("{}.json", stem))
}

/// Parse the content of a specification file and flatten its forks.
///
/// Only invalid JSON is an error. Top-level values of an unexpected type are treated as
/// absent rather than discarding the whole file.
pub fn parse_chain_spec(content: &str) -> Result<ChainSpec, serde_json::Error> {
    let mut file: Value = serde_json::from_str(content)?;

    let mut spec = ChainSpec {
        chain_id: file.get("chain_id").and_then(Value::as_u64),
        description: file
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string),
        ..Default::default()
    };

    if let Some(Value::Array(forks)) = file.get_mut("forks").map(Value::take) {
        for fork in forks {
            spec.apply_fork(Fork::from_value(fork));
        }
    }

    Ok(spec)
}

/// Load and flatten the specification of `rollup`.
///
/// # Errors
///
/// Returns [`SourceError`] if the file is absent, cannot be read or is not valid JSON. Callers that want best-effort behavior fall back to `ChainSpec::default()`.
pub fn load_chain_spec(
    specs_dir: &Path,
    rollup: &str,
    exec_env: Option<&str>,
) -> Result<ChainSpec, SourceError> {
    let path = spec_path(specs_dir, rollup, exec_env);
    let content =
        std::fs::read_to_string(&path).map_err(|e| SourceError::from_io(path.clone(), e))?;
    parse_chain_spec(&content).map_err(|source| SourceError::Malformed { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_spec(dir: &TempDir, file: &str, content: &str) {
        std::fs::write(dir.path().join(file), content).unwrap();
    }

    /// Test that a later fork overrides an earlier one for the same opcode
    #[test]
    fn test_later_fork_wins() {
        let json = r#"{
            "chain_id": 1,
            "forks": [
                {"opcodes": {"0x01": {"name": "ADD"}}},
                {"opcodes": {"0x01": {"name": "ADD2"}}}
            ]
        }"#;

        let spec = parse_chain_spec(json).unwrap();
        assert_eq!(spec.chain_id, Some(1));
        assert_eq!(spec.opcodes.len(), 1);
        assert_eq!(spec.opcodes["0x01"].name.as_deref(), Some("ADD2"));
    }

    /// Test that a replaced entry is swapped whole rather than merged field by field
    #[test]
    fn test_override_replaces_whole_element() {
        let json = r#"{
            "forks": [
                {"precompiles": {"0x01": {"name": "ecrecover", "url": "https://example.org"}}},
                {"precompiles": {"0x01": {"name": "ecrecover", "description": "patched"}}}
            ]
        }"#;

        let spec = parse_chain_spec(json).unwrap();
        let element = &spec.precompiles["0x01"];
        assert_eq!(element.description.as_deref(), Some("patched"));
        assert!(element.url.is_none());
    }

    /// Test that every key from every fork survives flattening, in first-seen order
    #[test]
    fn test_union_of_fork_keys_in_insertion_order() {
        let json = r#"{
            "forks": [
                {"opcodes": {"0x02": {"name": "MUL"}, "0x01": {"name": "ADD"}}},
                {"opcodes": {"0x5f": {"name": "PUSH0"}, "0x02": {"name": "MUL2"}}},
                {"system_contracts": {"0x4200000000000000000000000000000000000015": {"name": "L1Block"}}}
            ]
        }"#;

        let spec = parse_chain_spec(json).unwrap();
        let codes: Vec<&str> = spec.opcodes.keys().map(String::as_str).collect();
        assert_eq!(codes, vec!["0x02", "0x01", "0x5f"]);
        assert_eq!(spec.opcodes["0x02"].name.as_deref(), Some("MUL2"));
        assert_eq!(spec.system_contracts.len(), 1);
        assert!(spec.precompiles.is_empty());
    }

    /// Test that forks without sub-maps and files without forks are accepted
    #[test]
    fn test_missing_sections_are_empty() {
        let spec = parse_chain_spec(r#"{"description": "EVM", "forks": [{}]}"#).unwrap();
        assert_eq!(spec.description.as_deref(), Some("EVM"));
        assert!(spec.chain_id.is_none());
        assert!(spec.opcodes.is_empty());

        let spec = parse_chain_spec(r#"{"chain_id": 10}"#).unwrap();
        assert_eq!(spec.chain_id, Some(10));
        assert!(spec.system_contracts.is_empty());
    }

    /// Test that unknown element fields are preserved
    #[test]
    fn test_unknown_element_fields_preserved() {
        let json = r#"{"forks": [{"opcodes": {"0x40": {"name": "BLOCKHASH", "status": "Modified"}}}]}"#;
        let spec = parse_chain_spec(json).unwrap();
        assert_eq!(
            spec.opcodes["0x40"].extra.get("status"),
            Some(&Value::String("Modified".to_string()))
        );
    }

    /// Test that values of an unexpected type are dropped without losing the rest of the file
    #[test]
    fn test_unexpected_types_do_not_discard_file() {
        let json = r#"{
            "chain_id": "0xa",
            "description": 7,
            "forks": [
                null,
                {"opcodes": {"0x01": {"name": "ADD"}, "0x02": "MUL"}},
                {"precompiles": [1, 2], "opcodes": {"0x5f": {"name": "PUSH0", "url": ["https://a", "https://b"]}}}
            ]
        }"#;

        let spec = parse_chain_spec(json).unwrap();
        assert_eq!(spec.chain_id, None);
        assert_eq!(spec.description, None);
        assert!(spec.precompiles.is_empty());

        let codes: Vec<&str> = spec.opcodes.keys().map(String::as_str).collect();
        assert_eq!(codes, vec!["0x01", "0x5f"]);

        let push0 = &spec.opcodes["0x5f"];
        assert_eq!(push0.name.as_deref(), Some("PUSH0"));
        assert!(push0.url.is_none());
        assert_eq!(
            serde_json::to_value(push0).unwrap(),
            serde_json::json!({"name": "PUSH0", "url": ["https://a", "https://b"]})
        );

        // forks that isn't a list
        let spec = parse_chain_spec(r#"{"chain_id": 10, "forks": {}}"#).unwrap();
        assert_eq!(spec.chain_id, Some(10));
        assert!(spec.opcodes.is_empty());
    }

    /// Test that an element without a name serializes without the key
    #[test]
    fn test_unnamed_element_omits_name() {
        let spec =
            parse_chain_spec(r#"{"forks": [{"system_contracts": {"0x01": {"url": "https://x"}}}]}"#)
                .unwrap();
        let element = &spec.system_contracts["0x01"];
        assert!(element.name.is_none());
        assert_eq!(
            serde_json::to_value(element).unwrap(),
            serde_json::json!({"url": "https://x"})
        );
    }

    /// Test that the environment suffix is appended to the file stem
    #[test]
    fn test_spec_path() {
        let dir = Path::new("/specs");
        assert_eq!(
            spec_path(dir, "optimism", None),
            PathBuf::from("/specs/optimism.json")
        );
        assert_eq!(
            spec_path(dir, "zksync", Some("eravm")),
            PathBuf::from("/specs/zksync_eravm.json")
        );
    }

    /// Test loading a spec file from disk with an environment suffix
    #[test]
    fn test_load_chain_spec_from_disk() {
        let dir = TempDir::new().unwrap();
        write_spec(
            &dir,
            "zksync_eravm.json",
            r#"{"chain_id": 324, "forks": [{"opcodes": {"0xff": {"name": "SELFDESTRUCT"}}}]}"#,
        );

        let spec = load_chain_spec(dir.path(), "zksync", Some("eravm")).unwrap();
        assert_eq!(spec.chain_id, Some(324));
        assert_eq!(spec.opcodes["0xff"].name.as_deref(), Some("SELFDESTRUCT"));
    }

    /// Test that an absent file is reported as missing and the default is empty
    #[test]
    fn test_missing_file_reports_missing() {
        let dir = TempDir::new().unwrap();
        let err = load_chain_spec(dir.path(), "ghost", None).unwrap_err();
        assert!(matches!(err, SourceError::Missing { .. }));

        let fallback = ChainSpec::default();
        let json = serde_json::to_value(&fallback).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "chainId": null,
                "description": null,
                "opcodes": {},
                "precompiles": {},
                "system_contracts": {}
            })
        );
    }

    /// Test that invalid JSON is reported as malformed
    #[test]
    fn test_invalid_json_reports_malformed() {
        let dir = TempDir::new().unwrap();
        write_spec(&dir, "broken.json", "{ not json");

        let err = load_chain_spec(dir.path(), "broken", None).unwrap_err();
        assert_eq!(err.kind(), "malformed");
    }
}
