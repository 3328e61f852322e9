//! Batch plan files: JSON when the extension says so, YAML otherwise.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::batch::{BatchOptions, ItemDescriptor};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("unable to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse json '{path}': {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unable to parse yaml '{path}': {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid batch plan '{path}': {source}")]
    Shape {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A plan: shared options and the items to cost.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchFile {
    #[serde(default)]
    pub options: BatchOptions,
    pub items: Vec<ItemDescriptor>,
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Parses a plan document into a generic value without interpreting it.
pub fn parse_document(content: &str, json: bool, path: &str) -> Result<Value, LoadError> {
    if json {
        serde_json::from_str(content).map_err(|source| LoadError::Json {
            path: path.to_string(),
            source,
        })
    } else {
        serde_yaml::from_str(content).map_err(|source| LoadError::Yaml {
            path: path.to_string(),
            source,
        })
    }
}

/// Interprets a document as a plan. A bare list is taken as the item list.
pub fn batch_from_value(value: Value, path: &str) -> Result<BatchFile, LoadError> {
    let shape = |source: serde_json::Error| LoadError::Shape {
        path: path.to_string(),
        source,
    };
    if value.is_array() {
        let items = serde_json::from_value(value).map_err(shape)?;
        Ok(BatchFile {
            options: BatchOptions::default(),
            items,
        })
    } else {
        serde_json::from_value(value).map_err(shape)
    }
}

pub fn parse_batch(content: &str, json: bool, path: &str) -> Result<BatchFile, LoadError> {
    batch_from_value(parse_document(content, json, path)?, path)
}

/// Reads a plan file as a generic value, choosing the parser by extension.
pub fn read_document(path: impl AsRef<Path>) -> Result<Value, LoadError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: display.clone(),
        source,
    })?;
    parse_document(&content, is_json(path), &display)
}

pub fn load_batch_file(path: impl AsRef<Path>) -> Result<BatchFile, LoadError> {
    let display = path.as_ref().display().to_string();
    batch_from_value(read_document(path)?, &display)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::potential::PotentialTier;

    #[test]
    fn parses_yaml_plan_with_options() {
        let yaml = r#"
options:
  trials: 500
  seed: 7
items:
  - id: hat
    level: 150
    star_force:
      current_tier: 0
      target_tier: 17
      modifiers:
        cost_discount_30: true
  - id: ring
    level: 140
    included: false
    potential:
      current_tier: rare
      target_tier: unique
      cube:
        mode: fixed
        cube: black
"#;
        let file = parse_batch(yaml, false, "plan.yaml").unwrap();
        assert_eq!(file.options.trials, Some(500));
        assert_eq!(file.items.len(), 2);
        let hat = &file.items[0];
        assert!(hat.included);
        assert!(hat.star_force.unwrap().modifiers.cost_discount_30);
        let ring = &file.items[1];
        assert!(!ring.included);
        assert_eq!(ring.potential.unwrap().target_tier, PotentialTier::Unique);
    }

    #[test]
    fn parses_bare_json_item_list() {
        let json = r#"[{"id":"belt","level":160,"star_force":{"current_tier":5,"target_tier":10}}]"#;
        let file = parse_batch(json, true, "plan.json").unwrap();
        assert_eq!(file.options, BatchOptions::default());
        assert_eq!(file.items[0].id, "belt");
    }

    #[test]
    fn malformed_input_names_the_file() {
        let err = parse_batch("{not json", true, "broken.json").unwrap_err();
        assert!(err.to_string().starts_with("unable to parse json 'broken.json'"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_batch_file("/nonexistent/plan.yaml").unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn wrong_shape_is_reported_with_detail() {
        let err = parse_batch("items:\n  - id: hat\n", false, "plan.yaml").unwrap_err();
        assert!(matches!(err, LoadError::Shape { .. }));
        assert!(err.to_string().contains("level"));
    }

    #[test]
    fn extension_selects_json() {
        assert!(is_json(Path::new("plan.JSON")));
        assert!(!is_json(Path::new("plan.yml")));
        assert!(!is_json(Path::new("plan")));
    }
}
