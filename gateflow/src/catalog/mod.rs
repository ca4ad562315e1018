//! Static, ordered stage catalogs.
//!
//! A [`StageCatalog`] is validated once at construction and is read-only
//! afterwards. Ordinals are assigned from list position.

mod definition;
mod underwriting;

pub use definition::StageDefinition;

use crate::core::StageId;
use crate::errors::{CatalogValidationError, GateflowError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;

/// Pattern every stage id must match (lowercase kebab-case).
pub const STAGE_ID_PATTERN: &str = r"^[a-z0-9]+(-[a-z0-9]+)*$";

#[allow(clippy::expect_used)]
fn stage_id_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(STAGE_ID_PATTERN).expect("stage id pattern compiles"))
}

/// An ordered, validated list of stage definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<StageDefinition>", into = "Vec<StageDefinition>")]
pub struct StageCatalog {
    stages: Vec<StageDefinition>,
}

impl StageCatalog {
    /// Builds a catalog from definitions in execution order.
    ///
    /// # Errors
    ///
    /// Returns an error on duplicate or malformed ids, empty titles or
    /// stages without sub-tasks.
    pub fn new(stages: Vec<StageDefinition>) -> Result<Self, CatalogValidationError> {
        validate(&stages)?;
        Ok(Self::from_validated(stages))
    }

    /// Creates a catalog with no stages.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn from_validated(mut stages: Vec<StageDefinition>) -> Self {
        for (ordinal, stage) in stages.iter_mut().enumerate() {
            stage.ordinal = ordinal;
        }
        Self { stages }
    }

    /// Parses a catalog from a JSON array of stage definitions.
    ///
    /// Malformed JSON is a `Serialization` error; well-formed definitions
    /// that fail validation are a `CatalogValidation` error.
    pub fn from_json_str(json: &str) -> Result<Self, GateflowError> {
        let stages: Vec<StageDefinition> = serde_json::from_str(json)?;
        Ok(Self::new(stages)?)
    }

    /// Loads a catalog from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, GateflowError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Returns the stages in execution order.
    #[must_use]
    pub fn stages(&self) -> &[StageDefinition] {
        &self.stages
    }

    /// Returns an iterator over the stages.
    pub fn iter(&self) -> std::slice::Iter<'_, StageDefinition> {
        self.stages.iter()
    }

    /// Returns the stage at `ordinal`.
    #[must_use]
    pub fn at(&self, ordinal: usize) -> Option<&StageDefinition> {
        self.stages.get(ordinal)
    }

    /// Looks up a stage by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&StageDefinition> {
        self.stages.iter().find(|s| s.id == id)
    }

    /// Returns the ordinal of a stage id.
    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.stages.iter().position(|s| s.id == id)
    }

    /// Returns true if the catalog contains the id.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// Returns the stages that require checker review.
    #[must_use]
    pub fn requiring_review(&self) -> Vec<&StageDefinition> {
        self.stages.iter().filter(|s| s.requires_review).collect()
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if the catalog has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl TryFrom<Vec<StageDefinition>> for StageCatalog {
    type Error = CatalogValidationError;

    fn try_from(stages: Vec<StageDefinition>) -> Result<Self, Self::Error> {
        Self::new(stages)
    }
}

impl From<StageCatalog> for Vec<StageDefinition> {
    fn from(catalog: StageCatalog) -> Self {
        catalog.stages
    }
}

impl<'a> IntoIterator for &'a StageCatalog {
    type Item = &'a StageDefinition;
    type IntoIter = std::slice::Iter<'a, StageDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn validate(stages: &[StageDefinition]) -> Result<(), CatalogValidationError> {
    let mut seen: HashSet<&StageId> = HashSet::new();

    for stage in stages {
        if !stage_id_regex().is_match(stage.id.as_str()) {
            return Err(CatalogValidationError::new(format!(
                "Stage id '{}' must be lowercase kebab-case",
                stage.id
            ))
            .with_stages(vec![stage.id.to_string()]));
        }

        if !seen.insert(&stage.id) {
            return Err(
                CatalogValidationError::new(format!("Duplicate stage id '{}'", stage.id))
                    .with_stages(vec![stage.id.to_string()]),
            );
        }

        if stage.title.trim().is_empty() {
            return Err(CatalogValidationError::new(format!(
                "Stage '{}' has an empty title",
                stage.id
            ))
            .with_stages(vec![stage.id.to_string()]));
        }

        if stage.subtasks.is_empty() {
            return Err(CatalogValidationError::new(format!(
                "Stage '{}' must declare at least one sub-task",
                stage.id
            ))
            .with_stages(vec![stage.id.to_string()]));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn stage(id: &str) -> StageDefinition {
        StageDefinition::new(id, format!("Stage {id}")).with_subtask("work")
    }

    #[test]
    fn test_catalog_assigns_ordinals() {
        let catalog = StageCatalog::new(vec![stage("a"), stage("b"), stage("c")]).unwrap();

        let ordinals: Vec<usize> = catalog.iter().map(|s| s.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2]);
        assert_eq!(catalog.position("b"), Some(1));
        assert_eq!(catalog.at(2).map(|s| s.id.as_str()), Some("c"));
    }

    #[test]
    fn test_catalog_rejects_duplicate_ids() {
        let err = StageCatalog::new(vec![stage("a"), stage("a")]).unwrap_err();
        assert_eq!(err.stages, vec!["a".to_string()]);
        assert!(err.message.contains("Duplicate"));
    }

    #[test]
    fn test_catalog_rejects_malformed_ids() {
        for bad in ["", "Mortgage", "pfs_analysis", "-lead", "trail-", "a--b"] {
            assert!(
                StageCatalog::new(vec![stage(bad)]).is_err(),
                "expected '{bad}' to be rejected"
            );
        }
    }

    #[test]
    fn test_catalog_rejects_missing_subtasks_and_title() {
        let no_subtasks = StageDefinition::new("a", "A");
        assert!(StageCatalog::new(vec![no_subtasks]).is_err());

        let no_title = StageDefinition::new("a", "  ").with_subtask("x");
        assert!(StageCatalog::new(vec![no_title]).is_err());
    }

    #[test]
    fn test_empty_catalog_is_valid() {
        let catalog = StageCatalog::new(Vec::new()).unwrap();
        assert!(catalog.is_empty());
        assert_eq!(catalog, StageCatalog::empty());
    }

    #[test]
    fn test_catalog_from_json_validates() {
        let json = r#"[
            {"id": "first", "title": "First", "subtasks": ["one"]},
            {"id": "second", "title": "Second", "subtasks": ["two"], "requires_review": true}
        ]"#;
        let catalog = StageCatalog::from_json_str(json).unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.at(1).unwrap().ordinal, 1);
        assert_eq!(catalog.requiring_review().len(), 1);

        let duplicate = r#"[
            {"id": "first", "title": "First", "subtasks": ["one"]},
            {"id": "first", "title": "Again", "subtasks": ["two"]}
        ]"#;
        let err = StageCatalog::from_json_str(duplicate).unwrap_err();
        assert_eq!(err.code(), "CatalogValidation");
        assert!(err.to_string().contains("first"));

        let malformed = r#"[{"id": "Bad Id", "title": "Bad", "subtasks": ["x"]}]"#;
        let err = StageCatalog::from_json_str(malformed).unwrap_err();
        assert_eq!(err.code(), "CatalogValidation");

        let broken = StageCatalog::from_json_str("[{").unwrap_err();
        assert_eq!(broken.code(), "Serialization");
    }

    #[test]
    fn test_catalog_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id": "only", "title": "Only", "subtasks": ["a", "b"], "duration_ms": 10}}]"#
        )
        .unwrap();

        let catalog = StageCatalog::from_path(file.path()).unwrap();
        assert_eq!(catalog.at(0).unwrap().duration_ms, 10);

        let missing = StageCatalog::from_path("/nonexistent/catalog.json").unwrap_err();
        assert_eq!(missing.code(), "Io");
    }
}
