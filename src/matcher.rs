//! Matching file headers to schema columns.
//!
//! Three tiers of evidence are considered, strictly ordered:
//!
//! 1. `exact`: the normalized names are equal (confidence 1.0);
//! 2. `alias`: an alias group links the two names, or links the file header to
//!    the schema column's role (confidence 0.9);
//! 3. `fuzzy`: normalized Levenshtein similarity above the configured threshold.
//!
//! A higher tier always wins over a lower one even when the lower tier reports a
//! higher confidence. Within a tier the highest confidence wins and ties keep
//! the first schema column listed.

use std::collections::HashSet;

use log::debug;
use rapidfuzz::distance::levenshtein;
use serde::{Deserialize, Serialize};

use crate::{
    config::MatchConfig,
    error::{MatchValidationError, OverrideError},
    schema::{ColumnDefinition, ColumnType},
};

pub const EXACT_CONFIDENCE: f64 = 1.0;
pub const ALIAS_CONFIDENCE: f64 = 0.9;

/// Lowercases and strips everything that is not an ASCII letter or digit.
pub fn normalize_column_name(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Normalized edit-distance similarity in `[0, 1]`.
pub fn calculate_similarity(a: &str, b: &str) -> f64 {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.0,
        _ => levenshtein::normalized_similarity(a.chars(), b.chars()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Exact,
    Alias,
    Fuzzy,
    None,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Exact => "exact",
            MatchType::Alias => "alias",
            MatchType::Fuzzy => "fuzzy",
            MatchType::None => "none",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            MatchType::Exact => 3,
            MatchType::Alias => 2,
            MatchType::Fuzzy => 1,
            MatchType::None => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchCandidate {
    pub schema_column_id: String,
    pub confidence: f64,
    pub match_type: MatchType,
}

/// Request to add a schema column for a file column that has no counterpart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewColumnProposal {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    pub file_column_index: usize,
    pub file_column_name: String,
    pub schema_column_id: Option<String>,
    pub new_column: Option<NewColumnProposal>,
    pub skip: bool,
    pub confidence: f64,
    pub match_type: MatchType,
}

impl ColumnMapping {
    fn unmatched(index: usize, name: &str) -> Self {
        Self {
            file_column_index: index,
            file_column_name: name.to_string(),
            schema_column_id: None,
            new_column: None,
            skip: true,
            confidence: 0.0,
            match_type: MatchType::None,
        }
    }

    /// Schema column id this mapping feeds, unless skipped.
    pub fn target(&self) -> Option<&str> {
        if self.skip {
            None
        } else {
            self.schema_column_id.as_deref()
        }
    }

    fn clear(&mut self) {
        self.schema_column_id = None;
        self.new_column = None;
        self.skip = true;
        self.confidence = 0.0;
        self.match_type = MatchType::None;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingValidation {
    pub valid: bool,
    pub missing_columns: Vec<String>,
}

impl MappingValidation {
    pub fn into_result(self) -> Result<(), MatchValidationError> {
        if self.valid {
            Ok(())
        } else {
            Err(MatchValidationError {
                missing_columns: self.missing_columns,
            })
        }
    }
}

/// Manual correction applied to one file column after auto-matching.
#[derive(Debug, Clone, PartialEq)]
pub enum OverrideTarget {
    Column(String),
    NewColumn(NewColumnProposal),
    Skip,
}

#[derive(Debug, Clone)]
struct AliasGroup {
    key: String,
    members: HashSet<String>,
}

#[derive(Debug, Clone)]
pub struct ColumnMatcher {
    fuzzy_threshold: f64,
    alias_groups: Vec<AliasGroup>,
}

impl Default for ColumnMatcher {
    fn default() -> Self {
        Self::new(&MatchConfig::default())
    }
}

impl ColumnMatcher {
    pub fn new(config: &MatchConfig) -> Self {
        let alias_groups = config
            .aliases
            .iter()
            .map(|(key, synonyms)| {
                let key = normalize_column_name(key);
                let mut members: HashSet<String> = synonyms
                    .iter()
                    .map(|synonym| normalize_column_name(synonym))
                    .filter(|synonym| !synonym.is_empty())
                    .collect();
                members.insert(key.clone());
                AliasGroup { key, members }
            })
            .collect();
        Self {
            fuzzy_threshold: config.fuzzy_threshold,
            alias_groups,
        }
    }

    pub fn fuzzy_threshold(&self) -> f64 {
        self.fuzzy_threshold
    }

    /// Best schema column for `file_column`, or `None` when nothing qualifies.
    pub fn find_best_match(
        &self,
        file_column: &str,
        columns: &[ColumnDefinition],
    ) -> Option<MatchCandidate> {
        self.best_among(file_column, columns.iter())
    }

    /// Every qualifying schema column, highest confidence first.
    pub fn get_all_matches(
        &self,
        file_column: &str,
        columns: &[ColumnDefinition],
    ) -> Vec<MatchCandidate> {
        let normalized = normalize_column_name(file_column);
        let mut matches: Vec<MatchCandidate> = columns
            .iter()
            .filter_map(|column| self.evaluate(&normalized, column))
            .collect();
        matches.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        matches
    }

    /// Greedy first-come-first-served assignment. Each header, in file order,
    /// takes its best match among the schema columns still unclaimed.
    pub fn auto_match_columns(
        &self,
        headers: &[String],
        columns: &[ColumnDefinition],
    ) -> Vec<ColumnMapping> {
        let mut claimed: HashSet<&str> = HashSet::new();
        headers
            .iter()
            .enumerate()
            .map(|(index, header)| {
                let pool = columns
                    .iter()
                    .filter(|column| !claimed.contains(column.id.as_str()));
                let Some(candidate) = self.best_among(header, pool) else {
                    debug!("No schema column for file column '{header}'");
                    return ColumnMapping::unmatched(index, header);
                };
                if let Some(column) = columns.iter().find(|c| c.id == candidate.schema_column_id) {
                    claimed.insert(column.id.as_str());
                }
                debug!(
                    "Mapped file column '{header}' to '{}' ({}, {:.2})",
                    candidate.schema_column_id,
                    candidate.match_type.as_str(),
                    candidate.confidence
                );
                ColumnMapping {
                    file_column_index: index,
                    file_column_name: header.clone(),
                    schema_column_id: Some(candidate.schema_column_id),
                    new_column: None,
                    skip: false,
                    confidence: candidate.confidence,
                    match_type: candidate.match_type,
                }
            })
            .collect()
    }

    fn best_among<'a>(
        &self,
        file_column: &str,
        columns: impl Iterator<Item = &'a ColumnDefinition>,
    ) -> Option<MatchCandidate> {
        let normalized = normalize_column_name(file_column);
        if normalized.is_empty() {
            return None;
        }
        let mut best: Option<MatchCandidate> = None;
        for candidate in columns.filter_map(|column| self.evaluate(&normalized, column)) {
            let better = best.as_ref().is_none_or(|current| {
                (candidate.match_type.rank(), candidate.confidence)
                    > (current.match_type.rank(), current.confidence)
            });
            if better {
                best = Some(candidate);
            }
        }
        best
    }

    fn evaluate(&self, normalized: &str, column: &ColumnDefinition) -> Option<MatchCandidate> {
        if normalized.is_empty() {
            return None;
        }
        let target = normalize_column_name(&column.name);
        let (confidence, match_type) = if normalized == target {
            (EXACT_CONFIDENCE, MatchType::Exact)
        } else if self.is_alias(normalized, &target, column) {
            (ALIAS_CONFIDENCE, MatchType::Alias)
        } else {
            let similarity = calculate_similarity(normalized, &target);
            if similarity <= self.fuzzy_threshold {
                return None;
            }
            (similarity, MatchType::Fuzzy)
        };
        Some(MatchCandidate {
            schema_column_id: column.id.clone(),
            confidence,
            match_type,
        })
    }

    fn is_alias(&self, normalized: &str, target: &str, column: &ColumnDefinition) -> bool {
        let role_key = column.role.and_then(|role| role.alias_key());
        self.alias_groups.iter().any(|group| {
            group.members.contains(normalized)
                && (group.members.contains(target) || role_key == Some(group.key.as_str()))
        })
    }
}

/// Checks that every required schema column is fed by a non-skipped mapping.
pub fn validate_mappings(
    mappings: &[ColumnMapping],
    columns: &[ColumnDefinition],
) -> MappingValidation {
    let mapped: HashSet<&str> = mappings.iter().filter_map(ColumnMapping::target).collect();
    let missing_columns: Vec<String> = columns
        .iter()
        .filter(|column| column.required && !mapped.contains(column.id.as_str()))
        .map(|column| column.name.clone())
        .collect();
    MappingValidation {
        valid: missing_columns.is_empty(),
        missing_columns,
    }
}

/// Re-points one file column. A schema column taken away from another file
/// column leaves that column skipped, so no id is ever mapped twice.
pub fn apply_override(
    mappings: &mut [ColumnMapping],
    file_column_index: usize,
    target: OverrideTarget,
    columns: &[ColumnDefinition],
) -> Result<(), OverrideError> {
    let position = mappings
        .iter()
        .position(|mapping| mapping.file_column_index == file_column_index)
        .ok_or(OverrideError::UnknownFileColumn(file_column_index))?;

    match target {
        OverrideTarget::Column(id) => {
            if !columns.iter().any(|column| column.id == id) {
                return Err(OverrideError::UnknownSchemaColumn(id));
            }
            for (other, mapping) in mappings.iter_mut().enumerate() {
                if other != position && mapping.schema_column_id.as_deref() == Some(id.as_str()) {
                    debug!("Releasing '{id}' from file column '{}'", mapping.file_column_name);
                    mapping.clear();
                }
            }
            let mapping = &mut mappings[position];
            mapping.schema_column_id = Some(id);
            mapping.new_column = None;
            mapping.skip = false;
            mapping.confidence = EXACT_CONFIDENCE;
            mapping.match_type = MatchType::None;
        }
        OverrideTarget::NewColumn(proposal) => {
            let mapping = &mut mappings[position];
            mapping.clear();
            mapping.skip = false;
            mapping.new_column = Some(proposal);
        }
        OverrideTarget::Skip => mappings[position].clear(),
    }
    Ok(())
}
