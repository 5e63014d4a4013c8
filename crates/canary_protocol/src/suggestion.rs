//! Inputs from the two non-statistical authorities: the AI review and the human reviewer.

use crate::types::{ColumnRole, LogicalType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// AI recommendation for one source column. Every field except the column
/// name is optional; absence means "no opinion".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(alias = "column_name")]
    pub source_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_logical_type: Option<LogicalType>,

    #[serde(default, skip_serializing_if = "Option::is_none", alias = "suggested_polars_type")]
    pub suggested_physical_type: Option<String>,

    #[serde(default, alias = "reasoning")]
    pub rationale: String,
}

impl Suggestion {
    pub fn new(source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            suggested_name: None,
            suggested_logical_type: None,
            suggested_physical_type: None,
            rationale: String::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.suggested_name = Some(name.into());
        self
    }

    pub fn with_logical_type(mut self, logical_type: LogicalType) -> Self {
        self.suggested_logical_type = Some(logical_type);
        self
    }

    pub fn with_physical_type(mut self, physical_type: impl Into<String>) -> Self {
        self.suggested_physical_type = Some(physical_type.into());
        self
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = rationale.into();
        self
    }

    /// Fill the fields this suggestion leaves unset from `other`.
    fn absorb(&mut self, other: Suggestion) {
        if self.suggested_name.is_none() {
            self.suggested_name = other.suggested_name;
        }
        if self.suggested_logical_type.is_none() {
            self.suggested_logical_type = other.suggested_logical_type;
        }
        if self.suggested_physical_type.is_none() {
            self.suggested_physical_type = other.suggested_physical_type;
        }
        if !other.rationale.is_empty() {
            if self.rationale.is_empty() {
                self.rationale = other.rationale;
            } else {
                self.rationale = format!("{}; {}", self.rationale, other.rationale);
            }
        }
    }
}

/// The AI review for one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestionReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default)]
    pub suggestions: Vec<Suggestion>,
}

impl SuggestionReport {
    pub fn new(suggestions: Vec<Suggestion>) -> Self {
        Self {
            summary: None,
            suggestions,
        }
    }

    /// Combine the naming review and the type review into one report.
    ///
    /// Suggestions for the same column are merged field by field; `self` wins
    /// where both specify a value. Column order follows first appearance.
    pub fn merge(mut self, other: SuggestionReport) -> SuggestionReport {
        for suggestion in other.suggestions {
            match self
                .suggestions
                .iter_mut()
                .find(|s| s.source_name == suggestion.source_name)
            {
                Some(existing) => existing.absorb(suggestion),
                None => self.suggestions.push(suggestion),
            }
        }
        self.summary = match (self.summary, other.summary) {
            (Some(a), Some(b)) => Some(format!("{} {}", a, b)),
            (a, b) => a.or(b),
        };
        self
    }
}

/// A human decision for one source column. Unset fields defer to the AI or
/// to the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Override {
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "name")]
    pub target_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none", alias = "type")]
    pub physical_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<ColumnRole>,
}

impl Override {
    pub fn rename(target_name: impl Into<String>) -> Self {
        Self {
            target_name: Some(target_name.into()),
            ..Self::default()
        }
    }

    pub fn with_type(mut self, physical_type: impl Into<String>) -> Self {
        self.physical_type = Some(physical_type.into());
        self
    }

    pub fn with_role(mut self, role: ColumnRole) -> Self {
        self.role = Some(role);
        self
    }
}

/// Overrides keyed by source column name.
pub type OverrideMap = BTreeMap<String, Override>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_naming_and_type_reports() {
        let naming = SuggestionReport::new(vec![
            Suggestion::new("User ID").with_name("user_id").with_rationale("contains space"),
        ]);
        let types = SuggestionReport::new(vec![
            Suggestion::new("User ID")
                .with_physical_type("UInt32")
                .with_logical_type(LogicalType::Identifier)
                .with_rationale("ids are unsigned"),
            Suggestion::new("amount").with_physical_type("Decimal(10,2)"),
        ]);

        let merged = naming.merge(types);
        assert_eq!(merged.suggestions.len(), 2);
        let user = &merged.suggestions[0];
        assert_eq!(user.suggested_name.as_deref(), Some("user_id"));
        assert_eq!(user.suggested_physical_type.as_deref(), Some("UInt32"));
        assert_eq!(user.rationale, "contains space; ids are unsigned");
        assert_eq!(merged.suggestions[1].source_name, "amount");
    }

    #[test]
    fn test_legacy_field_names() {
        let suggestion: Suggestion = serde_json::from_str(
            r#"{"column_name": "amt", "suggested_polars_type": "Float32", "reasoning": "small"}"#,
        )
        .unwrap();
        assert_eq!(suggestion.source_name, "amt");
        assert_eq!(suggestion.suggested_physical_type.as_deref(), Some("Float32"));

        let overrides: OverrideMap = serde_json::from_str(
            r#"{"amt": {"name": "amount", "type": "Decimal(12,4)"}, "id": {"role": "PRIMARY_KEY"}}"#,
        )
        .unwrap();
        assert_eq!(overrides["amt"].target_name.as_deref(), Some("amount"));
        assert_eq!(overrides["id"].role, Some(ColumnRole::PrimaryKey));
    }
}
