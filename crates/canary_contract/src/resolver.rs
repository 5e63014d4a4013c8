//! Override Resolver
//!
//! Folds the three authorities into one descriptor per snapshot column.
//! For every attribute the first value set wins: user override, then AI
//! suggestion, then the profiler. Blank strings count as unset.

use crate::contract::{Authority, ResolvedColumn};
use crate::error::StaleOverrideError;
use canary_protocol::{ColumnRole, OverrideMap, ProfilingSnapshot, Suggestion, SuggestionReport};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Resolve every snapshot column, in snapshot order.
///
/// Fails when an override names a column the snapshot does not contain.
/// Suggestions for unknown columns are ignored.
pub fn resolve_columns(
    snapshot: &ProfilingSnapshot,
    suggestions: Option<&SuggestionReport>,
    overrides: &OverrideMap,
) -> Result<Vec<ResolvedColumn>, StaleOverrideError> {
    let known: BTreeSet<&str> = snapshot.column_names().collect();

    let stale: Vec<String> = overrides
        .keys()
        .filter(|name| !known.contains(name.as_str()))
        .cloned()
        .collect();
    if !stale.is_empty() {
        return Err(StaleOverrideError { columns: stale });
    }

    // Later entries replace earlier ones for the same column.
    let mut by_column: HashMap<&str, &Suggestion> = HashMap::new();
    for suggestion in suggestions.map(|r| r.suggestions.as_slice()).unwrap_or_default() {
        if known.contains(suggestion.source_name.as_str()) {
            by_column.insert(suggestion.source_name.as_str(), suggestion);
        } else {
            debug!(column = %suggestion.source_name, "Ignoring suggestion for unknown column");
        }
    }

    let resolved = snapshot
        .columns
        .iter()
        .enumerate()
        .map(|(index, stat)| {
            let suggestion = by_column.get(stat.source_name.as_str()).copied();
            let user = overrides.get(&stat.source_name);

            let ai_name = suggestion.and_then(|s| non_blank(s.suggested_name.as_deref()));
            let ai_type = suggestion.and_then(|s| non_blank(s.suggested_physical_type.as_deref()));
            let logical_type = suggestion.and_then(|s| s.suggested_logical_type);
            let ai_role = logical_type.and_then(|t| t.implied_role());

            let (target_name, name_source) = pick(
                user.and_then(|o| non_blank(o.target_name.as_deref())),
                ai_name.clone(),
                stat.source_name.clone(),
            );
            let (physical_type, type_source) = pick(
                user.and_then(|o| non_blank(o.physical_type.as_deref())),
                ai_type.clone(),
                stat.physical_type.clone(),
            );
            let (role, role_source) = pick(user.and_then(|o| o.role), ai_role, ColumnRole::Unassigned);

            debug!(
                column = %stat.source_name,
                target = %target_name,
                %name_source,
                %type_source,
                %role_source,
                "Resolved column"
            );

            let mut column = ResolvedColumn::from_stat(index, stat);
            column.target_name = target_name;
            column.name_source = name_source;
            column.physical_type = physical_type;
            column.type_source = type_source;
            column.role = role;
            column.role_source = role_source;
            column.logical_type = logical_type;
            column.ai_suggested_name = ai_name;
            column.ai_suggested_type = ai_type;
            column.rationale = suggestion
                .map(|s| s.rationale.trim())
                .filter(|r| !r.is_empty())
                .map(str::to_string);
            column
        })
        .collect();

    Ok(resolved)
}

/// First set value wins, with its provenance.
fn pick<T>(user: Option<T>, ai: Option<T>, original: T) -> (T, Authority) {
    match (user, ai) {
        (Some(value), _) => (value, Authority::User),
        (None, Some(value)) => (value, Authority::Ai),
        (None, None) => (original, Authority::Original),
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use canary_protocol::{ColumnStat, LogicalType, Override};

    fn snapshot() -> ProfilingSnapshot {
        ProfilingSnapshot::new(
            10,
            vec![
                ColumnStat::new("usr_id", "Int64", 0.0, 10),
                ColumnStat::new("amt", "Float64", 0.1, 8),
                ColumnStat::new("status", "String", 0.0, 3),
            ],
        )
    }

    #[test]
    fn test_no_inputs_resolves_from_original() {
        let resolved = resolve_columns(&snapshot(), None, &OverrideMap::new()).unwrap();
        assert_eq!(resolved.len(), 3);
        for (i, col) in resolved.iter().enumerate() {
            assert_eq!(col.column_index, i);
            assert_eq!(col.target_name, col.source_name());
            assert_eq!(col.name_source, Authority::Original);
            assert_eq!(col.role, ColumnRole::Unassigned);
        }
        assert!(resolved[1].is_nullable);
        assert!(!resolved[0].is_nullable);
    }

    #[test]
    fn test_user_beats_ai_beats_original_per_attribute() {
        let report = SuggestionReport::new(vec![Suggestion::new("amt")
            .with_name("amount")
            .with_physical_type("Decimal(10,2)")
            .with_logical_type(LogicalType::Currency)
            .with_rationale("money")]);
        let mut overrides = OverrideMap::new();
        overrides.insert("amt".into(), Override::rename("order_amount"));

        let resolved = resolve_columns(&snapshot(), Some(&report), &overrides).unwrap();
        let amt = &resolved[1];
        assert_eq!(amt.target_name, "order_amount");
        assert_eq!(amt.name_source, Authority::User);
        assert_eq!(amt.physical_type, "Decimal(10,2)");
        assert_eq!(amt.type_source, Authority::Ai);
        assert_eq!(amt.role, ColumnRole::Metric);
        assert_eq!(amt.role_source, Authority::Ai);
        assert_eq!(amt.ai_suggested_name.as_deref(), Some("amount"));
        assert_eq!(amt.rationale.as_deref(), Some("money"));
    }

    #[test]
    fn test_blank_values_fall_through() {
        let report = SuggestionReport::new(vec![Suggestion::new("status").with_name("  ")]);
        let mut overrides = OverrideMap::new();
        overrides.insert("status".into(), Override::rename("").with_type(" "));

        let resolved = resolve_columns(&snapshot(), Some(&report), &overrides).unwrap();
        let status = &resolved[2];
        assert_eq!(status.target_name, "status");
        assert_eq!(status.name_source, Authority::Original);
        assert_eq!(status.type_source, Authority::Original);
        assert_eq!(status.ai_suggested_name, None);
    }

    #[test]
    fn test_stale_overrides_are_all_reported() {
        let mut overrides = OverrideMap::new();
        overrides.insert("zeta".into(), Override::rename("z"));
        overrides.insert("alpha".into(), Override::rename("a"));
        overrides.insert("amt".into(), Override::rename("amount"));

        let err = resolve_columns(&snapshot(), None, &overrides).unwrap_err();
        assert_eq!(err.columns, vec!["alpha".to_string(), "zeta".to_string()]);
    }

    #[test]
    fn test_unknown_suggestions_ignored_and_last_duplicate_wins() {
        let report = SuggestionReport::new(vec![
            Suggestion::new("ghost").with_name("boo"),
            Suggestion::new("status").with_name("state"),
            Suggestion::new("status").with_name("order_status"),
        ]);
        let resolved = resolve_columns(&snapshot(), Some(&report), &OverrideMap::new()).unwrap();
        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved[2].target_name, "order_status");
    }

    #[test]
    fn test_primary_key_only_from_user() {
        let report = SuggestionReport::new(vec![
            Suggestion::new("usr_id").with_logical_type(LogicalType::Identifier)
        ]);
        let resolved = resolve_columns(&snapshot(), Some(&report), &OverrideMap::new()).unwrap();
        assert_eq!(resolved[0].role, ColumnRole::Unassigned);
        assert_eq!(resolved[0].role_source, Authority::Original);

        let mut overrides = OverrideMap::new();
        overrides.insert(
            "usr_id".into(),
            Override::default().with_role(ColumnRole::PrimaryKey),
        );
        let resolved = resolve_columns(&snapshot(), Some(&report), &overrides).unwrap();
        assert_eq!(resolved[0].role, ColumnRole::PrimaryKey);
        assert_eq!(resolved[0].role_source, Authority::User);
    }
}
