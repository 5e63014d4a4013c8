//! Helpful error types for CLI commands
//!
//! Every error includes:
//! - What went wrong
//! - Context about the situation
//! - Suggestions for how to fix it

use canary_contract::{ConcurrentModificationError, ValidationFailure};
use std::fmt;
use std::path::Path;

/// An error with helpful context and suggestions
#[derive(Debug)]
pub struct HelpfulError {
    pub message: String,
    pub context: Option<String>,
    pub suggestions: Vec<String>,
}

impl HelpfulError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_suggestions(mut self, suggestions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.suggestions.extend(suggestions.into_iter().map(|s| s.into()));
        self
    }

    // === Common error constructors ===

    pub fn file_not_found(path: &Path) -> Self {
        Self::new(format!("File not found: {}", path.display()))
            .with_context("The specified file does not exist")
            .with_suggestions([
                format!("TRY: Check if the file exists: ls -la {}", path.display()),
                format!(
                    "TRY: Look for similar files: ls {}",
                    path.parent()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| ".".to_string())
                ),
            ])
    }

    pub fn json_parse_error(path: &Path, what: &str, details: &str) -> Self {
        Self::new(format!("Invalid {}: {}", what, details))
            .with_context(format!("Failed to parse JSON file: {}", path.display()))
            .with_suggestion(format!(
                "TRY: Validate the JSON: python -m json.tool {}",
                path.display()
            ))
    }

    pub fn no_contract(table: &str) -> Self {
        Self::new(format!("No approved contract for table '{}'", table))
            .with_context("Drift is measured against the latest approved contract")
            .with_suggestions([
                format!("TRY: canary draft --table {} --snapshot SNAPSHOT.json", table),
                "TRY: canary approve --contract CONTRACT.json --approved-by YOU".to_string(),
            ])
    }

    /// Lists every violation, one per line.
    pub fn validation_failed(table: &str, failure: &ValidationFailure) -> Self {
        let mut err = Self::new(format!(
            "Contract for '{}' has {} violation(s)",
            table,
            failure.violations.len()
        ))
        .with_context("Fix the overrides and draft again");
        for violation in &failure.violations {
            err = err.with_suggestion(format!("- {}", violation));
        }
        err
    }

    pub fn concurrent_approval(conflict: &ConcurrentModificationError) -> Self {
        Self::new(conflict.to_string())
            .with_context("Another contract version was approved after this draft was made")
            .with_suggestions([
                format!("TRY: canary history --table {}", conflict.table_name),
                format!(
                    "TRY: Draft again to build on the latest version: canary draft --table {} ...",
                    conflict.table_name
                ),
            ])
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;

        if let Some(ctx) = &self.context {
            writeln!(f, "CONTEXT: {}", ctx)?;
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            for suggestion in &self.suggestions {
                writeln!(f, "  {}", suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for HelpfulError {}
