//! Schema migration data model consumed by [`DataAdapter::migrate`]
//!
//! The pool layer never interprets these structures; it forwards them to the
//! wrapped adapter, which owns the per-dialect DDL generation.
//!
//! [`DataAdapter::migrate`]: crate::DataAdapter::migrate

use serde::{Deserialize, Serialize};

/// Abstract field type names mapped to concrete column types per dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    /// Auto-incrementing integer primary key
    Counter,
    /// 64-bit integer
    Integer,
    /// Double-precision float
    Number,
    /// Boolean flag
    Boolean,
    /// Variable-length text, optionally size-limited
    Text,
    /// Date/time stored in the dialect's native representation
    DateTime,
    /// Binary blob
    Blob,
}

/// A single column in a migration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Column name
    pub name: String,
    /// Abstract column type
    pub field_type: FieldType,
    /// Optional size hint (e.g. text length)
    pub size: Option<u32>,
    /// Whether the column participates in the primary key
    pub primary: bool,
    /// Whether the column accepts NULL
    pub nullable: bool,
}

impl FieldSpec {
    /// Create a field spec with the given name and type
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            size: None,
            primary: false,
            nullable: true,
        }
    }

    /// Set the size hint
    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    /// Mark the column as primary key
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self.nullable = false;
        self
    }

    /// Mark the column as NOT NULL
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// A data-model migration: the scheme an adapter should bring a table to
///
/// Adapters apply a migration at most once per (`applies_to`, `version`)
/// pair, tracking applied versions in their own bookkeeping table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Migration {
    /// Physical table the migration applies to
    pub applies_to: String,
    /// Logical model name
    pub model: String,
    /// Migration version, compared as an opaque string
    pub version: String,
    /// Human-readable description
    pub description: Option<String>,
    /// Columns to add (also the full column set on first creation)
    pub add: Vec<FieldSpec>,
    /// Columns to alter
    pub change: Vec<FieldSpec>,
    /// Columns to drop
    pub remove: Vec<FieldSpec>,
}

impl Migration {
    /// Create a migration that adds the given columns
    pub fn new(
        applies_to: impl Into<String>,
        model: impl Into<String>,
        version: impl Into<String>,
        add: Vec<FieldSpec>,
    ) -> Self {
        Self {
            applies_to: applies_to.into(),
            model: model.into(),
            version: version.into(),
            description: None,
            add,
            change: Vec::new(),
            remove: Vec::new(),
        }
    }

    /// Set the description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Outcome of applying a migration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MigrationOutcome {
    /// The target table was created or altered
    Applied,
    /// The (`applies_to`, `version`) pair had already been applied
    AlreadyApplied,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_spec_builder() {
        let field = FieldSpec::new("id", FieldType::Counter).primary();
        assert!(field.primary);
        assert!(!field.nullable);

        let field = FieldSpec::new("entity", FieldType::Text).size(120).not_null();
        assert_eq!(field.size, Some(120));
        assert!(!field.nullable);
    }

    #[test]
    fn migration_builder() {
        let migration = Migration::new(
            "increment_id",
            "increments",
            "1.0",
            vec![FieldSpec::new("id", FieldType::Counter).primary()],
        )
        .description("Increments migration (version 1.0)");

        assert_eq!(migration.applies_to, "increment_id");
        assert_eq!(migration.version, "1.0");
        assert!(migration.change.is_empty());
        assert!(migration.description.is_some());
    }
}
