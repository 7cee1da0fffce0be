//! SQLite DDL generation for migrations

use aquifer_core::{FieldSpec, FieldType};

/// Map an abstract field type to the SQLite column type
pub(crate) fn column_type(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::Counter => "INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL",
        FieldType::Integer => "INTEGER",
        FieldType::Number => "REAL",
        FieldType::Boolean => "INTEGER",
        FieldType::Text => "TEXT",
        FieldType::DateTime => "NUMERIC",
        FieldType::Blob => "BLOB",
    }
}

/// Render one column definition
pub(crate) fn column_def(field: &FieldSpec) -> String {
    // Counter carries its full constraint set in the type itself.
    if field.field_type == FieldType::Counter {
        return format!("\"{}\" {}", field.name, column_type(field.field_type));
    }
    let mut def = format!("\"{}\" {}", field.name, column_type(field.field_type));
    if field.primary {
        def.push_str(" PRIMARY KEY");
    }
    if field.nullable {
        def.push_str(" NULL");
    } else {
        def.push_str(" NOT NULL");
    }
    def
}

/// Render a CREATE TABLE statement for the given columns
pub(crate) fn create_table_sql(table: &str, fields: &[FieldSpec]) -> String {
    let defs: Vec<String> = fields.iter().map(column_def).collect();
    format!("CREATE TABLE \"{}\" ({})", table, defs.join(", "))
}
