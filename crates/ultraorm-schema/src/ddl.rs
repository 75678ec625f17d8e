//! DDL generation from entity definitions.
//!
//! One column definition per declared field, one named foreign-key
//! constraint per foreign-key field, joined into a single
//! `CREATE TABLE IF NOT EXISTS` statement. Defaults are rendered as SQL
//! literals; a generator default is evaluated once, at render time.

use ultraorm_core::{EntityDefinition, Error, FieldDescriptor, ForeignKeyRef, Result, Value};

/// Render one column definition:
/// `<name> <type> [PRIMARY KEY] [AUTO_INCREMENT] [NOT NULL] [UNIQUE]
/// [DEFAULT <literal>]`, with `DEFAULT CURRENT_TIMESTAMP` appended for
/// creation-stamped datetime columns that carry no explicit default.
#[must_use]
pub fn column_definition(field: &FieldDescriptor) -> String {
    let mut parts = vec![field.name.clone(), field.effective_column_type()];
    if field.primary_key {
        parts.push("PRIMARY KEY".to_string());
    }
    if field.auto_increment {
        parts.push("AUTO_INCREMENT".to_string());
    }
    if !field.nullable {
        parts.push("NOT NULL".to_string());
    }
    if field.unique {
        parts.push("UNIQUE".to_string());
    }
    if let Some(value) = field.resolve_default() {
        parts.push(format!("DEFAULT {}", default_literal(&value)));
    } else if field.auto_now_add {
        // The object layer only stamps rows it inserts itself.
        parts.push("DEFAULT CURRENT_TIMESTAMP".to_string());
    }
    parts.join(" ")
}

/// Render a default value as a SQL literal.
#[must_use]
pub fn default_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Int(n) => n.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Text(s) => quote_literal(s),
        Value::DateTime(dt) => quote_literal(&dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        Value::Json(v) => quote_literal(&v.to_string()),
    }
}

fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Render the named constraint clause for one foreign-key column:
/// `CONSTRAINT fk_<table>_<column> FOREIGN KEY (<column>)
/// REFERENCES <target>(<target-pk>) ON DELETE <action> ON UPDATE <action>`.
///
/// `target_column` must already be resolved to the referenced table's
/// primary key when the reference does not name one explicitly.
#[must_use]
pub fn foreign_key_clause(
    table: &str,
    column: &str,
    reference: &ForeignKeyRef,
    target_column: &str,
) -> String {
    format!(
        "CONSTRAINT fk_{table}_{column} FOREIGN KEY ({column}) REFERENCES {}({target_column}) ON DELETE {} ON UPDATE {}",
        reference.table,
        reference.on_delete.as_sql(),
        reference.on_update.as_sql(),
    )
}

/// Render the full `CREATE TABLE IF NOT EXISTS` statement for `definition`.
///
/// `resolve_pk` maps a referenced table name to its primary-key column,
/// consulted for foreign keys that do not name a target column. Fails with
/// a schema error when a target cannot be resolved.
pub fn create_table(
    definition: &EntityDefinition,
    resolve_pk: impl Fn(&str) -> Option<String>,
) -> Result<String> {
    let mut items: Vec<String> = definition.fields().iter().map(column_definition).collect();

    for field in definition.foreign_keys() {
        let Some(reference) = field.references.as_ref() else {
            continue;
        };
        let target_column = match &reference.column {
            Some(column) => column.clone(),
            None => resolve_pk(&reference.table).ok_or_else(|| {
                Error::schema(
                    definition.table(),
                    format!(
                        "cannot resolve the primary key of referenced table `{}` for field `{}`",
                        reference.table, field.name
                    ),
                )
            })?,
        };
        items.push(foreign_key_clause(
            definition.table(),
            &field.name,
            reference,
            &target_column,
        ));
    }

    let sql = format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        definition.table(),
        items.join(", ")
    );
    tracing::debug!(table = definition.table(), sql = %sql, "generated create table");
    Ok(sql)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};
    use ultraorm_core::FieldKind;

    fn no_fk_targets(_table: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_column_definition_order() {
        let field = FieldDescriptor::integer("id").primary_key().auto_increment();
        assert_eq!(column_definition(&field), "id INT PRIMARY KEY AUTO_INCREMENT NOT NULL");
    }

    #[test]
    fn test_column_definition_unique_and_default() {
        let field = FieldDescriptor::string("code").unique().default_value("none");
        assert_eq!(
            column_definition(&field),
            "code VARCHAR(255) NOT NULL UNIQUE DEFAULT 'none'"
        );
    }

    #[test]
    fn test_column_definition_nullable() {
        let field = FieldDescriptor::string("bio").nullable();
        assert_eq!(column_definition(&field), "bio VARCHAR(255)");
    }

    #[test]
    fn test_column_definition_max_length_in_type() {
        let field = FieldDescriptor::string("name").max_length(64);
        assert_eq!(column_definition(&field), "name VARCHAR(64) NOT NULL");
    }

    #[test]
    fn test_auto_now_add_appends_current_timestamp() {
        let field = FieldDescriptor::datetime("created_at").auto_now_add();
        assert_eq!(
            column_definition(&field),
            "created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP"
        );
    }

    #[test]
    fn test_explicit_default_wins_over_auto_now_add() {
        let epoch = chrono::DateTime::from_timestamp(0, 0).unwrap();
        let field = FieldDescriptor::datetime("created_at")
            .auto_now_add()
            .default_value(epoch);
        assert_eq!(
            column_definition(&field),
            "created_at DATETIME NOT NULL DEFAULT '1970-01-01 00:00:00'"
        );
    }

    #[test]
    fn test_generator_default_evaluated_at_render_time() {
        static NEXT: AtomicI64 = AtomicI64::new(10);
        let field = FieldDescriptor::integer("seq")
            .default_with(|| Value::Int(NEXT.fetch_add(1, Ordering::SeqCst)));
        assert_eq!(column_definition(&field), "seq INT NOT NULL DEFAULT 10");
        assert_eq!(column_definition(&field), "seq INT NOT NULL DEFAULT 11");
    }

    #[test]
    fn test_default_literal_escaping() {
        assert_eq!(default_literal(&Value::from("it's")), "'it''s'");
        assert_eq!(default_literal(&Value::from(true)), "TRUE");
        assert_eq!(default_literal(&Value::Null), "NULL");
        assert_eq!(default_literal(&Value::from(2.5)), "2.5");
    }

    #[test]
    fn test_foreign_key_clause_defaults_cascade() {
        let field = FieldDescriptor::foreign_key("author_id", "users");
        let reference = field.references.as_ref().unwrap();
        assert_eq!(
            foreign_key_clause("posts", "author_id", reference, "id"),
            "CONSTRAINT fk_posts_author_id FOREIGN KEY (author_id) \
             REFERENCES users(id) ON DELETE CASCADE ON UPDATE CASCADE"
        );
    }

    #[test]
    fn test_foreign_key_clause_custom_actions() {
        use ultraorm_core::ReferentialAction;
        let field = FieldDescriptor::foreign_key("author_id", "users")
            .on_delete(ReferentialAction::SetNull)
            .on_update(ReferentialAction::Restrict);
        let reference = field.references.as_ref().unwrap();
        let clause = foreign_key_clause("posts", "author_id", reference, "id");
        assert!(clause.ends_with("ON DELETE SET NULL ON UPDATE RESTRICT"));
    }

    #[test]
    fn test_create_table_full_statement() {
        let definition = EntityDefinition::builder("posts")
            .field(FieldDescriptor::integer("id").primary_key().auto_increment())
            .field(FieldDescriptor::string("title").max_length(120))
            .field(FieldDescriptor::foreign_key("author_id", "users"))
            .build()
            .unwrap();
        let sql = create_table(&definition, |table| {
            (table == "users").then(|| "id".to_string())
        })
        .unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS posts (\
             id INT PRIMARY KEY AUTO_INCREMENT NOT NULL, \
             title VARCHAR(120) NOT NULL, \
             author_id INT NOT NULL, \
             CONSTRAINT fk_posts_author_id FOREIGN KEY (author_id) \
             REFERENCES users(id) ON DELETE CASCADE ON UPDATE CASCADE)"
        );
    }

    #[test]
    fn test_create_table_explicit_target_column_skips_resolver() {
        let definition = EntityDefinition::builder("posts")
            .field(FieldDescriptor::integer("id").primary_key())
            .field(FieldDescriptor::foreign_key("author_id", "users").references_column("user_id"))
            .build()
            .unwrap();
        let sql = create_table(&definition, no_fk_targets).unwrap();
        assert!(sql.contains("REFERENCES users(user_id)"));
    }

    #[test]
    fn test_create_table_unresolved_target_fails() {
        let definition = EntityDefinition::builder("posts")
            .field(FieldDescriptor::integer("id").primary_key())
            .field(FieldDescriptor::foreign_key("author_id", "users"))
            .build()
            .unwrap();
        let err = create_table(&definition, no_fk_targets).unwrap_err();
        assert!(err.to_string().contains("users"));
        assert!(matches!(err, Error::Schema { .. }));
    }

    #[test]
    fn test_create_table_field_kinds_render_types() {
        let definition = EntityDefinition::builder("samples")
            .field(FieldDescriptor::big_integer("big"))
            .field(FieldDescriptor::email("contact"))
            .field(FieldDescriptor::boolean("flag"))
            .field(FieldDescriptor::json("payload"))
            .field(FieldDescriptor::float("ratio"))
            .build()
            .unwrap();
        let sql = create_table(&definition, no_fk_targets).unwrap();
        assert!(sql.contains("big BIGINT NOT NULL"));
        assert!(sql.contains("contact VARCHAR(255) NOT NULL"));
        assert!(sql.contains("flag BOOLEAN NOT NULL"));
        assert!(sql.contains("payload JSON NOT NULL"));
        assert!(sql.contains("ratio FLOAT NOT NULL"));
    }

    #[test]
    fn test_field_kind_names_available() {
        assert_eq!(FieldKind::ForeignKey.as_str(), "foreign-key");
    }
}
