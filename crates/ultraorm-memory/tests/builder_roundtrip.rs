//! Drives the embedded engine with the statements the real builders emit.

use ultraorm_core::{
    Config, Dialect, Driver, DriverConnection, EntityDefinition, FieldDescriptor, Value,
};
use ultraorm_memory::MemoryDriver;
use ultraorm_query::{DeleteBuilder, InsertBuilder, SelectBuilder, SortDirection, UpdateBuilder};
use ultraorm_schema::create_table;

fn users_definition() -> EntityDefinition {
    EntityDefinition::builder("users")
        .field(FieldDescriptor::integer("id").primary_key().auto_increment())
        .field(FieldDescriptor::string("name").max_length(120))
        .field(FieldDescriptor::integer("age").min(0.0))
        .build()
        .unwrap()
}

async fn connect(driver: &MemoryDriver) -> Box<dyn DriverConnection> {
    driver.connect(&Config::memory("roundtrip")).await.unwrap()
}

#[tokio::test]
async fn test_schema_and_crud_through_builders() {
    let driver = MemoryDriver::new();
    let mut conn = connect(&driver).await;
    let definition = users_definition();

    let ddl = create_table(&definition, |_| None).unwrap();
    conn.execute(&ddl, &[]).await.unwrap();
    conn.execute(&ddl, &[]).await.unwrap();

    let (sql, params) = InsertBuilder::new("users")
        .value("name", "Ada")
        .value("age", 36)
        .build_with_dialect(Dialect::MySql);
    let inserted = conn.execute(&sql, &params).await.unwrap();
    assert_eq!(inserted.rows_affected, 1);
    assert_eq!(inserted.last_insert_id, Some(1));

    let (sql, params) = InsertBuilder::new("users")
        .value("name", "Grace")
        .value("age", 45)
        .build_with_dialect(Dialect::MySql);
    conn.execute(&sql, &params).await.unwrap();

    let mut select = SelectBuilder::new("users");
    select.order_by("age", SortDirection::Desc);
    let (sql, params) = select.build_with_dialect(Dialect::MySql);
    let rows = conn.query(&sql, &params).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get_named("name"), Some(&Value::from("Grace")));

    let (sql, params) = UpdateBuilder::new("users", "id", 1)
        .set("age", 37)
        .build_with_dialect(Dialect::MySql);
    let updated = conn.execute(&sql, &params).await.unwrap();
    assert_eq!(updated.rows_affected, 1);

    let mut select = SelectBuilder::new("users");
    select.condition([("id", 1)]);
    let (sql, params) = select.build_with_dialect(Dialect::MySql);
    let rows = conn.query(&sql, &params).await.unwrap();
    assert_eq!(rows[0].get_named("age"), Some(&Value::from(37)));

    let (sql, params) = DeleteBuilder::new("users", "id", 1).build_with_dialect(Dialect::MySql);
    let deleted = conn.execute(&sql, &params).await.unwrap();
    assert_eq!(deleted.rows_affected, 1);

    let mut select = SelectBuilder::new("users");
    let (sql, params) = select.build_count_with_dialect(Dialect::MySql);
    let rows = conn.query(&sql, &params).await.unwrap();
    assert_eq!(rows[0].get(0), Some(&Value::Int(1)));
}

#[tokio::test]
async fn test_foreign_key_table_creates_and_accepts_rows() {
    let driver = MemoryDriver::new();
    let mut conn = connect(&driver).await;

    let users = users_definition();
    let posts = EntityDefinition::builder("posts")
        .field(FieldDescriptor::integer("id").primary_key().auto_increment())
        .field(FieldDescriptor::string("title"))
        .field(FieldDescriptor::foreign_key("author_id", "users"))
        .build()
        .unwrap();

    let resolve = |table: &str| {
        (table == "users")
            .then(|| users.primary_key().map(|f| f.name.clone()))
            .flatten()
    };
    conn.execute(&create_table(&users, |_| None).unwrap(), &[])
        .await
        .unwrap();
    conn.execute(&create_table(&posts, resolve).unwrap(), &[])
        .await
        .unwrap();

    let (sql, params) = InsertBuilder::new("posts")
        .value("title", "hello")
        .value("author_id", 1)
        .build_with_dialect(Dialect::MySql);
    let result = conn.execute(&sql, &params).await.unwrap();
    assert_eq!(result.last_insert_id, Some(1));
}
