use ultraorm::prelude::*;

async fn setup() -> (ConnectionManager, Entity) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let manager = ConnectionManager::new(Config::memory("crud_db"));
    let users = manager.register(
        EntityDefinition::builder("users")
            .field(FieldDescriptor::big_integer("id").primary_key().auto_increment())
            .field(FieldDescriptor::string("name").max_length(100))
            .field(FieldDescriptor::email("email").nullable())
            .field(FieldDescriptor::integer("age").min(0.0).max(150.0).default_value(18))
            .build()
            .expect("build users definition"),
    );
    manager.connect().await.expect("connect");
    manager.migrate().await.expect("migrate");
    (manager, users)
}

#[tokio::test]
async fn insert_captures_generated_key_and_round_trips() {
    let (manager, users) = setup().await;

    let mut ada = users
        .instance_with([("name", Value::from("Ada")), ("email", Value::from("ada@b.co"))])
        .expect("construct ada");
    assert!(ada.is_new());
    assert_eq!(ada.get("id"), None);

    ada.save(&manager).await.expect("insert ada");
    assert!(!ada.is_new());
    assert_eq!(ada.get("id"), Some(&Value::Int(1)));
    assert!(ada.dirty_fields().is_empty());

    let loaded = users
        .find_by_id(1)
        .await
        .expect("find by id")
        .expect("ada should exist");
    assert!(!loaded.is_new());
    assert_eq!(loaded.get("name"), Some(&Value::Text("Ada".into())));
    assert_eq!(loaded.get("email"), Some(&Value::Text("ada@b.co".into())));
    assert_eq!(loaded.get("age"), Some(&Value::Int(18)));
}

#[tokio::test]
async fn save_twice_is_insert_then_noop() {
    let (manager, users) = setup().await;

    let mut user = users.instance_with([("name", "Ada")]).expect("construct");
    user.save(&manager).await.expect("first save inserts");
    assert!(user.dirty_fields().is_empty());
    user.save(&manager).await.expect("second save is a no-op");

    let total = users.query().count().await.expect("count");
    assert_eq!(total, 1);
}

#[tokio::test]
async fn update_touches_only_dirty_fields() {
    let (manager, users) = setup().await;

    let mut ada = users
        .instance_with([("name", Value::from("Ada")), ("email", Value::from("ada@b.co"))])
        .expect("construct");
    ada.save(&manager).await.expect("insert");

    let mut loaded = users.find_by_id(1).await.expect("find").expect("exists");

    // Change the row behind the instance's back; a dirty-only UPDATE must
    // not clobber it.
    manager
        .execute(
            "UPDATE users SET email = ? WHERE id = ?",
            &[Value::from("changed@b.co"), Value::from(1)],
        )
        .await
        .expect("out-of-band update");

    loaded.set("name", "Ada").expect("set same value");
    assert_eq!(loaded.dirty_fields(), vec!["name"]);
    loaded.save(&manager).await.expect("update");

    let reloaded = users.find_by_id(1).await.expect("find").expect("exists");
    assert_eq!(reloaded.get("name"), Some(&Value::Text("Ada".into())));
    assert_eq!(reloaded.get("email"), Some(&Value::Text("changed@b.co".into())));
}

#[tokio::test]
async fn explicit_primary_key_is_used_and_frozen() {
    let (manager, users) = setup().await;

    let mut user = users
        .instance_with([("id", Value::from(42)), ("name", Value::from("Grace"))])
        .expect("construct");
    user.save(&manager).await.expect("insert with explicit id");
    assert_eq!(user.get("id"), Some(&Value::Int(42)));

    let err = user.set("id", 43).expect_err("pk is frozen");
    assert!(err.is_validation());

    let loaded = users.find_by_id(42).await.expect("find").expect("exists");
    assert_eq!(loaded.get("name"), Some(&Value::Text("Grace".into())));
}

#[tokio::test]
async fn delete_on_new_instance_is_a_noop() {
    let (manager, users) = setup().await;

    let mut draft = users.instance_with([("name", "Draft")]).expect("construct");
    draft.delete(&manager).await.expect("delete before save does nothing");
    assert!(!draft.is_deleted());
    assert!(draft.is_new());

    assert_eq!(users.query().count().await.expect("count"), 0);

    // Still usable: the no-op delete must not poison the instance.
    draft.save(&manager).await.expect("save after no-op delete");
    assert_eq!(users.query().count().await.expect("count"), 1);
}

#[tokio::test]
async fn delete_removes_row_and_rejects_reuse() {
    let (manager, users) = setup().await;

    let mut user = users.instance_with([("name", "Ada")]).expect("construct");
    user.save(&manager).await.expect("insert");
    let id = user.get("id").cloned().expect("id assigned");

    user.delete(&manager).await.expect("delete");
    assert!(user.is_deleted());
    // Data mapping is left intact after delete.
    assert_eq!(user.get("name"), Some(&Value::Text("Ada".into())));

    assert!(users.find_by_id(id).await.expect("find").is_none());

    let save_err = user.save(&manager).await.expect_err("save after delete");
    assert!(matches!(save_err, Error::DeletedInstance { .. }));
    let delete_err = user.delete(&manager).await.expect_err("delete after delete");
    assert!(matches!(delete_err, Error::DeletedInstance { .. }));
}

#[tokio::test]
async fn serialized_instance_is_its_data_mapping() {
    let (manager, users) = setup().await;

    let mut user = users
        .instance_with([("name", Value::from("Ada")), ("email", Value::from("ada@b.co"))])
        .expect("construct");
    user.save(&manager).await.expect("insert");

    let json = serde_json::to_value(&user).expect("serialize");
    assert_eq!(
        json,
        serde_json::json!({
            "id": 1,
            "name": "Ada",
            "email": "ada@b.co",
            "age": 18,
        })
    );
}
