use ultraorm::prelude::*;

fn users_definition() -> EntityDefinition {
    EntityDefinition::builder("users")
        .field(FieldDescriptor::big_integer("id").primary_key().auto_increment())
        .field(FieldDescriptor::string("name"))
        .build()
        .expect("build users definition")
}

fn posts_definition() -> EntityDefinition {
    EntityDefinition::builder("posts")
        .field(FieldDescriptor::big_integer("id").primary_key().auto_increment())
        .field(
            FieldDescriptor::foreign_key("author_id", "users")
                .on_delete(ReferentialAction::Cascade),
        )
        .field(FieldDescriptor::string("title"))
        .build()
        .expect("build posts definition")
}

#[tokio::test]
async fn migrate_creates_every_registered_table() {
    let manager = ConnectionManager::new(Config::memory("migrate_db"));
    let users = manager.register(users_definition());
    let posts = manager.register(posts_definition());
    manager.connect().await.expect("connect");
    manager.migrate().await.expect("migrate");

    let mut ada = users.instance_with([("name", "Ada")]).expect("construct");
    ada.save(&manager).await.expect("insert user");

    let mut post = posts
        .instance_with([
            ("author_id", ada.get("id").cloned().expect("id assigned")),
            ("title", Value::from("Notes on the Engine")),
        ])
        .expect("construct");
    post.save(&manager).await.expect("insert post");

    assert_eq!(users.query().count().await.expect("count"), 1);
    assert_eq!(posts.query().count().await.expect("count"), 1);
}

#[tokio::test]
async fn repeated_sync_keeps_existing_rows() {
    let manager = ConnectionManager::new(Config::memory("resync_db"));
    let users = manager.register(users_definition());
    manager.connect().await.expect("connect");
    manager.migrate().await.expect("migrate");

    let mut ada = users.instance_with([("name", "Ada")]).expect("construct");
    ada.save(&manager).await.expect("insert");

    users.sync().await.expect("second sync");
    manager.migrate().await.expect("second migrate");

    assert_eq!(users.query().count().await.expect("count"), 1);
}

#[tokio::test]
async fn foreign_key_target_key_comes_from_the_registry() {
    let manager = ConnectionManager::new(Config::memory("fk_db"));
    // The referenced entity only needs to be registered, not yet created.
    manager.register(users_definition());
    let posts = manager.register(posts_definition());
    manager.connect().await.expect("connect");

    posts.sync().await.expect("posts sync resolves users.id");
}

#[tokio::test]
async fn migrate_stops_at_the_first_failing_entity() {
    let manager = ConnectionManager::new(Config::memory("abort_db"));
    let users = manager.register(users_definition());
    let broken = manager.register(
        EntityDefinition::builder("broken")
            .field(FieldDescriptor::big_integer("id").primary_key())
            .field(FieldDescriptor::foreign_key("ghost_id", "ghosts"))
            .build()
            .expect("build broken definition"),
    );
    let third = manager.register(
        EntityDefinition::builder("third")
            .field(FieldDescriptor::big_integer("id").primary_key())
            .build()
            .expect("build third definition"),
    );
    manager.connect().await.expect("connect");

    let err = manager.migrate().await.expect_err("unresolvable reference");
    assert!(matches!(err, Error::Schema { ref table, .. } if table == "broken"));

    // Entities before the failure exist, entities after it were never reached.
    assert_eq!(users.query().count().await.expect("users table exists"), 0);
    assert!(broken.query().count().await.is_err());
    assert!(third.query().count().await.is_err());
}

#[tokio::test]
async fn sync_requires_a_connected_manager() {
    let manager = ConnectionManager::new(Config::memory("cold_sync_db"));
    let users = manager.register(users_definition());

    let err = users.sync().await.expect_err("not connected");
    assert!(err.is_connection());
}
