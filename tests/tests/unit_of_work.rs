use pretty_assertions::assert_eq;
use rowmap::{accessor, Entity, FieldDef, FieldType, IdGenerator, Mapping};
use tests::prelude::*;

const INSERT_USER: &str =
    "INSERT INTO users (username, email, active, created_at) VALUES (?, ?, ?, ?)";

#[test]
fn flush_inserts_and_captures_generated_id() {
    let mut db = MockDb::new();

    let user = Handle::new(User {
        email: Some("alice@example.com".to_string()),
        ..User::new("alice")
    });

    assert_ok!(db.em.persist(&user));
    assert_eq!(db.em.state(&user), EntityState::New);
    assert!(db.em.unit_of_work().is_scheduled_for_insert(user.oid()));
    assert!(db.log.is_empty());

    assert_ok!(db.em.flush());

    assert_eq!(db.log.script(), ["BEGIN", INSERT_USER, "COMMIT"]);
    assert_eq!(
        db.log.all()[1].params(),
        [
            Value::from("alice"),
            Value::from("alice@example.com"),
            Value::Bool(true),
            Value::Null,
        ]
    );
    assert_eq!(db.log.count(|op| matches!(op, Exec::LastInsertId)), 1);

    assert_eq!(user.borrow().id, Some(1));
    assert_eq!(db.em.state(&user), EntityState::Managed);
    assert_eq!(db.em.unit_of_work().identity_count(), 1);
}

#[test]
fn second_flush_is_a_no_op() {
    let mut db = MockDb::new();

    let user = Handle::new(User::new("alice"));
    assert_ok!(db.em.persist(&user));
    assert_ok!(db.em.flush());

    db.log.clear();
    assert_ok!(db.em.flush());
    assert_ok!(db.em.flush());

    assert!(db.log.is_empty(), "unexpected statements: {:?}", db.log.all());
}

#[test]
fn update_writes_changed_columns_only() {
    let mut db = MockDb::new();
    db.mock.push_rows([user_row(1, "alice", Some("alice@example.com"))]);

    let user = assert_ok!(db.em.find::<User>(1)).unwrap();
    db.log.clear();

    user.borrow_mut().email = Some("alice@example.org".to_string());
    assert_ok!(db.em.flush());

    assert_eq!(
        db.log.script(),
        ["BEGIN", "UPDATE users SET email = ? WHERE id = ?", "COMMIT"]
    );
    assert_eq!(
        db.log.all()[1].params(),
        [Value::from("alice@example.org"), Value::I64(1)]
    );

    // The snapshot now holds the written value
    db.log.clear();
    assert_ok!(db.em.flush());
    assert!(db.log.is_empty());
}

#[test]
fn remove_deletes_and_detaches() {
    let mut db = MockDb::new();
    db.mock.push_rows([user_row(1, "alice", None)]);

    let user = assert_ok!(db.em.find::<User>(1)).unwrap();
    db.log.clear();

    assert_ok!(db.em.remove(&user));
    assert_eq!(db.em.state(&user), EntityState::Removed);
    assert!(!db.em.contains(&user));

    assert_ok!(db.em.flush());

    assert_eq!(
        db.log.script(),
        ["BEGIN", "DELETE FROM users WHERE id = ?", "COMMIT"]
    );
    assert_eq!(db.log.all()[1].params(), [Value::I64(1)]);
    assert_eq!(db.em.state(&user), EntityState::Detached);
    assert_eq!(db.em.unit_of_work().identity_count(), 0);
}

#[test]
fn removing_a_new_entity_issues_no_sql() {
    let mut db = MockDb::new();

    let user = Handle::new(User::new("ghost"));
    assert_ok!(db.em.persist(&user));
    assert_ok!(db.em.remove(&user));

    assert_eq!(db.em.state(&user), EntityState::Detached);
    assert!(!db.em.unit_of_work().is_scheduled_for_insert(user.oid()));

    assert_ok!(db.em.flush());
    assert!(db.log.is_empty(), "unexpected statements: {:?}", db.log.all());
}

#[test]
fn persist_cancels_pending_delete() {
    let mut db = MockDb::new();
    db.mock.push_rows([user_row(1, "alice", None)]);

    let user = assert_ok!(db.em.find::<User>(1)).unwrap();
    db.log.clear();

    assert_ok!(db.em.remove(&user));
    assert_ok!(db.em.persist(&user));
    assert_eq!(db.em.state(&user), EntityState::Managed);

    assert_ok!(db.em.flush());
    assert!(db.log.is_empty());
}

#[test]
fn removing_an_untracked_entity_fails() {
    let mut db = MockDb::new();

    let user = Handle::new(User::new("stranger"));
    let err = assert_err!(db.em.remove(&user));
    assert!(err.is_state());
}

#[test]
fn writes_run_inserts_then_updates_then_deletes() {
    let mut db = MockDb::new();
    db.mock
        .push_rows([user_row(1, "alice", None)])
        .push_rows([user_row(2, "bob", None)]);

    let alice = assert_ok!(db.em.find::<User>(1)).unwrap();
    let bob = assert_ok!(db.em.find::<User>(2)).unwrap();
    db.log.clear();

    assert_ok!(db.em.remove(&bob));
    alice.borrow_mut().username = "alicia".to_string();
    let post = Handle::new(Post::new("Hello World", Some(1)));
    assert_ok!(db.em.persist(&post));

    assert_ok!(db.em.flush());

    assert_eq!(
        db.log.script(),
        [
            "BEGIN",
            "INSERT INTO posts (title, title_slug, content, author_id) VALUES (?, ?, ?, ?)",
            "UPDATE users SET username = ? WHERE id = ?",
            "DELETE FROM users WHERE id = ?",
            "COMMIT",
        ]
    );
}

#[test]
fn composite_keys_are_written_by_the_caller() {
    let mut db = MockDb::new();

    let membership = Handle::new(Membership {
        user_id: 1,
        group_id: 2,
        role: "admin".to_string(),
    });
    assert_ok!(db.em.persist(&membership));
    assert_ok!(db.em.flush());

    assert_eq!(
        db.log.script(),
        [
            "BEGIN",
            "INSERT INTO memberships (user_id, group_id, role) VALUES (?, ?, ?)",
            "COMMIT",
        ]
    );
    assert_eq!(
        db.log.all()[1].params(),
        [Value::I64(1), Value::I64(2), Value::from("admin")]
    );
    assert_eq!(db.log.count(|op| matches!(op, Exec::LastInsertId)), 0);
}

#[test]
fn changing_a_key_updates_by_the_old_key() {
    let mut db = MockDb::new();

    let membership = Handle::new(Membership {
        user_id: 1,
        group_id: 2,
        role: "admin".to_string(),
    });
    assert_ok!(db.em.persist(&membership));
    assert_ok!(db.em.flush());
    db.log.clear();

    membership.borrow_mut().group_id = 3;
    assert_ok!(db.em.flush());

    assert_eq!(
        db.log.script(),
        [
            "BEGIN",
            "UPDATE memberships SET group_id = ? WHERE user_id = ? AND group_id = ?",
            "COMMIT",
        ]
    );
    assert_eq!(
        db.log.all()[1].params(),
        [Value::I64(3), Value::I64(1), Value::I64(2)]
    );

    // The identity map follows the new key
    db.log.clear();
    let found = assert_ok!(db.em.find::<Membership>([("userId", 1), ("groupId", 3)])).unwrap();
    assert!(found.ptr_eq(&membership));
    assert!(db.log.is_empty());

    assert_none!(assert_ok!(db.em.find::<Membership>([("userId", 1), ("groupId", 2)])));
}

#[derive(Debug, Default)]
struct Setting {
    key: String,
    value: Option<String>,
}

impl Entity for Setting {
    const NAME: &'static str = "Setting";

    fn mapping() -> Mapping {
        Mapping::entity()
            .table("settings")
            .generated(IdGenerator::Sequence)
            .field(FieldDef::new("key", FieldType::String, accessor!(Setting, key)).id())
            .field(
                FieldDef::new("value", FieldType::String, accessor!(Setting, value))
                    .nullable()
                    .default("on"),
            )
    }
}

#[test]
fn null_fields_take_their_default_on_insert() {
    let mut builder = builder();
    builder.register::<Setting>();
    let mut db = MockDb::with_builder(builder);

    let setting = Handle::new(Setting {
        key: "feature".to_string(),
        value: None,
    });
    assert_ok!(db.em.persist(&setting));
    assert_ok!(db.em.flush());

    assert_eq!(
        db.log.all()[1],
        Exec::Update {
            sql: "INSERT INTO settings (key, value) VALUES (?, ?)".to_string(),
            params: vec![Value::from("feature"), Value::from("on")],
        }
    );
}

#[test]
fn failed_write_rolls_back_and_keeps_the_work_pending() {
    let mut db = MockDb::new();
    db.mock.fail_on("INSERT INTO posts");

    let user = Handle::new(User::new("alice"));
    let post = Handle::new(Post::new("First", None));
    assert_ok!(db.em.persist(&user));
    assert_ok!(db.em.persist(&post));

    let err = assert_err!(db.em.flush());
    assert!(err.is_flush());
    assert!(err.cause().unwrap().is_transaction());
    assert!(err.root().is_driver());

    assert_eq!(
        db.log.script(),
        [
            "BEGIN",
            INSERT_USER,
            "INSERT INTO posts (title, title_slug, content, author_id) VALUES (?, ?, ?, ?)",
            "ROLLBACK",
        ]
    );

    assert_eq!(db.em.state(&user), EntityState::New);
    assert_eq!(db.em.state(&post), EntityState::New);
    assert_eq!(db.em.unit_of_work().identity_count(), 0);

    db.mock.heal();
    db.log.clear();
    assert_ok!(db.em.flush());

    assert_eq!(db.log.count(|op| matches!(op, Exec::Update { .. })), 2);
    assert_eq!(db.em.state(&user), EntityState::Managed);
    assert_eq!(db.em.state(&post), EntityState::Managed);
}

#[test]
fn failed_commit_is_reported_as_a_transaction_error() {
    let mut db = MockDb::new();
    db.mock.fail_commit();

    let user = Handle::new(User::new("alice"));
    assert_ok!(db.em.persist(&user));

    let err = assert_err!(db.em.flush());
    assert!(err.is_flush());
    assert!(err.cause().unwrap().is_transaction());
    assert_eq!(db.log.script(), ["BEGIN", INSERT_USER, "COMMIT", "ROLLBACK"]);
    assert_eq!(db.em.state(&user), EntityState::New);
}

#[test]
fn detach_and_clear_stop_tracking() {
    let mut db = MockDb::new();
    db.mock
        .push_rows([user_row(1, "alice", None)])
        .push_rows([user_row(2, "bob", None)]);

    let alice = assert_ok!(db.em.find::<User>(1)).unwrap();
    let bob = assert_ok!(db.em.find::<User>(2)).unwrap();

    db.em.detach(&alice);
    assert_eq!(db.em.state(&alice), EntityState::Detached);
    assert_eq!(db.em.unit_of_work().len(), 1);

    // Changes to a detached instance are not written
    alice.borrow_mut().username = "changed".to_string();
    db.log.clear();
    assert_ok!(db.em.flush());
    assert!(db.log.is_empty());

    db.em.clear();
    assert_eq!(db.em.state(&bob), EntityState::Detached);
    assert!(db.em.unit_of_work().is_empty());
    assert_eq!(db.em.unit_of_work().identity_count(), 0);
}

#[test]
fn persisting_a_detached_entity_schedules_an_insert() {
    let mut db = MockDb::new();
    db.mock.push_rows([user_row(1, "alice", None)]);

    let alice = assert_ok!(db.em.find::<User>(1)).unwrap();
    db.em.detach(&alice);

    assert_ok!(db.em.persist(&alice));
    assert_eq!(db.em.state(&alice), EntityState::New);
}
