use pretty_assertions::assert_eq;
use rowmap::{err, Aggregate, Criteria, Direction};
use tests::prelude::*;

fn persist_user(em: &mut EntityManager, username: &str, email: Option<&str>) -> Handle<User> {
    let user = Handle::new(User {
        email: email.map(str::to_string),
        ..User::new(username)
    });
    assert_ok!(em.persist(&user));
    user
}

#[test]
fn persist_then_find_round_trip() {
    let mut db = SqliteDb::new();

    let user = Handle::new(User {
        id: None,
        username: "alice".to_string(),
        email: Some("alice@example.com".to_string()),
        active: false,
        created_at: Some("2024-03-01T09:30:00".to_string()),
    });
    assert_ok!(db.em.persist(&user));
    assert_ok!(db.em.flush());

    let id = user.borrow().id.unwrap();
    let written = user.borrow().clone();

    db.em.clear();
    let found = assert_ok!(db.em.find::<User>(id)).unwrap();

    assert!(!found.ptr_eq(&user));
    assert_eq!(*found.borrow(), written);
}

#[test]
fn generated_ids_increase() {
    let mut db = SqliteDb::new();

    let alice = persist_user(&mut db.em, "alice", None);
    let bob = persist_user(&mut db.em, "bob", None);
    assert_ok!(db.em.flush());

    assert_eq!(alice.borrow().id, Some(1));
    assert_eq!(bob.borrow().id, Some(2));
}

#[test]
fn update_and_delete() {
    let mut db = SqliteDb::new();

    let user = persist_user(&mut db.em, "alice", None);
    assert_ok!(db.em.flush());
    let id = user.borrow().id.unwrap();

    user.borrow_mut().email = Some("alice@example.org".to_string());
    assert_ok!(db.em.flush());

    db.em.clear();
    let found = assert_ok!(db.em.find::<User>(id)).unwrap();
    assert_eq!(found.borrow().email.as_deref(), Some("alice@example.org"));

    assert_ok!(db.em.remove(&found));
    assert_ok!(db.em.flush());

    assert_none!(assert_ok!(db.em.find::<User>(id)));
}

#[test]
fn association_join_query() {
    let mut db = SqliteDb::new();

    let alice = persist_user(&mut db.em, "alice", None);
    let bob = persist_user(&mut db.em, "bob", None);
    assert_ok!(db.em.flush());

    let alice_id = alice.borrow().id;
    let bob_id = bob.borrow().id;

    for (title, author) in [
        ("Zebra news", alice_id),
        ("Apple news", alice_id),
        ("Weather", alice_id),
        ("Other news", bob_id),
    ] {
        assert_ok!(db.em.persist(&Handle::new(Post::new(title, author))));
    }
    assert_ok!(db.em.flush());

    let posts = assert_ok!(assert_ok!(db.em.create_query(
        "SELECT p FROM Post p INNER JOIN p.author a \
         WHERE a.username = :name AND p.title LIKE :pattern ORDER BY p.title"
    ))
    .set_parameter("pattern", "%news%")
    .set_parameter("name", "alice")
    .get_result::<Post>());

    let titles: Vec<_> = posts.iter().map(|post| &post.title[..]).collect();
    assert_eq!(titles, ["Apple news", "Zebra news"]);
    assert_eq!(posts[0].title_slug, "apple-news");
    assert_eq!(posts[0].author_id, alice_id);

    let authors = assert_ok!(assert_ok!(db.em.create_query(
        "SELECT u FROM User u INNER JOIN u.posts p WITH p.title LIKE :t ORDER BY u.username"
    ))
    .set_parameter("t", "%news%")
    .get_result::<User>());

    let names: Vec<_> = authors.iter().map(|user| &user.username[..]).collect();
    assert_eq!(names, ["alice", "alice", "bob"]);
}

#[test]
fn scalar_query() {
    let mut db = SqliteDb::new();

    let alice = persist_user(&mut db.em, "alice", None);
    assert_ok!(db.em.flush());
    let alice_id = alice.borrow().id;

    for title in ["One", "Two"] {
        assert_ok!(db.em.persist(&Handle::new(Post::new(title, alice_id))));
    }
    assert_ok!(db.em.flush());

    let count = assert_ok!(assert_ok!(db
        .em
        .create_query("SELECT COUNT(p.id) FROM Post p WHERE p.authorId = :author"))
    .set_parameter("author", alice_id)
    .get_single_scalar_result());

    assert_eq!(count, Value::I64(2));
}

#[test]
fn scalar_query_on_empty_table() {
    let mut db = SqliteDb::new();

    let value = assert_ok!(assert_ok!(db
        .em
        .create_query("SELECT u.id FROM User u WHERE u.id = :id"))
    .set_parameter("id", 99)
    .get_single_scalar_result());

    assert_eq!(value, Value::Null);
}

#[test]
fn composite_key_round_trip() {
    let mut db = SqliteDb::new();

    let membership = Handle::new(Membership {
        user_id: 1,
        group_id: 2,
        role: "admin".to_string(),
    });
    assert_ok!(db.em.persist(&membership));
    assert_ok!(db.em.flush());

    membership.borrow_mut().group_id = 5;
    assert_ok!(db.em.flush());

    db.em.clear();
    assert_none!(assert_ok!(db.em.find::<Membership>([("userId", 1), ("groupId", 2)])));

    let found = assert_ok!(db.em.find::<Membership>([("groupId", 5), ("userId", 1)])).unwrap();
    assert_eq!(found.borrow().role, "admin");
}

#[test]
fn rolled_back_block_leaves_no_rows() {
    let mut db = SqliteDb::new();

    let err = assert_err!(db.em.transactional(|em| {
        persist_user(em, "alice", None);
        em.flush()?;
        Err::<(), _>(err!("abort"))
    }));
    assert_eq!(err.to_string(), "abort");

    let count = assert_ok!(db.em.repository::<User>().count(&Criteria::new()));
    assert_eq!(count, 0);
}

#[test]
fn repository_over_sqlite() {
    let mut db = SqliteDb::new();

    for (name, email) in [
        ("carol", Some("carol@example.com")),
        ("alice", None),
        ("bob", Some("bob@example.com")),
    ] {
        persist_user(&mut db.em, name, email);
    }
    assert_ok!(db.em.flush());

    let mut users = db.em.repository::<User>();

    let page = assert_ok!(users.find_by(
        &Criteria::new(),
        &[("username", Direction::Asc)],
        Some(2),
        Some(1)
    ));
    let names: Vec<_> = page.iter().map(|user| &user.username[..]).collect();
    assert_eq!(names, ["bob", "carol"]);

    let without_email = assert_ok!(users.find_one_by(&Criteria::new().eq("email", Value::Null)));
    assert_eq!(without_email.unwrap().username, "alice");

    assert_eq!(assert_ok!(users.count(&Criteria::from([("active", true)]))), 3);
    assert!(assert_ok!(users.exists(&Criteria::from([("username", "bob")]))));
    assert!(!assert_ok!(users.exists(&Criteria::from([("username", "dave")]))));
}

#[test]
fn repository_paging_and_aggregates_over_sqlite() {
    let mut db = SqliteDb::new();

    for (name, email) in [
        ("carol", Some("carol@example.com")),
        ("alice", None),
        ("bob", Some("bob@example.com")),
    ] {
        persist_user(&mut db.em, name, email);
    }
    assert_ok!(db.em.flush());

    let mut users = db.em.repository::<User>();

    let page = assert_ok!(users.find_paginated(
        2,
        2,
        &Criteria::new(),
        &[("username", Direction::Asc)]
    ));
    let names: Vec<_> = page.items.iter().map(|user| &user.username[..]).collect();
    assert_eq!(names, ["carol"]);
    assert_eq!((page.total, page.total_pages), (3, 2));

    assert_eq!(
        assert_ok!(users.aggregate(Aggregate::Max, "id", &Criteria::new())),
        Value::I64(3)
    );
    assert_eq!(
        assert_ok!(users.aggregate(Aggregate::Count, "email", &Criteria::new())),
        Value::I64(2)
    );

    let found = assert_ok!(users.find_by_ids([1, 3, 99]));
    assert_eq!(found.len(), 2);

    let bobs = assert_ok!(users.execute_query(
        "SELECT u FROM User u WHERE u.username = :name",
        [("name", "bob")]
    ));
    assert_eq!(bobs.len(), 1);
    assert_eq!(bobs[0].email.as_deref(), Some("bob@example.com"));
}

#[test]
fn refresh_discards_local_changes() {
    let mut db = SqliteDb::new();

    let user = persist_user(&mut db.em, "alice", None);
    assert_ok!(db.em.flush());

    user.borrow_mut().username = "not saved".to_string();
    assert_ok!(db.em.refresh(&user));

    assert_eq!(user.borrow().username, "alice");
}

#[test]
fn every_statement_reaches_the_log() {
    let mut db = SqliteDb::new();

    persist_user(&mut db.em, "alice", None);
    assert_ok!(db.em.flush());

    assert_eq!(
        db.log.script(),
        [
            "BEGIN",
            "INSERT INTO users (username, email, active, created_at) VALUES (?, ?, ?, ?)",
            "COMMIT",
        ]
    );
}
