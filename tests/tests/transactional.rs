use pretty_assertions::assert_eq;
use rowmap::{err, Oid};
use tests::prelude::*;

const INSERT_USER: &str =
    "INSERT INTO users (username, email, active, created_at) VALUES (?, ?, ?, ?)";

fn identities(em: &EntityManager) -> Vec<(String, Oid)> {
    let mut identities: Vec<_> = em
        .unit_of_work()
        .identities()
        .map(|(key, oid)| (key.to_string(), oid))
        .collect();
    identities.sort();
    identities
}

#[test]
fn block_is_flushed_and_committed() {
    let mut db = MockDb::new();
    let user = Handle::new(User::new("alice"));

    let ret = assert_ok!(db.em.transactional(|em| {
        em.persist(&user)?;
        Ok(42)
    }));

    assert_eq!(ret, 42);
    assert_eq!(db.log.script(), ["BEGIN", INSERT_USER, "COMMIT"]);
    assert_eq!(db.em.state(&user), EntityState::Managed);
}

#[test]
fn failing_block_restores_the_identity_map() {
    let mut db = MockDb::new();
    db.mock
        .push_rows([user_row(1, "alice", None)])
        .push_rows([user_row(2, "bob", None)]);

    let alice = assert_ok!(db.em.find::<User>(1)).unwrap();
    let bob = assert_ok!(db.em.find::<User>(2)).unwrap();
    db.log.clear();

    let before = identities(&db.em);
    let carol = Handle::new(User::new("carol"));

    let err = assert_err!(db.em.transactional(|em| {
        em.persist(&carol)?;
        em.remove(&alice)?;
        em.detach(&bob);
        Err::<(), _>(err!("boom"))
    }));

    // Returned unchanged
    assert_eq!(err.to_string(), "boom");

    assert_eq!(identities(&db.em), before);
    assert_eq!(db.em.state(&alice), EntityState::Managed);
    assert_eq!(db.em.state(&bob), EntityState::Managed);
    assert_eq!(db.em.state(&carol), EntityState::Detached);
    assert_eq!(db.log.script(), ["BEGIN", "ROLLBACK"]);
}

#[test]
fn failing_flush_rolls_back_once() {
    let mut db = MockDb::new();
    db.mock.fail_on("INSERT INTO users");

    let user = Handle::new(User::new("alice"));

    let err = assert_err!(db.em.transactional(|em| em.persist(&user)));
    assert!(err.is_flush());

    assert_eq!(db.log.script(), ["BEGIN", INSERT_USER, "ROLLBACK"]);
    assert_eq!(db.em.state(&user), EntityState::Detached);
    assert!(db.em.unit_of_work().is_empty());
}

#[test]
fn failing_commit_rolls_back_and_restores() {
    let mut db = MockDb::new();
    db.mock.fail_commit();

    let user = Handle::new(User::new("alice"));

    let err = assert_err!(db.em.transactional(|em| em.persist(&user)));
    assert!(err.is_transaction());

    assert_eq!(db.log.script(), ["BEGIN", INSERT_USER, "COMMIT", "ROLLBACK"]);
    assert_eq!(db.em.state(&user), EntityState::Detached);
}

#[test]
fn nested_blocks_share_one_transaction() {
    let mut db = MockDb::new();

    let user = Handle::new(User::new("alice"));
    let post = Handle::new(Post::new("Hello", None));

    assert_ok!(db.em.transactional(|em| {
        em.persist(&user)?;
        em.transactional(|em| em.persist(&post))
    }));

    assert_eq!(
        db.log.script(),
        [
            "BEGIN",
            INSERT_USER,
            "INSERT INTO posts (title, title_slug, content, author_id) VALUES (?, ?, ?, ?)",
            "COMMIT",
        ]
    );
    assert_eq!(db.em.state(&user), EntityState::Managed);
    assert_eq!(db.em.state(&post), EntityState::Managed);
}

#[test]
fn inner_rollback_dooms_the_outer_commit() {
    let mut db = MockDb::new();
    let user = Handle::new(User::new("alice"));

    let err = assert_err!(db.em.transactional(|em| {
        em.persist(&user)?;

        let inner = em.transactional(|_| Err::<(), _>(err!("inner failure")));
        assert!(inner.is_err());

        Ok(())
    }));

    assert!(err.is_transaction());
    assert_eq!(db.log.script(), ["BEGIN", INSERT_USER, "ROLLBACK"]);
    assert_eq!(db.em.state(&user), EntityState::Detached);

    // The next transaction starts clean
    db.log.clear();
    assert_ok!(db.em.transactional(|em| em.persist(&user)));
    assert_eq!(db.log.script(), ["BEGIN", INSERT_USER, "COMMIT"]);
}
