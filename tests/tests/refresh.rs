use pretty_assertions::assert_eq;
use tests::prelude::*;

#[test]
fn refresh_overwrites_local_changes() {
    let mut db = MockDb::new();
    db.mock
        .push_rows([user_row(1, "alice", None)])
        .push_rows([user_row(1, "alice", Some("alice@example.com"))]);

    let user = assert_ok!(db.em.find::<User>(1)).unwrap();
    user.borrow_mut().username = "local edit".to_string();

    assert_ok!(db.em.refresh(&user));

    assert_eq!(user.borrow().username, "alice");
    assert_eq!(user.borrow().email.as_deref(), Some("alice@example.com"));
    assert_eq!(db.em.state(&user), EntityState::Managed);

    // The fresh snapshot leaves nothing to write
    db.log.clear();
    assert_ok!(db.em.flush());
    assert!(db.log.is_empty());

    // Still the instance the identity map hands out
    let found = assert_ok!(db.em.find::<User>(1)).unwrap();
    assert!(found.ptr_eq(&user));
}

#[test]
fn refresh_of_a_deleted_row_fails() {
    let mut db = MockDb::new();
    db.mock.push_rows([user_row(5, "eve", None)]).push_empty();

    let user = assert_ok!(db.em.find::<User>(5)).unwrap();
    let err = assert_err!(db.em.refresh(&user));

    assert!(err.is_entity_not_found());
    assert_eq!(err.to_string(), "entity not found: User with identifier 5");
    assert_eq!(db.em.state(&user), EntityState::Detached);
}

#[test]
fn refresh_requires_an_identifier() {
    let mut db = MockDb::new();

    let user = Handle::new(User::new("nobody"));
    let err = assert_err!(db.em.refresh(&user));

    assert!(err.is_state());
    assert!(err.root().is_validation());
    assert!(db.log.is_empty());
}

#[test]
fn refresh_while_borrowed_is_a_state_error() {
    let mut db = MockDb::new();
    db.mock
        .push_rows([user_row(1, "alice", None)])
        .push_rows([user_row(1, "alice", None)]);

    let user = assert_ok!(db.em.find::<User>(1)).unwrap();

    {
        let _guard = user.borrow();
        let err = assert_err!(db.em.refresh(&user));
        assert!(err.is_state());
    }

    assert_eq!(db.em.state(&user), EntityState::Managed);
}

#[test]
fn failed_reload_keeps_the_entity_managed() {
    let mut db = MockDb::new();
    db.mock.push_rows([user_row(3, "carol", None)]);

    let user = assert_ok!(db.em.find::<User>(3)).unwrap();
    db.mock.fail_on("FROM users");

    let err = assert_err!(db.em.refresh(&user));
    assert!(!err.is_entity_not_found());
    assert_eq!(db.em.state(&user), EntityState::Managed);

    db.mock.heal();
    let found = assert_ok!(db.em.find::<User>(3)).unwrap();
    assert!(found.ptr_eq(&user));
}
