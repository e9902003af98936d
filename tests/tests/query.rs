use pretty_assertions::assert_eq;
use rowmap::ParseCache;
use tests::prelude::*;

const USER_COLUMNS: &str = "u.id, u.username, u.email, u.active, u.created_at";

fn compile(em: &mut EntityManager, oql: &str) -> String {
    assert_ok!(em.create_query(oql)).sql().to_string()
}

#[test]
fn parameters_follow_placeholder_order() {
    let mut db = MockDb::new();
    let oql = "SELECT u FROM User u WHERE u.username = :name AND u.email LIKE :pat";

    let in_order = assert_ok!(db.em.create_query(oql))
        .set_parameter("name", "alice")
        .set_parameter("pat", "%@example.com");
    assert_eq!(
        in_order.sql(),
        format!("SELECT {USER_COLUMNS} FROM users u WHERE u.username = ? AND u.email LIKE ?")
    );
    assert_eq!(
        assert_ok!(in_order.parameters()),
        [Value::from("alice"), Value::from("%@example.com")]
    );

    let mut reversed = assert_ok!(db.em.create_query(oql))
        .set_parameter(":pat", "%@example.com")
        .set_parameter(":name", "alice");
    assert_eq!(
        assert_ok!(reversed.parameters()),
        [Value::from("alice"), Value::from("%@example.com")]
    );

    assert_ok!(reversed.get_result::<User>());
    assert_eq!(
        db.log.all()[0].params(),
        [Value::from("alice"), Value::from("%@example.com")]
    );
}

#[test]
fn repeated_parameter_is_bound_at_every_placeholder() {
    let mut db = MockDb::new();

    let query = assert_ok!(db
        .em
        .create_query("SELECT u FROM User u WHERE u.username = :q OR u.email = :q"))
    .set_parameter("q", "alice");

    assert_eq!(
        assert_ok!(query.parameters()),
        [Value::from("alice"), Value::from("alice")]
    );
}

#[test]
fn unbound_parameter_is_a_query_error() {
    let mut db = MockDb::new();

    let mut query = assert_ok!(db
        .em
        .create_query("SELECT u FROM User u WHERE u.username = :name"))
    .set_parameter("other", 1);

    assert!(assert_err!(query.get_rows()).is_query());
    assert!(db.log.is_empty());
}

#[test]
fn association_join_with_extra_condition() {
    let mut db = MockDb::new();

    let query = assert_ok!(db
        .em
        .create_query("SELECT u FROM User u INNER JOIN u.posts p WITH p.title LIKE :t"))
    .set_parameter("t", "%news%");

    assert_eq!(
        query.sql(),
        format!(
            "SELECT {USER_COLUMNS} FROM users u \
             INNER JOIN posts p ON p.author_id = u.id AND (p.title LIKE ?)"
        )
    );
    assert_eq!(assert_ok!(query.parameters()), [Value::from("%news%")]);
}

#[test]
fn field_rewrite_matches_whole_tokens() {
    let mut db = MockDb::new();

    let sql = compile(
        &mut db.em,
        "SELECT p FROM Post p WHERE p.titleSlug = :slug AND p.title <> :title",
    );

    assert_eq!(
        sql,
        "SELECT p.id, p.title, p.title_slug, p.content, p.author_id FROM posts p \
         WHERE p.title_slug = ? AND p.title <> ?"
    );
}

#[test]
fn string_literals_are_left_alone() {
    let mut db = MockDb::new();

    let sql = compile(
        &mut db.em,
        "SELECT u.username FROM User u WHERE u.email = 'u.createdAt :not'",
    );

    assert_eq!(
        sql,
        "SELECT u.username FROM users u WHERE u.email = 'u.createdAt :not'"
    );
}

#[test]
fn many_to_one_join() {
    let mut db = MockDb::new();

    let sql = compile(
        &mut db.em,
        "SELECT p FROM Post p LEFT JOIN p.author a WHERE a.username = :name",
    );

    assert_eq!(
        sql,
        "SELECT p.id, p.title, p.title_slug, p.content, p.author_id FROM posts p \
         LEFT JOIN users a ON p.author_id = a.id WHERE a.username = ?"
    );
}

#[test]
fn many_to_many_join_goes_through_the_join_table() {
    let mut db = MockDb::new();

    let owning = compile(
        &mut db.em,
        "SELECT r.name FROM User u JOIN u.roles r WHERE u.id = :id",
    );
    assert_eq!(
        owning,
        "SELECT r.name FROM users u \
         INNER JOIN user_roles u_r ON u_r.user_id = u.id \
         INNER JOIN roles r ON r.id = u_r.role_id WHERE u.id = ?"
    );

    let inverse = compile(&mut db.em, "SELECT u.username FROM Role r JOIN r.users u");
    assert_eq!(
        inverse,
        "SELECT u.username FROM roles r \
         INNER JOIN user_roles r_u ON r_u.role_id = r.id \
         INNER JOIN users u ON u.id = r_u.user_id"
    );
}

#[test]
fn explicit_join_and_ordering() {
    let mut db = MockDb::new();

    let sql = compile(
        &mut db.em,
        "select u.username, p.title from User u left outer join Post p on p.authorId = u.id \
         order by u.createdAt desc, p.title",
    );

    assert_eq!(
        sql,
        "SELECT u.username, p.title FROM users u LEFT JOIN posts p ON p.author_id = u.id \
         ORDER BY u.created_at desc, p.title"
    );
}

#[test]
fn star_projection_without_alias() {
    let mut db = MockDb::new();

    assert_eq!(
        compile(&mut db.em, "SELECT * FROM Role"),
        "SELECT id, name FROM roles"
    );
}

#[test]
fn malformed_queries() {
    let mut db = MockDb::new();

    for oql in [
        "",
        "SELECT u",
        "FROM User u",
        "SELECT u FROM User u JOIN x.posts p",
        "SELECT u FROM User u JOIN u.comments c",
        "SELECT u FROM User u JOIN Post p",
        "SELECT u FROM User u WHERE u.nickname = :n",
        "SELECT u FROM User u WHERE (u.id = :id",
        "SELECT u FROM User u JOIN u.posts u",
    ] {
        let err = assert_err!(db.em.create_query(oql), "oql={oql:?}");
        assert!(err.is_query(), "oql={oql:?} err={err}");
    }

    let err = assert_err!(db.em.create_query("SELECT w FROM Widget w"));
    assert!(err.is_mapping());
}

#[test]
fn unknown_alias_error_names_the_fragment() {
    let mut db = MockDb::new();

    let err = assert_err!(db.em.create_query("SELECT u FROM User u JOIN x.posts p"));
    assert_eq!(
        err.to_string(),
        "invalid query: unknown alias `x` (near `x.posts p`)"
    );
}

#[test]
fn results_are_hydrated_but_not_managed() {
    let mut db = MockDb::new();
    db.mock.push_rows([
        user_row(1, "alice", None),
        user_row(2, "bob", Some("bob@example.com")),
    ]);

    let users = assert_ok!(assert_ok!(db
        .em
        .create_query("SELECT u FROM User u ORDER BY u.username"))
    .get_result::<User>());

    assert_eq!(users.len(), 2);
    assert_eq!(users[0].username, "alice");
    assert_eq!(users[1].email.as_deref(), Some("bob@example.com"));
    assert!(db.em.unit_of_work().is_empty());
}

#[test]
fn result_type_must_match_the_root_entity() {
    let mut db = MockDb::new();

    let mut query = assert_ok!(db.em.create_query("SELECT u FROM User u"));
    assert!(assert_err!(query.get_result::<Post>()).is_query());
}

#[test]
fn single_result() {
    let mut db = MockDb::new();
    db.mock
        .push_rows([user_row(1, "alice", None)])
        .push_empty()
        .push_rows([user_row(1, "alice", None), user_row(2, "bob", None)]);

    let oql = "SELECT u FROM User u WHERE u.active = :active";

    let one = assert_ok!(assert_ok!(db.em.create_query(oql))
        .set_parameter("active", true)
        .get_single_result::<User>());
    assert_eq!(one.unwrap().username, "alice");

    let none = assert_ok!(assert_ok!(db.em.create_query(oql))
        .set_parameter("active", true)
        .get_single_result::<User>());
    assert_none!(none);

    let err = assert_err!(assert_ok!(db.em.create_query(oql))
        .set_parameter("active", true)
        .get_single_result::<User>());
    assert!(err.is_query());
}

#[test]
fn single_scalar_result() {
    let mut db = MockDb::new();
    db.mock
        .push_rows([Row::new().with("COUNT(u.id)", 3)])
        .push_empty();

    let oql = "SELECT COUNT(u.id) FROM User u";

    let mut query = assert_ok!(db.em.create_query(oql));
    assert_eq!(query.sql(), "SELECT COUNT(u.id) FROM users u");
    assert_eq!(assert_ok!(query.get_single_scalar_result()), Value::I64(3));

    let mut query = assert_ok!(db.em.create_query(oql));
    assert_eq!(assert_ok!(query.get_single_scalar_result()), Value::Null);
}

#[test]
fn single_scalar_result_rejects_several_rows() {
    let mut db = MockDb::new();
    db.mock
        .push_rows([Row::new().with("id", 1), Row::new().with("id", 2)]);

    let mut query = assert_ok!(db.em.create_query("SELECT u.id FROM User u"));
    assert!(assert_err!(query.get_single_scalar_result()).is_query());
}

#[test]
fn single_scalar_result_of_missing_row_is_null() {
    let mut db = MockDb::new();

    let mut query = assert_ok!(db.em.create_query("SELECT u.id FROM User u WHERE u.id = :id"))
        .set_parameter("id", 99);

    assert_eq!(assert_ok!(query.get_single_scalar_result()), Value::Null);
    assert_eq!(
        db.log.statements(),
        ["SELECT u.id FROM users u WHERE u.id = ?"]
    );
}

#[test]
fn execution_failures_carry_the_sql() {
    let mut db = MockDb::new();
    db.mock.fail_on("FROM users");

    let mut query = assert_ok!(db.em.create_query("SELECT u FROM User u"));
    let err = assert_err!(query.get_rows());

    assert!(err.is_query());
    assert!(err.root().is_driver());
    assert!(err
        .to_string()
        .starts_with(&format!("invalid query: query execution failed (near `SELECT {USER_COLUMNS} FROM users u`)")));
}

#[test]
fn parse_cache_reuses_parsed_queries() {
    let mut db = MockDb::new();
    let oql = "SELECT u FROM User u WHERE u.id = :id";

    assert_ok!(db.em.create_query(oql));
    assert_ok!(db.em.create_query(&format!("  {oql}\n")));

    let cache = db.em.parse_cache();
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.misses(), 1);
    assert_eq!(cache.hits(), 1);
    assert!(cache.contains(oql));

    db.em.clear_query_cache();
    assert!(db.em.parse_cache().is_empty());
    assert_eq!(db.em.parse_cache().hits(), 0);
}

#[test]
fn failed_parses_are_not_cached() {
    let mut db = MockDb::new();

    assert_err!(db.em.create_query("SELECT u FROM"));
    assert!(db.em.parse_cache().is_empty());
}

#[test]
fn parse_cache_can_be_shared() {
    let cache = ParseCache::new();

    let mut builder = builder();
    builder.query_cache(cache.clone());

    let mut first = MockDb::with_builder(builder);
    assert_ok!(first.em.create_query("SELECT r FROM Role r"));

    let mut builder = tests::builder();
    builder.query_cache(cache.clone());

    let mut second = MockDb::with_builder(builder);
    assert_ok!(second.em.create_query("SELECT r FROM Role r"));

    assert_eq!(cache.len(), 1);
    assert_eq!(cache.hits(), 1);
}
