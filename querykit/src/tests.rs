use rusqlite::Row;
use test_case::test_case;

use super::*;

fn people_registry() -> Registry {
    Registry::builder()
        .table("people", ["id integer primary key", "name text not null", "age integer"])
        .prepared_statement("insert", "insert into people(name, age) values(?, ?)", true)
        .statement("insert_quiet", "insert into people(name, age) values(?, ?)")
        .statement("by_name", "select name, age from people where name = ?")
        .statement("all", "select name, age from people order by id")
        .statement("count", "select count(*) from people")
        .statement("is_adult", "select age >= 18 from people where name = ?")
        .decoder("person", |row: &Row<'_>| -> rusqlite::Result<(String, i64)> {
            Ok((row.get(0)?, row.get(1)?))
        })
        .build()
        .expect("build registry")
}

#[test_case(true, 1)]
#[test_case(false, 0)]
fn test_bool_to_integer(value: bool, expected: i64) {
    assert_eq!(bool_to_integer(value), expected);
    assert_eq!(Value::boolean(value), Value::Integer(expected));
}

#[test_case(0, Ok(false))]
#[test_case(1, Ok(true))]
#[test_case(2, Err(InvalidBoolean(2)))]
#[test_case(-1, Err(InvalidBoolean(-1)))]
#[test_case(i64::MAX, Err(InvalidBoolean(i64::MAX)))]
fn test_integer_to_boolean(value: i64, expected: Result<bool, InvalidBoolean>) {
    assert_eq!(integer_to_boolean(value), expected);
}

#[test]
fn test_invalid_boolean_is_the_recoverable_error() {
    let err = DbError::from(InvalidBoolean(7));
    assert!(err.is_recoverable());
    assert_eq!(err.to_string(), "integer 7 is not a boolean (expected 0 or 1)");
    assert!(!DbError::Closed.is_recoverable());
    assert!(!DbError::UnknownStatement("x".to_string()).is_recoverable());
}

#[test]
fn test_value_factories_keep_kind_and_payload() {
    let integer = Value::integer(42);
    assert_eq!(integer.kind(), ValueKind::Integer);
    assert_eq!(integer.as_integer(), Some(42));
    assert_eq!(integer.as_real(), None);

    let real = Value::real(2.5);
    assert_eq!(real.kind(), ValueKind::Real);
    assert_eq!(real.as_real(), Some(2.5));

    let text = Value::text("hello");
    assert_eq!(text.kind(), ValueKind::Text);
    assert_eq!(text.as_text(), Some("hello"));
    assert_eq!(text.as_integer(), None);

    assert_eq!(Value::boolean(true).kind(), ValueKind::Integer);
    assert_eq!(Value::integer(1).as_boolean(), Ok(Some(true)));
    assert_eq!(Value::integer(5).as_boolean(), Err(InvalidBoolean(5)));
    assert_eq!(Value::text("1").as_boolean(), Ok(None));
}

#[test]
fn test_params_macro_builds_typed_values() {
    let values = params![1_i64, 2.5, "three", true];
    assert_eq!(
        values,
        &[
            Value::Integer(1),
            Value::Real(2.5),
            Value::Text("three".to_string()),
            Value::Integer(1),
        ][..]
    );
}

#[test_case(true, "create table if not exists t(id integer primary key,name text);")]
#[test_case(false, "create table t(id integer primary key,name text);")]
fn test_create_table_sql(if_not_exists: bool, expected: &str) {
    let table = TableBlueprint::new("t", if_not_exists, ["id integer primary key", "name text"]);
    assert_eq!(table.create_sql(), expected);
}

#[test]
fn test_execute_returns_generated_key_only_when_declared() {
    let registry = people_registry();
    let conn = registry.connect().expect("connect");

    let first = conn
        .execute("insert", params!["ada", 36])
        .expect("insert");
    assert_eq!(first.as_deref(), Some("1"));

    let quiet = conn
        .execute("insert_quiet", params!["grace", 45])
        .expect("insert");
    assert_eq!(quiet, None);

    let third = conn
        .execute("insert", params!["alan", 41])
        .expect("insert");
    assert_eq!(third.as_deref(), Some("3"));
}

#[test]
fn test_query_one_decodes_first_row_or_nothing() {
    let registry = people_registry();
    let conn = registry.connect().expect("connect");
    conn.execute("insert", params!["ada", 36]).expect("insert");
    conn.execute("insert", params!["bob", 12]).expect("insert");

    let first: Option<(String, i64)> = conn
        .query_one_named("all", "person", params![])
        .expect("query");
    assert_eq!(first, Some(("ada".to_string(), 36)));

    let missing: Option<(String, i64)> = conn
        .query_one_named("by_name", "person", params!["nobody"])
        .expect("query");
    assert_eq!(missing, None);

    let name: Option<String> = conn
        .query_one("by_name", &SingleString, params!["bob"])
        .expect("query");
    assert_eq!(name.as_deref(), Some("bob"));
}

#[test]
fn test_query_many_keeps_cursor_order() {
    let registry = people_registry();
    let conn = registry.connect().expect("connect");
    for (name, age) in [("c", 3), ("a", 1), ("b", 2)] {
        conn.execute("insert", params![name, age]).expect("insert");
    }

    let people: Vec<(String, i64)> = conn
        .query_many_named("all", "person", params![])
        .expect("query");
    let names: Vec<&str> = people.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, ["c", "a", "b"]);

    let ages: Vec<i64> = conn
        .query_many(
            "all",
            &|row: &Row<'_>| row.get::<_, i64>(1),
            params![],
        )
        .expect("query");
    assert_eq!(ages, [3, 1, 2]);

    let none: Vec<String> = conn
        .query_many("by_name", &SingleString, params!["nobody"])
        .expect("query");
    assert!(none.is_empty());
}

#[test]
fn test_query_boolean_conflates_no_row_and_zero() {
    let registry = people_registry();
    let conn = registry.connect().expect("connect");
    conn.execute("insert", params!["ada", 36]).expect("insert");
    conn.execute("insert", params!["bob", 12]).expect("insert");

    assert!(conn.query_boolean("is_adult", params!["ada"]).expect("query"));
    assert!(!conn.query_boolean("is_adult", params!["bob"]).expect("query"));
    assert!(!conn.query_boolean("is_adult", params!["nobody"]).expect("query"));
}

#[test]
fn test_query_boolean_null_first_column_is_false() {
    let registry = Registry::builder()
        .table("flags", ["id integer primary key", "flag integer"])
        .statement("max_flag", "select max(flag) from flags")
        .build()
        .expect("build registry");
    let conn = registry.connect().expect("connect");
    assert!(!conn.query_boolean("max_flag", params![]).expect("query"));
}

#[test]
fn test_generated_key_only_reported_for_inserts() {
    let registry = Registry::builder()
        .table("people", ["id integer primary key", "name text not null", "age integer"])
        .prepared_statement("insert", "insert into people(name, age) values(?, ?)", true)
        .prepared_statement("birthday", "update people set age = age + 1 where name = ?", true)
        .build()
        .expect("build registry");
    let conn = registry.connect().expect("connect");
    let key = conn.execute("insert", params!["ada", 36]).expect("insert");
    assert_eq!(key.as_deref(), Some("1"));
    let key = conn.execute("birthday", params!["ada"]).expect("update");
    assert_eq!(key, None);
    let key = conn.execute("insert", params!["bob", 12]).expect("insert");
    assert_eq!(key.as_deref(), Some("2"));
}

#[test]
fn test_builtin_decoders_read_first_column() {
    let registry = Registry::builder()
        .statement("row", "select 7, 'x'")
        .statement("real", "select 1.5")
        .build()
        .expect("build registry");
    let conn = registry.connect().expect("connect");

    let integer: Option<i64> = conn.query_one("row", &SingleInteger, params![]).expect("query");
    assert_eq!(integer, Some(7));
    let double: Option<f64> = conn.query_one("real", &SingleDouble, params![]).expect("query");
    assert_eq!(double, Some(1.5));
    let value: Option<Value> = conn.query_one("row", &SingleValue, params![]).expect("query");
    assert_eq!(value, Some(Value::Integer(7)));
}

#[test]
fn test_parameter_count_mismatch_is_a_driver_error() {
    let registry = people_registry();
    let conn = registry.connect().expect("connect");

    let too_few = conn.execute("insert", params!["ada"]);
    assert!(matches!(too_few, Err(DbError::Sqlite(_))));

    let too_many = conn.execute("insert", params!["ada", 1, 2]);
    assert!(matches!(too_many, Err(DbError::Sqlite(_))));
}

#[test]
fn test_constraint_violation_is_reported_with_sqlite_code() {
    let registry = Registry::builder()
        .table("tags", ["name text unique"])
        .statement("insert", "insert into tags(name) values(?)")
        .build()
        .expect("build registry");
    let conn = registry.connect().expect("connect");

    conn.execute("insert", params!["rust"]).expect("first insert");
    let err = conn.execute("insert", params!["rust"]).expect_err("duplicate");
    assert!(!err.is_recoverable());
    assert_eq!(err.sqlite_code(), Some(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE));
}

#[test]
fn test_unknown_decoder_and_type_mismatch() {
    let registry = people_registry();
    let conn = registry.connect().expect("connect");

    let unknown = conn.query_one_named::<String>("all", "nope", params![]);
    assert!(matches!(unknown, Err(DbError::UnknownDecoder(name)) if name == "nope"));

    let mismatch = conn.query_one_named::<i64>("all", "person", params![]);
    assert!(matches!(mismatch, Err(DbError::DecoderTypeMismatch { name, .. }) if name == "person"));
}

#[test]
fn test_connect_with_subset_compiles_only_those_statements() {
    let registry = people_registry();
    let conn = registry.connect_with(&["insert", "count"]).expect("connect");
    assert_eq!(conn.prepared_statements(), ["count", "insert"]);

    conn.execute("insert", params!["ada", 36]).expect("insert");
    let err = conn.query_many("all", &SingleString, params![]).expect_err("not prepared");
    assert!(matches!(err, DbError::StatementNotPrepared(name) if name == "all"));
}

#[test]
fn test_connect_with_undeclared_name_fails() {
    let registry = people_registry();
    let err = registry.connect_with(&["insert", "missing"]).expect_err("undeclared");
    assert!(matches!(err, DbError::UnknownStatement(name) if name == "missing"));
}

#[test]
fn test_duplicate_declarations_keep_the_last_one() {
    let registry = Registry::builder()
        .statement("answer", "select 1")
        .statement("answer", "select 2")
        .decoder("first", SingleString)
        .decoder("first", SingleInteger)
        .build()
        .expect("build registry");
    assert_eq!(registry.statement_names(), ["answer"]);
    assert_eq!(registry.statement("answer").map(|s| s.sql.as_str()), Some("select 2"));

    let conn = registry.connect().expect("connect");
    let answer: Option<i64> = conn.query_one_named("answer", "first", params![]).expect("query");
    assert_eq!(answer, Some(2));
}

#[test]
fn test_close_is_idempotent() {
    let registry = people_registry();
    let mut conn = registry.connect().expect("connect");
    assert!(conn.is_connected());

    conn.close().expect("close");
    assert!(!conn.is_connected());
    conn.close().expect("second close");

    let err = conn.execute("count", params![]).expect_err("closed");
    assert!(matches!(err, DbError::Closed));
}

#[test]
fn test_commit_and_rollback_need_manual_mode() {
    let registry = people_registry();
    let mut conn = registry.connect().expect("connect");
    assert!(conn.auto_commit());
    assert!(matches!(conn.commit(), Err(DbError::AutoCommitEnabled)));
    assert!(matches!(conn.rollback(), Err(DbError::AutoCommitEnabled)));

    conn.set_auto_commit(false).expect("manual mode");
    conn.execute("insert", params!["ada", 36]).expect("insert");
    conn.rollback().expect("rollback");
    let count: Option<i64> = conn.query_one("count", &SingleInteger, params![]).expect("query");
    assert_eq!(count, Some(0));

    conn.execute("insert", params!["ada", 36]).expect("insert");
    conn.commit().expect("commit");
    conn.execute("insert", params!["bob", 12]).expect("insert");
    conn.set_auto_commit(true).expect("auto mode commits pending work");
    let count: Option<i64> = conn.query_one("count", &SingleInteger, params![]).expect("query");
    assert_eq!(count, Some(2));
}

#[test]
fn test_transaction_guard_rolls_back_on_drop() {
    let registry = people_registry();
    let mut conn = registry.connect().expect("connect");

    {
        let tx = conn.transaction().expect("begin");
        tx.execute("insert", params!["ada", 36]).expect("insert");
    }
    assert!(conn.auto_commit());
    let count: Option<i64> = conn.query_one("count", &SingleInteger, params![]).expect("query");
    assert_eq!(count, Some(0));

    let tx = conn.transaction().expect("begin");
    tx.execute("insert", params!["ada", 36]).expect("insert");
    tx.commit().expect("commit");
    let count: Option<i64> = conn.query_one("count", &SingleInteger, params![]).expect("query");
    assert_eq!(count, Some(1));
}

#[test]
fn test_transaction_guard_in_manual_mode_keeps_earlier_work() {
    let registry = people_registry();
    let mut conn = registry.connect().expect("connect");
    conn.set_auto_commit(false).expect("manual mode");
    conn.execute("insert", params!["ada", 36]).expect("insert");

    drop(conn.transaction().expect("begin"));
    {
        let tx = conn.transaction().expect("begin");
        tx.execute("insert", params!["bob", 12]).expect("insert");
    }
    let tx = conn.transaction().expect("begin");
    tx.execute("insert", params!["cy", 50]).expect("insert");
    tx.rollback().expect("rollback");
    let tx = conn.transaction().expect("begin");
    tx.execute("insert", params!["dee", 41]).expect("insert");
    tx.commit().expect("release");

    assert!(!conn.auto_commit());
    conn.commit().expect("commit");
    let names: Vec<String> = conn
        .query_many("all", &SingleString, params![])
        .expect("query");
    assert_eq!(names, ["ada", "dee"]);
}

#[test]
fn test_manifest_parses_defaults() {
    let manifest = Manifest::from_json_str(
        r#"{
            "tables": [{ "name": "t", "columns": ["id integer primary key", "name text"] }],
            "statements": [
                { "name": "insert", "sql": "insert into t(name) values(?)", "return_generated_key": true },
                { "name": "count", "sql": "select count(*) from t" }
            ]
        }"#,
    )
    .expect("parse manifest");
    assert_eq!(manifest.config, DbConfig::default());
    assert!(manifest.tables[0].if_not_exists);
    assert!(!manifest.statements[1].return_generated_key);

    let registry = RegistryBuilder::from_manifest(manifest)
        .build()
        .expect("build registry");
    let conn = registry.connect().expect("connect");
    assert_eq!(conn.execute("insert", params!["a"]).expect("insert").as_deref(), Some("1"));
}

#[test]
fn test_manifest_rejects_unknown_fields() {
    let err = Manifest::from_json_str(r#"{ "config": { "databse": "x.db" } }"#)
        .expect_err("typo in field name");
    assert!(matches!(err, DbError::Json(_)));
}

#[test]
fn test_zero_statement_cache_is_rejected() {
    let config = DbConfig {
        statement_cache_capacity: 0,
        ..DbConfig::default()
    };
    let err = RegistryBuilder::new(config).build().expect_err("invalid config");
    assert!(matches!(err, DbError::Config(_)));
}

#[test]
fn test_registry_target_defaults_to_memory() {
    let registry = Registry::builder().build().expect("build registry");
    assert_eq!(registry.target(), &Target::Memory);
    assert_eq!(registry.target().to_string(), MEMORY_ADDRESS);
    assert!(registry.auto_commit());
    assert!(registry.decoders().is_empty());
}
