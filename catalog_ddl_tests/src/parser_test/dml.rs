use super::*;

#[test]
fn test_parse_insert() {
    assert_eq!(
        parse("insert into t values (1, abc, default)").unwrap(),
        Command::Insert {
            table: "t".to_string(),
            values: vec!["1".to_string(), "abc".to_string(), "default".to_string()],
        }
    );
}

#[test]
fn test_parse_insert_errors() {
    assert!(parse("insert t values (1)").unwrap_err().contains("Usage"));
    assert!(parse("insert into t values (1 2)").unwrap_err().contains("comma-separated"));
    assert!(parse("insert into t values (1,)").unwrap_err().contains("Trailing comma"));
}

#[test]
fn test_parse_select_describe_show() {
    assert_eq!(
        parse("select * from t").unwrap(),
        Command::Select { table: "t".to_string() }
    );
    assert_eq!(
        parse("desc t").unwrap(),
        Command::Describe { table: "t".to_string() }
    );
    assert_eq!(parse("show tables").unwrap(), Command::ShowTables);
    assert!(parse("select a from t").unwrap_err().contains("Usage"));
    assert!(parse("show views").unwrap_err().contains("Usage"));
}

#[test]
fn test_only_schema_changes_are_ddl() {
    assert!(parse("drop table t").unwrap().is_ddl());
    assert!(parse("alter table t rebuild").unwrap().is_ddl());
    assert!(!parse("select * from t").unwrap().is_ddl());
    assert!(!parse("show tables").unwrap().is_ddl());
}

#[test]
fn test_parse_unknown_and_empty() {
    assert_eq!(parse("frobnicate t").unwrap_err(), "Unknown command 'frobnicate'");
    assert_eq!(parse("   ").unwrap_err(), "Empty command");
}
