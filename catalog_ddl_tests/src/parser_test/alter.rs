use super::*;

#[test]
fn test_parse_alter_add_column() {
    let cmd = parse("alter table items add column qty int not null default 0").unwrap();
    match cmd {
        Command::Alter {
            table,
            action: AlterAction::AddColumn(column),
        } => {
            assert_eq!(table, "items");
            assert_eq!(column.name, "qty");
            assert_eq!(column.dtype, DataType::Int);
            assert!(column.not_null);
            assert_eq!(column.default.as_deref(), Some("0"));
        }
        _ => panic!("Expected Alter AddColumn command"),
    }
}

#[test]
fn test_parse_alter_add_without_column_keyword() {
    match parse("alter table items add seq bigint identity").unwrap() {
        Command::Alter {
            action: AlterAction::AddColumn(column),
            ..
        } => {
            assert_eq!(column.name, "seq");
            assert!(column.identity);
        }
        _ => panic!("Expected Alter AddColumn command"),
    }
}

#[test]
fn test_parse_alter_rebuild() {
    assert_eq!(
        parse("alter table items rebuild").unwrap(),
        Command::Alter {
            table: "items".to_string(),
            action: AlterAction::Rebuild,
        }
    );
    assert!(parse("alter table items rebuild now").unwrap_err().contains("Usage"));
}

#[test]
fn test_parse_alter_errors() {
    assert!(parse("alter items add a int").unwrap_err().contains("Usage"));
    assert!(parse("alter table items drop column a").unwrap_err().contains("Usage"));
    assert!(parse("alter table items add").unwrap_err().contains("Missing column definition"));
}
