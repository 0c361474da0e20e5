use super::*;

#[test]
fn test_parse_drop_defaults_to_restrict() {
    assert_eq!(
        parse("drop table t").unwrap(),
        Command::Drop {
            kind: ObjectKind::Table,
            name: "t".to_string(),
            cascade: false,
        }
    );
    match parse("drop schema sales restrict").unwrap() {
        Command::Drop { kind, cascade, .. } => {
            assert_eq!(kind, ObjectKind::Schema);
            assert!(!cascade);
        }
        _ => panic!("Expected Drop command"),
    }
}

#[test]
fn test_parse_drop_cascade() {
    for (input, kind) in [
        ("drop view v cascade", ObjectKind::View),
        ("drop index ix CASCADE", ObjectKind::Index),
        ("DROP TABLE public.t cascade", ObjectKind::Table),
    ] {
        match parse(input).unwrap() {
            Command::Drop { kind: k, cascade, .. } => {
                assert_eq!(k, kind);
                assert!(cascade);
            }
            _ => panic!("Expected Drop command"),
        }
    }
}

#[test]
fn test_parse_drop_errors() {
    assert!(parse("drop table").unwrap_err().contains("Usage"));
    assert!(parse("drop table t now").unwrap_err().contains("Usage"));
    assert!(parse("drop column t").unwrap_err().contains("Unknown object type"));
}

#[test]
fn test_parse_truncate() {
    let expected = Command::Truncate {
        table: "t".to_string(),
    };
    assert_eq!(parse("truncate table t").unwrap(), expected);
    assert_eq!(parse("truncate t").unwrap(), expected);
    assert!(parse("truncate table").unwrap_err().contains("Usage"));
}
