use super::*;

fn insert_values(input: &str) -> Vec<String> {
    match parse(input).unwrap() {
        Command::Insert { values, .. } => values,
        _ => panic!("Expected Insert command"),
    }
}

#[test]
fn test_quoted_token_keeps_spaces_and_punctuation() {
    assert_eq!(
        insert_values(r#"insert into t values (1, "a, (b) c")"#),
        vec!["1".to_string(), "a, (b) c".to_string()]
    );
}

#[test]
fn test_doubled_quote_escapes() {
    assert_eq!(
        insert_values("insert into t values ('it''s')"),
        vec!["it's".to_string()]
    );
}

#[test]
fn test_empty_quoted_token_is_kept() {
    assert_eq!(
        insert_values(r#"insert into t values ("", x)"#),
        vec![String::new(), "x".to_string()]
    );
}

#[test]
fn test_trailing_semicolon_is_ignored() {
    assert_eq!(parse("show tables;").unwrap(), Command::ShowTables);
}

#[test]
fn test_tokenizer_errors() {
    assert!(parse(r#"insert into t values ("abc)"#).unwrap_err().contains("Unclosed quote"));
    assert!(parse(r#"insert into t values (a"b")"#)
        .unwrap_err()
        .contains("cannot start in the middle"));
    assert!(parse(r#"insert into t values ("a"b)"#)
        .unwrap_err()
        .contains("immediately after a closing quote"));
}
