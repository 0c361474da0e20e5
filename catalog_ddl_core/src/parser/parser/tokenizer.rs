/// Splits a command into tokens. Parentheses and commas are tokens of their
/// own; `'...'` and `"..."` quote a single token (the quotes are dropped,
/// doubling the quote character escapes it). A trailing `;` is ignored.
pub(super) fn tokenize(input: &str) -> Result<Vec<String>, String> {
    let input = input.trim().trim_end_matches(';');
    let mut tokens: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut quoted_token = false;

    let mut it = input.chars().peekable();
    while let Some(ch) = it.next() {
        if let Some(q) = quote {
            if ch == q {
                if it.peek() == Some(&q) {
                    it.next();
                    current.push(q);
                } else {
                    quote = None;
                    quoted_token = true;
                }
            } else {
                current.push(ch);
            }
            continue;
        }

        match ch {
            '\'' | '"' => {
                if !current.is_empty() || quoted_token {
                    return Err(format!(
                        "Quote ({ch}) cannot start in the middle of a token. Add whitespace before the quote."
                    ));
                }
                quote = Some(ch);
            }
            c if c.is_whitespace() => flush(&mut tokens, &mut current, &mut quoted_token),
            ',' | '(' | ')' => {
                flush(&mut tokens, &mut current, &mut quoted_token);
                tokens.push(ch.to_string());
            }
            _ => {
                if quoted_token {
                    return Err("Characters found immediately after a closing quote. Add whitespace after the quoted string."
                        .to_string());
                }
                current.push(ch);
            }
        }
    }

    if let Some(q) = quote {
        return Err(format!("Unclosed quote ({q}) in input"));
    }
    flush(&mut tokens, &mut current, &mut quoted_token);
    Ok(tokens)
}

fn flush(tokens: &mut Vec<String>, current: &mut String, quoted_token: &mut bool) {
    if !current.is_empty() || *quoted_token {
        tokens.push(std::mem::take(current));
    }
    *quoted_token = false;
}
