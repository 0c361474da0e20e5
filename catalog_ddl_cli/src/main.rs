use anyhow::Context;
use catalog_ddl_core::Database;
use catalog_ddl_core::parser::parser::parse;
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "./catalogdb".to_string());
    let mut db = Database::open(&path).with_context(|| format!("failed to open database at {path}"))?;

    println!("catalog_ddl_cli (type 'help' or 'exit')");

    loop {
        print!("ddl> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }

        if input.eq_ignore_ascii_case("help") {
            println!("Commands:");
            println!("  parse <cmd>   -> show parsed Command (debug)");
            println!("  outcome       -> diagnostics of the last DDL statement");
            println!("  exit|quit     -> quit");
            println!("  help          -> help");
            println!("  (anything else is executed)");
            continue;
        }

        if input.eq_ignore_ascii_case("outcome") {
            println!("{:#?}", db.last_outcome());
            continue;
        }

        if let Some(rest) = input.strip_prefix("parse ") {
            match parse(rest) {
                Ok(cmd) => println!("Parsed as: {cmd:?}"),
                Err(e) => eprintln!("Parse error: {e}"),
            }
            continue;
        }

        match db.execute(input) {
            Ok(out) => println!("{out}"),
            Err(err) => println!("{err}"),
        }
    }
    Ok(())
}
