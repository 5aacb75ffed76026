//! Interactive shell: one client for many commands, so the guest cart and
//! the claimed route survive between them.

use std::io::Write;

use clap::Parser;
use redthread_client::AppState;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::CommandError;
use crate::{Cli, Commands, dispatch};

const PROMPT: &str = "rt> ";

pub async fn run(app: &AppState) -> Result<(), CommandError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{PROMPT}");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        let args = split_args(&line);
        match args.first().map(String::as_str) {
            None => continue,
            Some("exit" | "quit") => break,
            Some(_) => {}
        }

        let cli = match Cli::try_parse_from(std::iter::once("rt-cli".to_string()).chain(args)) {
            Ok(cli) => cli,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        if matches!(cli.command, Commands::Shell) {
            println!("Already in the shell");
            continue;
        }

        if let Err(e) = dispatch(app, cli.command).await {
            // Surfaced flows park a friendlier message than the raw error
            let message = app.auth().take_error().await.unwrap_or_else(|| e.to_string());
            println!("Error: {message}");
        }
    }
    Ok(())
}

/// Split a line on whitespace, keeping double-quoted runs together.
fn split_args(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut pending = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                pending = true;
            }
            c if c.is_whitespace() && !quoted => {
                if pending {
                    args.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            c => {
                current.push(c);
                pending = true;
            }
        }
    }
    if pending {
        args.push(current);
    }
    args
}
