//! Line-oriented interactive session.
//!
//! Stdin commands and app-shell completions are multiplexed with
//! `tokio::select!`, so the prompt stays usable while requests are in flight.

use anyhow::Context;
use skylook_core::{App, Change, Coordinate, ErrorKind};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::view;

const HELP: &str = "\
Commands:
  search <city>      look up weather by city name
  click <lat> <lon>  look up weather at a map point
  theme              toggle light/dark theme
  show               redraw the current view
  help               show this help
  quit               leave";

#[derive(Debug, Clone, PartialEq)]
enum SessionCommand {
    Search(String),
    Click(Coordinate),
    Theme,
    Show,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Option<SessionCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let cmd = match word.to_lowercase().as_str() {
        "search" | "s" => SessionCommand::Search(rest.to_string()),
        "click" | "c" => {
            let mut parts = rest
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|p| !p.is_empty());
            let coord = match (parts.next(), parts.next(), parts.next()) {
                (Some(lat), Some(lon), None) => lat
                    .parse::<f64>()
                    .ok()
                    .zip(lon.parse::<f64>().ok())
                    .map(|(lat, lon)| Coordinate::new(lat, lon)),
                _ => None,
            };
            SessionCommand::Click(coord.ok_or_else(|| "Usage: click <lat> <lon>".to_string())?)
        }
        "theme" | "t" => SessionCommand::Theme,
        "show" => SessionCommand::Show,
        "help" | "?" => SessionCommand::Help,
        "quit" | "exit" | "q" => SessionCommand::Quit,
        other => return Err(format!("Unknown command '{other}'. Type `help` for a list.")),
    };

    Ok(Some(cmd))
}

pub async fn run(mut app: App) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    app.start();
    println!("{HELP}\n");
    println!("{}", view::render(&app));

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read from stdin")? else {
                    break;
                };

                match parse_command(&line) {
                    Ok(None) => continue,
                    Ok(Some(SessionCommand::Quit)) => break,
                    Ok(Some(SessionCommand::Help)) => {
                        println!("{HELP}");
                        continue;
                    }
                    Ok(Some(SessionCommand::Search(city))) => {
                        // Rejections are already in the error slot.
                        let _ = app.submit_search(&city);
                    }
                    Ok(Some(SessionCommand::Click(coord))) => {
                        let _ = app.click_map(coord);
                    }
                    Ok(Some(SessionCommand::Theme)) => {
                        app.toggle_theme();
                    }
                    Ok(Some(SessionCommand::Show)) => {}
                    Err(usage) => app.report_error(usage, ErrorKind::Validation),
                }
                println!("{}\n", view::render(&app));
            }
            change = app.process_next() => {
                if change != Change::Ignored {
                    println!("{}\n", view::render(&app));
                }
            }
        }
    }

    Ok(())
}
