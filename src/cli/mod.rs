mod doctor;
mod run;
mod serve;

use std::path::PathBuf;

use anyhow::Result;
use console::style;

use crate::core::terminal::{self, GuideSection, print_error};

fn print_help() {
    terminal::print_banner();

    GuideSection::new("Core")
        .command("serve", "Start the HTTP API server")
        .command("run", "Prepare one meeting in the terminal")
        .print();

    GuideSection::new("Diagnostics")
        .command("doctor", "Check credentials and tool integrations")
        .command("help", "Show this message")
        .print();

    GuideSection::new("Run options")
        .command("--context <text>", "Free-text meeting context")
        .command("--focus <mode>", "blockers | design | progress | planning | balanced")
        .command("--agenda", "Include the agenda builder step")
        .command("--no-slack", "Skip the Slack context step")
        .blank()
        .command("--config <file>", "TOML config file (serve, run, doctor)")
        .print();

    println!(
        "\n {} {} <command> [options]\n",
        style("Usage:").bold(),
        style("meetprep").green()
    );
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ServeArgs {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RunArgs {
    pub include_slack: bool,
    pub include_agenda: bool,
    pub focus_mode: Option<String>,
    pub meeting_context: Option<String>,
    pub config: Option<PathBuf>,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            include_slack: true,
            include_agenda: false,
            focus_mode: None,
            meeting_context: None,
            config: None,
        }
    }
}

/// Value following the flag at `i`, if any.
fn flag_value(args: &[String], i: usize) -> Option<String> {
    args.get(i + 1).cloned()
}

pub(crate) fn parse_serve_flags(args: &[String], start: usize) -> ServeArgs {
    let mut parsed = ServeArgs::default();
    let mut i = start;
    while i < args.len() {
        match args[i].as_str() {
            "--host" => {
                parsed.host = flag_value(args, i).or(parsed.host);
                i += 2;
            }
            "--port" | "-p" => {
                parsed.port = flag_value(args, i)
                    .and_then(|p| p.parse().ok())
                    .or(parsed.port);
                i += 2;
            }
            "--config" | "-c" => {
                parsed.config = flag_value(args, i).map(PathBuf::from).or(parsed.config);
                i += 2;
            }
            _ => i += 1,
        }
    }
    parsed
}

pub(crate) fn parse_run_flags(args: &[String], start: usize) -> RunArgs {
    let mut parsed = RunArgs::default();
    let mut i = start;
    while i < args.len() {
        match args[i].as_str() {
            "--no-slack" => {
                parsed.include_slack = false;
                i += 1;
            }
            "--agenda" => {
                parsed.include_agenda = true;
                i += 1;
            }
            "--focus" | "-f" => {
                parsed.focus_mode = flag_value(args, i).or(parsed.focus_mode);
                i += 2;
            }
            "--context" => {
                parsed.meeting_context = flag_value(args, i).or(parsed.meeting_context);
                i += 2;
            }
            "--config" | "-c" => {
                parsed.config = flag_value(args, i).map(PathBuf::from).or(parsed.config);
                i += 2;
            }
            _ => i += 1,
        }
    }
    parsed
}

pub async fn run_main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("serve") | Some("server") => serve::run(parse_serve_flags(&args, 2)).await,
        Some("run") => run::run(parse_run_flags(&args, 2)).await,
        Some("doctor") => doctor::run(parse_serve_flags(&args, 2).config).await,
        Some("help") | Some("--help") | Some("-h") | None => {
            print_help();
            Ok(())
        }
        Some(other) => {
            print_error(&format!("Unknown command: {}", other));
            print_help();
            Ok(())
        }
    }
}
