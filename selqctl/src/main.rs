use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, ValueEnum};
use rustyline::{error::ReadlineError, DefaultEditor};
use selq_log::{LogConfig, LogGuard};
use selq_parser::{parse, tokenize, CstRule, ParseOutput};
use tracing::{debug, info, Level};

mod config;
mod error;
mod render;

use config::{Config, OutputFormat, Settings};
use error::CliError;

/// SelQ command-line client.
#[derive(Parser)]
#[command(name = "selqctl", author, version, about = "SelQ SELECT parser CLI", long_about = None)]
struct Cli {
    /// Parse SQL directly and exit.
    #[arg(short = 'e', long = "exec")]
    sql: Option<String>,

    /// Parse each `;`-separated statement of a file and exit.
    #[arg(short = 'f', long = "file")]
    file: Option<PathBuf>,

    #[command(flatten)]
    opts: Options,
}

#[derive(Args, Default)]
struct Options {
    /// Path to configuration file (default: $HOME/.selqrc).
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Output style.
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Also print the token stream.
    #[arg(long)]
    tokens: bool,

    /// Also print the concrete syntax tree.
    #[arg(long)]
    cst: bool,

    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = Config::discover(cli.opts.config.as_deref())?;

    let level = if cli.opts.verbose {
        Level::DEBUG
    } else {
        config
            .log_level
            .as_deref()
            .map(selq_log::parse_level)
            .transpose()?
            .unwrap_or(Level::WARN)
    };
    let log = selq_log::init(&LogConfig {
        level,
        dir: config.log_dir.clone(),
        ..LogConfig::default()
    })?;

    let mut settings = Settings::resolve(&config, cli.opts.format, cli.opts.tokens, cli.opts.cst);

    if let Some(sql) = cli.sql {
        return Ok(exit_code(execute_sql(&sql, &settings)?));
    }

    if let Some(file) = cli.file {
        let content = fs::read_to_string(&file)
            .with_context(|| format!("failed to read {}", file.display()))?;
        let mut all_ok = true;
        for stmt in content.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            all_ok &= execute_sql(stmt, &settings)?;
        }
        return Ok(exit_code(all_ok));
    }

    interactive_shell(&mut settings, &log)?;
    Ok(ExitCode::SUCCESS)
}

fn exit_code(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Parse a single statement and print the result. Returns `true` when it
/// parsed without errors of either kind.
fn execute_sql(sql: &str, settings: &Settings) -> anyhow::Result<bool> {
    let out = run_stages(sql, settings, &mut std::io::stdout())?;
    print!("{}", render::output(sql, &out, settings.format)?);
    if settings.format != OutputFormat::Pretty {
        println!();
    }
    Ok(out.is_ok())
}

/// Lex and parse `sql` once, writing the token and CST listings to `trace`
/// when enabled.
fn run_stages(
    sql: &str,
    settings: &Settings,
    trace: &mut impl Write,
) -> anyhow::Result<ParseOutput> {
    debug!(sql, "executing");
    let (tokens, lex_errors) = tokenize(sql);
    if settings.show_tokens {
        write!(trace, "{}", render::tokens(&tokens))?;
    }
    let (cst, parse_errors) = parse(&tokens);
    if settings.show_cst {
        if let Some(cst) = &cst {
            write!(trace, "{}", cst.to_node())?;
        }
    }
    Ok(ParseOutput::from_stages(cst.as_ref(), lex_errors, parse_errors))
}

/// Handle a backslash command. Returns `false` when the shell should exit.
fn shell_command(line: &str, settings: &mut Settings, log: &LogGuard) -> anyhow::Result<bool> {
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("\\q"), _) => return Ok(false),
        (Some("\\log"), Some(level)) => {
            log.set_level(selq_log::parse_level(level)?)?;
            println!("log level set to {level}");
        }
        (Some("\\format"), Some(name)) => match OutputFormat::from_str(name, true) {
            Ok(format) => settings.format = format,
            Err(err) => eprintln!("{err}"),
        },
        (Some("\\tokens"), _) => {
            settings.show_tokens = !settings.show_tokens;
            println!("tokens {}", on_off(settings.show_tokens));
        }
        (Some("\\cst"), _) => {
            settings.show_cst = !settings.show_cst;
            println!("cst {}", on_off(settings.show_cst));
        }
        _ => eprintln!("commands: \\q, \\log <level>, \\format <pretty|json|debug>, \\tokens, \\cst"),
    }
    Ok(true)
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

/// Interactive readline shell.
fn interactive_shell(settings: &mut Settings, log: &LogGuard) -> anyhow::Result<()> {
    let mut rl = DefaultEditor::new().map_err(CliError::from)?;
    if let Some(history) = &settings.history {
        if rl.load_history(history).is_err() {
            debug!(path = %history.display(), "no history loaded");
        }
    }
    let prompt = "selq> ";

    loop {
        match rl.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                rl.add_history_entry(trimmed).map_err(CliError::from)?;
                if trimmed.eq_ignore_ascii_case("exit") {
                    break;
                }
                if trimmed.starts_with('\\') {
                    if !shell_command(trimmed, settings, log)? {
                        break;
                    }
                    continue;
                }
                execute_sql(trimmed, settings)?;
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => return Err(CliError::from(err).into()),
        }
    }

    if let Some(history) = &settings.history {
        if let Some(dir) = history.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        rl.save_history(history).map_err(CliError::from)?;
        info!(path = %history.display(), "history saved");
    }
    Ok(())
}
