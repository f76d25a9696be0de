//! Text output for parse results.

use std::fmt::Write as _;

use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFile;
use codespan_reporting::term::{self, termcolor::NoColor};
use selq_parser::{ParseOutput, Token};

use crate::config::OutputFormat;

/// Name shown for the parsed text in diagnostics.
const SOURCE_NAME: &str = "<input>";

/// Render `out` (the result of parsing `sql`) in the requested format.
pub fn output(sql: &str, out: &ParseOutput, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(out)?,
        OutputFormat::Debug => format!("{out:#?}"),
        OutputFormat::Pretty => pretty(sql, out)?,
    })
}

fn pretty(sql: &str, out: &ParseOutput) -> anyhow::Result<String> {
    let mut text = String::new();
    if let Some(ast) = &out.ast {
        writeln!(text, "{ast}")?;
        writeln!(text, "  columns: {}", ast.columns.join(", "))?;
        writeln!(text, "  table:   {}", ast.table)?;
        match &ast.where_clause {
            Some(expr) => writeln!(text, "  where:   {expr}")?,
            None => writeln!(text, "  where:   -")?,
        }
    }
    if let Some(report) = diagnostic(sql, out)? {
        text.push_str(&report);
    }
    Ok(text)
}

/// The first error as a source diagnostic, with the offending bytes underlined.
fn diagnostic(sql: &str, out: &ParseOutput) -> anyhow::Result<Option<String>> {
    let Some((message, span)) = out.first_error() else {
        return Ok(None);
    };

    let mut report = Diagnostic::error()
        .with_message(message)
        .with_labels(vec![Label::primary((), span.start..span.end)]);
    let total = out.lex_errors.len() + out.parse_errors.len();
    if total > 1 {
        report = report.with_notes(vec![format!("{} more error(s)", total - 1)]);
    }

    let file = SimpleFile::new(SOURCE_NAME, sql);
    let mut writer = NoColor::new(Vec::new());
    term::emit(&mut writer, &term::Config::default(), &file, &report)?;
    Ok(Some(String::from_utf8(writer.into_inner())?))
}

/// One token per line: kind, lexeme and byte span.
pub fn tokens(tokens: &[Token]) -> String {
    let mut text = String::new();
    for tok in tokens {
        let _ = writeln!(
            text,
            "{:<12} {:<12} {}..{}",
            tok.kind.name(),
            tok.lexeme,
            tok.span.start,
            tok.span.end
        );
    }
    text
}
