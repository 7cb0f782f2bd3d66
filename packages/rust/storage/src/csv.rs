//! Minimal CSV codec for the pipeline's tabular artifacts.
//!
//! Quotes, doubled-quote escapes and CRLF line endings are handled; blank
//! lines are skipped. Output uses `\n` line endings and quotes a field only
//! when it has to.

use std::mem::take;

use teamscrape_shared::{Result, TeamScrapeError};

/* ---------------- Parsing ---------------- */

/// Split CSV text into rows of fields.
///
/// An unterminated quoted field is a parse error rather than a silently
/// truncated row.
pub fn parse_rows(text: &str) -> Result<Vec<Vec<String>>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut rows = Vec::new();
    let mut field = String::new();
    let mut row: Vec<String> = Vec::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes {
                    if matches!(chars.peek(), Some('"')) {
                        chars.next(); // doubled-quote escape
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                } else {
                    in_quotes = true;
                }
            }
            ',' if !in_quotes => row.push(take(&mut field)),
            '\n' | '\r' if !in_quotes => {
                if ch == '\r' && matches!(chars.peek(), Some('\n')) {
                    chars.next();
                }
                row.push(take(&mut field));
                if row.len() == 1 && row[0].is_empty() {
                    row.clear();
                } else {
                    rows.push(take(&mut row));
                }
            }
            _ => field.push(ch),
        }
    }

    if in_quotes {
        return Err(TeamScrapeError::parse(format!(
            "unterminated quoted field in row {}",
            rows.len() + 1
        )));
    }

    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    Ok(rows)
}

/// Parse a table whose first row is a header, returning the data rows with
/// their fields reordered to match `columns`.
///
/// Every name in `columns` must appear in the header (extra header columns
/// are ignored) and every data row must have as many fields as the header.
pub fn parse_table(text: &str, columns: &[&str]) -> Result<Vec<Vec<String>>> {
    let mut rows = parse_rows(text)?.into_iter();
    let header = rows
        .next()
        .ok_or_else(|| TeamScrapeError::parse("missing header row"))?;

    let positions = columns
        .iter()
        .map(|col| {
            header
                .iter()
                .position(|h| h.trim() == *col)
                .ok_or_else(|| TeamScrapeError::parse(format!("missing column '{col}' in header")))
        })
        .collect::<Result<Vec<usize>>>()?;

    rows.enumerate()
        .map(|(i, row)| {
            if row.len() != header.len() {
                return Err(TeamScrapeError::parse(format!(
                    "row {} has {} fields, expected {}",
                    i + 2,
                    row.len(),
                    header.len()
                )));
            }
            Ok(positions.iter().map(|&p| row[p].clone()).collect())
        })
        .collect()
}

/* ---------------- Writing ---------------- */

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Append a single CSV row to `out`.
pub fn write_row<S: AsRef<str>>(out: &mut String, row: &[S]) {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let cell = cell.as_ref();
        if needs_quotes(cell) {
            out.push('"');
            out.push_str(&cell.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(cell);
        }
    }
    out.push('\n');
}

/// Render a header plus rows as CSV text.
pub fn to_csv_string<S: AsRef<str>>(header: &[&str], rows: &[Vec<S>]) -> String {
    let mut out = String::new();
    write_row(&mut out, header);
    for row in rows {
        write_row(&mut out, row);
    }
    out
}
