//! Plain-text and Markdown rendering of [`TableView`]s.

use crate::format::{FloatFormat, FloatFormatGuard, format_float};
use crate::table::{Cell, TableView};
use derive_more::Display;
use faro_traits::Result;

/// Output flavour of [`render_table`].
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderMode {
    /// Aligned columns for a terminal.
    #[default]
    #[display("plain")]
    Plain,
    /// A GitHub-flavoured Markdown table.
    #[display("markdown")]
    Markdown,
}

struct Grid {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    numeric: Vec<bool>,
}

fn grid<T: TableView + ?Sized>(table: &T) -> Grid {
    let index = table.index_names();
    let columns = table.column_names();

    let mut header = index.clone();
    header.extend(columns.iter().cloned());

    let mut numeric = vec![false; index.len()];
    numeric.extend(std::iter::repeat_n(true, columns.len()));

    let mut rows = Vec::with_capacity(table.n_rows());
    for row in 0..table.n_rows() {
        let mut cells = table.row_labels(row);
        for column in 0..columns.len() {
            let text = match table.cell(row, column) {
                Cell::Text(text) => {
                    numeric[index.len() + column] = false;
                    text
                }
                Cell::Int(value) => value.to_string(),
                Cell::Float(value) => format_float(value),
            };
            cells.push(text);
        }
        rows.push(cells);
    }

    Grid {
        header,
        rows,
        numeric,
    }
}

fn to_plain(grid: &Grid, name: Option<&str>) -> String {
    let mut widths: Vec<usize> = grid.header.iter().map(|h| h.chars().count()).collect();
    for row in &grid.rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }
    let total = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .zip(&grid.numeric)
            .map(|((cell, &w), &numeric)| {
                if numeric {
                    format!("{cell:>w$}")
                } else {
                    format!("{cell:<w$}")
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut output = String::new();
    if let Some(name) = name {
        output.push_str(name);
        output.push('\n');
        output.push_str(&"=".repeat(total));
        output.push('\n');
    }
    output.push_str(&line(&grid.header));
    output.push('\n');
    output.push_str(&"-".repeat(total));
    output.push('\n');
    for row in &grid.rows {
        output.push_str(&line(row));
        output.push('\n');
    }
    output
}

fn to_markdown(grid: &Grid, name: Option<&str>) -> String {
    let mut output = String::new();
    if let Some(name) = name {
        output.push_str(&format!("## {name}\n\n"));
    }

    output.push_str(&format!("| {} |\n", grid.header.join(" | ")));
    let rule: Vec<&str> = grid
        .numeric
        .iter()
        .map(|&numeric| if numeric { "---:" } else { "---" })
        .collect();
    output.push_str(&format!("|{}|\n", rule.join("|")));

    for row in &grid.rows {
        output.push_str(&format!("| {} |\n", row.join(" | ")));
    }
    output
}

/// Renders `table` with an optional title and float pattern.
///
/// When `fmt` is given (e.g. `"{:.2}%"`), it replaces the float format while
/// the table is rendered; the previous format is back in place when this
/// returns, whatever the outcome.
pub fn render_table<T: TableView + ?Sized>(
    table: &T,
    name: Option<&str>,
    fmt: Option<&str>,
    mode: RenderMode,
) -> Result<String> {
    let format = fmt.map(FloatFormat::parse).transpose()?;
    let _guard = format.map(|format| FloatFormatGuard::set(Some(format)));

    let grid = grid(table);
    Ok(match mode {
        RenderMode::Plain => to_plain(&grid, name),
        RenderMode::Markdown => to_markdown(&grid, name),
    })
}

/// Prints `table` as plain text to standard output.
pub fn print_table<T: TableView + ?Sized>(
    table: &T,
    name: Option<&str>,
    fmt: Option<&str>,
) -> Result<()> {
    let rendered = render_table(table, name, fmt, RenderMode::Plain)?;
    println!("{rendered}");
    Ok(())
}
