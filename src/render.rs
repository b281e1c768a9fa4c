//! Terminal rendering of display tables.

use colored::Colorize;

use crate::engine::{Cell, Column, ColumnKind, DisplayTable, SearchResponse};
use crate::models::Rgb;

const SEPARATOR: &str = "  ";

fn column_width(table: &DisplayTable, index: usize, column: &Column) -> usize {
    table
        .rows
        .iter()
        .filter_map(|row| row.get(index))
        .map(|cell| cell.text.chars().count())
        .chain(std::iter::once(column.label.chars().count()))
        .max()
        .unwrap_or(0)
}

fn pad(text: &str, width: usize, right_align: bool) -> String {
    if right_align {
        format!("{:>width$}", text, width = width)
    } else {
        format!("{:<width$}", text, width = width)
    }
}

fn paint(padded: String, color: Option<Rgb>, colored: bool) -> String {
    match color {
        Some(Rgb(r, g, b)) if colored => padded.truecolor(0, 0, 0).on_truecolor(r, g, b).to_string(),
        _ => padded,
    }
}

/// Render a display table as aligned text, one line per row.
///
/// With `colored`, non-blank spec cells are painted with their class colour.
pub fn render_table(table: &DisplayTable, colored: bool) -> String {
    let widths: Vec<usize> = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, column)| column_width(table, i, column))
        .collect();

    let mut lines = Vec::with_capacity(table.rows.len() + 1);

    let header: Vec<String> = table
        .columns
        .iter()
        .zip(&widths)
        .map(|(column, &width)| {
            let padded = pad(&column.label, width, column.kind == ColumnKind::Stat);
            match column.color {
                Some(Rgb(r, g, b)) if colored => padded.truecolor(r, g, b).bold().to_string(),
                _ => padded,
            }
        })
        .collect();
    lines.push(header.join(SEPARATOR).trim_end().to_string());

    for row in &table.rows {
        let cells: Vec<String> = row
            .iter()
            .zip(table.columns.iter().zip(&widths))
            .map(|(cell, (column, &width))| render_cell(cell, column, width, colored))
            .collect();
        lines.push(cells.join(SEPARATOR).trim_end().to_string());
    }

    lines.join("\n")
}

fn render_cell(cell: &Cell, column: &Column, width: usize, colored: bool) -> String {
    let padded = pad(&cell.text, width, column.kind == ColumnKind::Stat);
    if cell.is_blank() {
        return padded;
    }
    paint(padded, cell.color, colored)
}

/// Render a search response: a status line followed by the table.
pub fn render_response(response: &SearchResponse, colored: bool) -> String {
    let page = &response.page;
    let status = format!(
        "{} | sort {} | page {}/{} | {} matches",
        response.window,
        response.sort,
        page.page,
        page.total_pages.max(1),
        page.total_items
    );

    if response.table.rows.is_empty() {
        return format!("{}\nNo compositions match.", status);
    }
    format!("{}\n{}", status, render_table(&response.table, colored))
}
