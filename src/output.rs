use crate::table::{Cell, Table};
use crate::util::{format_number, format_percent};
use serde::Serialize;
use std::error::Error;
use std::path::Path;
use tabled::{builder::Builder, settings::Style, Table as TextTable, Tabled};

pub fn write_csv(path: &Path, table: &Table) -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(table.columns())?;
    for row in table.rows() {
        wtr.write_record(row.iter().map(Cell::to_string))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), Box<dyn Error>> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Cell as shown on screen: percentage columns as `12.50%`, other numbers
/// with thousands separators.
fn display_cell(column: &str, cell: &Cell) -> String {
    match cell {
        Cell::Number(n) if column.starts_with('%') => format_percent(*n),
        Cell::Number(n) if n.fract() == 0.0 => format_number(*n, 0),
        Cell::Number(n) => format_number(*n, 2),
        other => other.to_string(),
    }
}

pub fn render_table(table: &Table, max_rows: usize) -> Option<String> {
    if table.is_empty() {
        return None;
    }
    let mut builder = Builder::default();
    builder.push_record(table.columns().iter().cloned());
    for row in table.rows().iter().take(max_rows) {
        builder.push_record(
            table
                .columns()
                .iter()
                .zip(row)
                .map(|(col, cell)| display_cell(col, cell)),
        );
    }
    Some(builder.build().with(Style::markdown()).to_string())
}

pub fn preview_table(title: &str, table: &Table, max_rows: usize) {
    println!("{}\n", title);
    match render_table(table, max_rows) {
        Some(s) => println!("{}\n", s),
        None => println!("(no rows)\n"),
    }
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = TextTable::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}
