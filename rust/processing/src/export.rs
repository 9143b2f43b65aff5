// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Final CSV and XLSX exports.

use crate::error::TableError;
use crate::logging::RunLog;
use crate::record::Row;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use serde_json::Value;
use std::path::Path;

/// Name of the first worksheet; overflow sheets get `_2`, `_3`, ...
pub const SHEET_NAME: &str = "Building_Analysis";
/// Data rows per worksheet (the format's row limit minus the header)
pub const MAX_SHEET_ROWS: usize = 1_048_575;
const MAX_SHEET_COLUMNS: usize = 16_384;
/// Characters allowed in one cell
pub const MAX_CELL_CHARS: usize = 32_767;

/// Write `rows` under `columns` as CSV. Missing and null cells are empty.
pub fn write_csv(path: &Path, columns: &[String], rows: &[Row]) -> Result<(), TableError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(columns)?;
    for row in rows {
        writer.write_record(columns.iter().map(|column| csv_cell(row.get(column))))?;
    }
    writer.flush()?;
    Ok(())
}

fn csv_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Write `rows` under `columns` as an XLSX workbook. Returns the number of
/// worksheets used.
///
/// Text longer than [`MAX_CELL_CHARS`] is truncated with a warning.
pub fn write_xlsx(
    path: &Path,
    columns: &[String],
    rows: &[Row],
    log: &dyn RunLog,
) -> Result<usize, TableError> {
    write_xlsx_paged(path, columns, rows, MAX_SHEET_ROWS, log)
}

pub(crate) fn write_xlsx_paged(
    path: &Path,
    columns: &[String],
    rows: &[Row],
    rows_per_sheet: usize,
    log: &dyn RunLog,
) -> Result<usize, TableError> {
    if columns.len() > MAX_SHEET_COLUMNS {
        return Err(TableError::TooManyColumns(columns.len()));
    }

    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let rows_per_sheet = rows_per_sheet.max(1);
    let pages: Vec<&[Row]> = if rows.is_empty() {
        vec![rows]
    } else {
        rows.chunks(rows_per_sheet).collect()
    };

    for (page, page_rows) in pages.iter().enumerate() {
        let sheet = workbook.add_worksheet();
        if page == 0 {
            sheet.set_name(SHEET_NAME)?;
        } else {
            sheet.set_name(format!("{SHEET_NAME}_{}", page + 1))?;
        }
        let sheet_name = sheet.name();
        let mut cells = CellWriter {
            sheet,
            sheet_name,
            first_record: page * rows_per_sheet,
            log,
        };
        cells.write_page(columns, page_rows, &header)?;
    }

    workbook.save(path)?;
    Ok(pages.len())
}

struct CellWriter<'a> {
    sheet: &'a mut Worksheet,
    sheet_name: String,
    first_record: usize,
    log: &'a dyn RunLog,
}

impl CellWriter<'_> {
    fn write_page(
        &mut self,
        columns: &[String],
        rows: &[Row],
        header: &Format,
    ) -> Result<(), TableError> {
        for (c, column) in columns.iter().enumerate() {
            self.sheet
                .write_string_with_format(0, c as u16, column, header)?;
        }

        for (r, row) in rows.iter().enumerate() {
            for (c, column) in columns.iter().enumerate() {
                let (sheet_row, sheet_col) = (r as u32 + 1, c as u16);
                match row.get(column) {
                    None | Some(Value::Null) => {}
                    Some(Value::Bool(b)) => {
                        self.sheet.write_boolean(sheet_row, sheet_col, *b)?;
                    }
                    Some(Value::Number(n)) => {
                        if let Some(v) = n.as_f64() {
                            self.sheet.write_number(sheet_row, sheet_col, v)?;
                        }
                    }
                    Some(Value::String(s)) => {
                        self.write_text(r, sheet_col, column, s)?;
                    }
                    Some(other) => {
                        self.write_text(r, sheet_col, column, &other.to_string())?;
                    }
                }
            }
        }
        Ok(())
    }

    fn write_text(
        &mut self,
        page_row: usize,
        sheet_col: u16,
        column: &str,
        text: &str,
    ) -> Result<(), TableError> {
        let sheet_row = page_row as u32 + 1;
        let Some((cut, _)) = text.char_indices().nth(MAX_CELL_CHARS) else {
            self.sheet.write_string(sheet_row, sheet_col, text)?;
            return Ok(());
        };

        self.log.warn(&format!(
            "Truncated column '{column}' of record {} (sheet {}, row {}) to {MAX_CELL_CHARS} characters",
            self.first_record + page_row + 1,
            self.sheet_name,
            sheet_row + 1,
        ));
        self.sheet.write_string(sheet_row, sheet_col, &text[..cut])?;
        Ok(())
    }
}
