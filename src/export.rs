//! Spreadsheet export: one worksheet, two columns, one row per uploaded file.

use crate::error::Scan2XlsxError;
use crate::output::{ResultTable, COLUMNS};
use rust_xlsxwriter::{Format, FormatAlign, Workbook, XlsxError};
use std::borrow::Cow;
use std::path::Path;
use tracing::{debug, info, warn};

/// Default name of the downloadable artifact.
pub const OUTPUT_FILE_NAME: &str = "output.xlsx";

/// MIME type to serve [`OUTPUT_FILE_NAME`] with.
pub const XLSX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Name of the single worksheet.
pub const SHEET_NAME: &str = "OCR Results";

/// Longest string an XLSX cell accepts.
pub const MAX_CELL_CHARS: usize = 32_767;

const NAME_COL_WIDTH: f64 = 32.0;
const TEXT_COL_WIDTH: f64 = 100.0;

/// Render the table as an in-memory `.xlsx` workbook.
pub fn xlsx_to_buffer(table: &ResultTable) -> Result<Vec<u8>, Scan2XlsxError> {
    let mut workbook = build_workbook(table)?;
    let buf = workbook.save_to_buffer()?;
    debug!("Workbook rendered: {} rows, {} bytes", table.len(), buf.len());
    Ok(buf)
}

/// Write the table to `path` as `.xlsx`.
///
/// Parent directories are created. The workbook is written to a sibling
/// temp file and renamed into place, so a reader never sees a partial file.
pub async fn write_xlsx(table: &ResultTable, path: impl AsRef<Path>) -> Result<(), Scan2XlsxError> {
    let path = path.as_ref();
    let buf = xlsx_to_buffer(table)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Scan2XlsxError::OutputWriteFailed {
                    path: path.to_path_buf(),
                    source: e,
                })?;
        }
    }

    let tmp_path = path.with_extension("xlsx.tmp");
    tokio::fs::write(&tmp_path, &buf)
        .await
        .map_err(|e| Scan2XlsxError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Scan2XlsxError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    info!("Wrote {} rows to {}", table.len(), path.display());
    Ok(())
}

fn build_workbook(table: &ResultTable) -> Result<Workbook, XlsxError> {
    let mut workbook = Workbook::new();

    let header_format = Format::new().set_bold();
    let name_format = Format::new().set_align(FormatAlign::Top);
    let text_format = Format::new().set_align(FormatAlign::Top).set_text_wrap();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;
    worksheet.set_column_width(0, NAME_COL_WIDTH)?;
    worksheet.set_column_width(1, TEXT_COL_WIDTH)?;
    worksheet.set_freeze_panes(1, 0)?;

    for (col, title) in COLUMNS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *title, &header_format)?;
    }

    for (i, row) in table.rows().iter().enumerate() {
        let r = (i + 1) as u32;
        worksheet.write_string_with_format(r, 0, fit_cell(&row.file_name), &name_format)?;
        worksheet.write_string_with_format(r, 1, fit_cell(&row.extracted_text), &text_format)?;
    }

    Ok(workbook)
}

/// Truncate to the cell limit, counting chars the way the writer does.
fn fit_cell(text: &str) -> Cow<'_, str> {
    match text.char_indices().nth(MAX_CELL_CHARS) {
        Some((cut, _)) => {
            warn!(
                "Cell text truncated from {} to {} chars",
                text.chars().count(),
                MAX_CELL_CHARS
            );
            Cow::Owned(text[..cut].to_string())
        }
        None => Cow::Borrowed(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
    use std::io::Cursor;

    fn read_back(buf: Vec<u8>) -> Vec<Vec<String>> {
        let mut wb: Xlsx<_> = open_workbook_from_rs(Cursor::new(buf)).unwrap();
        let range = wb.worksheet_range(SHEET_NAME).unwrap();
        range
            .rows()
            .map(|r| r.iter().map(Data::to_string).collect())
            .collect()
    }

    #[test]
    fn header_then_rows_in_order() {
        let mut table = ResultTable::new();
        table.push("a.png", "alpha");
        table.push("b.pdf", "beta\ngamma");
        table.push("c.txt", "[ERROR] unsupported file type: text/plain");

        let rows = read_back(xlsx_to_buffer(&table).unwrap());
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], vec!["File Name", "Extracted Text"]);
        assert_eq!(rows[1], vec!["a.png", "alpha"]);
        assert_eq!(rows[2], vec!["b.pdf", "beta\ngamma"]);
        assert_eq!(rows[3][0], "c.txt");
        assert!(rows[3][1].starts_with("[ERROR]"));
    }

    #[test]
    fn empty_table_still_has_header() {
        let rows = read_back(xlsx_to_buffer(&ResultTable::new()).unwrap());
        assert_eq!(rows, vec![vec!["File Name".to_string(), "Extracted Text".to_string()]]);
    }

    #[test]
    fn oversized_cell_is_truncated() {
        let mut table = ResultTable::new();
        table.push("big.pdf", "é".repeat(MAX_CELL_CHARS + 10));
        let rows = read_back(xlsx_to_buffer(&table).unwrap());
        assert_eq!(rows[1][1].chars().count(), MAX_CELL_CHARS);
    }

    #[test]
    fn fit_cell_borrows_short_text() {
        assert!(matches!(fit_cell("short"), Cow::Borrowed("short")));
        assert_eq!(fit_cell(&"x".repeat(MAX_CELL_CHARS)).len(), MAX_CELL_CHARS);
    }

    #[tokio::test]
    async fn write_creates_parent_dirs_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out").join(OUTPUT_FILE_NAME);
        let mut table = ResultTable::new();
        table.push("scan.jpg", "hello");

        write_xlsx(&table, &path).await.unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("xlsx.tmp").exists());
        let rows = read_back(std::fs::read(&path).unwrap());
        assert_eq!(rows[1], vec!["scan.jpg", "hello"]);
    }
}
