use super::DocumentLoader;
use crate::error::IngestError;
use crate::models::TextBlock;
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;
use tracing::warn;

/// One block per worksheet; cells of a row are joined with ` | `.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpreadsheetLoader;

impl DocumentLoader for SpreadsheetLoader {
    fn load_blocks(&self, path: &Path) -> Result<Vec<TextBlock>, IngestError> {
        let mut workbook = open_workbook_auto(path)
            .map_err(|error| IngestError::Spreadsheet(format!("{}: {error}", path.display())))?;

        let mut blocks = Vec::new();
        for (position, sheet_name) in workbook.sheet_names().into_iter().enumerate() {
            let range = match workbook.worksheet_range(&sheet_name) {
                Ok(range) => range,
                Err(error) => {
                    warn!(path = %path.display(), sheet = %sheet_name, %error, "skipping unreadable sheet");
                    continue;
                }
            };

            let mut text = format!("Sheet: {sheet_name}\n");
            for row in range.rows() {
                let cells = row.iter().map(cell_text).collect::<Vec<_>>();
                if cells.iter().all(|cell| cell.is_empty()) {
                    continue;
                }
                text.push_str(&cells.join(" | "));
                text.push('\n');
            }

            blocks.push(TextBlock {
                number: (position + 1) as u32,
                text,
            });
        }

        Ok(blocks)
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(value) => value.trim().to_string(),
        Data::Float(value) => value.to_string(),
        Data::Int(value) => value.to_string(),
        Data::Bool(value) => value.to_string(),
        Data::DateTime(value) => value.to_string(),
        Data::DateTimeIso(value) | Data::DurationIso(value) => value.clone(),
        _ => String::new(),
    }
}
