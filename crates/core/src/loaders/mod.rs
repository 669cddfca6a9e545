//! Format dispatch: each supported extension maps to one extractor that turns
//! a file into an ordered list of [`TextBlock`]s.

use crate::error::IngestError;
use crate::models::{DocumentFormat, TextBlock};
use regex::Regex;
use std::path::Path;

pub mod csv;
pub mod docx;
pub mod markdown;
pub mod pdf;
pub mod spreadsheet;
pub mod text;

pub use self::csv::CsvLoader;
pub use self::docx::DocxLoader;
pub use self::markdown::MarkdownLoader;
pub use self::pdf::LopdfLoader;
pub use self::spreadsheet::SpreadsheetLoader;
pub use self::text::PlainTextLoader;

pub trait DocumentLoader {
    fn load_blocks(&self, path: &Path) -> Result<Vec<TextBlock>, IngestError>;
}

pub fn loader_for(format: DocumentFormat) -> &'static dyn DocumentLoader {
    match format {
        DocumentFormat::Pdf => &LopdfLoader,
        DocumentFormat::PlainText => &PlainTextLoader,
        DocumentFormat::Docx => &DocxLoader,
        DocumentFormat::Csv => &CsvLoader,
        DocumentFormat::Markdown => &MarkdownLoader,
        DocumentFormat::Spreadsheet => &SpreadsheetLoader,
    }
}

/// Loads `path` with the extractor registered for `format` and drops blocks
/// that carry no text.
pub fn load_blocks(path: &Path, format: DocumentFormat) -> Result<Vec<TextBlock>, IngestError> {
    let blocks = loader_for(format)
        .load_blocks(path)?
        .into_iter()
        .map(|block| {
            Ok(TextBlock {
                number: block.number,
                text: clean_extracted_text(&block.text)?,
            })
        })
        .collect::<Result<Vec<_>, IngestError>>()?
        .into_iter()
        .filter(|block| !block.text.is_empty())
        .collect::<Vec<_>>();

    if blocks.is_empty() {
        return Err(IngestError::EmptyDocument(path.display().to_string()));
    }

    Ok(blocks)
}

/// Strips control characters left behind by extractors and collapses runs of
/// blank lines into a single paragraph break.
pub fn clean_extracted_text(text: &str) -> Result<String, IngestError> {
    let blank_run = Regex::new(r"\n[ \t]*(?:\n[ \t]*)+")?;
    let without_controls = text
        .replace("\r\n", "\n")
        .chars()
        .filter(|ch| *ch == '\n' || *ch == '\t' || !ch.is_control())
        .collect::<String>();

    Ok(blank_run
        .replace_all(&without_controls, "\n\n")
        .trim()
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn blank_line_runs_collapse_to_one_break() {
        let cleaned = clean_extracted_text("First\r\n\r\n  \n\nSecond\u{0}\u{000c}\n").unwrap();
        assert_eq!(cleaned, "First\n\nSecond");
    }

    #[test]
    fn empty_files_are_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("blank.txt");
        fs::write(&path, "  \n\n\t")?;

        let result = load_blocks(&path, DocumentFormat::PlainText);
        assert!(matches!(result, Err(IngestError::EmptyDocument(_))));
        Ok(())
    }
}
