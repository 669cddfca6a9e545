use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    Pdf,
    PlainText,
    Docx,
    Csv,
    Markdown,
    Spreadsheet,
}

impl DocumentFormat {
    /// Case-sensitive suffix match, so `report.PDF` is not recognised.
    pub fn from_path_str(path: &str) -> Option<Self> {
        const SUFFIXES: [(&str, DocumentFormat); 7] = [
            (".pdf", DocumentFormat::Pdf),
            (".txt", DocumentFormat::PlainText),
            (".docx", DocumentFormat::Docx),
            (".csv", DocumentFormat::Csv),
            (".md", DocumentFormat::Markdown),
            (".xlsx", DocumentFormat::Spreadsheet),
            (".xls", DocumentFormat::Spreadsheet),
        ];

        SUFFIXES
            .iter()
            .find(|(suffix, _)| path.ends_with(*suffix))
            .map(|(_, format)| *format)
    }

    pub fn label(self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::PlainText => "txt",
            DocumentFormat::Docx => "docx",
            DocumentFormat::Csv => "csv",
            DocumentFormat::Markdown => "md",
            DocumentFormat::Spreadsheet => "xlsx",
        }
    }
}

/// One unit of extracted text: a page, a row, or a sheet depending on the format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    pub number: u32,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub chunk_id: String,
    pub document_id: String,
    pub source_path: String,
    pub block: u32,
    pub chunk_index: u64,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub document_id: String,
    pub source_path: String,
    pub format: DocumentFormat,
    pub checksum: String,
    pub block_count: usize,
    pub chunk_range: Range<usize>,
    pub ingested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSummary {
    pub source_path: String,
    pub format: DocumentFormat,
    pub chunk_count: usize,
    pub total_chunks: usize,
}

impl fmt::Display for IngestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Document {} loaded successfully!", self.source_path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn simple(&self) -> String {
        self.0.simple().to_string()
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub sample_k: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            top_k: 4,
            sample_k: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DocumentFormat;

    #[test]
    fn suffix_match_covers_every_supported_extension() {
        let cases = [
            ("a.pdf", DocumentFormat::Pdf),
            ("uploads/notes.txt", DocumentFormat::PlainText),
            ("b.docx", DocumentFormat::Docx),
            ("rows.csv", DocumentFormat::Csv),
            ("README.md", DocumentFormat::Markdown),
            ("book.xlsx", DocumentFormat::Spreadsheet),
            ("old.xls", DocumentFormat::Spreadsheet),
        ];

        for (path, expected) in cases {
            assert_eq!(DocumentFormat::from_path_str(path), Some(expected), "{path}");
        }
    }

    #[test]
    fn suffix_match_is_case_sensitive() {
        assert_eq!(DocumentFormat::from_path_str("REPORT.PDF"), None);
        assert_eq!(DocumentFormat::from_path_str("slides.pptx"), None);
        assert_eq!(DocumentFormat::from_path_str("pdf"), None);
    }
}
