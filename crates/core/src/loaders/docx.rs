use super::DocumentLoader;
use crate::error::IngestError;
use crate::models::TextBlock;
use docx_rs::{DocumentChild, ParagraphChild, RunChild};
use std::fs;
use std::path::Path;

/// Body paragraphs, one per line, as a single block. Tables are not read.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocxLoader;

impl DocumentLoader for DocxLoader {
    fn load_blocks(&self, path: &Path) -> Result<Vec<TextBlock>, IngestError> {
        let bytes = fs::read(path)?;
        let docx = docx_rs::read_docx(&bytes)
            .map_err(|error| IngestError::Docx(format!("{}: {error}", path.display())))?;

        let mut text = String::new();
        for child in docx.document.children {
            if let DocumentChild::Paragraph(paragraph) = child {
                for child in paragraph.children {
                    if let ParagraphChild::Run(run) = child {
                        for child in run.children {
                            if let RunChild::Text(fragment) = child {
                                text.push_str(&fragment.text);
                            }
                        }
                    }
                }
                text.push('\n');
            }
        }

        Ok(vec![TextBlock { number: 1, text }])
    }
}
