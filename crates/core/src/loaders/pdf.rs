use super::DocumentLoader;
use crate::error::IngestError;
use crate::models::TextBlock;
use lopdf::Document;
use std::path::Path;
use tracing::warn;

/// One block per page that yields text.
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfLoader;

impl DocumentLoader for LopdfLoader {
    fn load_blocks(&self, path: &Path) -> Result<Vec<TextBlock>, IngestError> {
        let document =
            Document::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = match document.extract_text(&[page_no]) {
                Ok(text) => text,
                Err(error) => {
                    warn!(path = %path.display(), page = page_no, %error, "skipping unreadable pdf page");
                    continue;
                }
            };

            if !text.trim().is_empty() {
                pages.push(TextBlock {
                    number: page_no,
                    text,
                });
            }
        }

        if pages.is_empty() {
            return Err(IngestError::PdfParse(format!(
                "pdf had no readable page text: {}",
                path.display()
            )));
        }

        Ok(pages)
    }
}
