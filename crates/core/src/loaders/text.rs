use super::DocumentLoader;
use crate::error::IngestError;
use crate::models::TextBlock;
use std::fs;
use std::path::Path;

#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextLoader;

impl DocumentLoader for PlainTextLoader {
    fn load_blocks(&self, path: &Path) -> Result<Vec<TextBlock>, IngestError> {
        let bytes = fs::read(path)?;
        let text = String::from_utf8(bytes)
            .map_err(|_| IngestError::InvalidEncoding(path.display().to_string()))?;

        Ok(vec![TextBlock { number: 1, text }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn whole_file_is_one_block() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("notes.txt");
        fs::write(&path, "line one\nline two\n")?;

        let blocks = PlainTextLoader.load_blocks(&path)?;
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "line one\nline two\n");
        Ok(())
    }

    #[test]
    fn invalid_utf8_is_reported() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("latin1.txt");
        fs::write(&path, [0x63, 0x61, 0x66, 0xe9])?;

        let result = PlainTextLoader.load_blocks(&path);
        assert!(matches!(result, Err(IngestError::InvalidEncoding(_))));
        Ok(())
    }
}
