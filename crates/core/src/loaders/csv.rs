use super::DocumentLoader;
use crate::error::IngestError;
use crate::models::TextBlock;
use std::path::Path;
use tracing::warn;

/// One block per record, rendered as `header: value` lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvLoader;

impl DocumentLoader for CsvLoader {
    fn load_blocks(&self, path: &Path) -> Result<Vec<TextBlock>, IngestError> {
        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();

        let mut blocks = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = match record {
                Ok(record) => record,
                Err(error) => {
                    warn!(path = %path.display(), row = row + 1, %error, "skipping malformed csv row");
                    continue;
                }
            };

            let text = headers
                .iter()
                .zip(record.iter())
                .map(|(header, value)| format!("{}: {}", header.trim(), value.trim()))
                .collect::<Vec<_>>()
                .join("\n");

            blocks.push(TextBlock {
                number: (row + 1) as u32,
                text,
            });
        }

        Ok(blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn each_row_becomes_a_block() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("people.csv");
        fs::write(&path, "name,city\nAda,London\nGrace,Arlington\n")?;

        let blocks = CsvLoader.load_blocks(&path)?;
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "name: Ada\ncity: London");
        assert_eq!(blocks[1].number, 2);
        Ok(())
    }

    #[test]
    fn ragged_rows_are_skipped() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("ragged.csv");
        fs::write(&path, "a,b\n1,2\n3\n4,5\n")?;

        let blocks = CsvLoader.load_blocks(&path)?;
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].text, "a: 4\nb: 5");
        Ok(())
    }
}
