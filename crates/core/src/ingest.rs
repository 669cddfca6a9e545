use crate::chunking::{build_chunks, ChunkingConfig};
use crate::loaders::load_blocks;
use crate::{Chunk, DocumentFormat, IngestError};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Files under `folder`, recursively, whose names carry a supported extension.
pub fn discover_supported_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let supported = entry
            .path()
            .to_str()
            .and_then(DocumentFormat::from_path_str)
            .is_some();

        if supported {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub fn digest_file(path: &Path) -> Result<String, IngestError> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

pub fn generate_document_id(path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// A document loaded and split, not yet embedded.
#[derive(Debug, Clone)]
pub struct PreparedDocument {
    pub document_id: String,
    pub source_path: String,
    pub format: DocumentFormat,
    pub checksum: String,
    pub block_count: usize,
    pub chunks: Vec<Chunk>,
}

pub fn prepare_document(
    path: &Path,
    format: DocumentFormat,
    config: ChunkingConfig,
    first_index: u64,
) -> Result<PreparedDocument, IngestError> {
    if path.file_name().is_none() {
        return Err(IngestError::MissingFileName(path.display().to_string()));
    }

    let checksum = digest_file(path)?;
    let document_id = generate_document_id(path);
    let source_path = path.to_string_lossy().to_string();
    let blocks = load_blocks(path, format)?;

    let mut chunks = Vec::new();
    let mut cursor = first_index;
    for block in &blocks {
        let (block_chunks, next_cursor) = build_chunks(
            &document_id,
            &source_path,
            block.number,
            &block.text,
            config,
            cursor,
        )?;
        cursor = next_cursor;
        chunks.extend(block_chunks);
    }

    if chunks.is_empty() {
        return Err(IngestError::EmptyDocument(source_path));
    }

    Ok(PreparedDocument {
        document_id,
        source_path,
        format,
        checksum,
        block_count: blocks.len(),
        chunks,
    })
}

#[derive(Debug)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct FolderReport {
    pub loaded: Vec<crate::IngestSummary>,
    pub skipped_files: Vec<SkippedFile>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PipelineOptions;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn discovery_is_recursive_and_filters_extensions() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let base = dir.path();
        let nested = base.join("nested");
        fs::create_dir(&nested)?;

        File::create(base.join("a.txt")).and_then(|mut file| file.write_all(b"hello"))?;
        File::create(nested.join("b.md")).and_then(|mut file| file.write_all(b"# hi"))?;
        File::create(nested.join("c.pptx")).and_then(|mut file| file.write_all(b"nope"))?;
        File::create(base.join("D.TXT")).and_then(|mut file| file.write_all(b"upper"))?;

        let files = discover_supported_files(base);
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|path| path.extension().is_some()));
        Ok(())
    }

    #[test]
    fn checksum_is_reproducible() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let file_path = dir.path().join("a.txt");
        fs::write(&file_path, b"abc")?;

        let first = digest_file(&file_path)?;
        let second = digest_file(&file_path)?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn prepared_chunks_continue_from_first_index() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("long.txt");
        fs::write(&path, "word ".repeat(300))?;

        let config = ChunkingConfig::from(&PipelineOptions::default());
        let prepared = prepare_document(&path, DocumentFormat::PlainText, config, 12)?;

        assert_eq!(prepared.block_count, 1);
        assert_eq!(prepared.chunks.len(), 4);
        assert_eq!(prepared.chunks[0].chunk_index, 12);
        assert!(prepared
            .chunks
            .iter()
            .all(|chunk| chunk.document_id == prepared.document_id));
        Ok(())
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let config = ChunkingConfig::from(&PipelineOptions::default());
        let result = prepare_document(
            Path::new("/definitely/not/here.txt"),
            DocumentFormat::PlainText,
            config,
            0,
        );
        assert!(matches!(result, Err(IngestError::Io(_))));
    }
}
