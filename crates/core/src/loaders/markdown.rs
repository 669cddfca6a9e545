use super::DocumentLoader;
use crate::error::IngestError;
use crate::models::TextBlock;
use pulldown_cmark::{Event, Parser, TagEnd};
use std::fs;
use std::path::Path;

/// Markdown with the markup stripped, as a single block.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownLoader;

impl DocumentLoader for MarkdownLoader {
    fn load_blocks(&self, path: &Path) -> Result<Vec<TextBlock>, IngestError> {
        let source = fs::read_to_string(path)?;
        Ok(vec![TextBlock {
            number: 1,
            text: markdown_to_text(&source),
        }])
    }
}

pub fn markdown_to_text(source: &str) -> String {
    let mut text = String::new();

    for event in Parser::new(source) {
        match event {
            Event::Text(fragment) | Event::Code(fragment) => text.push_str(&fragment),
            Event::SoftBreak | Event::HardBreak => text.push('\n'),
            Event::End(TagEnd::Paragraph)
            | Event::End(TagEnd::Heading(_))
            | Event::End(TagEnd::CodeBlock) => text.push_str("\n\n"),
            Event::End(TagEnd::Item) => text.push('\n'),
            _ => {}
        }
    }

    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::markdown_to_text;

    #[test]
    fn markup_is_stripped() {
        let source = "# Release notes\n\nThe **parser** now handles `code`.\n\n- one\n- two\n";
        let text = markdown_to_text(source);

        assert!(text.starts_with("Release notes\n\nThe parser now handles code."));
        assert!(text.contains("one\n"));
        assert!(!text.contains('#'));
        assert!(!text.contains("**"));
    }
}
