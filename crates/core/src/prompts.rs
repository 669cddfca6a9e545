//! Prompt text for every document task.

use crate::Chunk;

pub const SUMMARY_QUESTION: &str = "Please provide a concise summary of the document, including:
1. Main topics covered
2. Key points
3. Important conclusions";

pub const DETAILED_SUMMARY_QUESTION: &str = "Summarize the document in detail.";

/// Context passages separated by a blank line, nearest first.
pub fn join_context(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn join_sample(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn retrieval_prompt(question: &str, context: &str) -> String {
    format!(
        "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.

{context}

Question: {question}
Helpful Answer:"
    )
}

pub fn comparison_question(first_summary: &str, second_summary: &str) -> String {
    format!(
        "Compare these documents:
Document 1: {first_summary}
Document 2: {second_summary}

Please highlight:
1. Common themes
2. Key differences
3. Unique points in each document"
    )
}

pub fn keywords_prompt(text: &str) -> String {
    format!("Extract the top 10 most important keywords from the following text:\n\n{text}")
}

pub fn sentiment_prompt(text: &str) -> String {
    format!("Analyze the overall sentiment of the following text and explain why:\n\n{text}")
}

pub fn translation_prompt(target_language: &str, text: &str) -> String {
    format!("Translate the following text to {target_language}:\n\n{text}")
}
