//! Report persistence for `lyceum run --save`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const REPORT_FILE_NAME: &str = "final_report.md";

/// Directory name for a topic: lowercase, spaces replaced by underscores.
///
/// Path separators are replaced as well so a topic can never escape the
/// output directory.
pub fn normalize_topic(topic: &str) -> String {
    let normalized: String = topic
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            other => other,
        })
        .collect();

    match normalized.trim_matches('.') {
        "" => "untitled".to_string(),
        _ => normalized,
    }
}

/// Remove a code fence wrapped around a whole Markdown report.
pub fn clean_markdown_code_blocks(content: &str) -> String {
    let trimmed = content.trim();
    let fenced = ["```markdown", "```md", "```"]
        .iter()
        .find_map(|opening| trimmed.strip_prefix(opening));

    match fenced {
        Some(rest) => rest.strip_suffix("```").unwrap_or(rest).trim().to_string(),
        None => trimmed.to_string(),
    }
}

/// Write `content` to `<output_dir>/<normalized topic>/final_report.md`.
pub fn save_report(output_dir: &Path, topic: &str, content: &str) -> io::Result<PathBuf> {
    let dir = output_dir.join(normalize_topic(topic));
    fs::create_dir_all(&dir)?;

    let path = dir.join(REPORT_FILE_NAME);
    fs::write(&path, clean_markdown_code_blocks(content))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Graph Neural Networks", "graph_neural_networks")]
    #[case("  LLM agents ", "llm_agents")]
    #[case("a/b\\c", "a_b_c")]
    #[case("..", "untitled")]
    #[case("", "untitled")]
    fn test_normalize_topic(#[case] topic: &str, #[case] expected: &str) {
        assert_eq!(normalize_topic(topic), expected);
    }

    #[rstest]
    #[case("```markdown\n# Title\nBody\n```", "# Title\nBody")]
    #[case("```\n# Title\n```", "# Title")]
    #[case("# Title\n\n```rust\nfn main() {}\n```", "# Title\n\n```rust\nfn main() {}\n```")]
    fn test_clean_markdown_code_blocks(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(clean_markdown_code_blocks(input), expected);
    }

    #[test]
    fn test_save_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_report(dir.path(), "Quantum Computing", "```markdown\n# QC\n```").unwrap();

        assert_eq!(
            path,
            dir.path().join("quantum_computing").join(REPORT_FILE_NAME)
        );
        assert_eq!(fs::read_to_string(path).unwrap(), "# QC");
    }

    #[test]
    fn test_save_report_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        save_report(dir.path(), "topic", "first").unwrap();
        let path = save_report(dir.path(), "topic", "second").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "second");
    }
}
