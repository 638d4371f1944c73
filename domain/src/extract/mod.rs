//! Code-fragment extraction
//!
//! Scans model output for fenced code regions and yields them in order of
//! appearance. Extraction is pure and deterministic: [`Fragments`] is a lazy,
//! restartable iterator over the input text, and [`extract_fragments`]
//! collects it. Nothing here mutates the input or touches the outside world.

use serde::{Deserialize, Serialize};

/// Languages the sandbox knows how to run.
const EXECUTABLE_LANGUAGES: &[&str] = &["python", "javascript", "bash"];

/// One fenced code region extracted from a model response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeFragment {
    /// Normalized language tag (`python`, `javascript`, `bash`, ...).
    pub language: String,
    /// The code between the fences, trimmed.
    pub code: String,
    /// Ordinal position within the source text (0-based).
    pub index: usize,
}

impl CodeFragment {
    pub fn new(language: impl Into<String>, code: impl Into<String>, index: usize) -> Self {
        Self {
            language: language.into(),
            code: code.into(),
            index,
        }
    }

    /// Whether the sandbox has an interpreter for this fragment.
    pub fn is_executable(&self) -> bool {
        EXECUTABLE_LANGUAGES.contains(&self.language.as_str())
    }
}

/// Normalize a raw fence tag to a canonical language name.
pub fn normalize_language(tag: &str) -> String {
    let tag = tag.trim().to_lowercase();
    match tag.as_str() {
        "py" => "python".to_string(),
        "js" | "node" => "javascript".to_string(),
        "ts" => "typescript".to_string(),
        "sh" | "shell" => "bash".to_string(),
        _ => tag,
    }
}

/// Lazy iterator over the fenced code regions of a text.
///
/// Restartable: constructing a new `Fragments` over the same text yields the
/// same sequence. An unterminated fence ends the sequence.
pub struct Fragments<'a> {
    text: &'a str,
    default_language: &'a str,
    pos: usize,
    index: usize,
}

impl<'a> Fragments<'a> {
    pub fn new(text: &'a str, default_language: &'a str) -> Self {
        Self {
            text,
            default_language,
            pos: 0,
            index: 0,
        }
    }
}

impl Iterator for Fragments<'_> {
    type Item = CodeFragment;

    fn next(&mut self) -> Option<CodeFragment> {
        let open = self.text[self.pos..].find("```")? + self.pos;
        let tag_start = open + 3;
        let line_end = self.text[tag_start..].find('\n')? + tag_start;
        let tag = self.text[tag_start..line_end].trim();

        let body_start = line_end + 1;
        let close = self.text[body_start..].find("```")? + body_start;
        let code = self.text[body_start..close].trim();

        self.pos = close + 3;

        // A tag with spaces or punctuation is not a language marker
        let language = if tag.is_empty()
            || !tag
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '+' || c == '-')
        {
            self.default_language.to_string()
        } else {
            normalize_language(tag)
        };

        let fragment = CodeFragment::new(language, code, self.index);
        self.index += 1;
        Some(fragment)
    }
}

/// Extract all fenced code fragments from `text`, in order of appearance.
///
/// Untagged fences are labelled with `default_language`.
pub fn extract_fragments(text: &str, default_language: &str) -> Vec<CodeFragment> {
    Fragments::new(text, default_language).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_tagged_fence() {
        let text = "Here you go:\n```python\nprint(\"hi\")\n```\nDone.";
        let fragments = extract_fragments(text, "python");

        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].language, "python");
        assert_eq!(fragments[0].code, "print(\"hi\")");
        assert_eq!(fragments[0].index, 0);
    }

    #[test]
    fn test_untagged_fence_gets_default_language() {
        let text = "```\necho hi\n```";
        let fragments = extract_fragments(text, "bash");
        assert_eq!(fragments[0].language, "bash");
    }

    #[test]
    fn test_alias_normalization() {
        assert_eq!(normalize_language("py"), "python");
        assert_eq!(normalize_language("JS"), "javascript");
        assert_eq!(normalize_language("sh"), "bash");
        assert_eq!(normalize_language("shell"), "bash");
        assert_eq!(normalize_language("rust"), "rust");
    }

    #[test]
    fn test_multiple_fragments_keep_order() {
        let text = "```python\na = 1\n```\ntext\n```js\nlet b = 2;\n```";
        let fragments = extract_fragments(text, "python");

        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].language, "python");
        assert_eq!(fragments[1].language, "javascript");
        assert_eq!(fragments[1].index, 1);
    }

    #[test]
    fn test_unterminated_fence_is_ignored() {
        let text = "```python\nprint(1)\n``` ok\n```python\nno closing fence";
        let fragments = extract_fragments(text, "python");
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].code, "print(1)");
    }

    #[test]
    fn test_no_fences() {
        assert!(extract_fragments("just prose, no code", "python").is_empty());
    }

    #[test]
    fn test_restartable() {
        let text = "```python\nx\n```";
        let first: Vec<_> = Fragments::new(text, "python").collect();
        let second: Vec<_> = Fragments::new(text, "python").collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_executable_filter() {
        assert!(CodeFragment::new("python", "x", 0).is_executable());
        assert!(CodeFragment::new("bash", "x", 0).is_executable());
        assert!(!CodeFragment::new("typescript", "x", 0).is_executable());
        assert!(!CodeFragment::new("text", "x", 0).is_executable());
    }
}
