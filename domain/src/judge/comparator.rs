//! Output agreement predicate
//!
//! Two responses are "in agreement" when their executed stdout compares
//! equal under the active comparator. The predicate is pluggable so a
//! fuzzy or semantic comparator can be injected; the default is normalized
//! literal equality.

/// Decides whether two execution outputs count as the same answer.
pub trait OutputComparator: Send + Sync {
    fn agree(&self, a: &str, b: &str) -> bool;
}

/// Default comparator: literal equality after trimming and collapsing
/// whitespace runs to single spaces.
#[derive(Debug, Default, Clone, Copy)]
pub struct NormalizedOutput;

impl NormalizedOutput {
    /// Trim and collapse internal whitespace.
    pub fn normalize(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

impl OutputComparator for NormalizedOutput {
    fn agree(&self, a: &str, b: &str) -> bool {
        Self::normalize(a) == Self::normalize(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_agrees() {
        assert!(NormalizedOutput.agree("Hello, World!\n", "Hello, World!\n"));
    }

    #[test]
    fn test_whitespace_differences_agree() {
        assert!(NormalizedOutput.agree("Hello,  World!\n", " Hello, World! "));
        assert!(NormalizedOutput.agree("a\nb", "a b"));
    }

    #[test]
    fn test_different_output_disagrees() {
        assert!(!NormalizedOutput.agree("Hello", "Goodbye"));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(NormalizedOutput::normalize("  a \n b\t c  "), "a b c");
        assert_eq!(NormalizedOutput::normalize(""), "");
    }
}
