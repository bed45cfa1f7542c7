use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref TOKEN_RE: Regex = Regex::new(r"(?u)[\p{L}\p{N}]+").expect("valid regex");
}

/// Tokenize text into lowercase maximal runs of alphanumeric characters.
///
/// No stemming and no stopword removal: query tokens must match index terms
/// byte for byte, so both sides go through this one function.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN_RE
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_splits_on_punctuation() {
        let toks = tokenize("Hello, World! Rust-lang.");
        assert_eq!(toks, vec!["hello", "world", "rust", "lang"]);
    }

    #[test]
    fn keeps_digits_inside_runs() {
        assert_eq!(tokenize("bm25 k1=1.5"), vec!["bm25", "k1", "1", "5"]);
    }

    #[test]
    fn no_stemming() {
        let toks = tokenize("running runners run");
        assert_eq!(toks, vec!["running", "runners", "run"]);
    }

    #[test]
    fn no_stopword_removal() {
        let toks = tokenize("the quick fox");
        assert_eq!(toks, vec!["the", "quick", "fox"]);
    }

    #[test]
    fn handles_unicode_letters() {
        assert_eq!(tokenize("Café Zürich"), vec!["café", "zürich"]);
    }

    #[test]
    fn empty_input() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("  \t\n ---").is_empty());
    }
}
