//! Texture modality: source text cleanup and subword encoding.

use super::{file_stem_string, label_dirs, visible_files, DataError};
use crate::tokenizer::{Tokenizer, TokenizerError, CLS_ID, PAD_ID, SEP_ID};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Padding word appended to short snippets before encoding.
pub const PAD_WORD: &str = "0";

fn camel_boundary() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([a-z]+)([A-Z]+)").expect("literal pattern"))
}

fn bracket_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(["\[\]\\])"#).expect("literal pattern"))
}

fn special_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([*.+!$#&,;{}()':=/<>%-])").expect("literal pattern"))
}

/// Normalizes a source snippet into the word list fed to the tokenizer.
///
/// Splits camel-case identifiers, spaces out brackets and operator
/// characters, removes underscores, drops single-letter words, and
/// right-pads with [`PAD_WORD`] up to `max_len` words. Longer snippets come
/// back unpadded and untruncated; the id stage fixes the length.
pub fn clean_snippet(source: &str, max_len: usize) -> Vec<String> {
    let spaced = camel_boundary().replace_all(source, "${1} ${2}");
    let spaced = bracket_chars().replace_all(&spaced, " ${1} ");
    let spaced = special_chars().replace_all(&spaced, " ${1} ");
    let spaced = spaced.replace('_', "");

    let mut words: Vec<String> = spaced
        .split_whitespace()
        .filter(|w| !(w.chars().count() == 1 && w.chars().all(char::is_alphabetic)))
        .map(str::to_string)
        .collect();
    while words.len() < max_len {
        words.push(PAD_WORD.to_string());
    }
    words
}

/// Encodes a snippet into fixed-length token and segment id sequences.
///
/// Ids are `[CLS] ... [SEP]` with zero padding, truncated to `max_len`;
/// segment ids are the identity range `0..max_len`.
pub fn encode_snippet(
    tokenizer: &dyn Tokenizer,
    source: &str,
    max_len: usize,
) -> Result<(Vec<u32>, Vec<u32>), TokenizerError> {
    assert!(max_len >= 2, "texture: sequence length must fit CLS and SEP");

    let words = clean_snippet(source, max_len);
    let encoded = tokenizer.encode(&words.join(" "))?;

    let mut ids = Vec::with_capacity(max_len);
    ids.push(CLS_ID);
    ids.extend(encoded.into_iter().take(max_len - 2));
    ids.push(SEP_ID);
    while ids.len() < max_len {
        ids.push(PAD_ID);
    }

    let segments = (0..max_len as u32).collect();
    Ok((ids, segments))
}

/// Reads every `.txt` snippet under the label subfolders of `root`,
/// keyed by file stem.
pub fn read_corpus(root: &Path) -> Result<BTreeMap<String, String>, DataError> {
    let mut corpus = BTreeMap::new();
    for (_, dir) in label_dirs(root)? {
        for path in visible_files(&dir)? {
            if path.extension().map_or(true, |ext| ext != "txt") {
                continue;
            }
            let text = fs::read_to_string(&path).map_err(|source| DataError::Io {
                path: path.clone(),
                source,
            })?;
            corpus.insert(file_stem_string(&path), text);
        }
    }
    Ok(corpus)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::{TokenizerConfig, WordPiece};
    use std::fs;

    #[test]
    fn test_camel_case_split() {
        let words = clean_snippet("getValue", 0);
        assert_eq!(words, vec!["get", "Value"]);
    }

    #[test]
    fn test_operators_become_words() {
        let words = clean_snippet("foo.bar()", 0);
        assert_eq!(words, vec!["foo", ".", "bar", "(", ")"]);
    }

    #[test]
    fn test_brackets_and_backslash_spaced() {
        let words = clean_snippet("rows[0]", 0);
        assert_eq!(words, vec!["rows", "[", "0", "]"]);
    }

    #[test]
    fn test_underscores_removed() {
        let words = clean_snippet("foo_bar baz_", 0);
        assert_eq!(words, vec!["foobar", "baz"]);
    }

    #[test]
    fn test_single_letter_words_dropped() {
        // "i" goes, ";" and "42" stay
        let words = clean_snippet("int i ; 42", 0);
        assert_eq!(words, vec!["int", ";", "42"]);
    }

    #[test]
    fn test_short_snippet_padded() {
        let words = clean_snippet("int count", 6);
        assert_eq!(words.len(), 6);
        assert_eq!(&words[2..], &[PAD_WORD, PAD_WORD, PAD_WORD, PAD_WORD]);
    }

    #[test]
    fn test_long_snippet_not_truncated_here() {
        let words = clean_snippet("one two three four five", 2);
        assert_eq!(words.len(), 5);
    }

    fn java_tokenizer() -> WordPiece {
        let config = TokenizerConfig::default()
            .with_vocab_size(256)
            .with_min_frequency(1);
        let mut tokenizer = WordPiece::new(config);
        tokenizer
            .train(&["public static void main", "int count = 0 ;", "0 0 0 0"])
            .unwrap();
        tokenizer
    }

    #[test]
    fn test_encode_snippet_shape() {
        let tokenizer = java_tokenizer();
        let (ids, segments) = encode_snippet(&tokenizer, "int count = 0;", 16).unwrap();
        assert_eq!(ids.len(), 16);
        assert_eq!(segments, (0..16).collect::<Vec<u32>>());
        assert_eq!(ids[0], CLS_ID);
        assert!(ids.contains(&SEP_ID));
    }

    #[test]
    fn test_encode_snippet_truncates_long_input() {
        let tokenizer = java_tokenizer();
        let long = "count ; ".repeat(50);
        let (ids, _) = encode_snippet(&tokenizer, &long, 12).unwrap();
        assert_eq!(ids.len(), 12);
        assert_eq!(ids[0], CLS_ID);
        assert_eq!(ids[11], SEP_ID);
    }

    #[test]
    fn test_encode_snippet_pads_short_input() {
        let tokenizer = java_tokenizer();
        let (ids, _) = encode_snippet(&tokenizer, "", 8).unwrap();
        assert_eq!(ids.len(), 8);
        // empty snippet still cleans to pad words, which encode as real ids
        assert_eq!(ids[0], CLS_ID);
    }

    #[test]
    fn test_read_corpus_keys_and_filtering() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Readable")).unwrap();
        fs::create_dir_all(dir.path().join("Unreadable")).unwrap();
        fs::write(dir.path().join("Readable/b.txt"), "int x = 1;").unwrap();
        fs::write(dir.path().join("Unreadable/a.txt"), "while(true){}").unwrap();
        fs::write(dir.path().join("Readable/c.java"), "class C {}").unwrap();

        let corpus = read_corpus(dir.path()).unwrap();
        let keys: Vec<&String> = corpus.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(corpus["b"], "int x = 1;");
    }
}
