//! Decoder for bracketed token attribute blocks
//!
//! The interactive parser prints each token as `[Text=dog Lemma=dog ...]`.
//! Values may embed markup (`Timex=<TIMEX3 tid="t1">today</TIMEX3>`) whose
//! own `=` and whitespace would break naive splitting, so markup is swapped
//! out for placeholders first and restored into the values afterwards.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]").unwrap());
static MARKUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^<>]+>.*?</[^<>]+>").unwrap());
static PAIR: Lazy<Regex> = Lazy::new(|| Regex::new(r"([^=\s]*)=([^=\s]*)").unwrap());

fn placeholder(i: usize) -> String {
    format!("^^^{}^^^", i)
}

/// Contents of every `[...]` block on a line, in order
pub fn token_blocks(line: &str) -> impl Iterator<Item = &str> + '_ {
    BLOCK
        .captures_iter(line)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
}

/// Decode one block body into ordered key/value pairs.
pub fn parse_feature_block(block: &str) -> Vec<(String, String)> {
    let mut stashed: HashMap<String, String> = HashMap::new();
    let masked = MARKUP.replace_all(block, |caps: &regex::Captures| {
        let key = placeholder(stashed.len());
        stashed.insert(key.clone(), caps[0].to_string());
        key
    });

    PAIR.captures_iter(&masked)
        .map(|caps| {
            let value = &caps[2];
            let value = stashed
                .get(value)
                .cloned()
                .unwrap_or_else(|| value.to_string());
            (caps[1].to_string(), value)
        })
        .collect()
}
