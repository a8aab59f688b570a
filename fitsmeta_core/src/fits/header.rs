//! FITS header cards and the keyword map built from them

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Size of one header card in bytes
pub const CARD_SIZE: usize = 80;

/// Keywords dropped before a header is exposed downstream
pub const BLACKLIST: [&str; 3] = ["COMMENT", "HISTORY", ""];

/// Parsed header keywords of a single HDU
///
/// Later duplicates of a keyword replace earlier ones. Commentary cards are
/// kept under their keyword until [`Header::strip_blacklisted`] removes them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Header {
    cards: BTreeMap<String, Value>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the concatenated header blocks of one HDU, stopping at `END`
    pub fn parse(bytes: &[u8]) -> Self {
        let mut header = Self::new();
        for card in bytes.chunks(CARD_SIZE) {
            let text = String::from_utf8_lossy(card);
            match parse_card(&text) {
                Card::End => break,
                Card::Keyword(key, value) => {
                    header.cards.insert(key, value);
                }
                Card::Commentary(key, text) => {
                    header.cards.insert(key, Value::Text(text));
                }
                Card::Undefined => {}
            }
        }
        header
    }

    /// Drop commentary and blank keywords
    pub fn strip_blacklisted(&mut self) {
        for key in BLACKLIST {
            self.cards.remove(key);
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.cards.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.cards.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.cards.contains_key(key)
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    pub fn get_float(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    /// String value with surrounding blanks removed
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str).map(str::trim)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.cards.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.cards.keys()
    }
}

impl FromIterator<(String, Value)> for Header {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            cards: iter.into_iter().collect(),
        }
    }
}

/// Classification of a single 80-byte card
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Card {
    End,
    Keyword(String, Value),
    Commentary(String, String),
    /// Value indicator present but no value
    Undefined,
}

/// True when the card is the `END` card
pub(crate) fn is_end_card(card: &[u8]) -> bool {
    card.len() >= 8 && &card[..3] == b"END" && card[3..8].iter().all(|b| *b == b' ')
}

pub(crate) fn parse_card(card: &str) -> Card {
    let keyword_field = card.get(..8).unwrap_or(card);
    let keyword = keyword_field.trim_end();

    if keyword == "END" {
        return Card::End;
    }

    if keyword == "HIERARCH" {
        return parse_hierarch(card.get(8..).unwrap_or(""));
    }

    let has_value_indicator = card.get(8..10) == Some("= ");
    if !has_value_indicator {
        let text = card.get(8..).unwrap_or("").trim().to_string();
        return Card::Commentary(keyword.to_string(), text);
    }

    match parse_value(card.get(10..).unwrap_or("")) {
        Some(value) => Card::Keyword(keyword.to_string(), value),
        None => Card::Undefined,
    }
}

fn parse_hierarch(rest: &str) -> Card {
    match rest.split_once('=') {
        Some((name, value)) => {
            let key = name.split_whitespace().collect::<Vec<_>>().join(" ");
            match parse_value(value) {
                Some(value) => Card::Keyword(key, value),
                None => Card::Undefined,
            }
        }
        None => Card::Commentary("HIERARCH".to_string(), rest.trim().to_string()),
    }
}

fn parse_value(field: &str) -> Option<Value> {
    let field = field.trim_start();

    if let Some(quoted) = field.strip_prefix('\'') {
        return Some(Value::Text(parse_quoted(quoted)));
    }

    let token = match field.find('/') {
        Some(idx) => &field[..idx],
        None => field,
    }
    .trim();

    if token.is_empty() {
        return None;
    }

    match token {
        "T" => return Some(Value::Bool(true)),
        "F" => return Some(Value::Bool(false)),
        _ => {}
    }

    if let Ok(i) = token.parse::<i64>() {
        return Some(Value::Integer(i));
    }

    if let Ok(f) = token.replace(['D', 'd'], "E").parse::<f64>() {
        return Some(Value::Float(f));
    }

    Some(Value::Text(token.to_string()))
}

/// Read a quoted string body; doubled quotes are an escaped quote
fn parse_quoted(body: &str) -> String {
    let mut out = String::new();
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\'' {
            if chars.peek() == Some(&'\'') {
                out.push('\'');
                chars.next();
            } else {
                break;
            }
        } else {
            out.push(c);
        }
    }
    out.trim_end().to_string()
}
