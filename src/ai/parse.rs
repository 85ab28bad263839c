//! Recupero best-effort del JSON dalla risposta di un modello
//!
//! I modelli circondano il JSON di testo o blocchi markdown e lasciano virgole finali.
//! I candidati vengono provati in ordine, vince il primo che si deserializza
//! nel tipo richiesto:
//! 1. l'intera risposta, senza spazi iniziali e finali
//! 2. il contenuto di ogni blocco di codice delimitato
//! 3. il tratto dalla prima parentesi aperta all'ultima chiusa
//! 4. lo stesso tratto senza virgole finali

use super::AiError;
use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

lazy_static! {
    static ref FENCED_BLOCK_RE: Regex =
        Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)```").unwrap();
    static ref TRAILING_COMMA_RE: Regex = Regex::new(r",(\s*[}\]])").unwrap();
}

pub fn extract_json<T: DeserializeOwned>(text: &str) -> Result<T, AiError> {
    let mut last_error = None;

    for (strategy, candidate) in candidates(text) {
        match serde_json::from_str::<T>(&candidate) {
            Ok(value) => {
                debug!("Parsed model reply with strategy '{}'", strategy);
                return Ok(value);
            }
            Err(e) => last_error = Some(e.to_string()),
        }
    }

    warn!("No JSON candidate in model reply could be parsed");
    Err(AiError::Parse(
        last_error.unwrap_or_else(|| "no JSON found in model reply".to_string()),
    ))
}

fn candidates(text: &str) -> Vec<(&'static str, String)> {
    let mut out = Vec::new();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return out;
    }
    out.push(("direct", trimmed.to_string()));

    for captures in FENCED_BLOCK_RE.captures_iter(text) {
        if let Some(body) = captures.get(1) {
            let body = body.as_str().trim();
            if !body.is_empty() {
                out.push(("fenced", body.to_string()));
            }
        }
    }

    if let Some(span) = bracket_span(text) {
        out.push(("bracket-span", span.to_string()));
        let cleaned = TRAILING_COMMA_RE.replace_all(span, "$1");
        if cleaned != span {
            out.push(("trailing-commas", cleaned.into_owned()));
        }
    }

    out
}

/// Dalla prima `{` o `[` all'ultima chiusura dello stesso tipo
fn bracket_span(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let closer = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(closer)?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, Debug, PartialEq)]
    struct Card {
        front: String,
        back: String,
    }

    #[derive(Deserialize, Debug, PartialEq)]
    struct Deck {
        cards: Vec<Card>,
    }

    #[test]
    fn test_plain_json() {
        let deck: Deck = extract_json(r#" {"cards": [{"front": "a", "back": "b"}]} "#).unwrap();
        assert_eq!(deck.cards.len(), 1);
    }

    #[test]
    fn test_fenced_block_with_language() {
        let reply = "Sure! Here you go:\n```json\n{\"cards\": [{\"front\": \"H2O\", \"back\": \"water\"}]}\n```\nGood luck!";
        let deck: Deck = extract_json(reply).unwrap();
        assert_eq!(deck.cards[0].back, "water");
    }

    #[test]
    fn test_fenced_block_without_language() {
        let reply = "```\n[{\"front\": \"x\", \"back\": \"y\"}]\n```";
        let cards: Vec<Card> = extract_json(reply).unwrap();
        assert_eq!(cards, vec![Card { front: "x".into(), back: "y".into() }]);
    }

    #[test]
    fn test_json_embedded_in_prose() {
        let reply = "The deck is {\"cards\": []} as requested.";
        let deck: Deck = extract_json(reply).unwrap();
        assert!(deck.cards.is_empty());
    }

    #[test]
    fn test_trailing_commas_are_tolerated() {
        let reply = "{\"cards\": [{\"front\": \"a\", \"back\": \"b\",},],}";
        let deck: Deck = extract_json(reply).unwrap();
        assert_eq!(deck.cards[0].front, "a");
    }

    #[test]
    fn test_second_fenced_block_wins_when_first_is_wrong_shape() {
        let reply = "```\nnot json\n```\nand\n```json\n{\"cards\": []}\n```";
        let deck: Deck = extract_json(reply).unwrap();
        assert!(deck.cards.is_empty());
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        let err = extract_json::<Deck>("I cannot help with that.").unwrap_err();
        assert!(matches!(err, AiError::Parse(_)));
        assert!(matches!(extract_json::<Deck>("   ").unwrap_err(), AiError::Parse(_)));
    }
}
