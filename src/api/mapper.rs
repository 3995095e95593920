//! Maps service responses to domain models.

use serde_json::Value;

use crate::models::{AudioDownloadStatus, Definition, Phonetic, Word};

use super::models::DictionaryEntry;

/// Map a raw entry to a domain word for the text that was searched.
pub fn map_entry(entry: &DictionaryEntry, searched_word: &str, audio_base_url: &str) -> Word {
    let phonetics = entry
        .headword
        .pronunciations
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|pron| Phonetic {
            text: pron.text.clone(),
            audio_url: pron
                .sound
                .as_ref()
                .and_then(|sound| sound.audio.as_deref())
                .map(|token| resolve_audio_url(audio_base_url, token)),
        })
        .collect();

    let definitions = entry
        .definitions
        .iter()
        .map(|def| Definition {
            part_of_speech: entry.functional_label.clone(),
            meaning: extract_meaning(&def.sense_sequence),
            examples: Vec::new(),
        })
        .collect();

    Word {
        id: entry.meta.id.clone(),
        word: searched_word.to_string(),
        phonetics,
        definitions,
        timestamp: chrono::Utc::now().timestamp_millis(),
        audio_file_path: None,
        audio_download_status: AudioDownloadStatus::Pending,
    }
}

/// Subdirectory an audio token lives under on the media host.
///
/// Tokens starting with "bix" or "gg" map to those fixed subdirectories,
/// tokens starting with a digit or punctuation map to "number", anything
/// else uses the token's first character.
pub fn audio_subdirectory(token: &str) -> String {
    let Some(first) = token.chars().next() else {
        return String::new();
    };
    if token.starts_with("bix") {
        "bix".to_string()
    } else if token.starts_with("gg") {
        "gg".to_string()
    } else if first.is_ascii_digit() || !first.is_alphanumeric() {
        "number".to_string()
    } else {
        first.to_string()
    }
}

/// Full audio URL for a token: `<base>/<subdirectory>/<token>.mp3`.
pub fn resolve_audio_url(audio_base_url: &str, token: &str) -> String {
    format!(
        "{}/{}/{}.mp3",
        audio_base_url.trim_end_matches('/'),
        audio_subdirectory(token),
        token
    )
}

/// Flatten a sense sequence to a single meaning string: the first
/// `["text", ...]` pair found depth-first, with markup tokens stripped.
fn extract_meaning(sense_sequence: &Value) -> String {
    find_text(sense_sequence)
        .map(strip_markup)
        .unwrap_or_default()
}

fn find_text(value: &Value) -> Option<&str> {
    match value {
        Value::Array(items) => {
            if items.len() >= 2 && items[0].as_str() == Some("text") {
                if let Some(text) = items[1].as_str() {
                    return Some(text);
                }
            }
            items.iter().find_map(find_text)
        }
        Value::Object(map) => map.values().find_map(find_text),
        _ => None,
    }
}

/// Drop `{...}` formatting tokens from definition text.
fn strip_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for ch in text.chars() {
        match ch {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    out.trim().to_string()
}
