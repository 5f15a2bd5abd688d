//! Catalog field normalization
//!
//! Deliveries arrive with curly quotes, full-width punctuation, stray
//! numbering, and free-form ISRCs. Normalization here is about storage
//! hygiene; matching-time normalization lives in `scoring::names`.

use crate::ingest::parser::RawTrack;
use crate::models::Track;

/// Character substitutions applied before anything else
const CHAR_REPLACEMENTS: &[(char, &str)] = &[
    ('\u{2018}', "'"),
    ('\u{2019}', "'"),
    ('\u{201C}', "\""),
    ('\u{201D}', "\""),
    ('\u{2026}', "..."),
    ('\u{2014}', "-"),
    ('\u{2013}', "-"),
    ('\u{2212}', "-"),
    ('\u{FF01}', "!"),
    ('\u{FF1F}', "?"),
    ('\u{FF08}', "("),
    ('\u{FF09}', ")"),
    ('\u{FF1A}', ":"),
    ('\u{FF1B}', ";"),
    ('\u{FF0C}', ","),
];

/// Basic text normalization applied to every imported field
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match CHAR_REPLACEMENTS.iter().find(|(from, _)| *from == ch) {
            Some((_, to)) => out.push_str(to),
            None => out.push(ch),
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize a title, dropping leading track-number noise like "03 - "
pub fn normalize_title(title: &str) -> String {
    let title = normalize_text(title);
    let trimmed = strip_leading_number(&title);
    trimmed.trim().to_string()
}

fn strip_leading_number(title: &str) -> &str {
    let digits = title.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return title;
    }
    let rest = &title[digits..];
    let rest_trimmed = rest.trim_start();
    if let Some(stripped) = rest_trimmed
        .strip_prefix('-')
        .or_else(|| rest_trimmed.strip_prefix('.'))
        .or_else(|| rest_trimmed.strip_prefix(')'))
    {
        let stripped = stripped.trim_start();
        if !stripped.is_empty() {
            return stripped;
        }
    }
    title
}

/// Normalize an artist name, standardizing featuring notation
pub fn normalize_artist_name(artist: &str) -> String {
    let artist = normalize_text(artist);
    let mut out = String::with_capacity(artist.len());
    let mut words = artist.split(' ').peekable();
    while let Some(word) = words.next() {
        let lowered = word.to_lowercase();
        let replaced = match lowered.as_str() {
            "feat" | "feat." | "ft" | "ft." | "featuring" => "feat.",
            _ => word,
        };
        out.push_str(replaced);
        if words.peek().is_some() {
            out.push(' ');
        }
    }
    out
}

/// Canonicalize an ISRC: strip separators, uppercase, require 12 alphanumerics.
///
/// Returns `None` for anything that doesn't canonicalize, so junk values never
/// reach the database's unique column.
pub fn normalize_isrc(isrc: &str) -> Option<String> {
    let cleaned: String = isrc
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.'))
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if cleaned.len() == 12 && cleaned.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(cleaned)
    } else {
        None
    }
}

/// Build a pending `Track` from a raw row, or `None` when title/artist are
/// missing. Invalid ISRCs are dropped, not fatal.
pub fn normalize_track(raw: &RawTrack) -> Option<Track> {
    let title = raw.title.as_deref().map(normalize_title)?;
    let artist = raw.artist_name.as_deref().map(normalize_artist_name)?;
    if title.is_empty() || artist.is_empty() {
        return None;
    }

    let mut track = Track::new(title, artist);
    track.release_title = raw
        .release_title
        .as_deref()
        .map(normalize_text)
        .filter(|s| !s.is_empty());
    track.duration = raw.duration.clone();
    track.audio_path = raw.audio_path.clone();
    track.isrc = raw.isrc.as_deref().and_then(normalize_isrc);
    if raw.isrc.is_some() && track.isrc.is_none() {
        tracing::warn!(
            title = %track.title,
            isrc = ?raw.isrc,
            "Dropping malformed ISRC"
        );
    }
    Some(track)
}
