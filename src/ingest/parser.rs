//! Catalog CSV parsing
//!
//! Catalog deliveries use wildly inconsistent headers ("Track Title",
//! "performer", "File Path", ...). The parser maps known synonyms onto the
//! standard track fields and ignores everything else.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// One catalog row before normalization
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTrack {
    pub title: Option<String>,
    pub artist_name: Option<String>,
    pub release_title: Option<String>,
    pub duration: Option<String>,
    pub isrc: Option<String>,
    pub audio_path: Option<String>,
}

/// Header synonyms mapped to standard field names
fn default_field_mapping() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("title", "title"),
        ("track_title", "title"),
        ("track title", "title"),
        ("track name", "title"),
        ("name", "title"),
        ("artist", "artist_name"),
        ("artist_name", "artist_name"),
        ("artist name", "artist_name"),
        ("performer", "artist_name"),
        ("album", "release_title"),
        ("release", "release_title"),
        ("release_title", "release_title"),
        ("release title", "release_title"),
        ("album_title", "release_title"),
        ("album title", "release_title"),
        ("duration", "duration"),
        ("length", "duration"),
        ("time", "duration"),
        ("isrc", "isrc"),
        ("track_isrc", "isrc"),
        ("track isrc", "isrc"),
        ("file", "audio_path"),
        ("path", "audio_path"),
        ("audio", "audio_path"),
        ("audio_path", "audio_path"),
        ("audio path", "audio_path"),
        ("file_path", "audio_path"),
        ("file path", "audio_path"),
    ])
}

/// Parser for catalog CSV files
pub struct CatalogParser {
    field_mapping: HashMap<&'static str, &'static str>,
}

impl Default for CatalogParser {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogParser {
    pub fn new() -> Self {
        Self {
            field_mapping: default_field_mapping(),
        }
    }

    /// Parse a catalog CSV into raw track rows.
    ///
    /// `audio_base_path`, when given, resolves relative audio paths against
    /// the delivery's audio directory.
    pub fn parse_file(
        &self,
        file_path: &Path,
        audio_base_path: Option<&Path>,
    ) -> Result<Vec<RawTrack>> {
        if !file_path.exists() {
            return Err(Error::NotFound(format!(
                "Catalog file not found: {}",
                file_path.display()
            )));
        }

        tracing::info!(catalog = %file_path.display(), "Parsing catalog file");

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(file_path)
            .map_err(|e| Error::InvalidInput(format!("Cannot read catalog: {}", e)))?;

        // Map each column index to its standard field, if recognized
        let headers = reader
            .headers()
            .map_err(|e| Error::InvalidInput(format!("Cannot read catalog headers: {}", e)))?;
        let columns: Vec<Option<&'static str>> = headers
            .iter()
            .map(|h| {
                self.field_mapping
                    .get(h.trim().to_lowercase().as_str())
                    .copied()
            })
            .collect();

        if !columns.iter().any(|c| *c == Some("title")) {
            return Err(Error::InvalidInput(
                "Catalog has no recognizable title column".to_string(),
            ));
        }

        let mut tracks = Vec::new();
        for record in reader.records() {
            let record =
                record.map_err(|e| Error::InvalidInput(format!("Malformed CSV row: {}", e)))?;
            let mut track = RawTrack::default();
            for (idx, field) in columns.iter().enumerate() {
                let Some(field) = field else { continue };
                let Some(value) = record.get(idx) else {
                    continue;
                };
                let value = value.trim();
                if value.is_empty() {
                    continue;
                }
                let slot = match *field {
                    "title" => &mut track.title,
                    "artist_name" => &mut track.artist_name,
                    "release_title" => &mut track.release_title,
                    "duration" => &mut track.duration,
                    "isrc" => &mut track.isrc,
                    "audio_path" => &mut track.audio_path,
                    _ => continue,
                };
                if slot.is_none() {
                    *slot = Some(value.to_string());
                }
            }

            if let (Some(base), Some(audio)) = (audio_base_path, track.audio_path.as_deref()) {
                track.audio_path = Some(resolve_audio_path(audio, base));
            }

            tracks.push(track);
        }

        tracing::info!(count = tracks.len(), "Parsed catalog rows");
        Ok(tracks)
    }
}

/// Resolve a relative audio path against the delivery's audio directory
fn resolve_audio_path(file_path: &str, base_path: &Path) -> String {
    let path = PathBuf::from(file_path);
    if path.is_absolute() {
        file_path.to_string()
    } else {
        base_path.join(path).display().to_string()
    }
}
