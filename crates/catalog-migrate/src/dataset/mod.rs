//! Encoding-tolerant loading of exported catalog collections.
//!
//! Exports arrive as `{ "data": [ ... ] }` documents whose text encoding is not
//! guaranteed by the producer. Each candidate encoding is tried in order and
//! the first one that decodes to syntactically valid JSON wins.

use std::borrow::Cow;
use std::fmt;
use std::path::Path;

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::error::{MigrateError, Result};
use crate::model::{Item, Price};

/// Candidate encodings, in the order they are attempted.
pub const CANDIDATE_ENCODINGS: [SourceEncoding; 4] = [
    SourceEncoding::Utf8,
    SourceEncoding::Utf16,
    SourceEncoding::Windows1252,
    SourceEncoding::Latin1,
];

/// Text encoding a source document was decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    /// UTF-8, with or without a byte-order mark.
    Utf8,
    /// UTF-16 LE or BE; requires a byte-order mark.
    Utf16,
    Windows1252,
    /// ISO-8859-1: every byte maps to the code point of the same value.
    Latin1,
}

impl SourceEncoding {
    /// Decode `bytes`, returning `None` if they are not valid in this encoding.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Option<Cow<'a, str>> {
        match self {
            SourceEncoding::Utf8 => {
                let body = match Encoding::for_bom(bytes) {
                    Some((enc, len)) if enc == UTF_8 => &bytes[len..],
                    Some(_) => return None,
                    None => bytes,
                };
                UTF_8.decode_without_bom_handling_and_without_replacement(body)
            }
            SourceEncoding::Utf16 => match Encoding::for_bom(bytes) {
                Some((enc, len)) if enc == UTF_16LE || enc == UTF_16BE => {
                    enc.decode_without_bom_handling_and_without_replacement(&bytes[len..])
                }
                _ => None,
            },
            SourceEncoding::Windows1252 => {
                WINDOWS_1252.decode_without_bom_handling_and_without_replacement(bytes)
            }
            SourceEncoding::Latin1 => Some(Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect())),
        }
    }
}

impl fmt::Display for SourceEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceEncoding::Utf8 => "utf-8",
            SourceEncoding::Utf16 => "utf-16",
            SourceEncoding::Windows1252 => "windows-1252",
            SourceEncoding::Latin1 => "iso-8859-1",
        };
        f.write_str(name)
    }
}

/// A loaded collection and the encoding that produced it.
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub records: Vec<T>,
    pub encoding: SourceEncoding,
}

#[derive(Deserialize)]
struct Collection<T> {
    data: Vec<T>,
}

/// Load an exported item collection.
pub fn load_items<P: AsRef<Path>>(path: P) -> Result<Loaded<Item>> {
    load_collection(path)
}

/// Load an exported price collection.
pub fn load_prices<P: AsRef<Path>>(path: P) -> Result<Loaded<Price>> {
    load_collection(path)
}

/// Load any `{ "data": [ ... ] }` document from disk.
pub fn load_collection<T, P>(path: P) -> Result<Loaded<T>>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| MigrateError::load(path, e.to_string()))?;
    let loaded = parse_collection(&bytes).map_err(|reason| MigrateError::load(path, reason))?;
    debug!(
        "Loaded {} records from {} ({})",
        loaded.records.len(),
        path.display(),
        loaded.encoding
    );
    Ok(loaded)
}

/// Decode and parse a document held in memory.
///
/// Returns the failure reason as a plain string; callers attach the path.
pub fn parse_collection<T: DeserializeOwned>(bytes: &[u8]) -> std::result::Result<Loaded<T>, String> {
    let (value, encoding) = CANDIDATE_ENCODINGS
        .iter()
        .find_map(|enc| {
            let text = enc.decode(bytes)?;
            match serde_json::from_str::<serde_json::Value>(&text) {
                Ok(value) => Some((value, *enc)),
                Err(e) => {
                    debug!("Not valid JSON as {}: {}", enc, e);
                    None
                }
            }
        })
        .ok_or_else(|| "no encoding succeeded".to_string())?;

    let collection: Collection<T> = serde_json::from_value(value)
        .map_err(|e| format!("unexpected document structure: {}", e))?;

    Ok(Loaded {
        records: collection.data,
        encoding,
    })
}
