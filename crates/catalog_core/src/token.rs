//! Resumption token codec.
//!
//! A token carries the whole harvest request, so no cursor is kept server-side:
//! `from/until/set/prefix/offset`, with an empty segment for an absent field.
//! String values are percent-encoded so they never contain the delimiter, and
//! decoding only accepts the exact spelling `encode` produces. A corrupted token
//! therefore fails instead of decoding into some other valid-looking request.

use std::fmt;

use serde::Serialize;

use crate::{CatalogError, Datestamp};

const DELIMITER: char = '/';
const SEGMENTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ResumptionToken(String);

impl ResumptionToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ResumptionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResumptionToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Request state needed to continue a paged harvest.
///
/// Present string fields are never empty; [`ResumptionState::new`] folds an empty
/// value into `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResumptionState {
    pub from: Option<Datestamp>,
    pub until: Option<Datestamp>,
    pub set_spec: Option<String>,
    pub metadata_prefix: Option<String>,
    pub offset: u64,
}

impl ResumptionState {
    pub fn new(
        from: Option<Datestamp>,
        until: Option<Datestamp>,
        set_spec: Option<&str>,
        metadata_prefix: Option<&str>,
        offset: u64,
    ) -> Self {
        Self {
            from,
            until,
            set_spec: non_empty(set_spec),
            metadata_prefix: non_empty(metadata_prefix),
            offset,
        }
    }

    pub fn encode(&self) -> ResumptionToken {
        let mut token = String::new();
        if let Some(from) = self.from {
            token.push_str(&from.to_string());
        }
        token.push(DELIMITER);
        if let Some(until) = self.until {
            token.push_str(&until.to_string());
        }
        token.push(DELIMITER);
        if let Some(set) = &self.set_spec {
            token.push_str(&urlencoding::encode(set));
        }
        token.push(DELIMITER);
        if let Some(prefix) = &self.metadata_prefix {
            token.push_str(&urlencoding::encode(prefix));
        }
        token.push(DELIMITER);
        token.push_str(&self.offset.to_string());
        ResumptionToken(token)
    }

    pub fn decode(token: &str) -> Result<Self, CatalogError> {
        let segments: Vec<&str> = token.split(DELIMITER).collect();
        if segments.len() != SEGMENTS {
            return Err(CatalogError::BadResumptionToken);
        }
        Ok(Self {
            from: decode_datestamp(segments[0])?,
            until: decode_datestamp(segments[1])?,
            set_spec: decode_text(segments[2])?,
            metadata_prefix: decode_text(segments[3])?,
            offset: decode_offset(segments[4])?,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_owned)
}

fn decode_datestamp(segment: &str) -> Result<Option<Datestamp>, CatalogError> {
    if segment.is_empty() {
        return Ok(None);
    }
    Datestamp::parse_canonical(segment)
        .map(Some)
        .ok_or(CatalogError::BadResumptionToken)
}

fn decode_text(segment: &str) -> Result<Option<String>, CatalogError> {
    if segment.is_empty() {
        return Ok(None);
    }
    let decoded = urlencoding::decode(segment).map_err(|_| CatalogError::BadResumptionToken)?;
    if decoded.is_empty() || urlencoding::encode(&decoded).as_ref() != segment {
        return Err(CatalogError::BadResumptionToken);
    }
    Ok(Some(decoded.into_owned()))
}

fn decode_offset(segment: &str) -> Result<u64, CatalogError> {
    let canonical = !segment.is_empty()
        && segment.bytes().all(|b| b.is_ascii_digit())
        && (segment == "0" || !segment.starts_with('0'));
    if !canonical {
        return Err(CatalogError::BadResumptionToken);
    }
    segment
        .parse::<u64>()
        .map_err(|_| CatalogError::BadResumptionToken)
}
