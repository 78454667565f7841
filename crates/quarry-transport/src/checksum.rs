//! Checksum extraction from response metadata.
//!
//! Some repository servers embed content checksums in response headers; the
//! transporter runs every configured extractor over each GET response and
//! records whatever they find in the task's receipt. Extraction never fails
//! a transfer, but an extractor may ask for one retry without its request
//! hints when a server mishandles them.

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::header::{HeaderMap, ETAG};

/// What an extractor made of a response.
pub enum ExtractOutcome {
    /// Algorithm name (`SHA-1`, `MD5`, ...) to hex digest.
    Checksums(HashMap<String, String>),
    /// Nothing usable in this response.
    None,
    /// The server mangled the response because of this extractor's request
    /// hints; retry once without them.
    Retry,
}

pub trait ChecksumExtractor: Send + Sync {
    /// Attach extractor-specific request headers. `hints` is false on a
    /// retry requested through [`ExtractOutcome::Retry`].
    fn prepare(&self, request: reqwest::RequestBuilder, hints: bool) -> reqwest::RequestBuilder {
        let _ = hints;
        request
    }

    fn extract(&self, headers: &HeaderMap) -> ExtractOutcome;
}

/// Reads the `SHA1{...}` value some repository managers embed in the ETag,
/// e.g. `ETag: "{SHA1{0123abcd...}}"`.
pub struct EtagChecksumExtractor;

impl ChecksumExtractor for EtagChecksumExtractor {
    fn extract(&self, headers: &HeaderMap) -> ExtractOutcome {
        let Some(etag) = headers.get(ETAG).and_then(|v| v.to_str().ok()) else {
            return ExtractOutcome::None;
        };
        let trimmed = etag.trim_matches('"');
        let Some(inner) = trimmed
            .strip_prefix("{SHA1{")
            .and_then(|s| s.strip_suffix("}}"))
        else {
            return ExtractOutcome::None;
        };
        if inner.is_empty() || !inner.chars().all(|c| c.is_ascii_hexdigit()) {
            return ExtractOutcome::None;
        }
        let mut checksums = HashMap::new();
        checksums.insert("SHA-1".to_string(), inner.to_ascii_lowercase());
        ExtractOutcome::Checksums(checksums)
    }
}

/// Reads `x-checksum-sha1` / `x-checksum-md5` headers.
pub struct HeaderChecksumExtractor;

impl ChecksumExtractor for HeaderChecksumExtractor {
    fn extract(&self, headers: &HeaderMap) -> ExtractOutcome {
        let mut checksums = HashMap::new();
        for (header, algorithm) in [("x-checksum-sha1", "SHA-1"), ("x-checksum-md5", "MD5")] {
            if let Some(value) = headers.get(header).and_then(|v| v.to_str().ok()) {
                let value = value.trim();
                if !value.is_empty() {
                    checksums.insert(algorithm.to_string(), value.to_ascii_lowercase());
                }
            }
        }
        if checksums.is_empty() {
            ExtractOutcome::None
        } else {
            ExtractOutcome::Checksums(checksums)
        }
    }
}

/// The extractor set a transporter uses unless configured otherwise.
pub fn default_extractors() -> Vec<Arc<dyn ChecksumExtractor>> {
    vec![
        Arc::new(EtagChecksumExtractor),
        Arc::new(HeaderChecksumExtractor),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                reqwest::header::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn etag_sha1_extraction() {
        let map = headers(&[("etag", "\"{SHA1{0123456789ABCDEF0123456789abcdef01234567}}\"")]);
        match EtagChecksumExtractor.extract(&map) {
            ExtractOutcome::Checksums(sums) => {
                assert_eq!(
                    sums.get("SHA-1").map(String::as_str),
                    Some("0123456789abcdef0123456789abcdef01234567")
                );
            }
            _ => panic!("expected checksums"),
        }
    }

    #[test]
    fn plain_etag_is_ignored() {
        let map = headers(&[("etag", "\"5eb63bbb\"")]);
        assert!(matches!(
            EtagChecksumExtractor.extract(&map),
            ExtractOutcome::None
        ));
    }

    #[test]
    fn header_checksums_extraction() {
        let map = headers(&[
            ("x-checksum-sha1", "2AAE6C35C94FCFB415DBE95F408B9CE91EE846ED"),
            ("x-checksum-md5", "5eb63bbbe01eeed093cb22bb8f5acdc3"),
        ]);
        match HeaderChecksumExtractor.extract(&map) {
            ExtractOutcome::Checksums(sums) => {
                assert_eq!(sums.len(), 2);
                assert_eq!(
                    sums.get("SHA-1").map(String::as_str),
                    Some("2aae6c35c94fcfb415dbe95f408b9ce91ee846ed")
                );
            }
            _ => panic!("expected checksums"),
        }
    }

    #[test]
    fn absent_headers_extract_nothing() {
        let map = HeaderMap::new();
        assert!(matches!(
            HeaderChecksumExtractor.extract(&map),
            ExtractOutcome::None
        ));
    }
}
