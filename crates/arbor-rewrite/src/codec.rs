//! Charset decoding and XML normalization of resource content.

use std::borrow::Cow;

use arbor_repo::ContentKind;
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE};
use quick_xml::events::Event;
use quick_xml::{Reader, Writer};
use tracing::{debug, warn};

use crate::error::{RewriteError, RewriteResult};

/// Decodes and encodes content bytes for text rewriting.
#[derive(Clone, Copy, Debug)]
pub struct ContentCodec {
    default: &'static Encoding,
}

impl ContentCodec {
    /// A codec falling back to the encoding labelled `default_label`.
    ///
    /// Fails if the label is unknown: the fallback itself must resolve.
    pub fn new(default_label: &str) -> RewriteResult<Self> {
        let default = Encoding::for_label(default_label.trim().as_bytes())
            .ok_or_else(|| RewriteError::UnknownEncoding(default_label.to_string()))?;
        Ok(Self { default })
    }

    pub fn default_encoding(&self) -> &'static Encoding {
        self.default
    }

    /// The encoding for a declared label. Missing or unsupported labels
    /// resolve to the default.
    pub fn resolve(&self, label: Option<&str>) -> &'static Encoding {
        let Some(label) = label.map(str::trim).filter(|l| !l.is_empty()) else {
            return self.default;
        };
        Encoding::for_label(label.as_bytes()).unwrap_or_else(|| {
            warn!(
                label,
                fallback = self.default.name(),
                "unsupported content encoding, using default"
            );
            self.default
        })
    }

    /// Decode `bytes`. XML content is additionally parsed and re-serialized;
    /// if parsing fails the plainly decoded text is returned.
    pub fn decode<'a>(
        &self,
        bytes: &'a [u8],
        encoding: &'static Encoding,
        kind: ContentKind,
        path: &str,
    ) -> RewriteResult<Cow<'a, str>> {
        let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
        if had_errors {
            return Err(RewriteError::Malformed {
                path: path.to_string(),
                encoding: encoding.name().to_string(),
            });
        }
        if kind != ContentKind::Xml {
            return Ok(text);
        }
        match normalize_xml(&text) {
            Ok(normalized) => Ok(Cow::Owned(normalized)),
            Err(error) => {
                debug!(path, error = %error, "xml parse failed, using raw text");
                Ok(text)
            }
        }
    }

    /// Encode `text` in exactly `encoding`.
    ///
    /// `encoding_rs` only encodes to ASCII-compatible targets and maps
    /// UTF-16 to UTF-8, so UTF-16 is written here unit by unit.
    pub fn encode(&self, text: &str, encoding: &'static Encoding) -> Vec<u8> {
        if encoding == UTF_16LE {
            return text.encode_utf16().flat_map(u16::to_le_bytes).collect();
        }
        if encoding == UTF_16BE {
            return text.encode_utf16().flat_map(u16::to_be_bytes).collect();
        }
        let (bytes, _, _) = encoding.encode(text);
        bytes.into_owned()
    }
}

/// Parse `text` as XML and write it back event by event.
fn normalize_xml(text: &str) -> Result<String, String> {
    let mut reader = Reader::from_str(text);
    let mut writer = Writer::new(Vec::with_capacity(text.len()));
    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Eof => break,
            event => writer.write_event(event).map_err(|e| e.to_string())?,
        }
    }
    String::from_utf8(writer.into_inner()).map_err(|e| e.to_string())
}
