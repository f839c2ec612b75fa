//! In-memory attachment encoding.
//!
//! Attachments never touch persistent storage: the caller hands over a byte
//! buffer (plus an optional filename hint), and [`encode`] produces the
//! `(mime type, base64 payload)` pair providers inline into their request
//! bodies. Encoding is a pure function of its inputs, so the same bytes and
//! hint always yield the same payload.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// Filename assumed when the caller provides none.
pub const DEFAULT_FILENAME: &str = "upload.bin";

/// MIME type used when neither the filename nor the content identifies one.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// How many leading bytes [`sniff_mime`] inspects.
const SNIFF_WINDOW: usize = 512;

/// Raw attachment handed in by the caller.
#[derive(Debug, Clone, Default)]
pub struct FileAttachment {
    /// File content, owned by the caller until the request body is built.
    pub bytes: Vec<u8>,
    /// Optional filename hint driving MIME inference and provider labelling.
    pub filename: Option<String>,
}

impl FileAttachment {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            filename: None,
        }
    }

    /// Attaches a filename hint such as `report.pdf`.
    pub fn with_filename<T: Into<String>>(mut self, filename: T) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

/// Attachment in the form providers inline into request bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedAttachment {
    /// Inferred MIME type.
    pub mime_type: String,
    /// Base64-encoded content.
    pub data: String,
    /// Filename carried through for provider-side labelling.
    pub filename: String,
}

/// Encodes an attachment for inlining.
///
/// MIME inference precedence:
/// 1. the filename hint's extension, via the standard extension table;
/// 2. known binary signatures in the first 512 bytes of the buffer;
/// 3. `application/octet-stream`.
///
/// A filename with a recognized extension wins even when the content bytes
/// disagree, so a `.txt`-named buffer full of PNG data encodes as
/// `text/plain`. An empty buffer encodes to a valid empty payload.
///
/// # Examples
///
/// ```
/// # use naisho::attachment::{encode, FileAttachment};
/// let encoded = encode(&FileAttachment::new(b"hello".to_vec()).with_filename("note.txt"));
/// assert_eq!(encoded.mime_type, "text/plain");
/// assert_eq!(encoded.data, "aGVsbG8=");
/// ```
pub fn encode(attachment: &FileAttachment) -> EncodedAttachment {
    let mime_type = attachment
        .filename
        .as_deref()
        .and_then(mime_from_filename)
        .or_else(|| sniff_mime(&attachment.bytes).map(str::to_string))
        .unwrap_or_else(|| OCTET_STREAM.to_string());

    EncodedAttachment {
        mime_type,
        data: STANDARD.encode(&attachment.bytes),
        filename: attachment
            .filename
            .clone()
            .unwrap_or_else(|| DEFAULT_FILENAME.to_string()),
    }
}

/// Resolves a MIME type from the filename extension, if recognized.
fn mime_from_filename(filename: &str) -> Option<String> {
    mime_guess::from_path(filename)
        .first()
        .map(|mime| mime.essence_str().to_string())
}

/// Matches the buffer prefix against known binary signatures.
///
/// Signatures anchored at offset zero except WAV, which is `RIFF` followed
/// by `WAVE` at offset 8.
fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    let head = &bytes[..bytes.len().min(SNIFF_WINDOW)];

    const SIGNATURES: &[(&[u8], &str)] = &[
        (b"%PDF", "application/pdf"),
        (b"\x89PNG\r\n\x1a\n", "image/png"),
        (b"\xff\xd8\xff", "image/jpeg"),
        (b"GIF87a", "image/gif"),
        (b"GIF89a", "image/gif"),
        (b"BM", "image/bmp"),
        (b"PK\x03\x04", "application/zip"),
        (b"PK\x05\x06", "application/zip"),
        (b"PK\x07\x08", "application/zip"),
        (b"\x1f\x8b", "application/gzip"),
        (b"<?xml", "application/xml"),
        (b"\xef\xbb\xbf", "text/plain"),
    ];

    for (signature, mime) in SIGNATURES {
        if head.starts_with(signature) {
            return Some(mime);
        }
    }

    if head.starts_with(b"RIFF") && head.len() >= 12 && &head[8..12] == b"WAVE" {
        return Some("audio/wav");
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_extension_resolves_mime() {
        let encoded = encode(&FileAttachment::new(b"hello.txt".to_vec()).with_filename("note.txt"));
        assert_eq!(encoded.mime_type, "text/plain");
        assert_eq!(encoded.filename, "note.txt");
    }

    #[test]
    fn filename_hint_beats_magic_bytes() {
        // PNG content named .txt must infer text/plain.
        let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
        bytes.extend_from_slice(&[0u8; 16]);
        let encoded = encode(&FileAttachment::new(bytes).with_filename("notes.txt"));
        assert_eq!(encoded.mime_type, "text/plain");
    }

    #[test]
    fn pdf_detected_from_magic_bytes_without_filename() {
        let encoded = encode(&FileAttachment::new(b"%PDF-1.4\nfake".to_vec()));
        assert_eq!(encoded.mime_type, "application/pdf");
        assert_eq!(encoded.filename, DEFAULT_FILENAME);
    }

    #[test]
    fn unrecognized_extension_falls_through_to_sniffing() {
        let encoded = encode(&FileAttachment::new(b"%PDF-1.7".to_vec()).with_filename("document"));
        assert_eq!(encoded.mime_type, "application/pdf");
        assert_eq!(encoded.filename, "document");
    }

    #[test]
    fn wav_signature_checks_the_riff_form_type() {
        let mut wav = b"RIFF".to_vec();
        wav.extend_from_slice(&[0, 0, 0, 0]);
        wav.extend_from_slice(b"WAVEfmt ");
        assert_eq!(encode(&FileAttachment::new(wav)).mime_type, "audio/wav");

        let mut avi = b"RIFF".to_vec();
        avi.extend_from_slice(&[0, 0, 0, 0]);
        avi.extend_from_slice(b"AVI LIST");
        assert_eq!(encode(&FileAttachment::new(avi)).mime_type, OCTET_STREAM);
    }

    #[test]
    fn unknown_bytes_fall_back_to_octet_stream() {
        let encoded = encode(&FileAttachment::new(vec![0x00, 0x01, 0x02]));
        assert_eq!(encoded.mime_type, OCTET_STREAM);
    }

    #[test]
    fn empty_buffer_encodes_to_empty_payload() {
        let encoded = encode(&FileAttachment::new(Vec::new()));
        assert_eq!(encoded.data, "");
        assert_eq!(encoded.mime_type, OCTET_STREAM);
    }

    #[test]
    fn encoding_is_deterministic() {
        let attachment = FileAttachment::new(b"same bytes".to_vec()).with_filename("a.json");
        assert_eq!(encode(&attachment), encode(&attachment));
    }
}
