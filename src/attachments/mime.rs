/// Content type detected from the leading bytes of an upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detected {
    pub mime: &'static str,
    /// Extension given to the stored file
    pub ext: &'static str,
}

const fn detected(mime: &'static str, ext: &'static str) -> Detected {
    Detected { mime, ext }
}

/// Sniff the content type of `bytes`. The client's filename and declared
/// content type are never consulted.
pub fn detect(bytes: &[u8]) -> Detected {
    let head = &bytes[..bytes.len().min(512)];

    if head.starts_with(b"%PDF-") {
        return detected("application/pdf", "pdf");
    }
    if head.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        return detected("image/png", "png");
    }
    if head.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return detected("image/jpeg", "jpeg");
    }
    if head.starts_with(b"GIF87a") || head.starts_with(b"GIF89a") {
        return detected("image/gif", "gif");
    }
    if head.len() >= 12 && &head[..4] == b"RIFF" && &head[8..12] == b"WEBP" {
        return detected("image/webp", "webp");
    }
    if head.starts_with(b"PK\x03\x04") {
        return detected("application/zip", "zip");
    }
    if !head.is_empty() && !head.contains(&0) && std::str::from_utf8(head).is_ok() {
        return detected("text/plain", "txt");
    }

    detected("application/octet-stream", "bin")
}
