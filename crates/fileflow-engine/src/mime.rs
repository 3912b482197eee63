//! MIME type detection for the inspect stage.
//!
//! Detection order: magic numbers from the object's header bytes, then the
//! content type stored on the object (unless it is the useless
//! octet-stream default), then a static extension map, then the final
//! octet-stream fallback.

/// How many header bytes the inspect stage should fetch for sniffing.
pub const SNIFF_LEN: usize = 512;

const EXTENSION_MAP: [(&str, &str); 16] = [
    (".pdf", "application/pdf"),
    (".txt", "text/plain"),
    (".csv", "text/csv"),
    (".json", "application/json"),
    (".xml", "application/xml"),
    (".doc", "application/msword"),
    (
        ".docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    (".xls", "application/vnd.ms-excel"),
    (
        ".xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    (".ppt", "application/vnd.ms-powerpoint"),
    (
        ".pptx",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    ),
    (".png", "image/png"),
    (".jpg", "image/jpeg"),
    (".jpeg", "image/jpeg"),
    (".gif", "image/gif"),
    (".zip", "application/zip"),
];

/// Detect a MIME type from header bytes, the stored content type, and the
/// file extension, in that order.
pub fn detect_mime_type(header: &[u8], stored_content_type: Option<&str>, ext: &str) -> String {
    if let Some(mime) = sniff_magic(header) {
        tracing::debug!(mime, source = "magic", "MIME detected");
        return mime.to_string();
    }

    if let Some(stored) = stored_content_type {
        if !stored.is_empty() && stored != "application/octet-stream" {
            tracing::debug!(mime = stored, source = "stored", "MIME detected");
            return stored.to_string();
        }
    }

    let ext = ext.to_lowercase();
    if let Some((_, mime)) = EXTENSION_MAP.iter().find(|(e, _)| *e == ext) {
        tracing::debug!(mime, source = "extension", "MIME detected");
        return mime.to_string();
    }

    "application/octet-stream".to_string()
}

/// Detect a MIME type from well-known magic numbers.
fn sniff_magic(data: &[u8]) -> Option<&'static str> {
    if data.len() < 4 {
        return None;
    }

    // JPEG: FF D8 FF
    if data[0] == 0xFF && data[1] == 0xD8 && data[2] == 0xFF {
        return Some("image/jpeg");
    }

    // PNG: 89 50 4E 47
    if data[0] == 0x89 && data[1] == 0x50 && data[2] == 0x4E && data[3] == 0x47 {
        return Some("image/png");
    }

    // GIF: 47 49 46
    if data[0] == 0x47 && data[1] == 0x49 && data[2] == 0x46 {
        return Some("image/gif");
    }

    // PDF: 25 50 44 46 ("%PDF")
    if data.starts_with(b"%PDF") {
        return Some("application/pdf");
    }

    // ZIP family (also docx/xlsx/pptx containers): 50 4B 03 04
    if data[0] == 0x50 && data[1] == 0x4B && data[2] == 0x03 && data[3] == 0x04 {
        return Some("application/zip");
    }

    // GZIP: 1F 8B
    if data[0] == 0x1F && data[1] == 0x8B {
        return Some("application/gzip");
    }

    // WebP: RIFF .... WEBP
    if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        return Some("image/webp");
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_bytes_win_over_everything() {
        let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(
            detect_mime_type(&png, Some("text/plain"), ".txt"),
            "image/png"
        );
    }

    #[test]
    fn pdf_signature_is_detected() {
        assert_eq!(detect_mime_type(b"%PDF-1.7 rest", None, ""), "application/pdf");
    }

    #[test]
    fn stored_content_type_is_second_choice() {
        assert_eq!(
            detect_mime_type(b"hello world", Some("text/csv"), ".bin"),
            "text/csv"
        );
    }

    #[test]
    fn octet_stream_stored_type_is_skipped() {
        assert_eq!(
            detect_mime_type(b"hello world", Some("application/octet-stream"), ".csv"),
            "text/csv"
        );
    }

    #[test]
    fn extension_fallback_applies() {
        assert_eq!(detect_mime_type(b"a,b,c\n1,2,3", None, ".csv"), "text/csv");
        assert_eq!(detect_mime_type(b"some text", None, ".XLSX"),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet");
    }

    #[test]
    fn final_fallback_is_octet_stream() {
        assert_eq!(
            detect_mime_type(b"....", None, ".weird"),
            "application/octet-stream"
        );
    }

    #[test]
    fn short_header_does_not_panic() {
        assert_eq!(detect_mime_type(&[0xFF], None, ""), "application/octet-stream");
        assert_eq!(detect_mime_type(&[], None, ""), "application/octet-stream");
    }
}
