//! Coarse classification from extension and MIME type.
//!
//! Assigns the default folder prefix used when no rule overrides the
//! destination. Deliberately simple: the rule engine is where real routing
//! decisions live.

const IMAGE_EXTS: [&str; 4] = [".jpg", ".jpeg", ".png", ".gif"];
const SPREADSHEET_EXTS: [&str; 2] = [".csv", ".xlsx"];

/// Derive a category label from a lowercased extension and an optional MIME
/// type. Falls back to `"uncategorized"`.
pub fn classify(mime_type: Option<&str>, ext: &str) -> &'static str {
    let ext = ext.to_lowercase();
    let mime = mime_type.unwrap_or("").to_lowercase();

    if IMAGE_EXTS.contains(&ext.as_str()) || mime.starts_with("image/") {
        return "images";
    }
    if SPREADSHEET_EXTS.contains(&ext.as_str())
        || mime.contains("spreadsheet")
        || mime.contains("csv")
    {
        return "spreadsheets";
    }
    if ext == ".pdf" || mime == "application/pdf" {
        return "pdfs";
    }
    if ext == ".txt" || mime.starts_with("text/plain") {
        return "text";
    }
    "uncategorized"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_extension() {
        assert_eq!(classify(None, ".png"), "images");
        assert_eq!(classify(None, ".csv"), "spreadsheets");
        assert_eq!(classify(None, ".pdf"), "pdfs");
        assert_eq!(classify(None, ".txt"), "text");
        assert_eq!(classify(None, ".zip"), "uncategorized");
    }

    #[test]
    fn classifies_by_mime_when_extension_is_unhelpful() {
        assert_eq!(classify(Some("image/webp"), ""), "images");
        assert_eq!(classify(Some("text/csv"), ".dat"), "spreadsheets");
        assert_eq!(
            classify(
                Some("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
                ""
            ),
            "spreadsheets"
        );
        assert_eq!(classify(Some("application/pdf"), ""), "pdfs");
    }

    #[test]
    fn extension_case_is_normalized() {
        assert_eq!(classify(None, ".PNG"), "images");
    }

    #[test]
    fn missing_everything_is_uncategorized() {
        assert_eq!(classify(None, ""), "uncategorized");
    }
}
