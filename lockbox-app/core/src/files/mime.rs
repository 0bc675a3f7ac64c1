use serde::{Deserialize, Serialize};

/// Coarse document category, resolved once from the MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Image,
    Document,
    Spreadsheet,
    Text,
    Unknown,
}

/// Category plus the extension used for scratch files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileType {
    pub kind: DocumentKind,
    /// Includes the leading dot.
    pub extension: &'static str,
}

impl FileType {
    const UNKNOWN: FileType = FileType {
        kind: DocumentKind::Unknown,
        extension: ".bin",
    };

    /// Classify a MIME type. Parameters (`; charset=...`) and case are
    /// ignored; anything unrecognized is `Unknown` / `.bin`.
    pub fn from_mime(mime: &str) -> FileType {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        let (kind, extension) = match essence.as_str() {
            "application/pdf" => (DocumentKind::Document, ".pdf"),
            "image/jpeg" | "image/jpg" => (DocumentKind::Image, ".jpg"),
            "image/png" => (DocumentKind::Image, ".png"),
            "image/gif" => (DocumentKind::Image, ".gif"),
            "image/webp" => (DocumentKind::Image, ".webp"),
            "application/msword" => (DocumentKind::Document, ".doc"),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                (DocumentKind::Document, ".docx")
            }
            "application/vnd.ms-excel" => (DocumentKind::Spreadsheet, ".xls"),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => {
                (DocumentKind::Spreadsheet, ".xlsx")
            }
            "text/plain" => (DocumentKind::Text, ".txt"),
            _ => return Self::UNKNOWN,
        };
        FileType { kind, extension }
    }
}

/// Human-readable size with binary units, e.g. `9.77 KB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let fixed = format!("{:.2}", value);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}
