//! File-type classification and credit awards.

use serde::Serialize;

/// Coarse file category derived from the file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Ppt,
    Doc,
    Image,
    Other,
}

/// Extension table in match priority order. First match wins.
const EXTENSIONS: &[(FileType, &[&str])] = &[
    (FileType::Pdf, &[".pdf"]),
    (FileType::Ppt, &[".ppt", ".pptx"]),
    (FileType::Doc, &[".doc", ".docx"]),
    (FileType::Image, &[".jpg", ".jpeg", ".png"]),
];

impl FileType {
    /// Classify by case-insensitive filename suffix.
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        EXTENSIONS
            .iter()
            .find(|(_, suffixes)| suffixes.iter().any(|s| lower.ends_with(s)))
            .map(|(file_type, _)| *file_type)
            .unwrap_or(FileType::Other)
    }

    /// Credits awarded for uploading a file of this type.
    pub fn credits(self) -> i64 {
        match self {
            FileType::Pdf => 3,
            FileType::Ppt | FileType::Doc => 2,
            FileType::Image => 1,
            FileType::Other => 0,
        }
    }

    pub fn is_supported(self) -> bool {
        self != FileType::Other
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileType::Pdf => "pdf",
            FileType::Ppt => "ppt",
            FileType::Doc => "doc",
            FileType::Image => "image",
            FileType::Other => "other",
        }
    }
}
