use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Xlsx,
    Xls,
    Csv,
    Json,
}

impl FileType {
    /// Classifies a filename by its final extension, case-insensitively.
    /// Returns `None` for a missing or unrecognized extension.
    pub fn detect(file_name: &str) -> Option<FileType> {
        let (_, ext) = file_name.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "xlsx" => Some(FileType::Xlsx),
            "xls" => Some(FileType::Xls),
            "csv" => Some(FileType::Csv),
            "json" => Some(FileType::Json),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Xlsx => "xlsx",
            FileType::Xls => "xls",
            FileType::Csv => "csv",
            FileType::Json => "json",
        }
    }

    pub fn is_workbook(&self) -> bool {
        matches!(self, FileType::Xlsx | FileType::Xls)
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
