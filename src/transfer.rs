//! File-level import and export: file-type checks, export naming and the
//! summary reported back to the user.

use chrono::{DateTime, NaiveDate, Utc};

use crate::codec;
use crate::domain::{ExportFormat, ImportFormat, SurveyResult, Waypoint, WaypointDraft};

/// A rendered export, ready to be written or downloaded
#[derive(Debug, Clone, PartialEq)]
pub struct ExportFile {
    pub file_name: String,
    pub mime_type: &'static str,
    pub contents: String,
}

/// `waypoints_export_<YYYY-MM-DD>.<ext>`
pub fn export_file_name(format: ExportFormat, date: NaiveDate) -> String {
    format!("waypoints_export_{}.{}", date.format("%Y-%m-%d"), format.extension())
}

pub fn export(format: ExportFormat, waypoints: &[Waypoint], now: DateTime<Utc>) -> ExportFile {
    ExportFile {
        file_name: export_file_name(format, now.date_naive()),
        mime_type: format.mime_type(),
        contents: codec::encode(format, waypoints, now),
    }
}

/// Decoded drafts of an import file
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedFile {
    pub format: ImportFormat,
    pub drafts: Vec<WaypointDraft>,
}

/// Pick the decoder from the file name, then decode. The file type is
/// checked before any parsing.
pub fn import(file_name: &str, contents: &str) -> SurveyResult<ImportedFile> {
    let format = ImportFormat::from_file_name(file_name)?;
    let drafts = codec::decode(format, contents)?;
    tracing::debug!(file = file_name, %format, count = drafts.len(), "decoded import file");
    Ok(ImportedFile { format, drafts })
}
