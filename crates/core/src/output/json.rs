use super::FormatError;
use crate::models::ScanResult;

/// Serialize a ScanResult to pretty-printed JSON
pub fn to_json(result: &ScanResult) -> Result<String, FormatError> {
    serde_json::to_string_pretty(result).map_err(FormatError::from)
}

/// Serialize a ScanResult to single-line JSON
pub fn to_json_compact(result: &ScanResult) -> Result<String, FormatError> {
    serde_json::to_string(result).map_err(FormatError::from)
}
