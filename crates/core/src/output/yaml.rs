use super::FormatError;
use crate::models::ScanResult;

/// Serialize a ScanResult to YAML
pub fn to_yaml(result: &ScanResult) -> Result<String, FormatError> {
    serde_yaml::to_string(result).map_err(FormatError::from)
}
