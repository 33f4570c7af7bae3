use mediaport_core::{UploadError, UploaderConfig};
use std::path::Path;

/// Upload validator
///
/// Runs before a task is queued, so a rejected file never touches the network.
pub struct MediaValidator {
    max_file_size: u64,
    allowed_content_types: Vec<String>,
}

impl MediaValidator {
    pub fn new(max_file_size: u64, allowed_content_types: Vec<String>) -> Self {
        Self {
            max_file_size,
            allowed_content_types: allowed_content_types
                .into_iter()
                .map(|ct| ct.to_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &UploaderConfig) -> Self {
        Self::new(
            config.max_file_size_bytes,
            config.accepted_mime_types.clone(),
        )
    }

    /// Validate file size
    pub fn validate_file_size(&self, size: u64) -> Result<(), UploadError> {
        if size == 0 {
            return Err(UploadError::EmptyFile);
        }

        if size > self.max_file_size {
            return Err(UploadError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    /// Validate content type against the allowlist
    pub fn validate_content_type(&self, content_type: &str) -> Result<(), UploadError> {
        let normalized = content_type.to_lowercase();

        if !self
            .allowed_content_types
            .iter()
            .any(|ct| ct == &normalized)
        {
            return Err(UploadError::UnsupportedType {
                mime_type: content_type.to_string(),
                allowed: self.allowed_content_types.clone(),
            });
        }

        Ok(())
    }

    /// Reject a declared content type that contradicts a known file extension.
    /// Filenames without an extension, or with one we do not recognize, pass.
    pub fn validate_extension_content_type_match(
        &self,
        filename: &str,
        content_type: &str,
    ) -> Result<(), UploadError> {
        let Some(extension) = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
        else {
            return Ok(());
        };

        let expected: &[&str] = match extension.as_str() {
            "jpg" | "jpeg" => &["image/jpeg"],
            "png" => &["image/png"],
            "gif" => &["image/gif"],
            "webp" => &["image/webp"],
            "avif" => &["image/avif"],
            "bmp" => &["image/bmp"],
            "tif" | "tiff" => &["image/tiff"],
            _ => {
                tracing::debug!(
                    extension = %extension,
                    content_type = %content_type,
                    "Unknown extension, skipping content type cross-check"
                );
                return Ok(());
            }
        };

        let normalized = content_type.to_lowercase();
        if !expected.iter().any(|ct| *ct == normalized) {
            return Err(UploadError::ExtensionMismatch {
                mime_type: content_type.to_string(),
                extension,
            });
        }

        Ok(())
    }

    /// Size first, then type, then the extension cross-check.
    pub fn validate_all(
        &self,
        filename: &str,
        content_type: &str,
        file_size: u64,
    ) -> Result<(), UploadError> {
        self.validate_file_size(file_size)?;
        self.validate_content_type(content_type)?;
        self.validate_extension_content_type_match(filename, content_type)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediaport_core::constants::MIB;

    fn validator() -> MediaValidator {
        MediaValidator::new(
            50 * MIB,
            vec!["image/jpeg".to_string(), "image/PNG".to_string()],
        )
    }

    #[test]
    fn test_size_limits() {
        let v = validator();
        assert!(v.validate_file_size(50 * MIB).is_ok());
        assert!(matches!(
            v.validate_file_size(60 * MIB),
            Err(UploadError::FileTooLarge { size, max }) if size == 60 * MIB && max == 50 * MIB
        ));
        assert!(matches!(v.validate_file_size(0), Err(UploadError::EmptyFile)));
    }

    #[test]
    fn test_content_type_allowlist_is_case_insensitive() {
        let v = validator();
        assert!(v.validate_content_type("image/png").is_ok());
        assert!(v.validate_content_type("IMAGE/JPEG").is_ok());
        let err = v.validate_content_type("image/gif").unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_TYPE");
        assert!(err.to_string().contains("image/gif"));
    }

    #[test]
    fn test_extension_mismatch() {
        let v = validator();
        assert!(v
            .validate_extension_content_type_match("cat.jpg", "image/jpeg")
            .is_ok());
        assert!(v
            .validate_extension_content_type_match("CAT.JPEG", "image/jpeg")
            .is_ok());
        assert!(matches!(
            v.validate_extension_content_type_match("cat.png", "image/jpeg"),
            Err(UploadError::ExtensionMismatch { ref extension, .. }) if extension == "png"
        ));
    }

    #[test]
    fn test_unknown_or_missing_extension_passes_cross_check() {
        let v = validator();
        assert!(v
            .validate_extension_content_type_match("clipboard", "image/png")
            .is_ok());
        assert!(v
            .validate_extension_content_type_match("photo.raw", "image/jpeg")
            .is_ok());
    }

    #[test]
    fn test_validate_all_checks_size_first() {
        let v = validator();
        let err = v.validate_all("huge.gif", "image/gif", 60 * MIB).unwrap_err();
        assert!(matches!(err, UploadError::FileTooLarge { .. }));
        assert!(v.validate_all("ok.png", "image/png", 1024).is_ok());
    }
}
