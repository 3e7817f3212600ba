//! Upload checks for user-selected videos.

use crate::error::ValidationError;
use crate::model::{FileHandle, ValidationResult};

pub const BYTES_PER_KB: u64 = 1024;
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// Largest accepted upload (50 MB)
pub const MAX_FILE_SIZE: u64 = 50 * BYTES_PER_MB;

/// MIME types the analysis service accepts
pub const ALLOWED_MIME_TYPES: [&str; 3] = ["video/mp4", "video/quicktime", "video/webm"];

/// Extensions offered by the file picker
pub fn accepted_extensions() -> &'static [&'static str] {
    &["mp4", "mov", "webm"]
}

/// Typed form of [`validate`]. Size is checked before type.
pub fn check(file: &FileHandle) -> Result<(), ValidationError> {
    if file.size_bytes > MAX_FILE_SIZE {
        return Err(ValidationError::FileTooLarge {
            size_bytes: file.size_bytes,
        });
    }
    if !ALLOWED_MIME_TYPES.contains(&file.mime_type.as_str()) {
        return Err(ValidationError::UnsupportedType {
            mime_type: file.mime_type.clone(),
        });
    }
    Ok(())
}

pub fn validate(file: &FileHandle) -> ValidationResult {
    match check(file) {
        Ok(()) => ValidationResult {
            valid: true,
            error: None,
        },
        Err(e) => ValidationResult {
            valid: false,
            error: Some(e.to_string()),
        },
    }
}

/// Human-readable size: bytes, then KB, then MB with two decimals.
pub fn format_size(bytes: u64) -> String {
    if bytes < BYTES_PER_KB {
        format!("{} bytes", bytes)
    } else if bytes < BYTES_PER_MB {
        format!("{:.2} KB", hundredths(bytes as f64 / BYTES_PER_KB as f64))
    } else {
        format!("{:.2} MB", hundredths(bytes as f64 / BYTES_PER_MB as f64))
    }
}

/// Rounds to two decimals with halves going up (`{:.2}` alone rounds them to even).
pub(crate) fn hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(size_bytes: u64, mime: &str) -> FileHandle {
        FileHandle::new("clip.mp4", size_bytes, mime)
    }

    #[test]
    fn accepts_every_allowed_type_at_the_limit() {
        for mime in ALLOWED_MIME_TYPES {
            let result = validate(&video(MAX_FILE_SIZE, mime));
            assert!(result.valid, "{mime} should be accepted");
            assert_eq!(result.error, None);
        }
    }

    #[test]
    fn rejects_oversized_files_regardless_of_type() {
        for mime in ["video/mp4", "video/webm", "image/png", ""] {
            let result = validate(&video(MAX_FILE_SIZE + 1, mime));
            assert!(!result.valid);
            let error = result.error.unwrap();
            assert!(error.starts_with("File size exceeds the maximum limit of 50MB"));
        }
    }

    #[test]
    fn oversized_message_shows_actual_megabytes() {
        let result = validate(&video(60 * BYTES_PER_MB, "video/mp4"));
        assert_eq!(
            result.error.as_deref(),
            Some("File size exceeds the maximum limit of 50MB. Current size: 60.00MB")
        );
    }

    #[test]
    fn rejects_disallowed_types_even_when_small() {
        let result = validate(&video(1024, "video/x-matroska"));
        assert!(!result.valid);
        assert_eq!(
            result.error.as_deref(),
            Some(
                "Unsupported file format. Please upload MP4, MOV, or WebM files. Current type: video/x-matroska"
            )
        );
    }

    #[test]
    fn check_reports_size_before_type() {
        let err = check(&video(MAX_FILE_SIZE * 2, "text/plain")).unwrap_err();
        assert!(matches!(err, ValidationError::FileTooLarge { .. }));
    }

    #[test]
    fn format_size_picks_unit() {
        assert_eq!(format_size(0), "0 bytes");
        assert_eq!(format_size(500), "500 bytes");
        assert_eq!(format_size(1023), "1023 bytes");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
        // Exact halves round up
        assert_eq!(format_size(1152), "1.13 KB");
        assert_eq!(format_size(1_179_648), "1.13 MB");
        assert_eq!(format_size(MAX_FILE_SIZE), "50.00 MB");
    }
}
