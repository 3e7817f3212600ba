use std::{io, path::PathBuf};

/// The three screens of the wizard, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Step {
    /// User describes what feedback they want
    #[default]
    Prompt,
    /// User picks the video to analyze
    Upload,
    /// Analysis progress, then the returned feedback
    Result,
}

impl Step {
    /// 1-based position shown in the step badge
    pub fn number(&self) -> usize {
        match self {
            Step::Prompt => 1,
            Step::Upload => 2,
            Step::Result => 3,
        }
    }

    /// Heading for the step
    pub fn title(&self) -> &'static str {
        match self {
            Step::Prompt => "What should we look for?",
            Step::Upload => "Upload your video",
            Step::Result => "Analysis Results",
        }
    }
}

/// A video picked by the user
#[derive(Debug, Clone, PartialEq)]
pub struct FileHandle {
    /// File name as shown to the user and sent to the service
    pub name: String,
    /// Size on disk in bytes
    pub size_bytes: u64,
    /// MIME type, derived from the extension when read from disk
    pub mime_type: String,
    /// Where the bytes live
    pub path: PathBuf,
}

impl FileHandle {
    pub fn new(name: impl Into<String>, size_bytes: u64, mime_type: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            path: PathBuf::from(&name),
            name,
            size_bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Builds a handle from a file on disk, reading its size from metadata.
    pub fn from_path(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let metadata = std::fs::metadata(&path)?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a file", path.display()),
            ));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = mime_from_extension(&path).to_string();
        Ok(Self {
            name,
            size_bytes: metadata.len(),
            mime_type,
            path,
        })
    }
}

/// Maps a file extension to the MIME type a browser would report for it.
fn mime_from_extension(path: &std::path::Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" | "qt" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "wmv" => "video/x-ms-wmv",
        "flv" => "video/x-flv",
        "mpg" | "mpeg" => "video/mpeg",
        _ => "application/octet-stream",
    }
}

/// Outcome of checking a candidate upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    /// Whether the file may be uploaded
    pub valid: bool,
    /// Message to show when it may not
    pub error: Option<String>,
}

/// What came back from one analysis call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOutcome {
    pub success: bool,
    pub result_text: Option<String>,
    pub error_message: Option<String>,
}

impl AnalysisOutcome {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            success: true,
            result_text: Some(text.into()),
            error_message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            result_text: None,
            error_message: Some(message.into()),
        }
    }
}

/// Everything the wizard screens render from
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WizardState {
    /// Screen currently shown
    pub step: Step,
    /// Analysis prompt entered on the first screen
    pub prompt: String,
    /// Accepted video; always present on the result screen
    pub video_file: Option<FileHandle>,
    /// Feedback text, or `"Error: ..."` when the run failed
    pub result: Option<String>,
    /// An analysis run is in flight
    pub is_processing: bool,
    /// Progress percentage (0.0 to 100.0) of the current run
    pub progress: f32,
    /// Inline validation message for the current screen
    pub error: Option<String>,
}
