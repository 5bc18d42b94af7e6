use crate::models::AnalysisResult;
use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;
use std::sync::Arc;

/// Image formats accepted by the upload surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageKind {
    /// Extensions offered by the file dialog filter
    pub const EXTENSIONS: [&'static str; 5] = ["jpeg", "jpg", "png", "gif", "webp"];

    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageKind::Jpeg),
            "png" => Some(ImageKind::Png),
            "gif" => Some(ImageKind::Gif),
            "webp" => Some(ImageKind::Webp),
            _ => None,
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
            ImageKind::Gif => "image/gif",
            ImageKind::Webp => "image/webp",
        }
    }
}

/// A chart image chosen by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub path: Utf8PathBuf,
    pub name: String,
    pub kind: ImageKind,
}

impl SelectedFile {
    /// Build a descriptor for `path`, or `None` when the extension is not an allowed image type.
    pub fn from_path(path: impl AsRef<Utf8Path>) -> Option<Self> {
        let path = path.as_ref();
        let kind = ImageKind::from_extension(path.extension()?)?;
        let name = path.file_name()?.to_string();

        Some(Self {
            path: path.to_path_buf(),
            name,
            kind,
        })
    }

    pub fn mime_type(&self) -> &'static str {
        self.kind.mime_type()
    }
}

/// Self-contained inline representation of the selected image (`data:` URI).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub data_uri: Arc<str>,
}

impl Preview {
    pub fn new(data_uri: impl Into<Arc<str>>) -> Self {
        Self {
            data_uri: data_uri.into(),
        }
    }
}

/// The five mutually exclusive phases of the upload/analyze session.
///
/// Every combination of file, preview, result and error that the window can
/// observe is one of these variants; nothing else is representable.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,

    /// A file is chosen; its preview may still be loading
    Previewing {
        file: SelectedFile,
        preview: Option<Preview>,
    },

    /// The analysis request is in flight
    Analyzing {
        file: SelectedFile,
        preview: Option<Preview>,
    },

    Result {
        file: SelectedFile,
        preview: Option<Preview>,
        data: Arc<AnalysisResult>,
    },

    Error {
        file: Option<SelectedFile>,
        preview: Option<Preview>,
        message: String,
    },
}

/// Discriminant of [`SessionPhase`] without the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    Idle,
    Previewing,
    Analyzing,
    Result,
    Error,
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PhaseKind::Idle => "idle",
            PhaseKind::Previewing => "previewing",
            PhaseKind::Analyzing => "analyzing",
            PhaseKind::Result => "result",
            PhaseKind::Error => "error",
        };
        f.write_str(name)
    }
}

impl SessionPhase {
    pub fn kind(&self) -> PhaseKind {
        match self {
            SessionPhase::Idle => PhaseKind::Idle,
            SessionPhase::Previewing { .. } => PhaseKind::Previewing,
            SessionPhase::Analyzing { .. } => PhaseKind::Analyzing,
            SessionPhase::Result { .. } => PhaseKind::Result,
            SessionPhase::Error { .. } => PhaseKind::Error,
        }
    }

    pub fn file(&self) -> Option<&SelectedFile> {
        match self {
            SessionPhase::Idle => None,
            SessionPhase::Previewing { file, .. }
            | SessionPhase::Analyzing { file, .. }
            | SessionPhase::Result { file, .. } => Some(file),
            SessionPhase::Error { file, .. } => file.as_ref(),
        }
    }

    pub fn preview(&self) -> Option<&Preview> {
        match self {
            SessionPhase::Idle => None,
            SessionPhase::Previewing { preview, .. }
            | SessionPhase::Analyzing { preview, .. }
            | SessionPhase::Result { preview, .. }
            | SessionPhase::Error { preview, .. } => preview.as_ref(),
        }
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            SessionPhase::Result { data, .. } => Some(data.as_ref()),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            SessionPhase::Error { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn is_analyzing(&self) -> bool {
        matches!(self, SessionPhase::Analyzing { .. })
    }

    /// Mutable access to the preview slot, when the phase has one
    pub(crate) fn preview_slot(&mut self) -> Option<&mut Option<Preview>> {
        match self {
            SessionPhase::Idle => None,
            SessionPhase::Previewing { preview, .. }
            | SessionPhase::Analyzing { preview, .. }
            | SessionPhase::Result { preview, .. }
            | SessionPhase::Error { preview, .. } => Some(preview),
        }
    }
}

/// Process-local session state owned by [`crate::state::SessionManager`].
///
/// `selection` and `request` are generation counters: a preview read or an
/// analysis outcome is applied only while its generation is still current.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub(crate) selection: u64,
    pub(crate) request: u64,
}

impl SessionState {
    pub fn kind(&self) -> PhaseKind {
        self.phase.kind()
    }

    pub fn file(&self) -> Option<&SelectedFile> {
        self.phase.file()
    }

    pub fn preview(&self) -> Option<&Preview> {
        self.phase.preview()
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.phase.result()
    }

    pub fn error(&self) -> Option<&str> {
        self.phase.error()
    }

    pub fn is_analyzing(&self) -> bool {
        self.phase.is_analyzing()
    }

    /// Whether the session holds nothing: no file, preview, result or error
    pub fn is_cleared(&self) -> bool {
        self.file().is_none()
            && self.preview().is_none()
            && self.result().is_none()
            && self.error().is_none()
    }
}
