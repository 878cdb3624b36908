use thiserror::Error;

/// Workspace-wide result alias.
pub type Result<T> = color_eyre::eyre::Result<T>;

/// Error taxonomy shared across crates.
///
/// `Structural` is always fatal for the operation that detected it and is
/// never auto-repaired. `Format` aborts the import of the offending file
/// only. Per-unit merge issues are not errors at all; they are collected in
/// the merge report.
#[derive(Debug, Error)]
pub enum CourselocError {
    #[error("structural error in language `{lang}`: {detail}")]
    Structural { lang: String, detail: String },

    #[error("format error in {path}: {detail}")]
    Format { path: String, detail: String },

    #[error("{0}")]
    Other(String),
}

impl CourselocError {
    pub fn structural(lang: impl Into<String>, detail: impl Into<String>) -> Self {
        CourselocError::Structural {
            lang: lang.into(),
            detail: detail.into(),
        }
    }

    pub fn format(path: impl Into<String>, detail: impl Into<String>) -> Self {
        CourselocError::Format {
            path: path.into(),
            detail: detail.into(),
        }
    }
}
