//! Avatar drop target.
//!
//! A drop carries at most one image of at most [`AVATAR_MAX_BYTES`]. The
//! accepted file is staged with a local preview reference so it can be shown
//! before anything is uploaded.

use axum::body::Bytes;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Largest accepted avatar, in bytes.
pub const AVATAR_MAX_BYTES: usize = 3_145_728;

/// A file as received from a drop or file selection.
#[derive(Debug, Clone)]
pub struct DroppedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl DroppedFile {
    pub fn new(file_name: impl Into<String>, content_type: Option<String>, bytes: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            bytes,
        }
    }
}

/// An accepted avatar that has not been uploaded yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedAvatar {
    pub id: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub size: usize,
    /// Local reference used to display the file.
    pub preview: String,
    #[serde(skip)]
    pub bytes: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AvatarRejection {
    #[error("no file was dropped")]
    NoFile,

    #[error("{0} files were dropped, only one is accepted")]
    TooManyFiles(usize),

    #[error("file is {size} bytes, the limit is {max} bytes")]
    FileTooLarge { size: usize, max: usize },

    #[error("file type {0} is not an image")]
    FileInvalidType(String),
}

impl AvatarRejection {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoFile => "no-file",
            Self::TooManyFiles(_) => "too-many-files",
            Self::FileTooLarge { .. } => "file-too-large",
            Self::FileInvalidType(_) => "file-invalid-type",
        }
    }
}

pub struct AvatarDrop;

impl AvatarDrop {
    /// Accepts a single image within the size limit.
    pub fn accept(files: Vec<DroppedFile>) -> Result<StagedAvatar, AvatarRejection> {
        if files.len() > 1 {
            return Err(AvatarRejection::TooManyFiles(files.len()));
        }
        let file = files.into_iter().next().ok_or(AvatarRejection::NoFile)?;

        let content_type = file
            .content_type
            .unwrap_or_else(|| "application/octet-stream".to_string());
        if !content_type.starts_with("image/") {
            return Err(AvatarRejection::FileInvalidType(content_type));
        }

        let size = file.bytes.len();
        if size > AVATAR_MAX_BYTES {
            return Err(AvatarRejection::FileTooLarge {
                size,
                max: AVATAR_MAX_BYTES,
            });
        }

        let id = Uuid::new_v4();
        Ok(StagedAvatar {
            id,
            file_name: file.file_name,
            content_type,
            size,
            preview: format!("blob:avatar/{id}"),
            bytes: file.bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(size: usize) -> DroppedFile {
        DroppedFile::new("me.png", Some("image/png".into()), vec![0u8; size].into())
    }

    #[test]
    fn single_image_is_staged_with_preview() {
        let staged = AvatarDrop::accept(vec![image(1024)]).unwrap();
        assert_eq!(staged.size, 1024);
        assert_eq!(staged.content_type, "image/png");
        assert_eq!(staged.preview, format!("blob:avatar/{}", staged.id));
    }

    #[test]
    fn limit_is_inclusive() {
        assert!(AvatarDrop::accept(vec![image(AVATAR_MAX_BYTES)]).is_ok());
        assert_eq!(
            AvatarDrop::accept(vec![image(AVATAR_MAX_BYTES + 1)]).unwrap_err(),
            AvatarRejection::FileTooLarge {
                size: AVATAR_MAX_BYTES + 1,
                max: AVATAR_MAX_BYTES
            }
        );
    }

    #[test]
    fn more_than_one_file_is_rejected() {
        let err = AvatarDrop::accept(vec![image(1), image(2)]).unwrap_err();
        assert_eq!(err, AvatarRejection::TooManyFiles(2));
        assert_eq!(err.code(), "too-many-files");
    }

    #[test]
    fn empty_drop_and_non_images_are_rejected() {
        assert_eq!(AvatarDrop::accept(vec![]).unwrap_err(), AvatarRejection::NoFile);

        let pdf = DroppedFile::new("cv.pdf", Some("application/pdf".into()), vec![1u8].into());
        assert_eq!(AvatarDrop::accept(vec![pdf]).unwrap_err().code(), "file-invalid-type");

        let unknown = DroppedFile::new("blob", None, vec![1u8].into());
        assert!(AvatarDrop::accept(vec![unknown]).is_err());
    }
}
