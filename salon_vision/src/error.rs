// THEORY:
// Every analysis in this crate is fail-fast: a failure at any stage aborts the whole
// call and surfaces as one `VisionError`. The variants are kept distinct because the
// caller maps each of them to different guidance for the end user. A missing face
// asks for a retake, an unreadable upload asks for another file, and a model load
// failure means the feature is unavailable on this deployment.

use thiserror::Error;

/// Guidance shown to the user when the detector finds no face.
pub const NO_FACE_GUIDANCE: &str = "No face detected. Make sure your face is clearly visible, \
     well lit and centered in the frame, then try again.";

#[derive(Debug, Error)]
pub enum VisionError {
    /// The color sampler was handed a zero-length pixel buffer.
    #[error("cannot sample colors from an empty pixel buffer")]
    EmptyInput,

    /// The face detector ran but found nothing usable.
    #[error("{guidance}", guidance = NO_FACE_GUIDANCE)]
    NoFaceDetected,

    /// The image source could not be fetched or decoded.
    #[error("invalid image input: {0}")]
    InvalidInput(String),

    /// The face detection weights could not be read or parsed.
    #[error("face detection model failed to load: {0}")]
    ModelLoad(String),

    /// Any other failure inside an analysis step.
    #[error("analysis failed: {0}")]
    Analysis(String),

    /// The analyzer configuration could not be read.
    #[error("invalid configuration: {0}")]
    Config(#[from] config::ConfigError),

    /// One of the sub-analyses of `tag_photo` failed; no tags were produced.
    #[error("photo tagging failed: {0}")]
    Tagging(#[source] Box<VisionError>),
}

impl VisionError {
    pub fn is_no_face(&self) -> bool {
        match self {
            VisionError::NoFaceDetected => true,
            VisionError::Tagging(inner) => inner.is_no_face(),
            _ => false,
        }
    }

    pub(crate) fn tagging(cause: VisionError) -> Self {
        VisionError::Tagging(Box::new(cause))
    }
}

impl From<image::ImageError> for VisionError {
    fn from(err: image::ImageError) -> Self {
        VisionError::InvalidInput(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VisionError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn tagging_error_keeps_its_cause() {
        let err = VisionError::tagging(VisionError::NoFaceDetected);
        assert!(err.is_no_face());
        let source = err.source().expect("tagging error should chain its cause");
        assert_eq!(source.to_string(), NO_FACE_GUIDANCE);
    }

    #[test]
    fn only_no_face_is_user_actionable() {
        assert!(!VisionError::EmptyInput.is_no_face());
        assert!(!VisionError::ModelLoad("missing".into()).is_no_face());
        assert!(!VisionError::tagging(VisionError::InvalidInput("bad".into())).is_no_face());
    }
}
