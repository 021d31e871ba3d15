use serde::{Deserialize, Serialize};
use std::path::Path;

/// Raw image bytes plus MIME type, as uploaded.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInput {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImageInput {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Guess the MIME type from a file extension.
    pub fn mime_for_path(path: &Path) -> Option<&'static str> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "png" => Some("image/png"),
            "jpg" | "jpeg" => Some("image/jpeg"),
            "webp" => Some("image/webp"),
            "gif" => Some("image/gif"),
            "heic" => Some("image/heic"),
            "heif" => Some("image/heif"),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for ImageInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageInput")
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_for_path() {
        assert_eq!(
            ImageInput::mime_for_path(Path::new("chart.PNG")),
            Some("image/png")
        );
        assert_eq!(
            ImageInput::mime_for_path(Path::new("photo.jpeg")),
            Some("image/jpeg")
        );
        assert_eq!(ImageInput::mime_for_path(Path::new("notes.txt")), None);
        assert_eq!(ImageInput::mime_for_path(Path::new("noext")), None);
    }

    #[test]
    fn test_debug_hides_bytes() {
        let image = ImageInput::new(vec![0u8; 1024], "image/png");
        let debug = format!("{:?}", image);
        assert!(debug.contains("1024"));
        assert!(debug.contains("image/png"));
    }
}
