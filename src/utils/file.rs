//! File utilities for loading session inputs.

use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use crate::models::ImageInput;

/// Largest document or image accepted from disk.
pub const MAX_INPUT_SIZE: u64 = 20 * 1024 * 1024;

/// Calculate SHA-256 checksum of bytes.
pub fn calculate_checksum(content: &[u8]) -> String {
    let hash = Sha256::digest(content);
    hex::encode(hash)
}

fn check_size(path: &Path, max_size: u64) -> std::io::Result<()> {
    let metadata = fs::metadata(path)?;
    if metadata.len() > max_size {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!(
                "file exceeds maximum size: {} > {}",
                metadata.len(),
                max_size
            ),
        ));
    }
    Ok(())
}

/// Read pre-extracted document text with a size limit.
pub fn read_document_text(path: &Path, max_size: u64) -> std::io::Result<String> {
    check_size(path, max_size)?;
    let text = fs::read_to_string(path)?;
    Ok(text.replace("\r\n", "\n"))
}

/// Read an image file, deriving its MIME type from the extension.
pub fn read_image(path: &Path, max_size: u64) -> std::io::Result<ImageInput> {
    let mime_type = ImageInput::mime_for_path(path).ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("unsupported image type: {}", path.display()),
        )
    })?;
    check_size(path, max_size)?;
    let bytes = fs::read(path)?;
    if bytes.is_empty() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("image file is empty: {}", path.display()),
        ));
    }
    Ok(ImageInput::new(bytes, mime_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_checksum() {
        let checksum = calculate_checksum(b"hello world");
        assert_eq!(checksum.len(), 64); // SHA-256 produces 64 hex chars
        assert_eq!(checksum, calculate_checksum(b"hello world"));
    }

    #[test]
    fn test_read_document_normalizes_crlf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        fs::write(&path, "line one\r\nline two").unwrap();

        let text = read_document_text(&path, MAX_INPUT_SIZE).unwrap();
        assert_eq!(text, "line one\nline two");
    }

    #[test]
    fn test_read_document_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        fs::write(&path, "x".repeat(100)).unwrap();

        let err = read_document_text(&path, 10).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_read_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.png");
        fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();

        let image = read_image(&path, MAX_INPUT_SIZE).unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.len(), 4);

        let bad = dir.path().join("chart.bmp");
        fs::write(&bad, [0u8; 4]).unwrap();
        assert_eq!(
            read_image(&bad, MAX_INPUT_SIZE).unwrap_err().kind(),
            std::io::ErrorKind::InvalidInput
        );
    }
}
