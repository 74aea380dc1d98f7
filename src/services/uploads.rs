//! Upload validation and on-disk storage for profile images and certificate
//! documents.
//!
//! Validation never trusts the client: the extension is checked against a
//! whitelist, the size against a limit, and the leading bytes are sniffed to
//! confirm the content really is one of the allowed formats. Images also have
//! their pixel dimensions read from the format header.

use anyhow::{Context, Result};
use chrono::Datelike;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

use crate::config::UploadConfig;

const MAX_FILENAME_LEN: usize = 255;
/// Room left for the name once the `<uuid>-` prefix is added, in bytes.
const MAX_STORED_NAME_BYTES: usize = MAX_FILENAME_LEN - 37;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No file was uploaded.")]
    Missing,

    #[error("Unsupported file extension: .{ext}. Allowed extensions: {allowed}")]
    UnsupportedExtension { ext: String, allowed: String },

    #[error("File size exceeds {limit_mb}MB limit. Your file is {actual_mb:.2}MB.")]
    TooLarge { limit_mb: usize, actual_mb: f64 },

    #[error("{0}")]
    InvalidContent(String),

    #[error("{0}")]
    InvalidDimensions(String),

    #[error("Stored file not found")]
    NotFound,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<anyhow::Error> for UploadError {
    fn from(err: anyhow::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<std::io::Error> for UploadError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Formats recognized by content sniffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Pdf,
    Jpeg,
    Png,
    Webp,
}

impl FileFormat {
    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }

    /// Identifies the format from the leading bytes of `data`.
    #[must_use]
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(b"%PDF-") {
            Some(Self::Pdf)
        } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if data.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(Self::Png)
        } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            Some(Self::Webp)
        } else {
            None
        }
    }
}

/// Where a stored file belongs. Also the first path segment on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    ProfileImage,
    CertificateFile,
}

impl UploadKind {
    const fn dir(self) -> &'static str {
        match self {
            Self::ProfileImage => "profile_images",
            Self::CertificateFile => "certificates",
        }
    }
}

/// Rules applied to one kind of upload.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub extensions: &'static [&'static str],
    pub formats: &'static [FileFormat],
    pub max_bytes: usize,
    /// Inclusive `(min, max)` pixel bounds for both width and height.
    pub dimensions: Option<(u32, u32)>,
}

/// An upload that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedUpload {
    pub filename: String,
    pub format: FileFormat,
}

impl UploadPolicy {
    #[must_use]
    pub const fn image(config: &UploadConfig) -> Self {
        Self {
            extensions: &["jpg", "jpeg", "png", "webp"],
            formats: &[FileFormat::Jpeg, FileFormat::Png, FileFormat::Webp],
            max_bytes: config.max_image_bytes,
            dimensions: Some((config.min_image_dimension, config.max_image_dimension)),
        }
    }

    #[must_use]
    pub const fn document(config: &UploadConfig) -> Self {
        Self {
            extensions: &["pdf", "png", "jpg", "jpeg"],
            formats: &[FileFormat::Pdf, FileFormat::Jpeg, FileFormat::Png],
            max_bytes: config.max_document_bytes,
            dimensions: None,
        }
    }

    pub fn validate(&self, filename: &str, data: &[u8]) -> Result<ValidatedUpload, UploadError> {
        let filename = sanitize_filename(filename);

        let ext = Path::new(&filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if !self.extensions.contains(&ext.as_str()) {
            return Err(UploadError::UnsupportedExtension {
                ext,
                allowed: self.extensions.join(", "),
            });
        }

        if data.len() > self.max_bytes {
            #[allow(clippy::cast_precision_loss)]
            let actual_mb = data.len() as f64 / (1024.0 * 1024.0);
            return Err(UploadError::TooLarge {
                limit_mb: self.max_bytes / (1024 * 1024),
                actual_mb,
            });
        }

        if data.is_empty() {
            return Err(UploadError::InvalidContent(
                "The uploaded file is empty.".to_string(),
            ));
        }

        let format = FileFormat::sniff(data)
            .filter(|f| self.formats.contains(f))
            .ok_or_else(|| {
                let allowed: Vec<&str> = self.formats.iter().map(|f| f.mime()).collect();
                UploadError::InvalidContent(format!(
                    "Invalid file content. Allowed types: {}",
                    allowed.join(", ")
                ))
            })?;

        if let Some((min, max)) = self.dimensions {
            let (width, height) = image_dimensions(format, data).ok_or_else(|| {
                UploadError::InvalidContent("Invalid or corrupted image file.".to_string())
            })?;

            if width > max || height > max {
                return Err(UploadError::InvalidDimensions(format!(
                    "Image dimensions too large. Maximum: {max}x{max}px. Your image: {width}x{height}px."
                )));
            }
            if width < min || height < min {
                return Err(UploadError::InvalidDimensions(format!(
                    "Image dimensions too small. Minimum: {min}x{min}px. Your image: {width}x{height}px."
                )));
            }
        }

        Ok(ValidatedUpload { filename, format })
    }
}

/// Strips path separators, NUL and control characters, and leading dots.
/// Empty results become `unnamed_file`; long names are cut to 255 characters
/// keeping the extension.
#[must_use]
pub fn sanitize_filename(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .filter(|c| {
            !matches!(c, '/' | '\\' | '\0')
                && !matches!(u32::from(*c), 0x00..=0x1f | 0x7f..=0x9f)
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        return "unnamed_file".to_string();
    }

    if cleaned.chars().count() <= MAX_FILENAME_LEN {
        return cleaned.to_string();
    }

    match cleaned.rsplit_once('.') {
        Some((stem, ext)) if ext.chars().count() < MAX_FILENAME_LEN - 1 => {
            let keep = MAX_FILENAME_LEN - ext.chars().count() - 1;
            let stem: String = stem.chars().take(keep).collect();
            format!("{stem}.{ext}")
        }
        _ => cleaned.chars().take(MAX_FILENAME_LEN).collect(),
    }
}

/// Cuts `name` to at most `max_bytes` bytes on a char boundary, keeping the
/// extension when it fits.
fn fit_stored_name(name: &str, max_bytes: usize) -> String {
    fn take_bytes(s: &str, max: usize) -> &str {
        let mut end = max.min(s.len());
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        &s[..end]
    }

    if name.len() <= max_bytes {
        return name.to_string();
    }

    match name.rsplit_once('.') {
        Some((stem, ext)) if ext.len() + 1 < max_bytes => {
            let stem = take_bytes(stem, max_bytes - ext.len() - 1);
            format!("{stem}.{ext}")
        }
        _ => take_bytes(name, max_bytes).to_string(),
    }
}

fn be_u16(data: &[u8], at: usize) -> Option<u32> {
    let bytes = data.get(at..at + 2)?;
    Some(u32::from(u16::from_be_bytes([bytes[0], bytes[1]])))
}

fn le_u24(data: &[u8], at: usize) -> Option<u32> {
    let b = data.get(at..at + 3)?;
    Some(u32::from(b[0]) | (u32::from(b[1]) << 8) | (u32::from(b[2]) << 16))
}

/// Reads `(width, height)` from the image header.
#[must_use]
pub fn image_dimensions(format: FileFormat, data: &[u8]) -> Option<(u32, u32)> {
    match format {
        FileFormat::Png => {
            if data.get(12..16)? != b"IHDR" {
                return None;
            }
            let w = data.get(16..20)?;
            let h = data.get(20..24)?;
            Some((
                u32::from_be_bytes([w[0], w[1], w[2], w[3]]),
                u32::from_be_bytes([h[0], h[1], h[2], h[3]]),
            ))
        }
        FileFormat::Jpeg => jpeg_dimensions(data),
        FileFormat::Webp => webp_dimensions(data),
        FileFormat::Pdf => None,
    }
}

fn jpeg_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    let mut i = 2;
    while i + 1 < data.len() {
        if data[i] != 0xFF {
            return None;
        }
        let marker = data[i + 1];
        match marker {
            0xFF => {
                i += 1;
            }
            0x01 | 0xD0..=0xD8 => {
                i += 2;
            }
            0xD9 | 0xDA => return None,
            0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                let height = be_u16(data, i + 5)?;
                let width = be_u16(data, i + 7)?;
                return Some((width, height));
            }
            _ => {
                let len = usize::try_from(be_u16(data, i + 2)?).ok()?;
                i += 2 + len;
            }
        }
    }
    None
}

fn webp_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    match data.get(12..16)? {
        b"VP8 " => {
            if data.get(23..26)? != [0x9D, 0x01, 0x2A] {
                return None;
            }
            let w = data.get(26..28)?;
            let h = data.get(28..30)?;
            Some((
                u32::from(u16::from_le_bytes([w[0], w[1]]) & 0x3FFF),
                u32::from(u16::from_le_bytes([h[0], h[1]]) & 0x3FFF),
            ))
        }
        b"VP8L" => {
            if *data.get(20)? != 0x2F {
                return None;
            }
            let b = data.get(21..25)?;
            let bits = u32::from_le_bytes([b[0], b[1], b[2], b[3]]);
            Some(((bits & 0x3FFF) + 1, ((bits >> 14) & 0x3FFF) + 1))
        }
        b"VP8X" => Some((le_u24(data, 24)? + 1, le_u24(data, 27)? + 1)),
        _ => None,
    }
}

/// Stores uploads under a root directory as
/// `<kind>/<YYYY>/<MM>/<uuid>-<filename>`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes `data` and returns the path relative to the root.
    pub async fn save(&self, kind: UploadKind, filename: &str, data: &[u8]) -> Result<String> {
        let now = chrono::Utc::now();
        let relative = format!(
            "{}/{:04}/{:02}/{}-{}",
            kind.dir(),
            now.year(),
            now.month(),
            uuid::Uuid::new_v4(),
            fit_stored_name(&sanitize_filename(filename), MAX_STORED_NAME_BYTES)
        );

        let full = self.root.join(&relative);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        fs::write(&full, data)
            .await
            .with_context(|| format!("Failed to write upload to {}", full.display()))?;

        debug!(path = %relative, bytes = data.len(), "Stored upload");
        Ok(relative)
    }

    /// Maps a stored relative path to its location on disk. Paths that could
    /// escape the root are rejected.
    #[must_use]
    pub fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let path = Path::new(relative);
        if relative.is_empty() || !path.components().all(|c| matches!(c, Component::Normal(_))) {
            return None;
        }
        Some(self.root.join(path))
    }

    pub async fn read(&self, relative: &str) -> Result<Vec<u8>, UploadError> {
        let path = self.resolve(relative).ok_or(UploadError::NotFound)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(UploadError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes a stored file. Failures are logged, not returned: a missing
    /// file must not block deleting the row that referenced it.
    pub async fn remove(&self, relative: &str) {
        let Some(path) = self.resolve(relative) else {
            warn!(path = %relative, "Refusing to remove upload outside the root");
            return;
        };

        match fs::remove_file(&path).await {
            Ok(()) => debug!(path = %relative, "Removed upload"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %relative, error = %e, "Failed to remove upload"),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Minimal PNG header with the given dimensions.
    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut data = b"\x89PNG\r\n\x1a\n".to_vec();
        data.extend_from_slice(&13u32.to_be_bytes());
        data.extend_from_slice(b"IHDR");
        data.extend_from_slice(&width.to_be_bytes());
        data.extend_from_slice(&height.to_be_bytes());
        data.extend_from_slice(&[8, 6, 0, 0, 0, 0, 0, 0, 0]);
        data
    }

    fn jpeg_bytes(width: u16, height: u16) -> Vec<u8> {
        let mut data = vec![0xFF, 0xD8];
        // APP0 segment
        data.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x10]);
        data.extend_from_slice(b"JFIF\0\x01\x01\0\0\x01\0\x01\0\0");
        // SOF0
        data.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x11, 0x08]);
        data.extend_from_slice(&height.to_be_bytes());
        data.extend_from_slice(&width.to_be_bytes());
        data.extend_from_slice(&[0x03, 0x01, 0x22, 0x00]);
        data
    }

    fn config() -> UploadConfig {
        UploadConfig::default()
    }

    #[test]
    fn test_sniff_formats() {
        assert_eq!(FileFormat::sniff(b"%PDF-1.7\n"), Some(FileFormat::Pdf));
        assert_eq!(FileFormat::sniff(&png_bytes(1, 1)), Some(FileFormat::Png));
        assert_eq!(FileFormat::sniff(&jpeg_bytes(1, 1)), Some(FileFormat::Jpeg));
        assert_eq!(
            FileFormat::sniff(b"RIFF\0\0\0\0WEBPVP8 "),
            Some(FileFormat::Webp)
        );
        assert_eq!(FileFormat::sniff(b"MZ\x90\0"), None);
    }

    #[test]
    fn test_png_dimensions() {
        assert_eq!(
            image_dimensions(FileFormat::Png, &png_bytes(640, 480)),
            Some((640, 480))
        );
    }

    #[test]
    fn test_jpeg_dimensions_skip_segments() {
        assert_eq!(
            image_dimensions(FileFormat::Jpeg, &jpeg_bytes(800, 600)),
            Some((800, 600))
        );
    }

    #[test]
    fn test_webp_vp8x_dimensions() {
        let mut data = b"RIFF\0\0\0\0WEBPVP8X".to_vec();
        data.extend_from_slice(&[10, 0, 0, 0, 0, 0, 0, 0]);
        // width-1 = 299, height-1 = 199
        data.extend_from_slice(&[0x2B, 0x01, 0x00, 0xC7, 0x00, 0x00]);
        assert_eq!(
            image_dimensions(FileFormat::Webp, &data),
            Some((300, 200))
        );
    }

    #[test]
    fn test_image_policy_accepts_valid_png() {
        let policy = UploadPolicy::image(&config());
        let upload = policy.validate("avatar.PNG", &png_bytes(200, 200)).unwrap();
        assert_eq!(upload.format, FileFormat::Png);
        assert_eq!(upload.filename, "avatar.PNG");
    }

    #[test]
    fn test_image_policy_rejects_extension() {
        let policy = UploadPolicy::image(&config());
        let err = policy.validate("avatar.gif", &png_bytes(200, 200)).unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedExtension { .. }));
    }

    #[test]
    fn test_image_policy_rejects_oversized() {
        let policy = UploadPolicy::image(&config());
        let mut data = png_bytes(200, 200);
        data.resize(5 * 1024 * 1024 + 1, 0);
        let err = policy.validate("avatar.png", &data).unwrap_err();
        assert!(matches!(err, UploadError::TooLarge { limit_mb: 5, .. }));
    }

    #[test]
    fn test_image_policy_rejects_disguised_content() {
        let policy = UploadPolicy::image(&config());
        let err = policy.validate("avatar.png", b"%PDF-1.4 not an image").unwrap_err();
        assert!(matches!(err, UploadError::InvalidContent(_)));
    }

    #[test]
    fn test_image_policy_dimension_bounds() {
        let policy = UploadPolicy::image(&config());
        assert!(matches!(
            policy.validate("a.png", &png_bytes(49, 100)).unwrap_err(),
            UploadError::InvalidDimensions(_)
        ));
        assert!(matches!(
            policy.validate("a.png", &png_bytes(100, 5001)).unwrap_err(),
            UploadError::InvalidDimensions(_)
        ));
        assert!(policy.validate("a.png", &png_bytes(50, 5000)).is_ok());
    }

    #[test]
    fn test_document_policy() {
        let policy = UploadPolicy::document(&config());
        assert!(policy.validate("cert.pdf", b"%PDF-1.7\n...").is_ok());
        assert!(policy.validate("scan.jpg", &jpeg_bytes(10, 10)).is_ok());

        let err = policy.validate("cert.pdf", b"<html>").unwrap_err();
        assert!(matches!(err, UploadError::InvalidContent(_)));

        let err = policy.validate("cert.webp", b"RIFF\0\0\0\0WEBP").unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedExtension { .. }));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_filename("..\\secret.pdf"), "secret.pdf");
        assert_eq!(sanitize_filename("a\0b\x07c.pdf"), "abc.pdf");
        assert_eq!(sanitize_filename("..."), "unnamed_file");
        assert_eq!(sanitize_filename(".hidden"), "hidden");
    }

    #[test]
    fn test_sanitize_long_filename_keeps_extension() {
        let long = format!("{}.pdf", "a".repeat(300));
        let cleaned = sanitize_filename(&long);
        assert_eq!(cleaned.chars().count(), 255);
        assert!(cleaned.ends_with(".pdf"));
    }

    #[test]
    fn test_stored_name_fits_byte_limit() {
        assert_eq!(fit_stored_name("cert.pdf", MAX_STORED_NAME_BYTES), "cert.pdf");

        let multibyte = format!("{}.png", "é".repeat(200));
        let fitted = fit_stored_name(&multibyte, MAX_STORED_NAME_BYTES);
        assert!(fitted.len() <= MAX_STORED_NAME_BYTES);
        assert!(fitted.ends_with(".png"));
    }

    #[tokio::test]
    async fn test_save_long_filename() {
        let root = std::env::temp_dir().join(format!("certrack-uploads-{}", uuid::Uuid::new_v4()));
        let store = FileStore::new(&root);

        let long = format!("{}.pdf", "a".repeat(240));
        let policy = UploadPolicy::document(&config());
        let validated = policy.validate(&long, b"%PDF-1.7").unwrap();

        let relative = store
            .save(UploadKind::CertificateFile, &validated.filename, b"%PDF-1.7")
            .await
            .unwrap();
        let stored = relative.rsplit('/').next().unwrap();
        assert!(stored.len() <= MAX_FILENAME_LEN);
        assert!(stored.ends_with(".pdf"));
        assert_eq!(store.read(&relative).await.unwrap(), b"%PDF-1.7");

        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let store = FileStore::new("/srv/uploads");
        assert!(store.resolve("../etc/passwd").is_none());
        assert!(store.resolve("/etc/passwd").is_none());
        assert!(store.resolve("").is_none());
        assert_eq!(
            store.resolve("certificates/2026/01/x.pdf"),
            Some(PathBuf::from("/srv/uploads/certificates/2026/01/x.pdf"))
        );
    }

    #[tokio::test]
    async fn test_save_read_remove() {
        let root = std::env::temp_dir().join(format!("certrack-uploads-{}", uuid::Uuid::new_v4()));
        let store = FileStore::new(&root);

        let relative = store
            .save(UploadKind::CertificateFile, "cert.pdf", b"%PDF-1.7")
            .await
            .unwrap();
        assert!(relative.starts_with("certificates/"));
        assert!(relative.ends_with("-cert.pdf"));

        assert_eq!(store.read(&relative).await.unwrap(), b"%PDF-1.7");

        store.remove(&relative).await;
        assert!(matches!(
            store.read(&relative).await.unwrap_err(),
            UploadError::NotFound
        ));

        let _ = std::fs::remove_dir_all(root);
    }
}
