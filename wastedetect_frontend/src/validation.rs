use std::fmt;
use std::path::Path;
use std::sync::Arc;

use image::ImageFormat;

use crate::error::ValidationError;

/// An image the user picked, not yet submitted.
#[derive(Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime: String,
    bytes: Arc<[u8]>,
}

impl fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageUpload")
            .field("file_name", &self.file_name)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }

    /// Reads a file from disk. The MIME type is sniffed from the content,
    /// falling back to the extension.
    pub fn from_path(path: &Path) -> Result<Self, ValidationError> {
        let bytes = std::fs::read(path).map_err(|source| ValidationError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let mime = infer::get(&bytes)
            .map(|kind| kind.mime_type().to_string())
            .or_else(|| mime_from_extension(&file_name).map(str::to_string))
            .unwrap_or_else(|| "application/octet-stream".to_string());
        Ok(Self::new(file_name, mime, bytes))
    }

    /// Replaces the declared type, keeping the shared bytes.
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = mime.into();
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Accepted upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
}

impl ImageKind {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
        }
    }

    pub(crate) fn format(&self) -> ImageFormat {
        match self {
            ImageKind::Jpeg => ImageFormat::Jpeg,
            ImageKind::Png => ImageFormat::Png,
        }
    }

    fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(ImageKind::Jpeg),
            "image/png" => Some(ImageKind::Png),
            _ => None,
        }
    }
}

fn mime_from_extension(file_name: &str) -> Option<&'static str> {
    let extension = Path::new(file_name)
        .extension()?
        .to_string_lossy()
        .to_lowercase();
    match extension.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        _ => None,
    }
}

/// Client-side image policy: the declared type must be an image, and the
/// content must sniff as JPEG or PNG. The backend only checks the declared
/// `image/` prefix, so the stricter format check lives here.
pub fn validate_image(upload: &ImageUpload) -> Result<ImageKind, ValidationError> {
    if upload.is_empty() {
        return Err(ValidationError::Empty {
            file_name: upload.file_name.clone(),
        });
    }
    let declared = upload.mime.trim().to_ascii_lowercase();
    if !declared.starts_with("image/") {
        return Err(ValidationError::NotAnImage {
            file_name: upload.file_name.clone(),
            mime: upload.mime.clone(),
        });
    }
    let sniffed = infer::get(upload.bytes()).and_then(|kind| ImageKind::from_mime(kind.mime_type()));
    match sniffed {
        Some(kind) => Ok(kind),
        None => Err(ValidationError::UnsupportedFormat {
            file_name: upload.file_name.clone(),
        }),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Cursor;

    use image::{DynamicImage, ImageBuffer, Rgb};

    use super::*;

    pub(crate) fn encoded(format: ImageFormat) -> Vec<u8> {
        let buffer = ImageBuffer::from_pixel(4, 3, Rgb([20u8, 120, 60]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(buffer)
            .write_to(&mut out, format)
            .expect("encode test image");
        out.into_inner()
    }

    pub(crate) fn png_upload(name: &str) -> ImageUpload {
        ImageUpload::new(name, "image/png", encoded(ImageFormat::Png))
    }

    pub(crate) fn jpeg_upload(name: &str) -> ImageUpload {
        ImageUpload::new(name, "image/jpeg", encoded(ImageFormat::Jpeg))
    }

    #[test]
    fn accepts_png_and_jpeg() {
        assert_eq!(validate_image(&png_upload("a.png")).unwrap(), ImageKind::Png);
        assert_eq!(validate_image(&jpeg_upload("b.jpg")).unwrap(), ImageKind::Jpeg);
    }

    #[test]
    fn rejects_non_image_mime() {
        let upload = ImageUpload::new("notes.txt", "text/plain", b"hello".to_vec());
        assert!(matches!(
            validate_image(&upload),
            Err(ValidationError::NotAnImage { .. })
        ));
    }

    #[test]
    fn rejects_empty_file() {
        let upload = ImageUpload::new("blank.png", "image/png", Vec::new());
        assert!(matches!(
            validate_image(&upload),
            Err(ValidationError::Empty { .. })
        ));
    }

    #[test]
    fn rejects_image_mime_with_foreign_content() {
        let gif = b"GIF89a\x01\x00\x01\x00\x00\x00\x00;".to_vec();
        let upload = ImageUpload::new("anim.png", "image/png", gif);
        assert!(matches!(
            validate_image(&upload),
            Err(ValidationError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn from_path_sniffs_mime() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("photo.bin");
        std::fs::write(&path, encoded(ImageFormat::Png)).expect("write");
        let upload = ImageUpload::from_path(&path).expect("read upload");
        assert_eq!(upload.file_name, "photo.bin");
        assert_eq!(upload.mime, "image/png");
    }

    #[test]
    fn from_path_reports_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = ImageUpload::from_path(&dir.path().join("missing.png")).unwrap_err();
        assert!(matches!(err, ValidationError::Read { .. }));
    }

    #[test]
    fn extension_fallback() {
        assert_eq!(mime_from_extension("X.JPEG"), Some("image/jpeg"));
        assert_eq!(mime_from_extension("x.png"), Some("image/png"));
        assert_eq!(mime_from_extension("x.gif"), None);
        assert_eq!(mime_from_extension("noext"), None);
    }
}
