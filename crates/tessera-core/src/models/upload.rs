use std::path::Path;

/// A file handed to the media store for ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub original_filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl UploadedFile {
    pub fn new(
        original_filename: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            original_filename: original_filename.into(),
            content_type: content_type.into(),
            data,
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Extension used when naming the stored file.
    ///
    /// The MIME type wins over the client-supplied filename; unknown types fall
    /// back to the filename's extension and finally to `bin`.
    pub fn extension(&self) -> String {
        if let Some(ext) = extension_for_content_type(&self.content_type) {
            return ext.to_string();
        }

        Path::new(&self.original_filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or_else(|| "bin".to_string())
    }
}

fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    match essence.as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/avif" => Some("avif"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_prefers_content_type() {
        let file = UploadedFile::new("photo.PNG", "image/jpeg", vec![1]);
        assert_eq!(file.extension(), "jpg");
    }

    #[test]
    fn extension_falls_back_to_filename() {
        let file = UploadedFile::new("scan.TIFF", "application/octet-stream", vec![1]);
        assert_eq!(file.extension(), "tiff");
    }

    #[test]
    fn extension_defaults_to_bin() {
        let file = UploadedFile::new("noext", "application/octet-stream", vec![1]);
        assert_eq!(file.extension(), "bin");
        let file = UploadedFile::new("weird.p/g", "", vec![1]);
        assert_eq!(file.extension(), "bin");
    }

    #[test]
    fn content_type_parameters_are_ignored() {
        let file = UploadedFile::new("a", "image/png; charset=binary", vec![1]);
        assert_eq!(file.extension(), "png");
    }
}
