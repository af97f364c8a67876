//! Image attachments: local validation and upload with a single retry.

use std::time::Duration;

use crate::domain::{SurveyError, SurveyResult};
use crate::repository::ImageHost;

/// Largest accepted image, in bytes
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Pause before the one retry of a failed upload
pub const UPLOAD_RETRY_DELAY: Duration = Duration::from_millis(700);

/// Image bytes plus the metadata the host needs
#[derive(Debug, Clone)]
pub struct ImageUpload {
    file_name: String,
    mime_type: String,
    bytes: Vec<u8>,
}

impl ImageUpload {
    /// Build and validate an upload. The declared MIME type wins; otherwise
    /// it is guessed from the file name.
    pub fn new(
        file_name: impl Into<String>,
        declared_mime: Option<&str>,
        bytes: Vec<u8>,
    ) -> SurveyResult<Self> {
        let file_name = file_name.into();
        let mime_type = match declared_mime.map(str::trim).filter(|m| !m.is_empty()) {
            Some(mime) => mime.to_ascii_lowercase(),
            None => mime_guess::from_path(&file_name)
                .first_raw()
                .unwrap_or("application/octet-stream")
                .to_string(),
        };

        let upload = Self {
            file_name,
            mime_type,
            bytes,
        };
        upload.validate()?;
        Ok(upload)
    }

    fn validate(&self) -> SurveyResult<()> {
        if !self.mime_type.starts_with("image/") {
            return Err(SurveyError::InvalidImage(
                "Please select a valid image file".to_string(),
            ));
        }
        if self.bytes.len() > MAX_IMAGE_BYTES {
            return Err(SurveyError::InvalidImage(
                "Image size should be less than 10MB".to_string(),
            ));
        }
        Ok(())
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Upload, retrying once after `retry_delay` if the first attempt hit a
/// transport failure. Other errors are returned immediately.
pub async fn upload_with_retry(
    host: &dyn ImageHost,
    image: &ImageUpload,
    retry_delay: Duration,
) -> SurveyResult<String> {
    match host.upload(image).await {
        Err(e) if e.is_transport() => {
            tracing::warn!(file = %image.file_name(), error = %e, "image upload failed, retrying once");
            tokio::time::sleep(retry_delay).await;
            host.upload(image).await
        }
        result => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockImageHost;

    fn png(len: usize) -> ImageUpload {
        ImageUpload::new("site.png", None, vec![0u8; len]).unwrap()
    }

    #[test]
    fn test_mime_guessed_from_file_name() {
        assert_eq!(png(4).mime_type(), "image/png");
        let jpeg = ImageUpload::new("photo.bin", Some("image/JPEG"), vec![1]).unwrap();
        assert_eq!(jpeg.mime_type(), "image/jpeg");
    }

    #[test]
    fn test_rejects_non_images_and_oversize() {
        let err = ImageUpload::new("notes.txt", None, vec![1]).unwrap_err();
        assert!(matches!(err, SurveyError::InvalidImage(_)));

        assert!(ImageUpload::new("big.png", None, vec![0u8; MAX_IMAGE_BYTES]).is_ok());
        let err = ImageUpload::new("big.png", None, vec![0u8; MAX_IMAGE_BYTES + 1]).unwrap_err();
        assert_eq!(err, SurveyError::InvalidImage("Image size should be less than 10MB".to_string()));
    }

    #[tokio::test]
    async fn test_transport_failure_retried_once() {
        let host = MockImageHost::failing_first(1);
        let url = upload_with_retry(&host, &png(4), Duration::ZERO).await.unwrap();
        assert_eq!(url, "https://images.test/1.png");
        assert_eq!(host.attempts(), 2);
    }

    #[tokio::test]
    async fn test_second_transport_failure_is_returned() {
        let host = MockImageHost::failing_first(2);
        let err = upload_with_retry(&host, &png(4), Duration::ZERO).await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(host.attempts(), 2);
    }
}
