//! Исходный чертёж в виде data URL: `data:<mime>;base64,<data>`.

use base64::Engine as _;
use thiserror::Error;

/// MIME по умолчанию, если префикс data URL отсутствует
pub const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// Ошибки разбора исходного изображения
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("image payload is empty")]
    Empty,
    #[error("invalid base64 image data: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Разобранный data URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub mime_type: String,
    /// Данные в base64 без префикса
    pub data: String,
}

impl ImagePayload {
    /// Разобрать data URL. Строка без префикса считается голым base64 JPEG.
    pub fn parse(source: &str) -> Self {
        if let Some(rest) = source.strip_prefix("data:") {
            if let Some((mime, data)) = rest.split_once(";base64,") {
                if !mime.is_empty() && !mime.contains(';') {
                    return Self {
                        mime_type: mime.to_string(),
                        data: data.to_string(),
                    };
                }
            }
        }
        Self {
            mime_type: DEFAULT_MIME_TYPE.to_string(),
            data: source.to_string(),
        }
    }

    pub fn is_pdf(&self) -> bool {
        self.mime_type == "application/pdf"
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    /// Декодировать байты изображения
    pub fn decode(&self) -> Result<Vec<u8>, PayloadError> {
        if self.data.trim().is_empty() {
            return Err(PayloadError::Empty);
        }
        Ok(base64::engine::general_purpose::STANDARD.decode(self.data.trim())?)
    }
}
