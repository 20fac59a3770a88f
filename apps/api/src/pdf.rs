use crate::errors::AppError;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";
pub const MAX_CV_BYTES: usize = 5 * 1024 * 1024;
/// Below this many characters the extraction is treated as a scan or a broken file.
pub const MIN_CV_TEXT_CHARS: usize = 100;

/// Extracts text from an in-memory PDF.
pub fn extract_cv_text(bytes: &[u8]) -> Result<String, AppError> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| AppError::Upstream(format!("Could not read PDF: {e}")))?;
    ensure_enough_text(text)
}

fn ensure_enough_text(text: String) -> Result<String, AppError> {
    if text.trim().chars().count() < MIN_CV_TEXT_CHARS {
        return Err(AppError::Upstream(
            "Could not extract enough text from PDF".to_string(),
        ));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_rejected() {
        let err = ensure_enough_text("   tiny   ".to_string()).unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }

    #[test]
    fn test_long_text_passes_through() {
        let text = "experience ".repeat(20);
        assert_eq!(ensure_enough_text(text.clone()).unwrap(), text);
    }
}
