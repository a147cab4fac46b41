use std::path::Path;

use uuid::Uuid;

use crate::error::AppError;

pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "txt"];

/// Public prefix under which stored files are served
pub const PUBLIC_PREFIX: &str = "/uploads";

/// Check an uploaded document and return its normalized extension
pub fn validate_upload(file_name: &str, size: usize, max_bytes: usize) -> Result<String, AppError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .filter(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .ok_or_else(|| {
            AppError::Validation("Only PDF, DOC, DOCX and TXT files are allowed".to_string())
        })?;

    if size == 0 {
        return Err(AppError::Validation("File is empty".to_string()));
    }

    if size > max_bytes {
        return Err(AppError::Validation("File too large".to_string()));
    }

    Ok(extension)
}

/// Write the file under `upload_dir` with a random name and return its public URL
pub async fn save_upload(upload_dir: &str, extension: &str, bytes: &[u8]) -> Result<String, AppError> {
    tokio::fs::create_dir_all(upload_dir).await?;

    let file_name = format!("{}.{}", Uuid::new_v4(), extension);
    tokio::fs::write(Path::new(upload_dir).join(&file_name), bytes).await?;

    tracing::debug!("Stored upload {} ({} bytes)", file_name, bytes.len());

    Ok(format!("{}/{}", PUBLIC_PREFIX, file_name))
}

/// Delete a file previously stored by [`save_upload`]
pub async fn remove_upload(upload_dir: &str, file_url: &str) -> Result<(), AppError> {
    let file_name = file_url
        .strip_prefix(PUBLIC_PREFIX)
        .and_then(|rest| rest.strip_prefix('/'))
        .filter(|name| !name.is_empty() && !name.contains(['/', '\\']))
        .ok_or_else(|| AppError::Internal(format!("Not a stored upload: {}", file_url)))?;

    tokio::fs::remove_file(Path::new(upload_dir).join(file_name)).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: usize = 10 * 1024 * 1024;

    #[test]
    fn test_allowed_extensions() {
        assert_eq!(validate_upload("notes.pdf", 10, MAX).unwrap(), "pdf");
        assert_eq!(validate_upload("Notes.DOCX", 10, MAX).unwrap(), "docx");
        assert_eq!(validate_upload("a.b.txt", 10, MAX).unwrap(), "txt");
    }

    #[test]
    fn test_rejected_extensions() {
        assert!(validate_upload("script.exe", 10, MAX).is_err());
        assert!(validate_upload("no_extension", 10, MAX).is_err());
        assert!(validate_upload("image.png", 10, MAX).is_err());
    }

    #[test]
    fn test_size_limits() {
        assert!(validate_upload("notes.pdf", MAX, MAX).is_ok());
        let err = validate_upload("notes.pdf", MAX + 1, MAX).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == "File too large"));
        assert!(validate_upload("notes.pdf", 0, MAX).is_err());
    }

    #[tokio::test]
    async fn test_save_upload_writes_file() {
        let dir = std::env::temp_dir().join(format!("uploads-{}", Uuid::new_v4()));
        let dir = dir.to_str().unwrap().to_string();

        let url = save_upload(&dir, "txt", b"hello").await.unwrap();
        assert!(url.starts_with("/uploads/") && url.ends_with(".txt"));

        let name = url.trim_start_matches("/uploads/");
        let stored = tokio::fs::read(Path::new(&dir).join(name)).await.unwrap();
        assert_eq!(stored, b"hello");

        remove_upload(&dir, &url).await.unwrap();
        assert!(!Path::new(&dir).join(name).exists());
        assert!(remove_upload(&dir, "/uploads/../secret.txt").await.is_err());

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
