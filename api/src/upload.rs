use std::path::Path;

use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};

const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("unsupported image file type")]
    InvalidFileType,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Extension whitelist check, case-insensitive. Filenames without a dot are
/// rejected outright.
pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Reduces an uploaded filename to a safe basename: path components are
/// dropped, whitespace becomes `_`, anything outside ASCII alphanumerics and
/// `.-_` is removed, and leading dots are stripped.
pub fn sanitize_filename(filename: &str) -> String {
    let basename = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let cleaned: String = basename
        .chars()
        .filter_map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                Some(c)
            } else if c.is_whitespace() {
                Some('_')
            } else {
                None
            }
        })
        .collect();
    cleaned.trim_start_matches('.').to_owned()
}

/// Validates and persists an uploaded image, returning the path (relative to
/// the serving root) to store on the product row. Creating the destination
/// directory is idempotent. Empty file contents are allowed.
pub async fn store_image(
    upload_dir: &Path,
    original_name: &str,
    data: &[u8],
) -> Result<String, UploadError> {
    if !allowed_file(original_name) {
        return Err(UploadError::InvalidFileType);
    }

    let filename = sanitize_filename(original_name);
    if !allowed_file(&filename) {
        return Err(UploadError::InvalidFileType);
    }

    fs::create_dir_all(upload_dir).await?;

    let path = upload_dir.join(&filename);
    let mut file = fs::File::create(&path).await?;
    file.write_all(data).await?;
    file.flush().await?;

    Ok(format!("static/images/{filename}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_whitelist() {
        assert!(allowed_file("x.png"));
        assert!(allowed_file("x.JPG"));
        assert!(allowed_file("photo.jpeg"));
        assert!(allowed_file("anim.gif"));
        assert!(!allowed_file("x.exe"));
        assert!(!allowed_file("x"));
        assert!(!allowed_file("x."));
    }

    #[test]
    fn sanitize_strips_path_components() {
        assert_eq!(sanitize_filename("../../etc/passwd.png"), "passwd.png");
        assert_eq!(sanitize_filename("..\\..\\x.png"), "x.png");
        assert_eq!(sanitize_filename("my photo.png"), "my_photo.png");
        assert_eq!(sanitize_filename(".hidden.png"), "hidden.png");
        assert_eq!(sanitize_filename("tomato.jpg"), "tomato.jpg");
    }

    #[tokio::test]
    async fn stores_file_and_returns_relative_path() {
        let dir = std::env::temp_dir().join(format!("agrimarket-upload-{}", std::process::id()));

        let path = store_image(&dir, "x.png", b"").await.unwrap();
        assert_eq!(path, "static/images/x.png");
        assert!(dir.join("x.png").exists());

        let err = store_image(&dir, "x.exe", b"binary").await.unwrap_err();
        assert!(matches!(err, UploadError::InvalidFileType));

        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn traversal_attempts_stay_inside_the_upload_dir() {
        let dir = std::env::temp_dir().join(format!("agrimarket-trav-{}", std::process::id()));

        let path = store_image(&dir, "../../escape.png", b"x").await.unwrap();
        assert_eq!(path, "static/images/escape.png");
        assert!(dir.join("escape.png").exists());

        tokio::fs::remove_dir_all(&dir).await.ok();
    }
}
