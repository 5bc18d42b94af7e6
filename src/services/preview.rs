use crate::models::{Preview, SelectedFile};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use camino::Utf8PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Encode image bytes as a `data:` URI that can be displayed without the remote service.
pub fn encode_data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

/// Read `file` fully into memory and build its inline preview.
pub async fn generate_preview(file: &SelectedFile) -> Result<Preview, PreviewError> {
    let bytes = tokio::fs::read(&file.path)
        .await
        .map_err(|source| PreviewError::Read {
            path: file.path.clone(),
            source,
        })?;

    tracing::debug!("Read {} bytes for preview of {}", bytes.len(), file.name);
    Ok(Preview::new(encode_data_uri(file.mime_type(), &bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_encode_data_uri() {
        assert_eq!(
            encode_data_uri("image/png", b"chart"),
            "data:image/png;base64,Y2hhcnQ="
        );
    }

    #[tokio::test]
    async fn test_generate_preview_from_file() {
        let mut temp_file = Builder::new().suffix(".gif").tempfile().unwrap();
        temp_file.write_all(b"GIF89a").unwrap();
        temp_file.flush().unwrap();

        let path = Utf8PathBuf::try_from(temp_file.path().to_path_buf()).unwrap();
        let file = SelectedFile::from_path(&path).unwrap();

        let preview = generate_preview(&file).await.unwrap();
        assert_eq!(&*preview.data_uri, "data:image/gif;base64,R0lGODlh");
    }

    #[tokio::test]
    async fn test_generate_preview_missing_file() {
        let file = SelectedFile::from_path("/definitely/not/here/chart.png").unwrap();
        assert!(matches!(
            generate_preview(&file).await,
            Err(PreviewError::Read { .. })
        ));
    }
}
