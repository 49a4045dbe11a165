use axum::extract::Multipart;
use axum::extract::multipart::Field;
use bytes::{BufMut, Bytes, BytesMut};
use tracing::debug;
use uuid::Uuid;

use common::constants::FILE_FIELD_NAME;
use common::error::ApiError;

/// Single-file multipart body ready to be replayed against cluster `/add` routes.
#[derive(Debug, Clone)]
pub struct AssembledUpload {
    pub payload: Bytes,
    pub filename: String,
    pub content_type: String,
}

/// Reads the inbound form field by field and re-encodes the `file` field alone under a
/// fresh boundary. Other fields are skipped.
pub async fn assemble(mut multipart: Multipart, max_bytes: usize) -> Result<AssembledUpload, ApiError> {
    let mut file: Option<(String, Bytes)> = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD_NAME) {
            debug!(field = ?field.name(), "ignoring multipart field");
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let data = read_field(field, max_bytes).await?;
        if data.is_empty() {
            return Err(ApiError::EmptyFile);
        }
        file = Some((filename, data));
    }

    let (filename, data) = file.ok_or(ApiError::NoFilePart)?;
    let boundary = Uuid::new_v4().simple().to_string();

    Ok(AssembledUpload {
        payload: encode_single_file(&boundary, &filename, &data),
        content_type: format!("multipart/form-data; boundary={}", boundary),
        filename,
    })
}

async fn read_field(mut field: Field<'_>, max_bytes: usize) -> Result<Bytes, ApiError> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = field.chunk().await? {
        if buf.len() + chunk.len() > max_bytes {
            return Err(ApiError::TooLarge);
        }
        buf.put(chunk);
    }
    Ok(buf.freeze())
}

fn encode_single_file(boundary: &str, filename: &str, data: &[u8]) -> Bytes {
    let filename = filename.replace('\\', "\\\\").replace('"', "\\\"");

    let mut body = BytesMut::with_capacity(data.len() + 256);
    body.put_slice(format!("--{}\r\n", boundary).as_bytes());
    body.put_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            FILE_FIELD_NAME, filename
        )
        .as_bytes(),
    );
    body.put_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.put_slice(data);
    body.put_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body.freeze()
}
