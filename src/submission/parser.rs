use axum::http::HeaderMap;
use bytes::Bytes;
use uuid::Uuid;

/// A parsed evidence upload: the form fields plus exactly one image part.
#[derive(Debug)]
pub struct SubmissionUpload {
    pub facility_id: Uuid,
    pub device_latitude: f64,
    pub device_longitude: f64,
    pub captured_at: Option<String>,
    pub evidence: Bytes,
    pub evidence_content_type: String,
    pub evidence_filename: Option<String>,
}

/// Parse `multipart/form-data` using multer. Expected parts: `facility_id`,
/// `latitude`, `longitude`, an `evidence` file, and optionally `captured_at`
/// (RFC 3339 or EXIF `DateTimeOriginal`). Unknown parts are drained and
/// ignored.
pub async fn parse_upload(headers: &HeaderMap, body: Bytes) -> Result<SubmissionUpload, String> {
    let boundary = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| multer::parse_boundary(ct).ok())
        .ok_or_else(|| "Missing multipart boundary".to_string())?;

    let stream = futures_util::stream::once(async { Ok::<_, std::io::Error>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut facility_id = None;
    let mut latitude = None;
    let mut longitude = None;
    let mut captured_at = None;
    let mut evidence = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Multipart error: {e}"))?
    {
        match field.name().unwrap_or("") {
            "facility_id" => {
                let text = read_text(field).await?;
                facility_id =
                    Some(text.trim().parse::<Uuid>().map_err(|_| {
                        format!("Invalid facility_id: {text}")
                    })?);
            }
            "latitude" => {
                let text = read_text(field).await?;
                latitude = Some(
                    text.trim()
                        .parse::<f64>()
                        .map_err(|_| format!("Invalid latitude: {text}"))?,
                );
            }
            "longitude" => {
                let text = read_text(field).await?;
                longitude = Some(
                    text.trim()
                        .parse::<f64>()
                        .map_err(|_| format!("Invalid longitude: {text}"))?,
                );
            }
            "captured_at" => {
                let text = read_text(field).await?;
                if !text.trim().is_empty() {
                    captured_at = Some(text);
                }
            }
            "evidence" => {
                let content_type = field
                    .content_type()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let filename = field.file_name().map(|s| s.to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| format!("Evidence read error: {e}"))?;
                evidence = Some((data, content_type, filename));
            }
            _ => {
                // Drain so the stream can advance past the part.
                let _ = field.bytes().await;
            }
        }
    }

    let facility_id = facility_id.ok_or_else(|| "Missing facility_id".to_string())?;
    let device_latitude = latitude.ok_or_else(|| "Missing latitude".to_string())?;
    let device_longitude = longitude.ok_or_else(|| "Missing longitude".to_string())?;
    let (evidence, evidence_content_type, evidence_filename) =
        evidence.ok_or_else(|| "Missing evidence file".to_string())?;

    if evidence.is_empty() {
        return Err("Evidence file is empty".to_string());
    }

    Ok(SubmissionUpload {
        facility_id,
        device_latitude,
        device_longitude,
        captured_at,
        evidence,
        evidence_content_type,
        evidence_filename,
    })
}

async fn read_text(field: multer::Field<'_>) -> Result<String, String> {
    field
        .text()
        .await
        .map_err(|e| format!("Field read error: {e}"))
}
