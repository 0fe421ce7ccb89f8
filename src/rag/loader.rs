use crate::types::{AppError, Document, Result};
use std::path::Path;
use tracing::{debug, info, warn};

/// Load a text or markdown file as a single [`Document`].
///
/// Metadata: `source` (the path as given) and `title` (the file stem).
/// Files that are not UTF-8 are read as GBK, which covers most legacy Chinese
/// text. Anything that is neither is decoded lossily with a warning.
pub fn load_text_file<P: AsRef<Path>>(path: P) -> Result<Document> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(AppError::NotFound(format!(
            "File does not exist: {}",
            path.display()
        )));
    }

    let bytes = std::fs::read(path)
        .map_err(|e| AppError::Internal(format!("Failed to read {}: {}", path.display(), e)))?;

    let content = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => decode_legacy(path, e.as_bytes()),
    };

    let title = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    info!(path = %path.display(), chars = content.chars().count(), "Loaded document");

    Ok(Document::new(content)
        .with_metadata("source", path.display().to_string())
        .with_metadata("title", title))
}

fn decode_legacy(path: &Path, bytes: &[u8]) -> String {
    let (text, had_errors) = encoding_rs::GBK.decode_without_bom_handling(bytes);
    if !had_errors {
        debug!(path = %path.display(), "Decoded file as GBK");
        return text.into_owned();
    }

    warn!(path = %path.display(), "File is neither UTF-8 nor GBK, decoding lossily");
    String::from_utf8_lossy(bytes).into_owned()
}
