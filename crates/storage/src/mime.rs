//! MIME-type to file-extension mapping for stored assets.

/// Extension used when the MIME type is unknown.
pub const FALLBACK_EXTENSION: &str = "bin";

/// File extension for a MIME type. The parameter part of the type
/// (`; charset=...`) is ignored.
pub fn extension_for(mime_type: &str) -> &'static str {
    let essence = mime_type.split(';').next().unwrap_or("").trim();
    match essence {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/avif" => "avif",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        _ => FALLBACK_EXTENSION,
    }
}
