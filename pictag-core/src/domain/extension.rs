//! Image extension allow-list.

/// Extensions accepted for uploads, lowercase.
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

pub const UNSUPPORTED_EXTENSION_MESSAGE: &str =
    "Unsupported extension. The supported extensions are png, jpg, and jpeg";

/// Whether the text after the last `.` of a filename or URL is an allowed
/// image extension (case-insensitive). References without a `.` are rejected.
pub fn is_allowed_extension(reference: &str) -> bool {
    reference
        .rsplit_once('.')
        .map(|(_, ext)| {
            ALLOWED_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}
