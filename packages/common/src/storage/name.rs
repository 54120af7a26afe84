/// Why a stored file name was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameError {
    Empty,
    /// Contains `/` or `\`.
    PathSeparator,
    /// Contains `..`.
    PathTraversal,
    NullByte,
    /// Starts with a dot.
    Hidden,
    ControlCharacter,
    /// Contains `"` or `;`, which would break a quoted header parameter.
    HeaderDelimiter,
}

impl NameError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "File name cannot be empty",
            Self::PathSeparator => "Invalid file name: path separators are not allowed",
            Self::PathTraversal => "Invalid file name: '..' is not allowed",
            Self::NullByte => "Invalid file name: null bytes are not allowed",
            Self::Hidden => "Invalid file name: hidden files are not allowed",
            Self::ControlCharacter => "Invalid file name: control characters are not allowed",
            Self::HeaderDelimiter => "Invalid file name: quotes and semicolons are not allowed",
        }
    }
}

/// Validates a flat storage name (no directory components).
///
/// Names come from queue payloads and URLs, so anything that could escape
/// the storage root is refused. Surrounding whitespace is not trimmed: a
/// name is used exactly as given.
pub fn validate_name(name: &str) -> Result<&str, NameError> {
    if name.trim().is_empty() {
        return Err(NameError::Empty);
    }
    if name.contains('\0') {
        return Err(NameError::NullByte);
    }
    // CR/LF would also end up in Content-Disposition headers.
    if name.chars().any(|c| c.is_ascii_control()) {
        return Err(NameError::ControlCharacter);
    }
    // Names are echoed in `Content-Disposition: attachment; filename="..."`.
    if name.contains(['"', ';']) {
        return Err(NameError::HeaderDelimiter);
    }
    if name.contains('/') || name.contains('\\') {
        return Err(NameError::PathSeparator);
    }
    if name.contains("..") {
        return Err(NameError::PathTraversal);
    }
    if name.starts_with('.') {
        return Err(NameError::Hidden);
    }
    Ok(name)
}
