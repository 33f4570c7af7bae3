use std::path::Path;

const MAX_FILENAME_LEN: usize = 255;

/// Reduce a caller-supplied name to a safe base name: directory parts are
/// dropped and anything outside `[A-Za-z0-9._-]` becomes `_`. Names longer
/// than 255 characters lose the end of their stem, not their extension.
pub fn sanitize_filename(filename: &str) -> String {
    let base = match Path::new(filename).file_name().and_then(|n| n.to_str()) {
        Some(name) => name,
        None if filename.trim().is_empty() => return "file".to_string(),
        // Ends in `..` or names the root.
        None => return "invalid_filename".to_string(),
    };
    if base.chars().all(|c| c == '.') {
        return "invalid_filename".to_string();
    }

    let s: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if s.trim_matches('_').is_empty() || s.len() < 3 {
        return "file".to_string();
    }
    truncate_keeping_extension(s, MAX_FILENAME_LEN)
}

/// `name` must be ASCII.
fn truncate_keeping_extension(name: String, max_len: usize) -> String {
    if name.len() <= max_len {
        return name;
    }
    match name.rfind('.') {
        Some(dot) if dot > 0 && name.len() - dot < max_len => {
            let extension = &name[dot..];
            format!("{}{}", &name[..max_len - extension.len()], extension)
        }
        _ => name[..max_len].to_string(),
    }
}

/// Name to register for a payload re-encoded as WebP: the extension is
/// replaced, or appended when there is none.
pub fn webp_filename(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("file");
    format!("{}.webp", stem)
}
