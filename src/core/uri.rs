//! Temp-file paths and `text/uri-list` entries for file-based transfers

use std::path::{Path, PathBuf};

const FALLBACK_NAME: &str = "drag-payload";

/// Where the payload for `filename` is written.
///
/// Only the final component of `filename` is used, so the path always
/// stays inside `dir` and is the same for the same name.
pub fn temp_path(dir: &Path, filename: &str) -> PathBuf {
    let name = Path::new(filename)
        .file_name()
        .filter(|name| !name.is_empty())
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| FALLBACK_NAME.into());
    dir.join(name)
}

/// A one-line uri-list: `file://` + percent-encoded absolute path + CRLF
pub fn file_uri(path: &Path) -> String {
    let path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let encoded: Vec<String> = path
        .to_string_lossy()
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();

    format!("file://{}\r\n", encoded.join("/"))
}
