use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::IndexerError;

#[derive(Debug)]
pub enum ProcessingError {
    Skipped(String, String), // file_path, reason
    Error(String, String),   // file_path, error_message
}

impl ProcessingError {
    pub fn file_path(&self) -> &str {
        match self {
            ProcessingError::Skipped(path, _) | ProcessingError::Error(path, _) => path,
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            ProcessingError::Skipped(_, reason) | ProcessingError::Error(_, reason) => reason,
        }
    }
}

impl From<ProcessingError> for IndexerError {
    fn from(error: ProcessingError) -> Self {
        IndexerError::Unreadable {
            path: PathBuf::from(error.file_path()),
            reason: error.reason().to_string(),
        }
    }
}

/// Read a Lua source file with size checks.
///
/// - Opens the file once and inspects metadata from the handle
/// - Oversize and non-UTF-8 files are skipped, not errors
pub fn read_text_file(full_path: &Path, max_file_size: usize) -> Result<String, ProcessingError> {
    let file_path = full_path.to_string_lossy().to_string();

    let mut file = File::open(full_path).map_err(|e| {
        ProcessingError::Error(file_path.clone(), format!("Failed to open file: {e}"))
    })?;

    let metadata = file.metadata().map_err(|e| {
        ProcessingError::Error(file_path.clone(), format!("Failed to read metadata: {e}"))
    })?;

    let file_len = metadata.len() as usize;
    if file_len > max_file_size {
        return Err(ProcessingError::Skipped(
            file_path,
            format!("File too large: {} bytes", metadata.len()),
        ));
    }

    if file_len == 0 {
        return Ok(String::new());
    }

    let mut bytes = Vec::with_capacity(file_len);
    file.read_to_end(&mut bytes).map_err(|e| {
        ProcessingError::Error(file_path.clone(), format!("Failed to read file: {e}"))
    })?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(_) => Err(ProcessingError::Skipped(
            file_path,
            "Non-UTF-8 content".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_text_file_ok() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "local x = 1").unwrap();

        let content = read_text_file(file.path(), 1024).expect("should read");
        assert_eq!(content, "local x = 1");
    }

    #[test]
    fn test_read_text_file_empty() {
        let file = NamedTempFile::new().unwrap();
        let content = read_text_file(file.path(), 1024).expect("empty ok");
        assert!(content.is_empty());
    }

    #[test]
    fn test_read_text_file_too_large() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), vec![b'a'; 2048]).unwrap();

        let err = read_text_file(file.path(), 1024).expect_err("should error");
        match err {
            ProcessingError::Skipped(_path, reason) => {
                assert!(reason.contains("File too large"));
            }
            _ => panic!("unexpected error type"),
        }
    }

    #[test]
    fn test_read_text_file_rejects_binary() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), [0xff, 0xfe, 0x00, 0x80]).unwrap();

        let err = read_text_file(file.path(), 1024).expect_err("should skip");
        assert!(matches!(err, ProcessingError::Skipped(_, ref reason) if reason == "Non-UTF-8 content"));
    }

    #[test]
    fn test_missing_file_converts_to_unreadable() {
        let err = read_text_file(Path::new("/definitely/not/here.lua"), 1024).expect_err("missing");
        let converted: IndexerError = err.into();
        assert!(matches!(converted, IndexerError::Unreadable { .. }));
    }
}
