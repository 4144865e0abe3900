//! 파일 출력 헬퍼
//!
//! 생성 파일은 내용이 바뀌었을 때만 씁니다. 두 번째 실행에서 변경이 없어야 하므로
//! 모든 생성물은 이 함수를 거칩니다.

use std::path::Path;

use tracing::debug;

use crate::error::EngineError;

/// 디스크의 내용과 다를 때만 파일을 씁니다. 실제로 썼으면 `true`입니다.
pub fn write_if_changed(path: &Path, content: &str) -> Result<bool, EngineError> {
    match std::fs::read(path) {
        Ok(existing) if existing == content.as_bytes() => {
            debug!(path = %path.display(), "unchanged, not writing");
            return Ok(false);
        }
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(EngineError::io(path, e)),
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| EngineError::io(parent, e))?;
    }
    std::fs::write(path, content).map_err(|e| EngineError::io(path, e))?;
    Ok(true)
}

/// 파일이 있으면 UTF-8 텍스트로 읽습니다.
pub fn read_optional(path: &Path) -> Result<Option<String>, EngineError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(EngineError::io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_only_on_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.txt");
        assert!(write_if_changed(&path, "a\n").unwrap());
        assert!(!write_if_changed(&path, "a\n").unwrap());
        assert!(write_if_changed(&path, "b\n").unwrap());
        assert_eq!(read_optional(&path).unwrap().as_deref(), Some("b\n"));
    }

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_optional(&dir.path().join("nope")).unwrap().is_none());
    }
}
