//! Writes a transport-encoded submission into the scratch directory

use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{HarnessError, HarnessResult};
use crate::languages::LanguageConfig;
use crate::workspace::RunScratch;

/// A submission on disk, owned by the run that wrote it
#[derive(Debug, Clone)]
pub struct MaterializedFile {
    pub path: PathBuf,
    pub language: LanguageConfig,
}

/// Decode a base64 payload. Line breaks and other ASCII whitespace are ignored.
pub fn decode_payload(encoded: &str) -> HarnessResult<Vec<u8>> {
    let compact: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    Ok(STANDARD.decode(compact)?)
}

/// Decode `encoded` and write it verbatim to a freshly allocated scratch path.
pub async fn materialize(
    scratch: &mut RunScratch,
    encoded: &str,
    language: &LanguageConfig,
) -> HarnessResult<MaterializedFile> {
    let content = decode_payload(encoded)?;
    let path = scratch.reserve(Some(language.source_extension()));
    let write_error = |source: std::io::Error| HarnessError::Write {
        path: path.clone(),
        source,
    };

    // An existing file means two runs got the same name; it is not ours
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await
        .map_err(write_error)?;
    scratch.track(path.clone());

    file.write_all(&content).await.map_err(write_error)?;
    file.flush().await.map_err(write_error)?;

    debug!(
        run_id = scratch.run_id(),
        language = %language.name,
        bytes = content.len(),
        "Materialized submission at {}",
        path.display()
    );

    Ok(MaterializedFile {
        path,
        language: language.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::LanguageRegistry;
    use crate::workspace::ScratchSpace;

    fn encode(s: &str) -> String {
        STANDARD.encode(s)
    }

    #[test]
    fn test_decode_ignores_line_breaks() {
        let encoded = encode("#include <cstdio>\nint main() { return 0; }\n");
        let (head, tail) = encoded.split_at(10);
        let wrapped = format!("{}\r\n{}\n", head, tail);
        assert_eq!(
            decode_payload(&wrapped).unwrap(),
            b"#include <cstdio>\nint main() { return 0; }\n"
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_payload("not*base64!"),
            Err(HarnessError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_materialize_writes_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let registry = LanguageRegistry::builtin().unwrap();
        let python = registry.get("python").unwrap();
        let mut run = ScratchSpace::new(dir.path()).begin_run();

        let source = "print(input())\n";
        let first = materialize(&mut run, &encode(source), python).await.unwrap();
        let second = materialize(&mut run, &encode(source), python).await.unwrap();

        assert_ne!(first.path, second.path);
        assert_eq!(first.path.extension().unwrap(), "py");
        assert_eq!(std::fs::read(&first.path).unwrap(), source.as_bytes());
        assert_eq!(
            std::fs::read(&first.path).unwrap(),
            std::fs::read(&second.path).unwrap()
        );

        run.release().await;
        assert!(!first.path.exists());
    }

    #[tokio::test]
    async fn test_materialize_decode_error_allocates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let registry = LanguageRegistry::builtin().unwrap();
        let mut run = ScratchSpace::new(dir.path()).begin_run();

        let result = materialize(&mut run, "%%%", registry.get("cpp").unwrap()).await;
        assert!(matches!(result, Err(HarnessError::Decode(_))));
        assert!(run.allocated().is_empty());
    }

    #[tokio::test]
    async fn test_materialize_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let registry = LanguageRegistry::builtin().unwrap();
        // Scratch root never created
        let mut run = ScratchSpace::new(dir.path().join("missing")).begin_run();

        let result = materialize(&mut run, &encode("x"), registry.get("cpp").unwrap()).await;
        assert!(matches!(result, Err(HarnessError::Write { .. })));
        assert!(run.allocated().is_empty());
    }

    #[tokio::test]
    async fn test_materialize_tracks_created_file() {
        let dir = tempfile::tempdir().unwrap();
        let registry = LanguageRegistry::builtin().unwrap();
        let mut run = ScratchSpace::new(dir.path()).begin_run();

        let file = materialize(&mut run, &encode("x"), registry.get("cpp").unwrap())
            .await
            .unwrap();
        assert_eq!(run.allocated(), &[file.path.clone()]);
    }
}
