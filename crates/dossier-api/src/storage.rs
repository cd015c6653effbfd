use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use dossier_core::intake::stored_file_name;

/// Manages the single on-disk directory holding uploaded documents.
///
/// Files are named `<field>-<unix millis>-<random>.<ext>`; the path recorded on
/// the document row is what locates a file, not the name alone.
pub struct Storage {
    dir: PathBuf,
}

/// A file that has been written and flushed to disk.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub file_name: String,
    pub path: PathBuf,
    pub size: u64,
    pub sha256: String,
}

impl Storage {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create upload directory {}", dir.display()))?;
        info!("Upload directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `bytes` under a freshly generated name. Never overwrites an
    /// existing file.
    pub async fn store(&self, field: &str, original_name: &str, bytes: &[u8]) -> Result<StoredFile> {
        let file_name = stored_file_name(field, original_name, chrono::Utc::now());
        let path = self.dir.join(&file_name);

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to create {}", path.display()))?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;

        let sha256 = hex::encode(Sha256::digest(bytes));
        debug!(path = %path.display(), size = bytes.len(), "Stored file");

        Ok(StoredFile {
            file_name,
            path,
            size: bytes.len() as u64,
            sha256,
        })
    }

    /// Removes a stored file. A file that is already gone is not an error.
    pub async fn delete(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => {
                info!("Deleted file {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("File {} already gone", path.display());
                Ok(())
            }
            Err(e) => Err(e).with_context(|| format!("Failed to delete {}", path.display())),
        }
    }

    pub async fn open(&self, path: &Path) -> std::io::Result<fs::File> {
        fs::File::open(path).await
    }
}
