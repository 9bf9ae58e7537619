//! FileDestination - appends payloads to a file

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use contracts::Destination;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

/// Configuration for FileDestination
#[derive(Debug, Clone)]
pub struct FileDestinationConfig {
    /// Target file path
    pub path: PathBuf,
    /// Truncate an existing file instead of appending to it
    pub truncate: bool,
}

impl FileDestinationConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> io::Result<Self> {
        let path = params
            .get("path")
            .map(PathBuf::from)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "missing 'path' parameter"))?;

        let truncate = match params.get("truncate").map(String::as_str) {
            Some("true") => true,
            Some("false") | None => false,
            Some(other) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("invalid 'truncate' value '{other}'"),
                ))
            }
        };

        Ok(Self { path, truncate })
    }
}

/// Destination that writes payloads to a file on disk
pub struct FileDestination {
    name: String,
    path: PathBuf,
    file: File,
}

impl FileDestination {
    /// Open `path` for appending, creating it if missing
    pub async fn open(name: impl Into<String>, path: impl AsRef<Path>) -> io::Result<Self> {
        Self::new(
            name,
            FileDestinationConfig {
                path: path.as_ref().to_path_buf(),
                truncate: false,
            },
        )
        .await
    }

    /// Create a new FileDestination
    #[instrument(name = "file_destination_new", skip(name, config), fields(path = %config.path.display()))]
    pub async fn new(name: impl Into<String>, config: FileDestinationConfig) -> io::Result<Self> {
        if config.path.as_os_str().is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "file destination path is empty",
            ));
        }

        let mut options = OpenOptions::new();
        options.create(true);
        if config.truncate {
            options.write(true).truncate(true);
        } else {
            options.append(true);
        }
        let file = options.open(&config.path).await?;

        let name = name.into();
        debug!(destination = %name, "FileDestination opened");

        Ok(Self {
            name,
            path: config.path,
            file,
        })
    }

    /// Create from params map (for factory)
    pub async fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> io::Result<Self> {
        let config = FileDestinationConfig::from_params(params)?;
        Self::new(name, config).await
    }

    /// Path of the underlying file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Destination for FileDestination {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write_all(buf).await?;
        // tokio completes file writes on a blocking thread; flush waits for
        // the write syscall so the bytes are in the file when this returns.
        self.file.flush().await?;
        Ok(buf.len())
    }
}
