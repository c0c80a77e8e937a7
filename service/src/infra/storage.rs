//! Object storage definitions.

use std::path::{Component, Path, PathBuf};

use common::{
    operations::{Release, Store},
    Handler,
};
use derive_more::{Display, Error as StdError, From};
use tokio::fs;
use tracerr::Traced;
use uuid::Uuid;

use crate::domain::contract::document;

/// File to be stored.
#[derive(Clone, Debug)]
pub struct File {
    /// Raw contents of this [`File`].
    pub bytes: Vec<u8>,

    /// Folder to place this [`File`] into.
    pub folder: String,

    /// Original name of this [`File`].
    pub name: String,
}

/// Outcome of a [`Store`] operation.
#[derive(Clone, Debug)]
pub struct Stored {
    /// Public URL the stored file is served under.
    pub url: document::Url,

    /// Reference the stored file can be [`Release`]d by.
    pub reference: document::Reference,
}

/// Local filesystem object storage.
///
/// Stand-in for an external object storage provider: files land under a
/// configured root directory and are served by URL prefix.
#[derive(Clone, Debug)]
pub struct Fs {
    /// Root directory the files are stored under.
    root: PathBuf,

    /// URL prefix the stored files are served under.
    base_url: String,
}

impl Fs {
    /// Creates a new [`Fs`] storage with the provided root directory and URL
    /// prefix.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            _ = base_url.pop();
        }
        Self {
            root: root.into(),
            base_url,
        }
    }

    /// Strips everything but `[A-Za-z0-9._-]` out of the provided file name.
    fn sanitize(name: &str) -> String {
        let mut sanitized = name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '-'
                }
            })
            .collect::<String>();
        sanitized.truncate(64);
        if sanitized.is_empty() {
            sanitized.push_str("file");
        }
        sanitized
    }

    /// Checks that the provided reference stays inside the storage root.
    fn is_safe(reference: &Path) -> bool {
        reference
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
    }
}

impl Handler<Store<File>> for Fs {
    type Ok = Stored;
    type Err = Traced<Error>;

    async fn execute(&self, Store(file): Store<File>) -> Result<Stored, Traced<Error>> {
        let File {
            bytes,
            folder,
            name,
        } = file;

        let reference = format!(
            "{}/{}-{}",
            Self::sanitize(&folder),
            Uuid::new_v4(),
            Self::sanitize(&name),
        );

        let path = self.root.join(&reference);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(tracerr::from_and_wrap!(=> Error))?;
        }
        fs::write(&path, &bytes)
            .await
            .map_err(tracerr::from_and_wrap!(=> Error))?;

        let url = format!("{}/{reference}", self.base_url);

        // SAFETY: Sanitized folder and name cannot produce an invalid
        //         `document::Url` or `document::Reference`.
        #[expect(unsafe_code, reason = "invariants are preserved")]
        let stored = unsafe {
            Stored {
                url: document::Url::new_unchecked(url),
                reference: document::Reference::new_unchecked(reference),
            }
        };
        Ok(stored)
    }
}

impl Handler<Release<document::Reference>> for Fs {
    type Ok = bool;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Release(reference): Release<document::Reference>,
    ) -> Result<bool, Traced<Error>> {
        let relative = Path::new(AsRef::<str>::as_ref(&reference));
        if !Self::is_safe(relative) {
            return Ok(false);
        }

        match fs::remove_file(self.root.join(relative)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(tracerr::new!(Error::from(e))),
        }
    }
}

/// Object storage [`Error`].
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// Filesystem error.
    #[display("Filesystem operation failed: {_0}")]
    Io(std::io::Error),
}

#[cfg(test)]
mod spec {
    use std::path::Path;

    use super::Fs;

    #[test]
    fn sanitizes_names() {
        assert_eq!(Fs::sanitize("photo.png"), "photo.png");
        assert_eq!(Fs::sanitize("../../etc/passwd"), "..-..-etc-passwd");
        assert_eq!(Fs::sanitize(""), "file");
    }

    #[test]
    fn rejects_traversing_references() {
        assert!(Fs::is_safe(Path::new("contracts/abc-photo.png")));
        assert!(!Fs::is_safe(Path::new("../outside")));
        assert!(!Fs::is_safe(Path::new("/absolute")));
    }
}
