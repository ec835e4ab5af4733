use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Component, Path, PathBuf},
};

use log::{debug, info};
use thiserror::Error;

pub const WELL_KNOWN_DIR: &str = ".well-known";
pub const PKI_VALIDATION_DIR: &str = ".well-known/pki-validation";

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("validation path {0:?} must be relative and stay inside the site root")]
    UnsafePath(String),
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Places the domain-control proof where the web server serves it, and removes it afterwards.
pub trait ValidationPublisher {
    fn publish(&self, site_root: &Path, uri: &str, content: &str) -> Result<PathBuf, PublishError>;
    fn cleanup(&self, site_root: &Path) -> Result<(), PublishError>;
}

pub struct FsValidationPublisher;

impl ValidationPublisher for FsValidationPublisher {
    fn publish(&self, site_root: &Path, uri: &str, content: &str) -> Result<PathBuf, PublishError> {
        let target = validation_path(site_root, uri)?;

        let validation_dir = site_root.join(PKI_VALIDATION_DIR);
        fs::create_dir_all(&validation_dir).map_err(|source| PublishError::Io {
            path: validation_dir.clone(),
            source,
        })?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| PublishError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        write_file(&target, content.as_bytes()).map_err(|source| PublishError::Io {
            path: target.clone(),
            source,
        })?;
        info!("[validation] published proof at {}", target.display());
        Ok(target)
    }

    fn cleanup(&self, site_root: &Path) -> Result<(), PublishError> {
        let root = site_root.join(WELL_KNOWN_DIR);
        match fs::remove_dir_all(&root) {
            Ok(()) => {
                info!("[validation] removed {}", root.display());
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("[validation] {} already absent", root.display());
                Ok(())
            }
            Err(source) => Err(PublishError::Io { path: root, source }),
        }
    }
}

/// Joins the service-provided uri onto the site root, rejecting anything that could escape it.
pub fn validation_path(site_root: &Path, uri: &str) -> Result<PathBuf, PublishError> {
    let relative = uri.trim().trim_start_matches('/');
    if relative.is_empty() {
        return Err(PublishError::UnsafePath(uri.to_string()));
    }
    let mut path = site_root.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            _ => return Err(PublishError::UnsafePath(uri.to_string())),
        }
    }
    Ok(path)
}

fn write_file(path: &Path, content: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.write_all(content)?;
    file.flush()
}
