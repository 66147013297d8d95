use crate::db::ConnectionParameters;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read profiles file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("could not write profiles file {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("error parsing profiles file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("error serializing profiles: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A named set of connection parameters as stored on disk.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ConnectionProfile {
    pub name: String,
    pub host: String,
    pub port: String,
    pub user: String,
    pub password: String,
    pub dbname: String,
}

impl ConnectionProfile {
    pub fn new(name: impl Into<String>, params: &ConnectionParameters) -> Self {
        ConnectionProfile {
            name: name.into(),
            host: params.host.clone(),
            port: params.port.clone(),
            user: params.user.clone(),
            password: params.password.clone(),
            dbname: params.database.clone(),
        }
    }

    pub fn parameters(&self) -> ConnectionParameters {
        ConnectionParameters {
            host: self.host.clone(),
            port: self.port.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            database: self.dbname.clone(),
        }
    }
}

/// File backed list of connection profiles, kept as a pretty printed JSON array.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ProfileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns every stored profile in file order, or nothing if the file
    /// has not been created yet.
    pub fn load(&self) -> Result<Vec<ConnectionProfile>, ConfigError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let data = fs::read_to_string(&self.path).map_err(|source| ConfigError::Read {
            path: self.path.clone(),
            source,
        })?;

        serde_json::from_str(&data).map_err(|source| ConfigError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Overwrites the file with `profiles`.
    pub fn save(&self, profiles: &[ConnectionProfile]) -> Result<(), ConfigError> {
        let data = serde_json::to_string_pretty(profiles)?;

        // Ensure the config directory exists
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: self.path.clone(),
                source,
            })?;
        }

        fs::write(&self.path, data).map_err(|source| ConfigError::Write {
            path: self.path.clone(),
            source,
        })
    }

    pub fn find(&self, name: &str) -> Result<Option<ConnectionProfile>, ConfigError> {
        Ok(self.load()?.into_iter().find(|profile| profile.name == name))
    }
}
