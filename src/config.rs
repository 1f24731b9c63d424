//! Location of per-game assets (manifests and the like).
//!
//! The data directory is resolved once by the embedding application and
//! passed to [`GameData`](crate::game_data::GameData); nothing here caches
//! global state.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Environment variable overriding the data directory.
pub const DATA_PATH_ENV: &str = "RETRO_DATA_PATH";

/// Subdirectories searched, in order, for a game's assets.
pub const INTEGRATIONS: [&str; 3] = ["stable", "experimental", "contrib"];

pub const MANIFEST_FILE: &str = "data.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataConfig {
    pub data_path: PathBuf,
}

impl DataConfig {
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        DataConfig {
            data_path: data_path.into(),
        }
    }

    /// `$RETRO_DATA_PATH` if set, else the nearest `data` directory at or
    /// above `hint` (or the working directory), else `./data`.
    pub fn resolve(hint: Option<&Path>) -> Self {
        Self::resolve_with(std::env::var_os(DATA_PATH_ENV), hint)
    }

    fn resolve_with(env: Option<OsString>, hint: Option<&Path>) -> Self {
        if let Some(path) = env.filter(|path| !path.is_empty()) {
            return Self::new(path);
        }

        let start = hint
            .map(Path::to_path_buf)
            .or_else(|| std::env::current_dir().ok());
        if let Some(start) = start {
            if let Some(found) = start
                .ancestors()
                .map(|dir| dir.join("data"))
                .find(|candidate| candidate.is_dir())
            {
                return Self::new(found);
            }
        }
        Self::new("data")
    }

    /// Directory holding `game`'s assets, from the first integration that
    /// has one.
    pub fn game_path(&self, game: &str) -> Option<PathBuf> {
        INTEGRATIONS
            .iter()
            .map(|integration| self.data_path.join(integration).join(game))
            .find(|path| path.is_dir())
    }

    pub fn manifest_path(&self, game: &str) -> Option<PathBuf> {
        self.game_path(game).map(|dir| dir.join(MANIFEST_FILE))
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self::new("data")
    }
}
