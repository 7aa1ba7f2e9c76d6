use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Catalogue of channel concepts, loaded from `channels.toml`.
///
/// The catalogue is passed explicitly into the assembly entry points; no
/// process-wide state is consulted.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelCatalog {
    pub channels: Vec<ChannelSpec>,
}

impl ChannelCatalog {
    pub fn channel(&self, id: u32) -> Option<&ChannelSpec> {
        self.channels.iter().find(|channel| channel.id == id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub id: u32,
    pub name: String,
    pub youtube_handle: String,
    pub music_genre: String,
    pub vibe: String,
    #[serde(default)]
    pub target_keywords: Vec<String>,
    #[serde(default)]
    pub concept: String,
}

impl ChannelSpec {
    /// Directory-safe channel name, spaces replaced by underscores.
    pub fn directory_name(&self) -> String {
        self.name.replace(' ', "_")
    }

    pub fn paths<P: AsRef<Path>>(&self, base_dir: P) -> ChannelPaths {
        ChannelPaths::new(base_dir.as_ref().join(self.directory_name()))
    }
}

/// Per-channel directory layout rooted at `<base>/<Channel_Name>`.
#[derive(Debug, Clone)]
pub struct ChannelPaths {
    pub root: PathBuf,
    pub music_raw: PathBuf,
    pub music_production: PathBuf,
    pub videos_raw: PathBuf,
    pub videos_production: PathBuf,
    pub final_dir: PathBuf,
}

impl ChannelPaths {
    fn new(root: PathBuf) -> Self {
        Self {
            music_raw: root.join("music").join("raw"),
            music_production: root.join("music").join("production"),
            videos_raw: root.join("videos").join("raw"),
            videos_production: root.join("videos").join("production"),
            final_dir: root.join("final"),
            root,
        }
    }

    pub fn all(&self) -> [&Path; 5] {
        [
            &self.music_raw,
            &self.music_production,
            &self.videos_raw,
            &self.videos_production,
            &self.final_dir,
        ]
    }
}

pub fn load_channel_catalog<P: AsRef<Path>>(path: P) -> Result<ChannelCatalog> {
    load_toml(path)
}

fn load_toml<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        source,
        path: path.to_path_buf(),
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        source,
        path: path.to_path_buf(),
    })
}
