//! Data this node remembers across restarts
//!
//! Only the local robot's color and the name of its last driver are kept,
//! so a returning player gets the same robot back.

use crate::entity::LedColor;
use crate::error::{NodeResult, StorageError};
use crate::game::GameState;
use bincode::{deserialize, serialize};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Key of the record describing the local robot
pub const GAME_DATA_KEY: &str = "arena.dat";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistentData {
    pub color: Option<LedColor>,
    pub previous_owner: Option<String>,
}

pub trait LocalStorage: Send + Sync {
    /// Reads a record, `None` if it was never saved
    fn load(&self, key: &str) -> Result<Option<PersistentData>, StorageError>;

    fn save(&self, key: &str, data: &PersistentData) -> Result<(), StorageError>;
}

/// One bincode file per key under a directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl LocalStorage for FileStorage {
    fn load(&self, key: &str) -> Result<Option<PersistentData>, StorageError> {
        let bytes = match fs::read(self.dir.join(key)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(deserialize(&bytes)?))
    }

    fn save(&self, key: &str, data: &PersistentData) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.dir.join(key), serialize(data)?)?;
        Ok(())
    }
}

fn load_or_default(storage: &dyn LocalStorage) -> Result<PersistentData, StorageError> {
    Ok(storage.load(GAME_DATA_KEY)?.unwrap_or_default())
}

/// Applies the remembered color and previous owner to the local robot
///
/// Returns false when there was nothing to restore.
pub fn restore_local_robot(game: &mut GameState, storage: &dyn LocalStorage) -> NodeResult<bool> {
    let Some(data) = storage.load(GAME_DATA_KEY)? else {
        return Ok(false);
    };
    let Some(robot) = game.find_local_robot_mut() else {
        return Ok(false);
    };
    if data.color.is_some() {
        robot.color = data.color;
    }
    if data.previous_owner.is_some() {
        robot.previous_owner = data.previous_owner;
    }
    info!(
        "Restored robot {} (color {:?}, previous owner {:?})",
        robot, robot.color, robot.previous_owner
    );
    Ok(true)
}

/// Remembers who drives the local robot, called when a round starts
pub fn remember_local_owner(game: &GameState, storage: &dyn LocalStorage) -> NodeResult<()> {
    let Some(owner) = game.find_local_robot().and_then(|r| r.owner.clone()) else {
        return Ok(());
    };
    let mut data = load_or_default(storage)?;
    debug!("Remembering '{}' as owner of the local robot", owner);
    data.previous_owner = Some(owner);
    storage.save(GAME_DATA_KEY, &data)?;
    Ok(())
}

/// Remembers the color picked for the local robot
pub fn remember_color(storage: &dyn LocalStorage, color: LedColor) -> NodeResult<()> {
    let mut data = load_or_default(storage)?;
    data.color = Some(color);
    storage.save(GAME_DATA_KEY, &data)?;
    Ok(())
}
