//! Position and preset persistence.
//!
//! Two flat text files under the state directory: the single dead-reckoned
//! position record (`pan,tilt,zoom`) and the ordered preset table
//! (`id,name,pan,tilt,zoom` per line). Only one process is expected to
//! touch them, so nothing is locked.

use ptz_common::consts::{POSITION_FILE, PRESET_FILE};
use ptz_common::hal::driver::HalError;
use ptz_common::hal::types::{NormalizedPosition, Preset};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// State file manager rooted at a state directory.
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    /// Create a store rooted at `dir`. Nothing is touched on disk.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Path of the position record.
    pub fn position_path(&self) -> PathBuf {
        self.dir.join(POSITION_FILE)
    }

    /// Path of the preset table.
    pub fn preset_path(&self) -> PathBuf {
        self.dir.join(PRESET_FILE)
    }

    /// Create the state directory if it does not exist.
    pub fn ensure_dir(&self) -> Result<(), HalError> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            HalError::PersistenceError(format!(
                "failed to create state dir {}: {}",
                self.dir.display(),
                e
            ))
        })
    }

    /// Last persisted position, or the neutral position when the record is
    /// missing or unreadable.
    pub fn read_position(&self) -> NormalizedPosition {
        let path = self.position_path();
        match fs::read_to_string(&path) {
            Ok(content) => parse_position(&content).unwrap_or_else(|| {
                warn!("corrupt position record {}, using neutral", path.display());
                NormalizedPosition::default()
            }),
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    warn!("cannot read {}: {}", path.display(), e);
                }
                NormalizedPosition::default()
            }
        }
    }

    /// Overwrite the position record.
    pub fn write_position(&self, position: NormalizedPosition) -> Result<(), HalError> {
        self.ensure_dir()?;
        let path = self.position_path();
        fs::write(&path, format!("{position}\n")).map_err(|e| {
            HalError::PersistenceError(format!("failed to write {}: {}", path.display(), e))
        })?;
        debug!("position saved {}", position);
        Ok(())
    }

    /// Look up a preset by id. The first matching record wins; malformed
    /// records are skipped. A missing table is an empty table.
    pub fn find_preset(&self, id: i32) -> Result<Option<Preset>, HalError> {
        let path = self.preset_path();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(HalError::PersistenceError(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        Ok(content
            .lines()
            .filter_map(parse_preset)
            .find(|preset| preset.id == id))
    }
}

fn parse_triple<'a>(mut fields: impl Iterator<Item = &'a str>) -> Option<NormalizedPosition> {
    let mut next = || fields.next()?.trim().parse::<i32>().ok();
    let pan = next()?;
    let tilt = next()?;
    let zoom = next()?;
    Some(NormalizedPosition::new(pan, tilt, zoom))
}

fn parse_position(content: &str) -> Option<NormalizedPosition> {
    let line = content.lines().next()?;
    let mut fields = line.split(',');
    let position = parse_triple(&mut fields)?;
    fields.next().is_none().then_some(position)
}

fn parse_preset(line: &str) -> Option<Preset> {
    let mut fields = line.trim().splitn(5, ',');
    let id = fields.next()?.trim().parse::<i32>().ok()?;
    let name = fields.next()?;
    if name.is_empty() {
        return None;
    }
    let position = parse_triple(fields.flat_map(|f| f.split(',')))?;
    Some(Preset {
        id,
        name: name.to_string(),
        position,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, StateStore) {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("state"));
        (dir, store)
    }

    #[test]
    fn missing_position_is_neutral() {
        let (_dir, store) = store();
        assert_eq!(store.read_position(), NormalizedPosition::new(180, 98, 0));
    }

    #[test]
    fn corrupt_position_is_neutral() {
        let (_dir, store) = store();
        store.ensure_dir().unwrap();
        fs::write(store.position_path(), "12,abc\n").unwrap();
        assert_eq!(store.read_position(), NormalizedPosition::default());

        fs::write(store.position_path(), "").unwrap();
        assert_eq!(store.read_position(), NormalizedPosition::default());
    }

    #[test]
    fn write_creates_dir_and_overwrites() {
        let (_dir, store) = store();
        store.write_position(NormalizedPosition::new(10, 20, 30)).unwrap();
        store.write_position(NormalizedPosition::new(192, 0, 50)).unwrap();

        assert_eq!(fs::read_to_string(store.position_path()).unwrap(), "192,0,50\n");
        assert_eq!(store.read_position(), NormalizedPosition::new(192, 0, 50));
    }

    #[test]
    fn write_into_unwritable_location_fails() {
        let (dir, _) = store();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let store = StateStore::new(blocker.join("state"));

        let err = store.write_position(NormalizedPosition::default()).unwrap_err();
        assert!(matches!(err, HalError::PersistenceError(_)));
    }

    #[test]
    fn preset_lookup_first_match_wins() {
        let (_dir, store) = store();
        store.ensure_dir().unwrap();
        fs::write(
            store.preset_path(),
            "garbage line\n1,door,10,20,0\n\n 3 ,desk, 90, 45, 10\n3,dup,0,0,0\n",
        )
        .unwrap();

        let preset = store.find_preset(3).unwrap().unwrap();
        assert_eq!(preset.name, "desk");
        assert_eq!(preset.position, NormalizedPosition::new(90, 45, 10));
        assert_eq!(store.find_preset(1).unwrap().unwrap().name, "door");
    }

    #[test]
    fn preset_miss_is_none() {
        let (_dir, store) = store();
        assert_eq!(store.find_preset(7).unwrap(), None);

        store.ensure_dir().unwrap();
        fs::write(store.preset_path(), "1,door,10,20,0\n").unwrap();
        assert_eq!(store.find_preset(7).unwrap(), None);
    }

    #[test]
    fn preset_requires_name_and_three_coordinates() {
        assert!(parse_preset("1,,10,20,0").is_none());
        assert!(parse_preset("1,door,10,20").is_none());
        assert!(parse_preset("x,door,10,20,0").is_none());
        assert!(parse_preset("1,door,10,20,0").is_some());
    }
}
