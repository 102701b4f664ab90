//! YAML file store.
//!
//! Each record lives in its own sharded directory as `record.yaml`. Writes go to a sibling
//! temp file that is renamed into place, so a reader never sees a half-written record.

use super::{Record, Store};
use crate::constants::RECORD_FILENAME;
use crate::{ClinicError, ClinicResult};
use clinic_uuid::RecordId;
use std::fs;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

pub struct YamlStore<T> {
    root: PathBuf,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> YamlStore<T> {
    /// Opens the store for `T` at `<data_dir>/<T::KIND>`, creating it if needed.
    pub fn open(data_dir: &Path) -> ClinicResult<Self> {
        let root = data_dir.join(T::KIND);
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            _record: PhantomData,
        })
    }

    fn record_path(&self, id: &RecordId) -> PathBuf {
        id.sharded_dir(&self.root).join(RECORD_FILENAME)
    }

    fn write_record(&self, path: &Path, record: &T) -> ClinicResult<()> {
        let yaml = serde_yaml::to_string(record).map_err(ClinicError::YamlSerialization)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("yaml.tmp");
        fs::write(&tmp, yaml)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    fn read_record(path: &Path) -> ClinicResult<T> {
        let raw = fs::read_to_string(path)?;
        let de = serde_yaml::Deserializer::from_str(&raw);
        serde_path_to_error::deserialize(de).map_err(|e| ClinicError::YamlDeserialization {
            path: format!("{}: {}", path.display(), e.path()),
            source: e.into_inner(),
        })
    }

    /// Paths of every `record.yaml` under `<root>/<s1>/<s2>/<id>/`.
    fn record_paths(&self) -> ClinicResult<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for s1 in subdirs(&self.root)? {
            for s2 in subdirs(&s1)? {
                for record_dir in subdirs(&s2)? {
                    let path = record_dir.join(RECORD_FILENAME);
                    if path.is_file() {
                        paths.push(path);
                    }
                }
            }
        }
        Ok(paths)
    }
}

fn subdirs(dir: &Path) -> ClinicResult<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut dirs = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    Ok(dirs)
}

impl<T: Record> Store<T> for YamlStore<T> {
    fn insert(&self, record: T) -> ClinicResult<()> {
        let path = self.record_path(&record.id());
        if path.exists() {
            return Err(ClinicError::Conflict(format!(
                "{} {} already exists",
                T::KIND,
                record.id()
            )));
        }
        self.write_record(&path, &record)
    }

    fn get(&self, id: &RecordId) -> ClinicResult<Option<T>> {
        let path = self.record_path(id);
        if !path.is_file() {
            return Ok(None);
        }
        Self::read_record(&path).map(Some)
    }

    fn update(&self, record: T) -> ClinicResult<()> {
        let path = self.record_path(&record.id());
        if !path.is_file() {
            return Err(ClinicError::not_found(T::KIND, record.id()));
        }
        self.write_record(&path, &record)
    }

    fn list(&self) -> ClinicResult<Vec<T>> {
        let mut records = Vec::new();
        for path in self.record_paths()? {
            match Self::read_record(&path) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!("skipping unreadable {} record: {}", T::KIND, e);
                }
            }
        }
        records.sort_by_key(|r| r.id());
        Ok(records)
    }

    fn remove(&self, id: &RecordId) -> ClinicResult<()> {
        let dir = id.sharded_dir(&self.root);
        if !dir.join(RECORD_FILENAME).is_file() {
            return Err(ClinicError::not_found(T::KIND, id));
        }
        fs::remove_dir_all(&dir)?;
        Ok(())
    }
}
