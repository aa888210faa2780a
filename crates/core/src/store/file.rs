//! YAML-on-disk record store.
//!
//! ## Storage Layout
//!
//! ```text
//! <root>/
//!   transfusions/
//!     <s1>/<s2>/<record-id>/record.yaml
//!     by-patient/
//!       <s1>/<s2>/<patient-id>/<record-id>     # empty index marker
//!   admissions/
//!     ...
//! ```
//!
//! where `s1`/`s2` are the first four hex characters of the id. Writes go to a
//! temporary file that is renamed over `record.yaml`, so readers never see a
//! truncated record.

use super::{sort_newest_first, Record, RecordStore};
use crate::constants::{BY_PATIENT_DIR_NAME, RECORD_FILENAME};
use crate::error::{WardError, WardResult};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use ward_uuid::RecordId;

#[derive(Clone, Debug)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens (creating if needed) a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`WardError::DirCreation`] if the root directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> WardResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(WardError::DirCreation)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_dir<R: Record>(&self) -> PathBuf {
        self.root.join(R::COLLECTION)
    }

    fn record_path<R: Record>(&self, id: RecordId) -> PathBuf {
        id.sharded_dir(&self.collection_dir::<R>())
            .join(RECORD_FILENAME)
    }

    fn patient_index_dir<R: Record>(&self, patient_id: RecordId) -> PathBuf {
        patient_id.sharded_dir(&self.collection_dir::<R>().join(BY_PATIENT_DIR_NAME))
    }
}

fn parse_record<R: Record>(path: &Path, contents: &str) -> WardResult<R> {
    let deserializer = serde_yaml::Deserializer::from_str(contents);
    serde_path_to_error::deserialize::<_, R>(deserializer).map_err(|err| {
        let field = err.path().to_string();
        let field = if field.is_empty() || field == "." {
            "<root>".to_string()
        } else {
            field
        };
        WardError::YamlDeserialization {
            path: path.display().to_string(),
            field,
            message: err.into_inner().to_string(),
        }
    })
}

impl RecordStore for FileStore {
    fn get<R: Record>(&self, id: RecordId) -> WardResult<R> {
        let path = self.record_path::<R>(id);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(WardError::not_found(R::KIND, id))
            }
            Err(e) => return Err(WardError::FileRead(e)),
        };
        parse_record(&path, &contents)
    }

    fn put<R: Record>(&self, record: &R) -> WardResult<()> {
        let yaml = serde_yaml::to_string(record).map_err(WardError::YamlSerialization)?;

        let path = self.record_path::<R>(record.id());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(WardError::DirCreation)?;
        }
        let tmp_path = path.with_extension("yaml.tmp");
        fs::write(&tmp_path, yaml).map_err(WardError::FileWrite)?;
        fs::rename(&tmp_path, &path).map_err(WardError::FileWrite)?;

        let index_dir = self.patient_index_dir::<R>(record.patient_id());
        fs::create_dir_all(&index_dir).map_err(WardError::DirCreation)?;
        let marker = index_dir.join(record.id().to_string());
        if !marker.exists() {
            fs::write(&marker, b"").map_err(WardError::FileWrite)?;
        }
        Ok(())
    }

    fn list_for_patient<R: Record>(&self, patient_id: RecordId) -> WardResult<Vec<R>> {
        let index_dir = self.patient_index_dir::<R>(patient_id);
        let entries = match fs::read_dir(&index_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(WardError::FileRead(e)),
        };

        let mut records = Vec::new();
        for entry in entries {
            let entry = entry.map_err(WardError::FileRead)?;
            let name = entry.file_name();
            let Some(id) = name.to_str().and_then(|n| RecordId::parse(n).ok()) else {
                tracing::warn!("ignoring unexpected index entry: {}", entry.path().display());
                continue;
            };

            match self.get::<R>(id) {
                Ok(record) if record.patient_id() == patient_id => records.push(record),
                Ok(_) => {
                    tracing::warn!("stale patient index entry for {} {}", R::KIND, id);
                }
                Err(e) if e.is_not_found() => {
                    tracing::warn!("dangling patient index entry for {} {}", R::KIND, id);
                }
                Err(e) => return Err(e),
            }
        }

        sort_newest_first(&mut records);
        Ok(records)
    }
}
