use crate::error::RegistryError;
use crate::parser::{IfcModel, SetIndex};
use std::path::{Path, PathBuf};

/// One parsed IFC file of the open project.
///
/// Immutable once created; re-parsing is not supported.
#[derive(Debug)]
pub struct ProjectFile {
    abspath: PathBuf,
    filename: String,
    megabytes: f64,
    model: IfcModel,
    pset_info: SetIndex,
    qset_info: SetIndex,
}

impl ProjectFile {
    /// Opens and parses an IFC file.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::FileNotFound`] if the path does not exist.
    /// Returns [`RegistryError::InvalidFileFormat`] if the content is not IFC.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RegistryError> {
        let abspath = absolute_path(path.as_ref())?;
        let metadata = std::fs::metadata(&abspath).map_err(|_| RegistryError::FileNotFound {
            path: abspath.clone(),
        })?;

        let model = IfcModel::open(&abspath).map_err(|source| {
            RegistryError::InvalidFileFormat {
                path: abspath.clone(),
                source,
            }
        })?;

        let megabytes = (metadata.len() as f64 / 1_048_576.0 * 10.0).round() / 10.0;
        Ok(Self::from_model(abspath, model, megabytes))
    }

    /// Wraps an already parsed model, e.g. one parsed from memory.
    #[must_use]
    pub fn from_model(abspath: PathBuf, model: IfcModel, megabytes: f64) -> Self {
        let filename = abspath
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| abspath.to_string_lossy().to_string());
        let pset_info = model.pset_info();
        let qset_info = model.qset_info();

        Self {
            abspath,
            filename,
            megabytes,
            model,
            pset_info,
            qset_info,
        }
    }

    #[must_use]
    pub fn abspath(&self) -> &Path {
        &self.abspath
    }

    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    #[must_use]
    pub fn megabytes(&self) -> f64 {
        self.megabytes
    }

    #[must_use]
    pub fn model(&self) -> &IfcModel {
        &self.model
    }

    #[must_use]
    pub fn project_guid(&self) -> &str {
        self.model.project_guid()
    }

    /// Property set names with their property names.
    #[must_use]
    pub fn pset_info(&self) -> &SetIndex {
        &self.pset_info
    }

    /// Quantity set names with their quantity names.
    #[must_use]
    pub fn qset_info(&self) -> &SetIndex {
        &self.qset_info
    }

    #[must_use]
    pub fn count_elements(&self) -> usize {
        self.model.elements().len()
    }
}

pub(crate) fn absolute_path(path: &Path) -> Result<PathBuf, RegistryError> {
    std::path::absolute(path).map_err(|_| RegistryError::FileNotFound {
        path: path.to_path_buf(),
    })
}
