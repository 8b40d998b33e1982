use crate::error::RegistryError;
use crate::model::project::{absolute_path, ProjectFile};
use crate::parser::{Entity, SetIndex};
use std::path::Path;
use tracing::{debug, info, warn};

/// Result of [`ProjectRegistry::add_file`] when nothing went wrong.
#[derive(Debug)]
pub enum AddOutcome<'a> {
    Added(&'a ProjectFile),
    /// The same absolute path is already a member; nothing changed.
    AlreadyOpen,
}

/// The files of one open project.
///
/// All members share the project global id of the first file.
#[derive(Debug, Default)]
pub struct ProjectRegistry {
    files: Vec<ProjectFile>,
}

impl ProjectRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and appends an IFC file.
    ///
    /// # Errors
    ///
    /// [`RegistryError::FileNotFound`] and [`RegistryError::InvalidFileFormat`]
    /// for unreadable files, [`RegistryError::ProjectMismatch`] if the file
    /// belongs to another project, [`RegistryError::FilenameTaken`] if an
    /// open file has the same file name. The registry is unchanged on error.
    pub fn add_file<P: AsRef<Path>>(&mut self, path: P) -> Result<AddOutcome<'_>, RegistryError> {
        let abspath = absolute_path(path.as_ref())?;
        if self.files.iter().any(|f| f.abspath() == abspath) {
            debug!(path = %abspath.display(), "file already open");
            return Ok(AddOutcome::AlreadyOpen);
        }

        let file = ProjectFile::open(&abspath)?;
        self.admit(file)
    }

    /// Appends an already parsed file after the same checks as [`Self::add_file`].
    pub fn admit(&mut self, file: ProjectFile) -> Result<AddOutcome<'_>, RegistryError> {
        if self.files.iter().any(|f| f.abspath() == file.abspath()) {
            return Ok(AddOutcome::AlreadyOpen);
        }

        if let Some(expected) = self.project_guid() {
            if expected != file.project_guid() {
                warn!(
                    path = %file.abspath().display(),
                    expected,
                    found = file.project_guid(),
                    "file belongs to another project"
                );
                return Err(RegistryError::ProjectMismatch {
                    path: file.abspath().to_path_buf(),
                    expected: expected.to_string(),
                    found: file.project_guid().to_string(),
                });
            }
        }

        if let Some(taken) = self.file(file.filename()) {
            warn!(
                path = %file.abspath().display(),
                open = %taken.abspath().display(),
                "file name already open"
            );
            return Err(RegistryError::FilenameTaken {
                path: file.abspath().to_path_buf(),
                filename: file.filename().to_string(),
            });
        }

        info!(
            file = file.filename(),
            elements = file.count_elements(),
            "added file"
        );
        self.files.push(file);
        Ok(AddOutcome::Added(&self.files[self.files.len() - 1]))
    }

    /// Project global id shared by all files, `None` while empty.
    #[must_use]
    pub fn project_guid(&self) -> Option<&str> {
        self.files.first().map(ProjectFile::project_guid)
    }

    /// Finds an element by global id in one file, or in the first file that has it.
    #[must_use]
    pub fn get_by_guid(
        &self,
        guid: &str,
        filename: Option<&str>,
    ) -> Option<(&ProjectFile, Entity<'_>)> {
        match filename {
            Some(name) => {
                let file = self.file(name)?;
                file.model().by_guid(guid).map(|e| (file, e))
            }
            None => self
                .files
                .iter()
                .find_map(|file| file.model().by_guid(guid).map(|e| (file, e))),
        }
    }

    /// Resolves an entity by its numeric id within one file.
    #[must_use]
    pub fn get_by_local_id(&self, filename: &str, id: u64) -> Option<Entity<'_>> {
        self.file(filename)?.model().by_id(id)
    }

    #[must_use]
    pub fn file(&self, filename: &str) -> Option<&ProjectFile> {
        self.files.iter().find(|f| f.filename() == filename)
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ProjectFile> {
        self.files.get(index)
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    #[must_use]
    pub fn filenames(&self) -> Vec<&str> {
        self.files.iter().map(ProjectFile::filename).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ProjectFile> {
        self.files.iter()
    }

    /// Union of the property set index of all files.
    #[must_use]
    pub fn pset_index(&self) -> SetIndex {
        merge_indexes(self.files.iter().map(ProjectFile::pset_info))
    }

    /// Union of the quantity set index of all files.
    #[must_use]
    pub fn qset_index(&self) -> SetIndex {
        merge_indexes(self.files.iter().map(ProjectFile::qset_info))
    }
}

impl<'a> IntoIterator for &'a ProjectRegistry {
    type Item = &'a ProjectFile;
    type IntoIter = std::slice::Iter<'a, ProjectFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

pub(crate) fn merge_indexes<'a>(indexes: impl Iterator<Item = &'a SetIndex>) -> SetIndex {
    let mut merged = SetIndex::new();
    for index in indexes {
        for (set, members) in index {
            let names = merged.entry(set.clone()).or_default();
            for member in members {
                if !names.contains(member) {
                    names.push(member.clone());
                }
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::IfcModel;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn in_memory(name: &str, project: &str, extra: &str) -> ProjectFile {
        in_folder("/models", name, project, extra)
    }

    fn in_folder(folder: &str, name: &str, project: &str, extra: &str) -> ProjectFile {
        let content = format!(
            "ISO-10303-21;HEADER;FILE_SCHEMA(('IFC4'));ENDSEC;DATA;
#1=IFCPROJECT('{project}',$,'P',$,$,$,$,$,$);
{extra}
ENDSEC;END-ISO-10303-21;"
        );
        let model = IfcModel::parse(&content).unwrap();
        ProjectFile::from_model(PathBuf::from(folder).join(name), model, 0.0)
    }

    #[test]
    fn rejects_other_project_and_keeps_files() {
        let mut registry = ProjectRegistry::new();
        registry.admit(in_memory("a.ifc", "P1", "")).unwrap();

        let err = registry.admit(in_memory("b.ifc", "P2", "")).unwrap_err();
        assert!(matches!(err, RegistryError::ProjectMismatch { .. }));
        assert_eq!(registry.filenames(), vec!["a.ifc"]);
    }

    #[test]
    fn same_path_is_already_open() {
        let mut registry = ProjectRegistry::new();
        registry.admit(in_memory("a.ifc", "P1", "")).unwrap();
        let outcome = registry.admit(in_memory("a.ifc", "P1", "")).unwrap();
        assert!(matches!(outcome, AddOutcome::AlreadyOpen));
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn same_name_in_another_folder_is_rejected() {
        let mut registry = ProjectRegistry::new();
        registry.admit(in_memory("a.ifc", "P1", "")).unwrap();
        let err = registry
            .admit(in_folder("/elsewhere", "a.ifc", "P1", ""))
            .unwrap_err();
        assert!(matches!(err, RegistryError::FilenameTaken { ref filename, .. } if filename == "a.ifc"));
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn resolves_guids_across_files() {
        let mut registry = ProjectRegistry::new();
        registry
            .admit(in_memory("a.ifc", "P1", "#5=IFCWALL('G1',$,'A',$,$,$,$,$,$);"))
            .unwrap();
        registry
            .admit(in_memory("b.ifc", "P1", "#9=IFCWALL('G2',$,'B',$,$,$,$,$,$);"))
            .unwrap();

        let (file, entity) = registry.get_by_guid("G2", None).unwrap();
        assert_eq!(file.filename(), "b.ifc");
        assert_eq!(entity.id(), 9);
        assert!(registry.get_by_guid("G2", Some("a.ifc")).is_none());
        assert!(registry.get_by_guid("G1", Some("missing.ifc")).is_none());
        assert_eq!(registry.get_by_local_id("a.ifc", 5).unwrap().name(), Some("A"));
        assert!(registry.get_by_local_id("a.ifc", 99).is_none());
    }

    #[test]
    fn merges_set_indexes() {
        let mut a = SetIndex::new();
        a.insert("Pset_A".to_string(), vec!["x".to_string()]);
        let mut b = SetIndex::new();
        b.insert("Pset_A".to_string(), vec!["y".to_string(), "x".to_string()]);
        b.insert("Pset_B".to_string(), vec!["z".to_string()]);

        let merged = merge_indexes([&a, &b].into_iter());
        assert_eq!(merged["Pset_A"], vec!["x", "y"]);
        assert_eq!(merged["Pset_B"], vec!["z"]);
    }
}
