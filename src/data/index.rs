use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use serde::Deserialize;

use crate::error::DatasetError;

#[derive(Debug, Deserialize)]
struct IndexRow {
    filename: String,
    label: String,
}

/// Label -> filenames map built from a `filename,label` CSV.
///
/// Preserves first-seen order: filenames keep file order within their label
/// group, label groups keep the order in which labels first appear.
#[derive(Debug, Clone, Default)]
pub struct LabelIndex {
    groups: Vec<(String, Vec<String>)>,
    positions: HashMap<String, usize>,
}

impl LabelIndex {
    pub fn from_csv(path: &Path) -> Result<Self, DatasetError> {
        let file = File::open(path).map_err(|source| DatasetError::IndexNotFound {
            path: path.to_path_buf(),
            source,
        })?;
        let mut reader = csv::Reader::from_reader(file);

        let headers = reader
            .headers()
            .map_err(|err| Self::format_error(path, err.to_string()))?
            .clone();
        if headers != vec!["filename", "label"] {
            return Err(Self::format_error(
                path,
                format!("expected header `filename,label`, got `{}`", headers.iter().collect::<Vec<_>>().join(",")),
            ));
        }

        let mut index = Self::default();
        for row in reader.deserialize::<IndexRow>() {
            let row = row.map_err(|err| Self::format_error(path, err.to_string()))?;
            index.push(row.label, row.filename);
        }
        Ok(index)
    }

    pub fn push(&mut self, label: String, filename: String) {
        match self.positions.get(&label) {
            Some(&pos) => self.groups[pos].1.push(filename),
            None => {
                self.positions.insert(label.clone(), self.groups.len());
                self.groups.push((label, vec![filename]));
            }
        }
    }

    /// Number of distinct labels.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.groups
            .iter()
            .map(|(label, files)| (label.as_str(), files.as_slice()))
    }

    fn format_error(path: &Path, reason: String) -> DatasetError {
        DatasetError::Format {
            path: path.to_path_buf(),
            reason,
        }
    }
}

/// Dense class ids over a [`LabelIndex`], offset by a caller-supplied start
/// index so several splits can share one global label space.
///
/// Class ids used for lookup (`filenames_for`, `label_for_class`) are the
/// local `0..class_count` range; `global_label_for` returns the offset id.
#[derive(Debug, Clone)]
pub struct ClassRoster {
    files: Vec<Vec<String>>,
    names: Vec<String>,
    labels: HashMap<String, usize>,
    start_index: usize,
}

impl ClassRoster {
    pub fn new(index: LabelIndex, start_index: usize) -> Self {
        let mut files = Vec::with_capacity(index.len());
        let mut names = Vec::with_capacity(index.len());
        let mut labels = HashMap::with_capacity(index.len());
        for (i, (label, group)) in index.groups.into_iter().enumerate() {
            labels.insert(label.clone(), i + start_index);
            names.push(label);
            files.push(group);
        }
        Self {
            files,
            names,
            labels,
            start_index,
        }
    }

    pub fn class_count(&self) -> usize {
        self.files.len()
    }

    pub fn filenames_for(&self, class_id: usize) -> &[String] {
        &self.files[class_id]
    }

    pub fn label_for_class(&self, class_id: usize) -> &str {
        &self.names[class_id]
    }

    /// Global (offset) integer label for a label string, if known.
    pub fn global_label_for(&self, label: &str) -> Option<i64> {
        self.labels.get(label).map(|&id| id as i64)
    }

    pub fn start_index(&self) -> usize {
        self.start_index
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn temp_csv(tag: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mi-index-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("index.csv");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn preserves_first_seen_order() {
        let path = temp_csv(
            "order",
            "filename,label\n\
             b1.jpg,beta\n\
             a1.jpg,alpha\n\
             b2.jpg,beta\n\
             a2.jpg,alpha\n",
        );
        let index = LabelIndex::from_csv(&path).unwrap();

        let groups: Vec<_> = index.iter().collect();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "beta");
        assert_eq!(groups[0].1, ["b1.jpg", "b2.jpg"]);
        assert_eq!(groups[1].0, "alpha");
        assert_eq!(groups[1].1, ["a1.jpg", "a2.jpg"]);
    }

    #[test]
    fn missing_file_is_index_not_found() {
        let err = LabelIndex::from_csv(Path::new("/nonexistent/train.csv")).unwrap_err();
        assert!(matches!(err, DatasetError::IndexNotFound { .. }));
    }

    #[test]
    fn wrong_header_is_format_error() {
        let path = temp_csv("header", "file,class\na.jpg,alpha\n");
        let err = LabelIndex::from_csv(&path).unwrap_err();
        assert!(matches!(err, DatasetError::Format { .. }));
    }

    #[test]
    fn ragged_row_is_format_error() {
        let path = temp_csv("ragged", "filename,label\na.jpg,alpha,extra\n");
        let err = LabelIndex::from_csv(&path).unwrap_err();
        assert!(matches!(err, DatasetError::Format { .. }));
    }

    #[test]
    fn roster_assigns_offset_ids() {
        let mut index = LabelIndex::default();
        index.push("beta".into(), "b1.jpg".into());
        index.push("alpha".into(), "a1.jpg".into());
        index.push("beta".into(), "b2.jpg".into());

        let roster = ClassRoster::new(index, 10);
        assert_eq!(roster.class_count(), 2);
        assert_eq!(roster.start_index(), 10);
        assert_eq!(roster.filenames_for(0), ["b1.jpg", "b2.jpg"]);
        assert_eq!(roster.label_for_class(1), "alpha");
        assert_eq!(roster.global_label_for("beta"), Some(10));
        assert_eq!(roster.global_label_for("alpha"), Some(11));
        assert_eq!(roster.global_label_for("gamma"), None);
    }
}
