use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use log::info;

use crate::{
    error::{Error, Result},
    kfold::Fold,
    loader::Dataset,
    serialize::{write_set, AttributeMode},
};

pub const DEFAULT_PREFIX: &str = "iscx2012ddos";

/// `<root>/train` and `<root>/test`, created on demand.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
    prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenSet {
    pub path: PathBuf,
    pub records: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFold {
    pub number: usize,
    pub training: WrittenSet,
    pub testing: WrittenSet,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            prefix: prefix.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn train_dir(&self) -> PathBuf {
        self.root.join("train")
    }

    pub fn test_dir(&self) -> PathBuf {
        self.root.join("test")
    }

    pub fn training_file(&self, fold: usize) -> PathBuf {
        self.train_dir()
            .join(format!("{}_training_set_fold_{fold}.xml", self.prefix))
    }

    pub fn testing_file(&self, fold: usize) -> PathBuf {
        self.test_dir()
            .join(format!("{}_testing_set_fold_{fold}.xml", self.prefix))
    }

    /// Creates the directory tree. Existing directories and their contents
    /// are left alone.
    pub fn prepare(&self) -> Result<()> {
        for (dir, what) in [
            (self.root.clone(), "output"),
            (self.train_dir(), "training set"),
            (self.test_dir(), "testing set"),
        ] {
            if dir.is_dir() {
                info!("{what} directory {} already exists, continuing", dir.display());
            } else {
                info!("creating {what} directory {}", dir.display());
                fs::create_dir_all(&dir).map_err(|e| Error::write(&dir, e))?;
            }
        }
        Ok(())
    }

    /// Writes the training (small) and testing (large) file of every fold.
    pub fn write_folds(
        &self,
        dataset: &Dataset,
        folds: &[Fold],
        mode: AttributeMode,
    ) -> Result<Vec<WrittenFold>> {
        self.prepare()?;

        let mut written = Vec::with_capacity(folds.len());
        for fold in folds {
            let training = self.write_one(
                &self.training_file(fold.number),
                &format!("training_set_{}", fold.number),
                dataset,
                &fold.small_labeled_fold,
                mode,
            )?;
            let testing = self.write_one(
                &self.testing_file(fold.number),
                &format!("testing_set_{}", fold.number),
                dataset,
                &fold.large_labeled_fold,
                mode,
            )?;
            written.push(WrittenFold {
                number: fold.number,
                training,
                testing,
            });
        }
        Ok(written)
    }

    fn write_one(
        &self,
        path: &Path,
        set_name: &str,
        dataset: &Dataset,
        indices: &[usize],
        mode: AttributeMode,
    ) -> Result<WrittenSet> {
        info!("writing {} records to {}", indices.len(), path.display());
        let file = fs::File::create(path).map_err(|e| Error::write(path, e))?;
        let records = indices.iter().map(|&i| &dataset.records[i]);
        let mut writer = write_set(io::BufWriter::new(file), set_name, records, mode)
            .map_err(|e| Error::write(path, e))?;
        writer.flush().map_err(|e| Error::write(path, e))?;

        Ok(WrittenSet {
            path: path.to_path_buf(),
            records: indices.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{loader::read_flow_file, record::FlowRecord};

    fn dataset(n: usize) -> Dataset {
        let records = (0..n)
            .map(|i| FlowRecord::new("flow").with_field("id", &i.to_string()))
            .collect();
        Dataset {
            records,
            labels: Vec::new(),
        }
    }

    #[test]
    fn file_names_follow_the_fold_number() {
        let layout = OutputLayout::new("/out", DEFAULT_PREFIX);
        assert_eq!(
            layout.training_file(2),
            Path::new("/out/train/iscx2012ddos_training_set_fold_2.xml")
        );
        assert_eq!(
            layout.testing_file(5),
            Path::new("/out/test/iscx2012ddos_testing_set_fold_5.xml")
        );
    }

    #[test]
    fn prepare_keeps_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path().join("sets"), DEFAULT_PREFIX);
        layout.prepare().unwrap();

        let keep = layout.train_dir().join("notes.txt");
        fs::write(&keep, "keep me").unwrap();
        layout.prepare().unwrap();

        assert_eq!(fs::read_to_string(keep).unwrap(), "keep me");
        assert!(layout.test_dir().is_dir());
    }

    #[test]
    fn writes_members_to_training_and_complement_to_testing() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path(), "unit");
        let dataset = dataset(4);
        let folds = [Fold {
            number: 1,
            small_labeled_fold: vec![2],
            large_labeled_fold: vec![0, 1, 3],
        }];

        let written = layout
            .write_folds(&dataset, &folds, AttributeMode::Drop)
            .unwrap();
        assert_eq!(written[0].training.records, 1);
        assert_eq!(written[0].testing.records, 3);

        let training = read_flow_file(&layout.training_file(1)).unwrap();
        assert_eq!(training.len(), 1);
        assert_eq!(training[0].element, "training_set_1");
        assert_eq!(training[0].get("id"), Some("2"));

        let testing = read_flow_file(&layout.testing_file(1)).unwrap();
        let ids: Vec<_> = testing.iter().map(|r| r.get("id").unwrap()).collect();
        assert_eq!(ids, ["0", "1", "3"]);
    }

    #[test]
    fn rewriting_a_fold_overwrites_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path(), DEFAULT_PREFIX);
        let dataset = dataset(3);
        let big = [Fold {
            number: 1,
            small_labeled_fold: vec![0, 1],
            large_labeled_fold: vec![2],
        }];
        let small = [Fold {
            number: 1,
            small_labeled_fold: vec![1],
            large_labeled_fold: vec![0, 2],
        }];

        layout.write_folds(&dataset, &big, AttributeMode::Drop).unwrap();
        layout.write_folds(&dataset, &small, AttributeMode::Drop).unwrap();
        assert_eq!(read_flow_file(&layout.training_file(1)).unwrap().len(), 1);
    }

    #[test]
    fn unwritable_root_is_a_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "").unwrap();

        let layout = OutputLayout::new(blocker.join("sets"), DEFAULT_PREFIX);
        assert!(matches!(layout.prepare(), Err(Error::Write { .. })));
    }
}
