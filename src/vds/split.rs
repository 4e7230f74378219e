//! Data file splitting for detectors that write a bounded number of frames per file.

use super::{DataType, FrameShape, VirtualSourceSpec};
use crate::error::LayoutError;
use std::path::{Path, PathBuf};

/// Frames per data file written by Eiger-style detectors.
pub const MAX_FRAMES_PER_DATASET: usize = 1000;

/// Digits of the numeric suffix of data file names.
const SUFFIX_DIGITS: usize = 6;

/// Naming scheme of the numbered data files belonging to a collection.
///
/// Derived from the master or meta file: `scan.nxs` and `scan_master.h5` give
/// `scan_000001.h5`, `scan_meta.h5` gives `scan_000001.h5`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFileTemplate {
    dir: PathBuf,
    head: String,
    tail: String,
}

impl DataFileTemplate {
    /// Derive the template from a `.nxs`, `*master*.h5` or `*meta*.h5` file name.
    pub fn from_master(path: &Path) -> Result<Self, LayoutError> {
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| LayoutError::InvalidSplit(format!("no file name in '{}'", path.display())))?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();

        let (head, tail) = match ext {
            "nxs" => (format!("{}_", stem), String::new()),
            "h5" => {
                let marker = ["master", "meta"]
                    .into_iter()
                    .find(|m| stem.contains(m))
                    .ok_or_else(|| {
                        LayoutError::InvalidSplit(format!(
                            "'{}' is neither a master nor a meta file",
                            path.display()
                        ))
                    })?;
                let at = stem.find(marker).unwrap_or_default();
                (stem[..at].to_string(), stem[at + marker.len()..].to_string())
            }
            _ => {
                return Err(LayoutError::InvalidSplit(format!(
                    "unexpected extension for '{}'",
                    path.display()
                )))
            }
        };
        Ok(Self { dir, head, tail })
    }

    /// Path of the `n`-th data file, numbered from 1.
    pub fn file_name(&self, n: usize) -> PathBuf {
        self.dir
            .join(format!("{}{:0width$}{}.h5", self.head, n, self.tail, width = SUFFIX_DIGITS))
    }
}

/// Declare the sources of a collection of `num_frames` frames written to
/// consecutive data files of at most `max_frames_per_file` frames each.
pub fn split_sources(
    template: &DataFileTemplate,
    num_frames: usize,
    frame_shape: FrameShape,
    dtype: DataType,
    max_frames_per_file: usize,
) -> Result<Vec<VirtualSourceSpec>, LayoutError> {
    if max_frames_per_file == 0 {
        return Err(LayoutError::InvalidSplit(
            "max_frames_per_file must be positive".to_string(),
        ));
    }
    let num_files = num_frames.div_ceil(max_frames_per_file);
    Ok((0..num_files)
        .map(|i| {
            let start = i * max_frames_per_file;
            VirtualSourceSpec::new(
                template.file_name(i + 1).to_string_lossy(),
                max_frames_per_file.min(num_frames - start),
                frame_shape,
                dtype,
                start,
            )
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_from_nexus_file() {
        let t = DataFileTemplate::from_master(Path::new("/data/scan.nxs")).unwrap();
        assert_eq!(t.file_name(1), PathBuf::from("/data/scan_000001.h5"));
    }

    #[test]
    fn template_from_master_and_meta_files() {
        let t = DataFileTemplate::from_master(Path::new("/data/scan_master.h5")).unwrap();
        assert_eq!(t.file_name(12), PathBuf::from("/data/scan_000012.h5"));
        let t = DataFileTemplate::from_master(Path::new("/data/scan_meta.h5")).unwrap();
        assert_eq!(t.file_name(3), PathBuf::from("/data/scan_000003.h5"));
    }

    #[test]
    fn template_rejects_plain_data_file() {
        assert!(DataFileTemplate::from_master(Path::new("/data/scan_000001.h5")).is_err());
        assert!(DataFileTemplate::from_master(Path::new("/data/scan.cbf")).is_err());
    }

    #[test]
    fn split_into_full_and_partial_files() {
        let t = DataFileTemplate::from_master(Path::new("scan.nxs")).unwrap();
        let sources = split_sources(&t, 1300, FrameShape::new(10, 10), DataType::U16, 1000).unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].frame_count, 1000);
        assert_eq!(sources[0].starting_logical_index, 0);
        assert_eq!(sources[1].frame_count, 300);
        assert_eq!(sources[1].starting_logical_index, 1000);
        assert_eq!(sources[1].path, "scan_000002.h5");
    }

    #[test]
    fn split_rejects_zero_file_size() {
        let t = DataFileTemplate::from_master(Path::new("scan.nxs")).unwrap();
        assert!(split_sources(&t, 10, FrameShape::new(1, 1), DataType::U8, 0).is_err());
    }
}
