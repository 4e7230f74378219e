//! HDF5 encoder.
//!
//! Axis chains become groups of 1-D position datasets carrying the NeXus
//! transformation attributes. The virtual layout is written as a mapping table
//! under `/entry/data/layout` alongside the logical array shape and fill value.

use super::{ChainRecord, Encoder};
use crate::error::{AppResult, NexgenError};
use crate::scan::ScanPointSet;
use crate::vds::{LayoutSegment, VirtualLayoutPlan};
use hdf5::types::VarLenUnicode;
use hdf5::{File, Group, Location};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const LAYOUT_GROUP: &str = "/entry/data/layout";
const SCAN_GROUP: &str = "/entry/scan";

/// Encoder writing an HDF5 file.
pub struct Hdf5Encoder {
    path: PathBuf,
    file: Option<File>,
}

impl Hdf5Encoder {
    /// Create (truncate) the output file.
    pub fn create(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(&path)?;
        write_str_attr(&file, "software_version", env!("CARGO_PKG_VERSION"))?;
        write_str_attr(&file, "file_time", &chrono::Utc::now().to_rfc3339())?;
        Ok(Self {
            path,
            file: Some(file),
        })
    }

    fn file(&self) -> AppResult<&File> {
        self.file
            .as_ref()
            .ok_or_else(|| NexgenError::Storage(format!("'{}' already closed", self.path.display())))
    }
}

/// Open `path` below the file root, creating missing groups on the way.
fn ensure_group(file: &File, path: &str) -> AppResult<Group> {
    let mut group: Group = file.group("/")?;
    for part in path.split('/').filter(|p| !p.is_empty()) {
        group = if group.link_exists(part) {
            group.group(part)?
        } else {
            group.create_group(part)?
        };
    }
    Ok(group)
}

fn write_str_attr(location: &Location, name: &str, value: &str) -> AppResult<()> {
    let value: VarLenUnicode = value
        .parse()
        .map_err(|e| NexgenError::Storage(format!("attribute '{}': {}", name, e)))?;
    location
        .new_attr::<VarLenUnicode>()
        .create(name)?
        .write_scalar(&value)?;
    Ok(())
}

fn write_f64_array(group: &Group, name: &str, values: &[f64]) -> AppResult<hdf5::Dataset> {
    let dataset = group.new_dataset::<f64>().shape(values.len()).create(name)?;
    dataset.write_raw(values)?;
    Ok(dataset)
}

fn write_u64_array(group: &Group, name: &str, values: &[u64]) -> AppResult<()> {
    group
        .new_dataset::<u64>()
        .shape(values.len())
        .create(name)?
        .write_raw(values)?;
    Ok(())
}

impl Encoder for Hdf5Encoder {
    fn write_chain(&mut self, chain: &ChainRecord) -> AppResult<()> {
        let group = ensure_group(self.file()?, &chain.group)?;
        write_str_attr(&group, "NX_class", "NXtransformations")?;
        for axis in &chain.axes {
            let dataset = write_f64_array(&group, &axis.name, &axis.positions)?;
            write_str_attr(&dataset, "depends_on", &axis.depends_on)?;
            write_str_attr(&dataset, "transformation_type", &axis.transformation_type.to_string())?;
            write_str_attr(&dataset, "units", &axis.units)?;
            dataset
                .new_attr::<f64>()
                .shape(3)
                .create("vector")?
                .write_raw(&axis.vector[..])?;
            dataset
                .new_attr::<f64>()
                .shape(3)
                .create("offset")?
                .write_raw(&axis.offset[..])?;
        }
        debug!(chain = %chain.name, axes = chain.axes.len(), "Chain written");
        Ok(())
    }

    fn write_scan(&mut self, scan: &ScanPointSet) -> AppResult<()> {
        let group = ensure_group(self.file()?, SCAN_GROUP)?;
        group
            .new_attr::<u64>()
            .create("num_frames")?
            .write_scalar(&(scan.len() as u64))?;
        for name in scan.axes() {
            if let Some(values) = scan.column(name) {
                write_f64_array(&group, name, &values)?;
            }
        }
        Ok(())
    }

    fn write_layout(&mut self, layout: &VirtualLayoutPlan, fill_value: i64) -> AppResult<()> {
        let group = ensure_group(self.file()?, LAYOUT_GROUP)?;
        let (frames, rows, cols) = layout.shape();
        group
            .new_attr::<u64>()
            .shape(3)
            .create("shape")?
            .write_raw(&[frames as u64, rows as u64, cols as u64][..])?;
        group
            .new_attr::<i64>()
            .create("fill_value")?
            .write_scalar(&fill_value)?;
        group
            .new_attr::<u64>()
            .create("logical_offset")?
            .write_scalar(&(layout.logical_offset() as u64))?;
        write_str_attr(&group, "dtype", &layout.dtype().to_string())?;

        let paths = layout
            .sources()
            .iter()
            .map(|src| {
                src.path
                    .parse::<VarLenUnicode>()
                    .map_err(|e| NexgenError::Storage(format!("source '{}': {}", src.path, e)))
            })
            .collect::<AppResult<Vec<_>>>()?;
        group
            .new_dataset::<VarLenUnicode>()
            .shape(paths.len())
            .create("sources")?
            .write_raw(paths.as_slice())?;

        let mut logical_start = Vec::new();
        let mut logical_end = Vec::new();
        let mut source_index = Vec::new();
        let mut local_start = Vec::new();
        for segment in layout.segments() {
            logical_start.push(segment.logical().start as u64);
            logical_end.push(segment.logical().end as u64);
            match segment {
                LayoutSegment::Backed { source, local, .. } => {
                    source_index.push(*source as i64);
                    local_start.push(local.start as u64);
                }
                LayoutSegment::Unbacked { .. } => {
                    source_index.push(-1);
                    local_start.push(0);
                }
            }
        }
        write_u64_array(&group, "logical_start", &logical_start)?;
        write_u64_array(&group, "logical_end", &logical_end)?;
        write_u64_array(&group, "local_start", &local_start)?;
        group
            .new_dataset::<i64>()
            .shape(source_index.len())
            .create("source_index")?
            .write_raw(source_index.as_slice())?;
        Ok(())
    }

    fn finish(&mut self) -> AppResult<()> {
        let file = self
            .file
            .take()
            .ok_or_else(|| NexgenError::Storage(format!("'{}' already closed", self.path.display())))?;
        file.flush()?;
        info!("HDF5 file written to '{}'", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vds::{plan, DataType, FrameShape, VirtualSourceSpec};
    use tempfile::tempdir;

    #[test]
    fn layout_table_written() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("collection.h5");
        let layout = plan(
            &[VirtualSourceSpec::new("a.h5", 100, FrameShape::new(4, 4), DataType::U16, 0)],
            150,
            0,
        )
        .unwrap();

        let mut encoder = Hdf5Encoder::create(&path).unwrap();
        encoder.write_layout(&layout, -1).unwrap();
        encoder.finish().unwrap();

        let file = File::open(&path).unwrap();
        let ends: Vec<u64> = file.dataset("entry/data/layout/logical_end").unwrap().read_raw().unwrap();
        assert_eq!(ends, vec![100, 150]);
        let index: Vec<i64> = file.dataset("entry/data/layout/source_index").unwrap().read_raw().unwrap();
        assert_eq!(index, vec![0, -1]);
    }
}
