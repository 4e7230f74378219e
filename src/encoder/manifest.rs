use super::{ChainRecord, Encoder};
use crate::error::{AppResult, NexgenError};
use crate::scan::ScanPointSet;
use crate::vds::VirtualLayoutPlan;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

/// Everything an encoder was handed, as one serialisable document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionManifest {
    /// RFC 3339 creation time.
    pub generated_at: String,
    /// Version of the writing crate.
    pub software_version: String,
    /// Chains in the order they were written.
    pub chains: Vec<ChainRecord>,
    /// Scanning axis positions.
    pub scan: Option<ScanPointSet>,
    /// Logical-to-physical frame mapping.
    pub layout: Option<VirtualLayoutPlan>,
    /// Value unbacked frames read as.
    pub fill_value: Option<i64>,
}

impl Default for CollectionManifest {
    fn default() -> Self {
        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            software_version: env!("CARGO_PKG_VERSION").to_string(),
            chains: Vec::new(),
            scan: None,
            layout: None,
            fill_value: None,
        }
    }
}

/// Encoder writing a JSON manifest.
///
/// With no output path the manifest is only kept in memory, which makes the
/// encoder usable as a dry run.
#[derive(Debug, Default)]
pub struct ManifestEncoder {
    path: Option<PathBuf>,
    manifest: CollectionManifest,
    finished: bool,
}

impl ManifestEncoder {
    /// Encoder writing to `path` on [`Encoder::finish`].
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            ..Default::default()
        }
    }

    /// Encoder that keeps the manifest in memory only.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// The manifest built so far.
    pub fn manifest(&self) -> &CollectionManifest {
        &self.manifest
    }

    /// Consume the encoder, returning the manifest.
    pub fn into_manifest(self) -> CollectionManifest {
        self.manifest
    }

    fn ensure_open(&self) -> AppResult<()> {
        if self.finished {
            return Err(NexgenError::Storage("manifest already finished".to_string()));
        }
        Ok(())
    }
}

impl Encoder for ManifestEncoder {
    fn write_chain(&mut self, chain: &ChainRecord) -> AppResult<()> {
        self.ensure_open()?;
        self.manifest.chains.push(chain.clone());
        Ok(())
    }

    fn write_scan(&mut self, scan: &ScanPointSet) -> AppResult<()> {
        self.ensure_open()?;
        self.manifest.scan = Some(scan.clone());
        Ok(())
    }

    fn write_layout(&mut self, layout: &VirtualLayoutPlan, fill_value: i64) -> AppResult<()> {
        self.ensure_open()?;
        self.manifest.layout = Some(layout.clone());
        self.manifest.fill_value = Some(fill_value);
        Ok(())
    }

    fn finish(&mut self) -> AppResult<()> {
        self.ensure_open()?;
        self.finished = true;
        if let Some(path) = &self.path {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(writer, &self.manifest)?;
            info!("Manifest written to '{}'", path.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vds::{plan, DataType, FrameShape, VirtualSourceSpec};
    use tempfile::tempdir;

    #[test]
    fn manifest_written_to_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("manifest.json");
        let layout = plan(
            &[VirtualSourceSpec::new("a.h5", 10, FrameShape::new(4, 4), DataType::U16, 0)],
            12,
            0,
        )
        .unwrap();

        let mut encoder = ManifestEncoder::new(&path);
        encoder.write_layout(&layout, -1).unwrap();
        encoder.finish().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let back: CollectionManifest = serde_json::from_str(&text).unwrap();
        assert_eq!(back.layout.unwrap().unbacked_ranges(), vec![10..12]);
        assert_eq!(back.fill_value, Some(-1));
    }

    #[test]
    fn writes_after_finish_are_rejected() {
        let mut encoder = ManifestEncoder::in_memory();
        encoder.finish().unwrap();
        assert!(encoder.finish().is_err());
    }
}
