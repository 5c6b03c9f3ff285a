use super::dx::{DxError, write_dx};
use super::table::{TableError, write_columns, write_pair_energies, write_series};
use super::traits::GistSink;
use crate::core::grid::VoxelGrid;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

const TABLE_TITLE: &str = "GIST Output, information printed per voxel";

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("File I/O error for '{path}': {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("Failed to write volumetric file '{path}': {source}")]
    Dx { path: PathBuf, source: DxError },
    #[error("Failed to write table '{path}': {source}")]
    Table { path: PathBuf, source: TableError },
}

/// Writes every output as a file in one directory.
///
/// Fields become `gist-<name>.dx`, series and tables `gist-<name>.dat`, and
/// pair listings `<name>.dat`.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self, SinkError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| SinkError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn field_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("gist-{name}.dx"))
    }

    pub fn data_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("gist-{name}.dat"))
    }

    pub fn pair_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.dat"))
    }

    fn create(path: &Path) -> Result<BufWriter<File>, SinkError> {
        File::create(path)
            .map(BufWriter::new)
            .map_err(|source| SinkError::Io {
                path: path.to_path_buf(),
                source,
            })
    }

    fn finish(path: &Path, mut writer: BufWriter<File>) -> Result<(), SinkError> {
        writer.flush().map_err(|source| SinkError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl GistSink for DirectorySink {
    type Error = SinkError;

    fn write_series(&mut self, name: &str, values: &[f64]) -> Result<(), SinkError> {
        let path = self.data_path(name);
        let mut writer = Self::create(&path)?;
        write_series(&mut writer, name, values).map_err(|source| SinkError::Table {
            path: path.clone(),
            source,
        })?;
        Self::finish(&path, writer)
    }

    fn write_field(
        &mut self,
        name: &str,
        grid: &VoxelGrid,
        values: &[f64],
    ) -> Result<(), SinkError> {
        let path = self.field_path(name);
        let mut writer = Self::create(&path)?;
        write_dx(&mut writer, grid, values).map_err(|source| SinkError::Dx {
            path: path.clone(),
            source,
        })?;
        Self::finish(&path, writer)
    }

    fn write_table(
        &mut self,
        name: &str,
        headers: &[&str],
        columns: &[&[f64]],
    ) -> Result<(), SinkError> {
        let path = self.data_path(name);
        let mut writer = Self::create(&path)?;
        write_columns(&mut writer, TABLE_TITLE, headers, columns).map_err(|source| {
            SinkError::Table {
                path: path.clone(),
                source,
            }
        })?;
        Self::finish(&path, writer)
    }

    fn write_pair_energies(
        &mut self,
        name: &str,
        entries: &[(usize, usize, f64)],
    ) -> Result<(), SinkError> {
        let path = self.pair_path(name);
        let mut writer = Self::create(&path)?;
        write_pair_energies(&mut writer, entries).map_err(|source| SinkError::Table {
            path: path.clone(),
            source,
        })?;
        Self::finish(&path, writer)
    }
}

/// Keeps every output in memory, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub series: BTreeMap<String, Vec<f64>>,
    pub fields: BTreeMap<String, Vec<f64>>,
    pub tables: BTreeMap<String, (Vec<String>, Vec<Vec<f64>>)>,
    pub pair_energies: BTreeMap<String, Vec<(usize, usize, f64)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(&self, name: &str) -> Option<&[f64]> {
        self.fields.get(name).map(Vec::as_slice)
    }
}

impl GistSink for MemorySink {
    type Error = Infallible;

    fn write_series(&mut self, name: &str, values: &[f64]) -> Result<(), Infallible> {
        self.series.insert(name.to_string(), values.to_vec());
        Ok(())
    }

    fn write_field(
        &mut self,
        name: &str,
        _grid: &VoxelGrid,
        values: &[f64],
    ) -> Result<(), Infallible> {
        self.fields.insert(name.to_string(), values.to_vec());
        Ok(())
    }

    fn write_table(
        &mut self,
        name: &str,
        headers: &[&str],
        columns: &[&[f64]],
    ) -> Result<(), Infallible> {
        self.tables.insert(
            name.to_string(),
            (
                headers.iter().map(|h| h.to_string()).collect(),
                columns.iter().map(|c| c.to_vec()).collect(),
            ),
        );
        Ok(())
    }

    fn write_pair_energies(
        &mut self,
        name: &str,
        entries: &[(usize, usize, f64)],
    ) -> Result<(), Infallible> {
        self.pair_energies.insert(name.to_string(), entries.to_vec());
        Ok(())
    }
}
