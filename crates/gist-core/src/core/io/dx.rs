use crate::core::grid::VoxelGrid;
use itertools::Itertools;
use nalgebra::Point3;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

const VALUES_PER_LINE: usize = 3;

#[derive(Debug, Error)]
pub enum DxError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("Expected {expected} values for the grid but found {found}")]
    ValueCount { expected: usize, found: usize },
    #[error("Grid has {grid} voxels but {values} values were supplied")]
    Mismatch { grid: usize, values: usize },
    #[error("Only axis-aligned grids with uniform spacing are supported")]
    UnsupportedDelta,
}

/// Writes a scalar field in OpenDX format, three values per line.
pub fn write_dx(
    writer: &mut impl Write,
    grid: &VoxelGrid,
    values: &[f64],
) -> Result<(), DxError> {
    if values.len() != grid.len() {
        return Err(DxError::Mismatch {
            grid: grid.len(),
            values: values.len(),
        });
    }
    let [nx, ny, nz] = grid.dims();
    let origin = grid.origin();
    let s = grid.spacing();

    writeln!(writer, "object 1 class gridpositions counts {nx} {ny} {nz}")?;
    writeln!(writer, "origin {} {} {}", origin.x, origin.y, origin.z)?;
    writeln!(writer, "delta {s} 0 0")?;
    writeln!(writer, "delta 0 {s} 0")?;
    writeln!(writer, "delta 0 0 {s}")?;
    writeln!(writer, "object 2 class gridconnections counts {nx} {ny} {nz}")?;
    writeln!(
        writer,
        "object 3 class array type double rank 0 items {} data follows",
        values.len()
    )?;
    for chunk in values.chunks(VALUES_PER_LINE) {
        writeln!(writer, "{}", chunk.iter().join(" "))?;
    }
    Ok(())
}

pub fn write_dx_path<P: AsRef<Path>>(
    path: P,
    grid: &VoxelGrid,
    values: &[f64],
) -> Result<(), DxError> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_dx(&mut writer, grid, values)?;
    writer.flush()?;
    Ok(())
}

/// Reads a scalar field written by [`write_dx`].
pub fn read_dx(reader: &mut impl BufRead) -> Result<(VoxelGrid, Vec<f64>), DxError> {
    let mut counts: Option<[usize; 3]> = None;
    let mut origin: Option<Point3<f64>> = None;
    let mut deltas: Vec<[f64; 3]> = Vec::new();
    let mut values: Vec<f64> = Vec::new();
    let mut in_data = false;

    for (line_num, line_res) in reader.lines().enumerate() {
        let line = line_res?;
        let line_num = line_num + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let parse_err = |message: String| DxError::Parse {
            line: line_num,
            message,
        };

        if in_data {
            if trimmed.starts_with("attribute") || trimmed.starts_with("object") {
                break;
            }
            for token in trimmed.split_whitespace() {
                let v = token
                    .parse::<f64>()
                    .map_err(|_| parse_err(format!("invalid value '{token}'")))?;
                values.push(v);
            }
            continue;
        }

        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        match tokens.first().copied() {
            Some("object") if trimmed.contains("gridpositions") => {
                let n = parse_trailing::<usize, 3>(&tokens)
                    .ok_or_else(|| parse_err("malformed gridpositions counts".into()))?;
                counts = Some(n);
            }
            Some("object") if trimmed.contains("data follows") => in_data = true,
            Some("object") => {}
            Some("origin") => {
                let o = parse_trailing::<f64, 3>(&tokens)
                    .ok_or_else(|| parse_err("malformed origin".into()))?;
                origin = Some(Point3::new(o[0], o[1], o[2]));
            }
            Some("delta") => {
                let d = parse_trailing::<f64, 3>(&tokens)
                    .ok_or_else(|| parse_err("malformed delta".into()))?;
                deltas.push(d);
            }
            _ => return Err(parse_err(format!("unexpected record '{trimmed}'"))),
        }
    }

    let dims = counts.ok_or(DxError::Parse {
        line: 0,
        message: "missing gridpositions record".into(),
    })?;
    let origin = origin.ok_or(DxError::Parse {
        line: 0,
        message: "missing origin record".into(),
    })?;
    if deltas.len() != 3 {
        return Err(DxError::UnsupportedDelta);
    }
    let spacing = deltas[0][0];
    let axis_aligned = (0..3).all(|i| {
        (0..3).all(|j| {
            if i == j {
                deltas[i][j] == spacing
            } else {
                deltas[i][j] == 0.0
            }
        })
    });
    if !axis_aligned {
        return Err(DxError::UnsupportedDelta);
    }

    let grid = VoxelGrid::with_origin(origin, dims, spacing);
    if values.len() != grid.len() {
        return Err(DxError::ValueCount {
            expected: grid.len(),
            found: values.len(),
        });
    }
    Ok((grid, values))
}

pub fn read_dx_path<P: AsRef<Path>>(path: P) -> Result<(VoxelGrid, Vec<f64>), DxError> {
    let mut reader = BufReader::new(File::open(path)?);
    read_dx(&mut reader)
}

fn parse_trailing<T: std::str::FromStr + Copy + Default, const N: usize>(
    tokens: &[&str],
) -> Option<[T; N]> {
    if tokens.len() < N {
        return None;
    }
    let mut out = [T::default(); N];
    for (slot, token) in out.iter_mut().zip(&tokens[tokens.len() - N..]) {
        *slot = token.parse().ok()?;
    }
    Some(out)
}
