use std::io::{self, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV writing error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Column '{name}' has {found} rows, expected {expected}")]
    RaggedColumn {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("{headers} headers supplied for {columns} columns")]
    HeaderCount { headers: usize, columns: usize },
}

fn space_delimited<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .from_writer(writer)
}

/// Writes a titled, space-delimited column table: one title line, one header
/// row, then one row per index of the columns.
pub fn write_columns<W: Write>(
    mut writer: W,
    title: &str,
    headers: &[&str],
    columns: &[&[f64]],
) -> Result<(), TableError> {
    if headers.len() != columns.len() {
        return Err(TableError::HeaderCount {
            headers: headers.len(),
            columns: columns.len(),
        });
    }
    let rows = columns.first().map_or(0, |c| c.len());
    for (name, column) in headers.iter().zip(columns) {
        if column.len() != rows {
            return Err(TableError::RaggedColumn {
                name: name.to_string(),
                expected: rows,
                found: column.len(),
            });
        }
    }

    writeln!(writer, "{title}")?;
    let mut csv = space_delimited(writer);
    csv.write_record(headers)?;
    let mut record = Vec::with_capacity(columns.len());
    for row in 0..rows {
        record.clear();
        record.extend(columns.iter().map(|c| c[row].to_string()));
        csv.write_record(&record)?;
    }
    csv.flush()?;
    Ok(())
}

/// Writes `higher lower energy` rows of the voxel-pair energy listing.
pub fn write_pair_energies<W: Write>(
    writer: W,
    entries: &[(usize, usize, f64)],
) -> Result<(), TableError> {
    let mut csv = space_delimited(writer);
    for &(hi, lo, energy) in entries {
        csv.write_record([hi.to_string(), lo.to_string(), energy.to_string()])?;
    }
    csv.flush()?;
    Ok(())
}

/// Writes a per-frame series as `frame value` rows under a `#Frame name` header.
pub fn write_series<W: Write>(
    mut writer: W,
    name: &str,
    values: &[f64],
) -> Result<(), TableError> {
    writeln!(writer, "#Frame {name}")?;
    let mut csv = space_delimited(writer);
    for (frame, value) in values.iter().enumerate() {
        csv.write_record([(frame + 1).to_string(), value.to_string()])?;
    }
    csv.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_columns_emits_title_header_and_rows() {
        let mut buffer = Vec::new();
        let x = [0.25, 0.75];
        let n = [3.0, 0.0];
        let columns: [&[f64]; 2] = [&x, &n];
        write_columns(&mut buffer, "GIST Output", &["xcoord", "population"], &columns).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text, "GIST Output\nxcoord population\n0.25 3\n0.75 0\n");
    }

    #[test]
    fn write_columns_rejects_ragged_columns() {
        let mut buffer = Vec::new();
        let columns: [&[f64]; 2] = [&[1.0, 2.0], &[1.0]];
        let result = write_columns(&mut buffer, "t", &["a", "b"], &columns);
        assert!(matches!(result, Err(TableError::RaggedColumn { .. })));
    }

    #[test]
    fn write_columns_rejects_header_count_mismatch() {
        let mut buffer = Vec::new();
        let columns: [&[f64]; 2] = [&[1.0], &[2.0]];
        let result = write_columns(&mut buffer, "t", &["a"], &columns);
        assert!(matches!(result, Err(TableError::HeaderCount { .. })));
    }

    #[test]
    fn write_pair_energies_writes_one_row_per_entry() {
        let mut buffer = Vec::new();
        write_pair_energies(&mut buffer, &[(5, 2, -0.5), (9, 0, 1.25)]).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "5 2 -0.5\n9 0 1.25\n");
    }

    #[test]
    fn write_series_numbers_frames_from_one() {
        let mut buffer = Vec::new();
        write_series(&mut buffer, "Eww", &[-1.0, -2.5]).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "#Frame Eww\n1 -1\n2 -2.5\n");
    }
}
