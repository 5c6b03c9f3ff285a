use super::traits::FrameSource;
use crate::core::forcefield::params::Forcefield;
use crate::core::models::atom::Atom;
use crate::core::models::frame::Frame;
use crate::core::models::topology::{Topology, TopologyBuilder, TopologyError};
use crate::core::space::unit_cell::{CellError, UnitCell};
use nalgebra::Point3;
use phf::phf_set;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

/// Residue names treated as solvent water.
static SOLVENT_RESIDUES: phf::Set<&'static str> = phf_set! {
    "WAT", "HOH", "H2O", "SOL", "TIP", "T3P", "T4P", "T4E", "SPC", "TP3", "TP4",
};

pub fn is_solvent_residue(name: &str) -> bool {
    SOLVENT_RESIDUES.contains(name)
}

#[derive(Debug, Error)]
pub enum BgfError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: BgfParseErrorKind,
    },
    #[error("Inconsistent data: {0}")]
    Inconsistency(String),
    #[error("Missing required record: {0}")]
    MissingRecord(String),
    #[error("Invalid topology: {0}")]
    Topology(#[from] TopologyError),
    #[error("Invalid periodic box on line {line}: {source}")]
    Cell { line: usize, source: CellError },
}

#[derive(Debug, Error)]
pub enum BgfParseErrorKind {
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: String, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: String, value: String },
    #[error("Required field in columns {columns} is empty")]
    MissingRequiredField { columns: String },
    #[error("Line is too short for ATOM/HETATM record (must be at least 80 chars)")]
    LineTooShort,
    #[error("CRYSTX record requires six numeric values")]
    InvalidCrystx,
}

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end.min(line.len())).unwrap_or("").trim()
}

fn parse_float(line: &str, start: usize, end: usize, line_num: usize) -> Result<f64, BgfError> {
    let field = slice_and_trim(line, start, end);
    field.parse().map_err(|_| BgfError::Parse {
        line: line_num,
        kind: BgfParseErrorKind::InvalidFloat {
            columns: format!("{}-{}", start + 1, end),
            value: field.into(),
        },
    })
}

fn parse_int<T: std::str::FromStr>(
    line: &str,
    start: usize,
    end: usize,
    line_num: usize,
) -> Result<T, BgfError> {
    let field = slice_and_trim(line, start, end);
    field.parse().map_err(|_| BgfError::Parse {
        line: line_num,
        kind: BgfParseErrorKind::InvalidInt {
            columns: format!("{}-{}", start + 1, end),
            value: field.into(),
        },
    })
}

#[derive(Debug, Clone)]
struct AtomRecord {
    hetero: bool,
    atom: Atom,
    position: Point3<f64>,
}

#[derive(Debug, Default)]
struct Block {
    atoms: Vec<AtomRecord>,
    conect: Vec<(usize, usize)>,
    crystx: Option<(usize, [f64; 6])>,
}

fn parse_atom_line(line: &str, line_num: usize, hetero: bool) -> Result<AtomRecord, BgfError> {
    if line.len() < 80 {
        return Err(BgfError::Parse {
            line: line_num,
            kind: BgfParseErrorKind::LineTooShort,
        });
    }
    let name = slice_and_trim(line, 13, 18);
    if name.is_empty() {
        return Err(BgfError::Parse {
            line: line_num,
            kind: BgfParseErrorKind::MissingRequiredField {
                columns: "14-18".into(),
            },
        });
    }
    let ff_type = slice_and_trim(line, 61, 66);
    if ff_type.is_empty() {
        return Err(BgfError::Parse {
            line: line_num,
            kind: BgfParseErrorKind::MissingRequiredField {
                columns: "62-66".into(),
            },
        });
    }

    let serial: usize = parse_int(line, 7, 12, line_num)?;
    let residue_name = slice_and_trim(line, 19, 22);
    let chain_id = slice_and_trim(line, 23, 24).chars().next().unwrap_or('A');
    let residue_number: isize = parse_int(line, 25, 30, line_num)?;
    let x = parse_float(line, 30, 40, line_num)?;
    let y = parse_float(line, 40, 50, line_num)?;
    let z = parse_float(line, 50, 60, line_num)?;
    let charge = parse_float(line, 72, 80, line_num)?;

    let mut atom = Atom::new(serial, name, residue_name, residue_number, ff_type, charge);
    atom.chain_id = chain_id;
    Ok(AtomRecord {
        hetero,
        atom,
        position: Point3::new(x, y, z),
    })
}

fn parse_crystx(line: &str, line_num: usize) -> Result<[f64; 6], BgfError> {
    let values: Vec<f64> = line
        .split_whitespace()
        .skip(1)
        .map(str::parse)
        .collect::<Result<_, _>>()
        .map_err(|_| BgfError::Parse {
            line: line_num,
            kind: BgfParseErrorKind::InvalidCrystx,
        })?;
    values.get(..6).and_then(|v| v.try_into().ok()).ok_or(BgfError::Parse {
        line: line_num,
        kind: BgfParseErrorKind::InvalidCrystx,
    })
}

/// A multi-frame BGF trajectory.
///
/// Frames are consecutive BGF blocks, each terminated by `END`. The first
/// block defines the topology (names, residues, force-field types, charges
/// and `CONECT` bonds); later blocks must list the same atoms in the same
/// order and only contribute coordinates and the `CRYSTX` box.
pub struct BgfTrajectory<R: BufRead> {
    reader: R,
    line_num: usize,
    topology: Topology,
    first_frame: Option<Frame>,
}

impl BgfTrajectory<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P, forcefield: &Forcefield) -> Result<Self, BgfError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), forcefield)
    }
}

impl<R: BufRead> BgfTrajectory<R> {
    pub fn from_reader(mut reader: R, forcefield: &Forcefield) -> Result<Self, BgfError> {
        let mut line_num = 0;
        let block = read_block(&mut reader, &mut line_num, true)?
            .ok_or_else(|| BgfError::MissingRecord("ATOM/HETATM records".into()))?;

        let first_frame = frame_from_block(&block)?;
        let topology = build_topology(&block, forcefield)?;
        Ok(Self {
            reader,
            line_num,
            topology,
            first_frame: Some(first_frame),
        })
    }
}

impl<R: BufRead> FrameSource for BgfTrajectory<R> {
    type Error = BgfError;

    fn topology(&self) -> &Topology {
        &self.topology
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, BgfError> {
        if let Some(frame) = self.first_frame.take() {
            return Ok(Some(frame));
        }
        let Some(block) = read_block(&mut self.reader, &mut self.line_num, false)? else {
            return Ok(None);
        };
        if block.atoms.len() != self.topology.atom_count() {
            return Err(BgfError::Inconsistency(format!(
                "Frame ending on line {} has {} atoms, topology has {}",
                self.line_num,
                block.atoms.len(),
                self.topology.atom_count()
            )));
        }
        frame_from_block(&block).map(Some)
    }
}

fn read_block(
    reader: &mut impl BufRead,
    line_num: &mut usize,
    with_bonds: bool,
) -> Result<Option<Block>, BgfError> {
    let mut block = Block::default();
    let mut saw_record = false;
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        *line_num += 1;
        let content = line.trim_end_matches(['\n', '\r']);
        let record_type = slice_and_trim(content, 0, 6);

        match record_type {
            "ATOM" | "HETATM" => {
                saw_record = true;
                let record = parse_atom_line(content, *line_num, record_type == "HETATM")?;
                block.atoms.push(record);
            }
            "CRYSTX" => {
                saw_record = true;
                block.crystx = Some((*line_num, parse_crystx(content, *line_num)?));
            }
            "CONECT" if with_bonds => {
                let serials: Vec<usize> = content
                    .split_whitespace()
                    .skip(1)
                    .filter_map(|s| s.parse().ok())
                    .collect();
                if let Some((&center, partners)) = serials.split_first() {
                    block.conect.extend(partners.iter().map(|&p| (center, p)));
                }
            }
            "END" => {
                if saw_record {
                    break;
                }
            }
            _ => {}
        }
    }

    if !saw_record {
        return Ok(None);
    }
    if block.atoms.is_empty() {
        return Err(BgfError::MissingRecord(format!(
            "ATOM/HETATM records in block ending on line {}",
            line_num
        )));
    }
    Ok(Some(block))
}

fn frame_from_block(block: &Block) -> Result<Frame, BgfError> {
    let cell = match block.crystx {
        Some((line, [a, b, c, alpha, beta, gamma])) => Some(
            UnitCell::from_box([a, b, c], [alpha, beta, gamma])
                .map_err(|source| BgfError::Cell { line, source })?,
        ),
        None => None,
    };
    let positions = block.atoms.iter().map(|r| r.position).collect();
    Ok(Frame::new(positions, cell))
}

/// Solvent residues become one molecule each. Consecutive `ATOM` residues of
/// one chain form a single molecule; every `HETATM` residue stands alone.
fn build_topology(block: &Block, forcefield: &Forcefield) -> Result<Topology, BgfError> {
    let mut builder = TopologyBuilder::new();
    let mut index_of_serial: HashMap<usize, usize> = HashMap::new();
    let mut previous: Option<(char, isize, bool, bool)> = None;

    for record in &block.atoms {
        let atom = &record.atom;
        let solvent = is_solvent_residue(&atom.residue_name);
        let key = (atom.chain_id, atom.residue_number, record.hetero, solvent);
        let new_molecule = match previous {
            None => true,
            Some((chain, residue, hetero, was_solvent)) => {
                let new_residue = chain != key.0 || residue != key.1;
                if solvent || was_solvent || hetero || record.hetero {
                    new_residue || was_solvent != solvent || hetero != record.hetero
                } else {
                    chain != key.0
                }
            }
        };
        if new_molecule {
            builder.start_molecule(solvent);
        }
        previous = Some(key);

        let index = builder.add_atom(atom.clone());
        if index_of_serial.insert(atom.serial, index).is_some() {
            return Err(BgfError::Inconsistency(format!(
                "Duplicate atom serial: {}",
                atom.serial
            )));
        }
    }

    for &(s1, s2) in &block.conect {
        match (index_of_serial.get(&s1), index_of_serial.get(&s2)) {
            (Some(&i), Some(&j)) => {
                builder.add_bond(i, j);
            }
            _ => {
                return Err(BgfError::Inconsistency(format!(
                    "CONECT references unknown atom serial ({s1}, {s2})"
                )));
            }
        }
    }

    Ok(builder.build(forcefield)?)
}
