use crate::core::models::atom::Atom;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// 12-6 Lennard-Jones parameters of one force-field atom type.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct VdwParam {
    /// Position of the potential minimum, in Å.
    pub radius: f64,
    /// Well depth, in kcal/mol.
    pub well_depth: f64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct NonBondedParams {
    pub vdw: HashMap<String, VdwParam>,
}

#[derive(Debug, Clone)]
pub struct Forcefield {
    pub non_bonded: NonBondedParams,
}

/// `A/r^12 - B/r^6` coefficients of one type pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LjPair {
    pub a: f64,
    pub b: f64,
}

impl LjPair {
    /// Arithmetic-mean radius and geometric-mean well depth.
    pub fn combine(p1: &VdwParam, p2: &VdwParam) -> Self {
        let r_min = 0.5 * (p1.radius + p2.radius);
        let well_depth = (p1.well_depth * p2.well_depth).sqrt();
        let r6 = r_min.powi(6);
        Self {
            a: well_depth * r6 * r6,
            b: 2.0 * well_depth * r6,
        }
    }
}

/// Dense symmetric table of pair coefficients indexed by type.
#[derive(Debug, Clone, PartialEq)]
pub struct LjTable {
    type_count: usize,
    type_names: Vec<String>,
    pairs: Vec<LjPair>,
}

impl LjTable {
    pub fn from_params(names: Vec<String>, params: &[VdwParam]) -> Self {
        let n = params.len();
        let mut pairs = vec![LjPair::default(); n * n];
        for i in 0..n {
            for j in 0..n {
                pairs[i * n + j] = LjPair::combine(&params[i], &params[j]);
            }
        }
        Self {
            type_count: n,
            type_names: names,
            pairs,
        }
    }

    #[inline]
    pub fn type_count(&self) -> usize {
        self.type_count
    }

    #[inline]
    pub fn type_name(&self, t: usize) -> &str {
        &self.type_names[t]
    }

    #[inline]
    pub fn get(&self, ti: usize, tj: usize) -> LjPair {
        self.pairs[ti * self.type_count + tj]
    }
}

#[derive(Debug, Error)]
pub enum ParamError {
    #[error("No van der Waals parameters for force-field type '{ff_type}' (atom {atom})")]
    MissingVdw { ff_type: String, atom: usize },
}

#[derive(Debug, Error)]
pub enum ParamLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

impl Forcefield {
    pub fn load(non_bonded_path: &Path) -> Result<Self, ParamLoadError> {
        let non_bonded = Self::load_non_bonded(non_bonded_path)?;
        Ok(Self { non_bonded })
    }

    pub fn from_vdw(vdw: HashMap<String, VdwParam>) -> Self {
        Self {
            non_bonded: NonBondedParams { vdw },
        }
    }

    fn load_non_bonded(path: &Path) -> Result<NonBondedParams, ParamLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| ParamLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ParamLoadError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }

    /// Assigns a Lennard-Jones type index to every atom and builds the pair
    /// table for the types actually present, in order of first appearance.
    pub fn assign_lj(&self, atoms: &[Atom]) -> Result<(Vec<usize>, LjTable), ParamError> {
        let mut index_of: HashMap<&str, usize> = HashMap::new();
        let mut names = Vec::new();
        let mut params = Vec::new();
        let mut types = Vec::with_capacity(atoms.len());

        for (i, atom) in atoms.iter().enumerate() {
            let key = atom.force_field_type.as_str();
            let t = match index_of.get(key) {
                Some(&t) => t,
                None => {
                    let param = self.non_bonded.vdw.get(key).ok_or_else(|| {
                        ParamError::MissingVdw {
                            ff_type: key.to_string(),
                            atom: i,
                        }
                    })?;
                    let t = params.len();
                    params.push(*param);
                    names.push(key.to_string());
                    index_of.insert(key, t);
                    t
                }
            };
            types.push(t);
        }

        Ok((types, LjTable::from_params(names, &params)))
    }
}
