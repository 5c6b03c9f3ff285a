use std::fmt;

/// Chemical element, as far as the analysis needs to distinguish them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Element {
    Hydrogen,
    Carbon,
    Nitrogen,
    Oxygen,
    Sulfur,
    Phosphorus,
    /// Massless virtual site (e.g. the M site of TIP4P).
    VirtualSite,
    #[default]
    Other,
}

impl Element {
    /// Infers the element from an atom name or force-field type label.
    ///
    /// Leading digits are skipped (`1HW` is a hydrogen). Names starting with
    /// `EP`, `LP`, `MW` or `M` followed by a non-letter are treated as virtual
    /// sites.
    pub fn infer(label: &str) -> Self {
        let trimmed = label.trim_start_matches(|c: char| c.is_ascii_digit());
        let upper = trimmed.to_ascii_uppercase();
        if upper.starts_with("EP") || upper.starts_with("LP") || upper.starts_with("MW") {
            return Self::VirtualSite;
        }
        let mut chars = upper.chars();
        match (chars.next(), chars.next()) {
            (Some('M'), next) if next.map_or(true, |c| !c.is_ascii_alphabetic()) => {
                Self::VirtualSite
            }
            (Some('H'), _) => Self::Hydrogen,
            (Some('C'), Some('L')) => Self::Other,
            (Some('C'), _) => Self::Carbon,
            (Some('N'), Some('A')) => Self::Other,
            (Some('N'), _) => Self::Nitrogen,
            (Some('O'), _) => Self::Oxygen,
            (Some('S'), _) => Self::Sulfur,
            (Some('P'), _) => Self::Phosphorus,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Hydrogen => "H",
            Self::Carbon => "C",
            Self::Nitrogen => "N",
            Self::Oxygen => "O",
            Self::Sulfur => "S",
            Self::Phosphorus => "P",
            Self::VirtualSite => "EP",
            Self::Other => "X",
        };
        write!(f, "{symbol}")
    }
}

/// Static per-atom topology record.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Serial number as given in the input file.
    pub serial: usize,
    /// The name of the atom (e.g. "OW", "HW1", "CA").
    pub name: String,
    pub residue_name: String,
    pub residue_number: isize,
    pub chain_id: char,
    /// The force field atom type, used to look up Lennard-Jones parameters.
    pub force_field_type: String,
    pub element: Element,
    /// The partial atomic charge in elementary charge units.
    pub partial_charge: f64,
}

impl Atom {
    pub fn new(
        serial: usize,
        name: &str,
        residue_name: &str,
        residue_number: isize,
        force_field_type: &str,
        partial_charge: f64,
    ) -> Self {
        Self {
            serial,
            name: name.to_string(),
            residue_name: residue_name.to_string(),
            residue_number,
            chain_id: 'A',
            force_field_type: force_field_type.to_string(),
            element: Element::infer(name),
            partial_charge,
        }
    }
}
