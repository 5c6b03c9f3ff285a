use nalgebra::Point3;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number density of bulk water (55.5 M) in molecules per Å³.
pub const BULK_DENSITY: f64 = 0.033422885325;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{parameter}': {reason}")]
    Invalid {
        parameter: &'static str,
        reason: String,
    },
    #[error("Unknown water model '{0}' (expected tip3p, tip4p or tip4pew)")]
    UnknownWaterModel(String),
}

/// Water model whose bulk pair energy serves as the energy reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaterModel {
    Tip3p,
    Tip4p,
    Tip4pEw,
}

impl WaterModel {
    /// Bulk water-water interaction energy per molecule in kcal/mol.
    pub fn bulk_energy(self) -> f64 {
        match self {
            WaterModel::Tip3p => -19.0653,
            WaterModel::Tip4p | WaterModel::Tip4pEw => -22.06,
        }
    }
}

impl FromStr for WaterModel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tip3p" => Ok(WaterModel::Tip3p),
            "tip4p" => Ok(WaterModel::Tip4p),
            "tip4pew" | "tip4p-ew" => Ok(WaterModel::Tip4pEw),
            _ => Err(ConfigError::UnknownWaterModel(s.to_string())),
        }
    }
}

impl fmt::Display for WaterModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WaterModel::Tip3p => "tip3p",
            WaterModel::Tip4p => "tip4p",
            WaterModel::Tip4pEw => "tip4pew",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridConfig {
    pub center: Point3<f64>,
    pub dims: [usize; 3],
    pub spacing: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            center: Point3::origin(),
            dims: [40, 40, 40],
            spacing: 0.5,
        }
    }
}

/// Particle-mesh Ewald options.
#[derive(Debug, Clone, PartialEq)]
pub struct PmeConfig {
    /// Explicit splitting coefficient in Å⁻¹; derived from `tolerance` when absent.
    pub ewald_coefficient: Option<f64>,
    pub tolerance: f64,
    /// A value `<= 0` selects the long-range dispersion correction; a positive
    /// value selects LJ-PME.
    pub dispersion_decay: f64,
    pub spline_order: usize,
    /// Target reciprocal grid spacing in Å.
    pub grid_spacing: f64,
    pub max_grid_points: usize,
}

impl Default for PmeConfig {
    fn default() -> Self {
        Self {
            ewald_coefficient: None,
            tolerance: 1e-5,
            dispersion_decay: -1.0,
            spline_order: 6,
            grid_spacing: 1.0,
            max_grid_points: 512,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnergyMode {
    /// Plain Coulomb plus Lennard-Jones within the cutoff.
    Direct,
    /// Self, direct and reciprocal Ewald terms with a dispersion policy.
    Pme(PmeConfig),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnergyConfig {
    pub cutoff: f64,
    /// Width of the van der Waals switching region ending at the cutoff; zero disables it.
    pub switch_width: f64,
    pub mode: EnergyMode,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            cutoff: 8.0,
            switch_width: 0.0,
            mode: EnergyMode::Direct,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GistConfig {
    pub grid: GridConfig,
    pub water_model: WaterModel,
    pub order_parameter: bool,
    pub energy: EnergyConfig,
}

#[derive(Default)]
pub struct GistConfigBuilder {
    grid_center: Option<Point3<f64>>,
    grid_dims: Option<[usize; 3]>,
    grid_spacing: Option<f64>,
    water_model: Option<WaterModel>,
    order_parameter: Option<bool>,
    cutoff: Option<f64>,
    switch_width: Option<f64>,
    pme: Option<PmeConfig>,
}

impl GistConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grid_center(mut self, center: Point3<f64>) -> Self {
        self.grid_center = Some(center);
        self
    }
    pub fn grid_dims(mut self, dims: [usize; 3]) -> Self {
        self.grid_dims = Some(dims);
        self
    }
    pub fn grid_spacing(mut self, spacing: f64) -> Self {
        self.grid_spacing = Some(spacing);
        self
    }
    pub fn water_model(mut self, model: WaterModel) -> Self {
        self.water_model = Some(model);
        self
    }
    pub fn order_parameter(mut self, enabled: bool) -> Self {
        self.order_parameter = Some(enabled);
        self
    }
    pub fn cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = Some(cutoff);
        self
    }
    pub fn switch_width(mut self, width: f64) -> Self {
        self.switch_width = Some(width);
        self
    }
    pub fn pme(mut self, pme: PmeConfig) -> Self {
        self.pme = Some(pme);
        self
    }

    pub fn build(self) -> Result<GistConfig, ConfigError> {
        let defaults = GridConfig::default();
        let grid = GridConfig {
            center: self.grid_center.unwrap_or(defaults.center),
            dims: self.grid_dims.unwrap_or(defaults.dims),
            spacing: self.grid_spacing.unwrap_or(defaults.spacing),
        };
        let energy_defaults = EnergyConfig::default();
        let energy = EnergyConfig {
            cutoff: self.cutoff.unwrap_or(energy_defaults.cutoff),
            switch_width: self.switch_width.unwrap_or(energy_defaults.switch_width),
            mode: self.pme.map_or(EnergyMode::Direct, EnergyMode::Pme),
        };
        let config = GistConfig {
            grid,
            water_model: self
                .water_model
                .ok_or(ConfigError::MissingParameter("water_model"))?,
            order_parameter: self.order_parameter.unwrap_or(false),
            energy,
        };
        config.validate()?;
        Ok(config)
    }
}

fn invalid(parameter: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        parameter,
        reason: reason.into(),
    }
}

impl GistConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.grid.spacing > 0.0) {
            return Err(invalid("grid_spacing", "must be positive"));
        }
        if self.grid.dims.iter().any(|&n| n == 0) {
            return Err(invalid("grid_dims", "every dimension must be at least 1"));
        }
        if !self.grid.center.coords.iter().all(|c| c.is_finite()) {
            return Err(invalid("grid_center", "must be finite"));
        }

        let energy = &self.energy;
        if !(energy.cutoff > 0.0) {
            return Err(invalid("cutoff", "must be positive"));
        }
        if !(energy.switch_width >= 0.0 && energy.switch_width < energy.cutoff) {
            return Err(invalid(
                "switch_width",
                format!("must lie in [0, cutoff = {})", energy.cutoff),
            ));
        }

        if let EnergyMode::Pme(pme) = &energy.mode {
            if let Some(beta) = pme.ewald_coefficient {
                if !(beta > 0.0) {
                    return Err(invalid("ewald_coefficient", "must be positive"));
                }
            }
            if !(pme.tolerance > 0.0 && pme.tolerance < 1.0) {
                return Err(invalid("tolerance", "must lie in (0, 1)"));
            }
            if pme.spline_order < 3 {
                return Err(invalid("spline_order", "must be at least 3"));
            }
            if !(pme.grid_spacing > 0.0) {
                return Err(invalid("pme_grid_spacing", "must be positive"));
            }
            if pme.max_grid_points < pme.spline_order {
                return Err(invalid(
                    "max_grid_points",
                    "must be at least the spline order",
                ));
            }
        }
        Ok(())
    }

    #[inline]
    pub fn is_pme(&self) -> bool {
        matches!(self.energy.mode, EnergyMode::Pme(_))
    }
}
