use crate::cli::{OrderParameterFlags, RunArgs};
use crate::error::{CliError, Result};
use gistpp::engine::config as core_config;
use nalgebra::Point3;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialGridConfig {
    center: Option<[f64; 3]>,
    dims: Option<[usize; 3]>,
    spacing: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
struct PartialPmeConfig {
    #[serde(rename = "ewald-coefficient")]
    ewald_coefficient: Option<f64>,
    tolerance: Option<f64>,
    #[serde(rename = "dispersion-decay")]
    dispersion_decay: Option<f64>,
    #[serde(rename = "spline-order")]
    spline_order: Option<usize>,
    #[serde(rename = "grid-spacing")]
    grid_spacing: Option<f64>,
    #[serde(rename = "max-grid-points")]
    max_grid_points: Option<usize>,
}

impl From<PartialPmeConfig> for core_config::PmeConfig {
    fn from(p: PartialPmeConfig) -> Self {
        let defaults = core_config::PmeConfig::default();
        Self {
            ewald_coefficient: p.ewald_coefficient.or(defaults.ewald_coefficient),
            tolerance: p.tolerance.unwrap_or(defaults.tolerance),
            dispersion_decay: p.dispersion_decay.unwrap_or(defaults.dispersion_decay),
            spline_order: p.spline_order.unwrap_or(defaults.spline_order),
            grid_spacing: p.grid_spacing.unwrap_or(defaults.grid_spacing),
            max_grid_points: p.max_grid_points.unwrap_or(defaults.max_grid_points),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct PartialEnergyConfig {
    cutoff: Option<f64>,
    #[serde(rename = "switch-width")]
    switch_width: Option<f64>,
    pme: Option<PartialPmeConfig>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct PartialGistConfig {
    forcefield: Option<PathBuf>,
    #[serde(rename = "water-model")]
    water_model: Option<String>,
    #[serde(rename = "order-parameter")]
    order_parameter: Option<bool>,
    grid: Option<PartialGridConfig>,
    energy: Option<PartialEnergyConfig>,
}

/// Everything the `run` command needs once file, flags and `--set` values
/// have been merged.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub forcefield_path: PathBuf,
    pub gist: core_config::GistConfig,
}

fn parse_value<T: FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value)))
}

impl PartialGistConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn merge_with_cli(mut self, args: &RunArgs) -> Result<RunConfig> {
        self.apply_set_values(&args.set_values)?;

        let grid = self.grid.take().unwrap_or_default();
        let energy = self.energy.take().unwrap_or_default();

        let forcefield_path = args
            .forcefield
            .clone()
            .or(self.forcefield.take())
            .ok_or_else(|| {
                CliError::Config(
                    "A value for 'forcefield' is required either in the config file or via CLI argument."
                        .to_string(),
                )
            })?;
        if !forcefield_path.exists() {
            return Err(CliError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Provided path does not exist: {}", forcefield_path.display()),
            )));
        }

        let water_model_name = args
            .water_model
            .as_ref()
            .or(self.water_model.as_ref())
            .ok_or_else(|| {
                CliError::Config(
                    "A value for 'water-model' is required either in the config file or via CLI argument."
                        .to_string(),
                )
            })?;
        let water_model = core_config::WaterModel::from_str(water_model_name)
            .map_err(|e| CliError::Config(e.to_string()))?;

        let mut builder = core_config::GistConfigBuilder::new()
            .water_model(water_model)
            .order_parameter(Self::merge_order_parameter(
                args.order_parameter,
                self.order_parameter,
            ));

        if let Some(center) = Self::merge_triple(args.grid_center.as_deref(), grid.center, "grid-center")? {
            builder = builder.grid_center(Point3::from(center));
        }
        if let Some(dims) = Self::merge_triple(args.grid_dims.as_deref(), grid.dims, "grid-dims")? {
            builder = builder.grid_dims(dims);
        }
        if let Some(spacing) = args.grid_spacing.or(grid.spacing) {
            builder = builder.grid_spacing(spacing);
        }
        if let Some(cutoff) = args.cutoff.or(energy.cutoff) {
            builder = builder.cutoff(cutoff);
        }
        if let Some(width) = args.switch_width.or(energy.switch_width) {
            builder = builder.switch_width(width);
        }

        let pme = match energy.pme {
            Some(partial) => Some(partial),
            None if args.pme => Some(PartialPmeConfig::default()),
            None => None,
        };
        if let Some(pme) = pme {
            builder = builder.pme(pme.into());
        }

        let gist = builder.build().map_err(|e| CliError::Config(e.to_string()))?;
        Ok(RunConfig {
            forcefield_path,
            gist,
        })
    }

    fn merge_order_parameter(cli_flags: OrderParameterFlags, file_val: Option<bool>) -> bool {
        if cli_flags.with_order {
            true
        } else if cli_flags.no_order {
            false
        } else {
            file_val.unwrap_or(false)
        }
    }

    fn merge_triple<T: Copy>(
        cli_val: Option<&[T]>,
        file_val: Option<[T; 3]>,
        key: &str,
    ) -> Result<Option<[T; 3]>> {
        match cli_val {
            Some(values) => <[T; 3]>::try_from(values).map(Some).map_err(|_| {
                CliError::Argument(format!("--{} expects exactly three values", key))
            }),
            None => Ok(file_val),
        }
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        if set_values.is_empty() {
            return Ok(());
        }
        for kv_pair in set_values {
            let Some((key, value_str)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };

            match key {
                "forcefield" => self.forcefield = Some(PathBuf::from(value_str)),
                "water-model" => self.water_model = Some(value_str.to_string()),
                "order-parameter" => {
                    self.order_parameter = Some(parse_value(key, value_str, "boolean")?);
                }
                "grid.spacing" => {
                    self.grid.get_or_insert_with(Default::default).spacing =
                        Some(parse_value(key, value_str, "float")?);
                }
                "energy.cutoff" => {
                    self.energy.get_or_insert_with(Default::default).cutoff =
                        Some(parse_value(key, value_str, "float")?);
                }
                "energy.switch-width" => {
                    self.energy.get_or_insert_with(Default::default).switch_width =
                        Some(parse_value(key, value_str, "float")?);
                }
                _ => {
                    if let Some(pme_key) = key.strip_prefix("energy.pme.") {
                        let pme = self
                            .energy
                            .get_or_insert_with(Default::default)
                            .pme
                            .get_or_insert_with(Default::default);
                        match pme_key {
                            "ewald-coefficient" => {
                                pme.ewald_coefficient = Some(parse_value(key, value_str, "float")?);
                            }
                            "tolerance" => {
                                pme.tolerance = Some(parse_value(key, value_str, "float")?);
                            }
                            "dispersion-decay" => {
                                pme.dispersion_decay = Some(parse_value(key, value_str, "float")?);
                            }
                            "spline-order" => {
                                pme.spline_order = Some(parse_value(key, value_str, "integer")?);
                            }
                            "grid-spacing" => {
                                pme.grid_spacing = Some(parse_value(key, value_str, "float")?);
                            }
                            "max-grid-points" => {
                                pme.max_grid_points = Some(parse_value(key, value_str, "integer")?);
                            }
                            _ => {
                                return Err(CliError::Config(format!(
                                    "Unsupported configuration key for --set: '{}'",
                                    key
                                )));
                            }
                        }
                    } else {
                        return Err(CliError::Config(format!(
                            "Unsupported configuration key for --set: '{}'",
                            key
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}
