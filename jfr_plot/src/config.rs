use config::{Config, ConfigError, File, FileFormat};
use std::{
    env,
    path::{Path, PathBuf},
};

use crate::defaults;
use crate::stats::ReductionFunc;

/// Name of the project local configuration file, searched upward from the
/// current directory.
pub const LOCAL_CONFIG_FILE_NAME: &str = ".jfrplotconfig";

const APP_CONFIG_DIR: &str = "jfr-plot";

/// User wide config file (XDG_CONFIG_HOME or ~/.config/jfr-plot/config.toml)
pub fn system_config_path() -> Option<PathBuf> {
    if let Ok(xdg_config_home) = env::var("XDG_CONFIG_HOME") {
        Some(
            Path::new(&xdg_config_home)
                .join(APP_CONFIG_DIR)
                .join("config.toml"),
        )
    } else {
        dirs_next::home_dir().map(|home| home.join(".config").join(APP_CONFIG_DIR).join("config.toml"))
    }
}

/// Nearest `.jfrplotconfig` in `start` or one of its ancestors.
pub fn find_local_config_from(start: &Path) -> Option<PathBuf> {
    let mut current_dir = start.to_path_buf();
    loop {
        let candidate = current_dir.join(LOCAL_CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current_dir.pop() {
            return None;
        }
    }
}

pub fn find_local_config() -> Option<PathBuf> {
    env::current_dir()
        .ok()
        .and_then(|dir| find_local_config_from(&dir))
}

/// Builds a config from the given files, later files overriding earlier
/// ones. Missing files are skipped.
pub fn read_config_files(paths: &[PathBuf]) -> Result<Config, ConfigError> {
    paths
        .iter()
        .fold(Config::builder(), |builder, path| {
            builder.add_source(
                File::from(path.as_path())
                    .format(FileFormat::Toml)
                    .required(false),
            )
        })
        .build()
}

/// Read hierarchical configuration (system -> local override)
pub fn read_hierarchical_config() -> Result<Config, ConfigError> {
    let paths: Vec<PathBuf> = system_config_path()
        .into_iter()
        .chain(find_local_config())
        .collect();
    read_config_files(&paths)
}

fn load_config() -> Option<Config> {
    match read_hierarchical_config() {
        Ok(config) => Some(config),
        Err(e) => {
            log::warn!("Ignoring configuration: {}", e);
            None
        }
    }
}

fn database_directory_from(config: &Config) -> PathBuf {
    config
        .get_string("database.directory")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(defaults::default_database_directory()))
}

/// Directory holding databases referred to by name.
pub fn database_directory() -> PathBuf {
    match load_config() {
        Some(config) => database_directory_from(&config),
        None => PathBuf::from(defaults::default_database_directory()),
    }
}

fn parse_statistic(config: &Config, key: &str) -> Option<ReductionFunc> {
    let name = config.get_string(key).ok()?;
    match name.parse::<ReductionFunc>() {
        Ok(statistic) => Some(statistic),
        Err(e) => {
            log::warn!("Ignoring {}: {}", key, e);
            None
        }
    }
}

fn progression_statistic_from(config: &Config, table: &str) -> ReductionFunc {
    parse_statistic(config, &format!("progression.table.{}.statistic", table))
        .or_else(|| parse_statistic(config, "progression.global.statistic"))
        .unwrap_or(defaults::default_statistic())
}

/// Statistic for trend plots of `table`: table specific, then global, then
/// the built-in default.
pub fn progression_statistic(table: &str) -> ReductionFunc {
    match load_config() {
        Some(config) => progression_statistic_from(&config, table),
        None => defaults::default_statistic(),
    }
}

pub fn report_title() -> Option<String> {
    load_config()?.get_string("report.title").ok()
}

pub fn report_template_path() -> Option<PathBuf> {
    load_config()?
        .get_string("report.template")
        .ok()
        .map(PathBuf::from)
}

pub fn report_custom_css_path() -> Option<PathBuf> {
    load_config()?
        .get_string("report.custom_css")
        .ok()
        .map(PathBuf::from)
}
