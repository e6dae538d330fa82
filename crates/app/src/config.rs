//! Tool configuration: optional TOML file, then `--flag=value` overrides.
//!
//! ```toml
//! [loader]
//! worker_threads = 4
//! scale = 100.0        # meters -> centimeters
//! async_load = true
//!
//! [materials]
//! generate_mips = true
//! skip_textures = false
//! merge_sections_by_material = false
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use asset::MaterialsConfig;
use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub loader: LoaderConfig,
    pub materials: MaterialsConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub worker_threads: usize,
    /// Uniform scale applied to every position.
    pub scale: f32,
    pub async_load: bool,
    /// Load only this object instead of all of them.
    pub object: Option<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            worker_threads: 2,
            scale: 1.0,
            async_load: false,
            object: None,
        }
    }
}

/// Parsed command line: the OBJ to open plus the effective config.
#[derive(Clone, Debug)]
pub struct Invocation {
    pub input: PathBuf,
    pub config: AppConfig,
}

impl AppConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse config TOML")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&text)
    }

    /// Apply one `--flag[=value]` argument. Returns `false` if unknown.
    fn apply_flag(&mut self, arg: &str) -> bool {
        if arg == "--async" {
            self.loader.async_load = true;
        } else if arg == "--merge" {
            self.materials.merge_sections_by_material = true;
        } else if arg == "--no-textures" {
            self.materials.skip_textures = true;
        } else if arg == "--no-mips" {
            self.materials.generate_mips = false;
        } else if let Some(v) = arg.strip_prefix("--object=") {
            self.loader.object = Some(v.to_string());
        } else if let Some(v) = arg.strip_prefix("--scale=") {
            match v.parse::<f32>() {
                Ok(scale) => self.loader.scale = scale,
                Err(_) => log::warn!("Ignoring invalid scale '{}'", v),
            }
        } else if let Some(v) = arg.strip_prefix("--workers=") {
            match v.parse::<usize>() {
                Ok(n) => self.loader.worker_threads = n.max(1),
                Err(_) => log::warn!("Ignoring invalid worker count '{}'", v),
            }
        } else {
            return false;
        }
        true
    }
}

/// `objview [--config=file.toml] [flags] <file.obj>`. The config file is
/// read first so flags override it regardless of their position.
pub fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Invocation> {
    let args: Vec<String> = args.into_iter().collect();

    let mut config = match args.iter().find_map(|a| a.strip_prefix("--config=")) {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    let mut input = None;
    for arg in &args {
        if arg.starts_with("--config=") || config.apply_flag(arg) {
            continue;
        }
        if arg.starts_with("--") {
            log::warn!("Unknown flag '{}'", arg);
        } else {
            input = Some(PathBuf::from(arg));
        }
    }

    let input = input.context("Usage: objview [--config=file.toml] [--object=name] [--async] <file.obj>")?;
    Ok(Invocation { input, config })
}
