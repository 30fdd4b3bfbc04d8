use anyhow::Result;
use log::debug;
use serde::{Deserialize, Serialize};

use std::fs::{File, create_dir_all};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::data::RenderOptions;
use crate::util::assets::{AssetCache, DEFAULT_FETCH_TIMEOUT, FontSources};

const APP_NAME: &str = "factura";
const CONFIG_FILE: &str = "config.toml";

/// Branding defaults, stored as toml in the user's config folder.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub title: Option<String>,
    pub footer_note: Option<String>,
    pub header_color_hex: Option<String>,
    pub items_heading: Option<String>,
    /// Logo used when a render names none.
    pub default_logo: Option<String>,
    pub signature: Option<String>,
    pub signature_printed_name: Option<String>,
    pub signer_name: Option<String>,
    pub signer_title: Option<String>,
    pub fonts: FontSources,
    pub fetch_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: None,
            footer_note: None,
            header_color_hex: None,
            items_heading: None,
            default_logo: None,
            signature: None,
            signature_printed_name: None,
            signer_name: None,
            signer_title: None,
            fonts: FontSources::default(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT.as_secs(),
        }
    }
}

impl Config {
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            title: self.title.clone(),
            footer_note: self.footer_note.clone(),
            header_color_hex: self.header_color_hex.clone(),
            items_heading: self.items_heading.clone(),
            signature_url: self.signature.clone(),
            signature_printed_name: self.signature_printed_name.clone(),
            signer_name: self.signer_name.clone(),
            signer_title: self.signer_title.clone(),
            ..Default::default()
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

pub fn load_config() -> Result<Config> {
    let config_file = check_config_exists()?;
    load_config_from(&config_file)
}

pub fn load_config_from(path: &Path) -> Result<Config> {
    let mut file = File::open(path)?;
    let mut buf = String::default();
    File::read_to_string(&mut file, &mut buf)?;
    let res: Config = toml::from_str(&buf)?;
    debug!("loaded config from {path:?}");
    Ok(res)
}

/// Saves the config. Assets it points to may have changed, so the asset cache is dropped.
pub fn save_config(config: &Config) -> Result<()> {
    let config_file = check_config_exists()?;
    save_config_to(config, &config_file)?;
    AssetCache::clear();
    Ok(())
}

pub fn save_config_to(config: &Config, path: &Path) -> Result<()> {
    let serialized = toml::to_string(config)?;
    let mut file = File::create(path)?;
    file.write_all(serialized.as_bytes())?;
    Ok(())
}

/// Path of the config file, created with defaults on first use.
pub fn check_config_exists() -> Result<PathBuf> {
    let mut dir: PathBuf = dirs::config_dir().unwrap_or_else(|| "./".into());
    dir.push(APP_NAME);

    if !dir.exists() {
        create_dir_all(&dir)?;
    }
    dir.push(CONFIG_FILE);
    if !dir.exists() {
        save_config_to(&Config::default(), &dir)?;
    }
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let config = Config {
            title: Some("Cotización".into()),
            header_color_hex: Some("#0a3d62".into()),
            fonts: FontSources {
                regular: Some("/fonts/Inter-Regular.ttf".into()),
                ..Default::default()
            },
            fetch_timeout_secs: 3,
            ..Default::default()
        };
        save_config_to(&config, &path).unwrap();
        assert_eq!(load_config_from(&path).unwrap(), config);
    }

    #[test]
    fn missing_keys_use_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "footer_note = \"Gracias\"\n").unwrap();
        let config = load_config_from(&path).unwrap();
        assert_eq!(config.footer_note.as_deref(), Some("Gracias"));
        assert_eq!(config.fetch_timeout(), DEFAULT_FETCH_TIMEOUT);
        assert_eq!(config.fonts, FontSources::default());
    }

    #[test]
    fn broken_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "title = ").unwrap();
        assert!(load_config_from(&path).is_err());
    }

    #[test]
    fn render_options_from_config() {
        let config = Config {
            title: Some("Propuesta".into()),
            signature: Some("https://example.com/firma.png".into()),
            signer_name: Some("Ana López".into()),
            ..Default::default()
        };
        let options = config.render_options();
        assert_eq!(options.title(), "Propuesta");
        assert_eq!(options.signature_source(), Some("https://example.com/firma.png"));
        assert_eq!(options.signer_name.as_deref(), Some("Ana López"));
        assert_eq!(options.logo_source(), None);
    }
}
