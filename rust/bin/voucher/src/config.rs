//! Client configuration.
//!
//! Reads `~/.voucher/config.toml`. Every section is optional; command-line
//! flags override what the file says.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use codes::code::GeneratorConfig;
use codes::sheet::SheetLayout;
use voucher_core::ServiceConfig;
use voucher_core::config::DEFAULT_LISTEN;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Directory for runtime state (default: ~/.voucher).
    pub data_dir: Option<PathBuf>,
    /// Database file (default: `{data_dir}/voucher.redb`).
    pub db_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneratorSection {
    pub code_length: usize,
    pub batch_size: usize,
    pub max_draws_per_code: usize,
}

impl Default for GeneratorSection {
    fn default() -> Self {
        let d = GeneratorConfig::default();
        Self {
            code_length: d.code_length,
            batch_size: d.batch_size,
            max_draws_per_code: d.max_draws_per_code,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SheetSection {
    pub columns: usize,
    pub rows: usize,
}

impl Default for SheetSection {
    fn default() -> Self {
        let d = SheetLayout::default();
        Self {
            columns: d.columns,
            rows: d.rows,
        }
    }
}

/// Client configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VoucherConfig {
    pub storage: StorageSection,
    pub generator: GeneratorSection,
    pub server: ServerSection,
    pub sheet: SheetSection,
}

/// Command-line overrides for the storage and server settings.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub data_dir: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
    pub listen: Option<String>,
}

impl VoucherConfig {
    /// Default config file path: ~/.voucher/config.toml.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }

    /// Load config from disk, or return default if file doesn't exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: VoucherConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("invalid config {}: {}", path.display(), e))?;
        Ok(config)
    }

    /// Merge file settings with flags. The data dir falls back to ~/.voucher.
    pub fn service_config(&self, overrides: &Overrides) -> ServiceConfig {
        let data_dir = overrides
            .data_dir
            .clone()
            .or_else(|| self.storage.data_dir.clone())
            .unwrap_or_else(dirs_path);
        // An explicit --data-dir beats a db_path from the file.
        let db_path = overrides.db_path.clone().or_else(|| {
            if overrides.data_dir.is_some() {
                None
            } else {
                self.storage.db_path.clone()
            }
        });
        ServiceConfig {
            data_dir: Some(data_dir),
            db_path,
            listen: overrides
                .listen
                .clone()
                .unwrap_or_else(|| self.server.listen.clone()),
        }
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            code_length: self.generator.code_length,
            batch_size: self.generator.batch_size,
            max_draws_per_code: self.generator.max_draws_per_code,
        }
    }

    pub fn sheet_layout(&self) -> SheetLayout {
        SheetLayout {
            columns: self.sheet.columns,
            rows: self.sheet.rows,
        }
    }
}

/// Return the voucher config directory (~/.voucher).
fn dirs_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".voucher")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = VoucherConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.generator_config(), GeneratorConfig::default());
        assert_eq!(config.sheet_layout(), SheetLayout::default());
        assert_eq!(config.server.listen, DEFAULT_LISTEN);
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[storage]
data_dir = "/srv/voucher"

[generator]
code_length = 12

[sheet]
columns = 3
"#,
        )
        .unwrap();

        let config = VoucherConfig::load(&path).unwrap();
        let generator = config.generator_config();
        assert_eq!(generator.code_length, 12);
        assert_eq!(generator.batch_size, 100);
        assert_eq!(config.sheet_layout(), SheetLayout { columns: 3, rows: 5 });

        let svc = config.service_config(&Overrides::default());
        assert_eq!(svc.resolve_db_path(), PathBuf::from("/srv/voucher/voucher.redb"));
    }

    #[test]
    fn test_flags_override_file() {
        let config: VoucherConfig = toml::from_str(
            r#"
[storage]
db_path = "/srv/voucher/codes.redb"

[server]
listen = "127.0.0.1:9000"
"#,
        )
        .unwrap();

        let svc = config.service_config(&Overrides::default());
        assert_eq!(svc.resolve_db_path(), PathBuf::from("/srv/voucher/codes.redb"));
        assert_eq!(svc.listen, "127.0.0.1:9000");

        let svc = config.service_config(&Overrides {
            data_dir: Some(PathBuf::from("/tmp/v")),
            listen: Some("0.0.0.0:1".into()),
            ..Default::default()
        });
        assert_eq!(svc.resolve_db_path(), PathBuf::from("/tmp/v/voucher.redb"));
        assert_eq!(svc.listen, "0.0.0.0:1");

        let svc = config.service_config(&Overrides {
            db_path: Some(PathBuf::from("/tmp/x.redb")),
            ..Default::default()
        });
        assert_eq!(svc.resolve_db_path(), PathBuf::from("/tmp/x.redb"));
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[generator]\ncode_length = \"long\"\n").unwrap();
        assert!(VoucherConfig::load(&path).is_err());
    }
}
