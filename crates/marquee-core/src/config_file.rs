use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::state::{FilterOption, LayoutMode, SortOption};
use crate::{Config, Credentials};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub auth: Option<AuthConfig>,
    pub catalog: Option<CatalogConfig>,
    pub annotations: Option<AnnotationsConfig>,
    pub display: Option<DisplayConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    pub api_key: Option<String>,
    pub bearer_token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub base_url: Option<String>,
    pub pages: Option<Vec<u32>>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnnotationsConfig {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub layout: Option<LayoutMode>,
    pub sort: Option<SortOption>,
    pub filter: Option<FilterOption>,
}

/// Platform config directory path: `<config_dir>/marquee/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("marquee").join("config.toml"))
}

/// Load config by cascading CWD `.marquee.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".marquee.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparseable config file");
            None
        }
    }
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let auth = (base.auth.unwrap_or_default(), overlay.auth.unwrap_or_default());
    let catalog = (
        base.catalog.unwrap_or_default(),
        overlay.catalog.unwrap_or_default(),
    );
    let annotations = (
        base.annotations.unwrap_or_default(),
        overlay.annotations.unwrap_or_default(),
    );
    let display = (
        base.display.unwrap_or_default(),
        overlay.display.unwrap_or_default(),
    );

    ConfigFile {
        auth: Some(AuthConfig {
            api_key: auth.1.api_key.or(auth.0.api_key),
            bearer_token: auth.1.bearer_token.or(auth.0.bearer_token),
        }),
        catalog: Some(CatalogConfig {
            base_url: catalog.1.base_url.or(catalog.0.base_url),
            pages: catalog.1.pages.or(catalog.0.pages),
            timeout_secs: catalog.1.timeout_secs.or(catalog.0.timeout_secs),
        }),
        annotations: Some(AnnotationsConfig {
            path: annotations.1.path.or(annotations.0.path),
        }),
        display: Some(DisplayConfig {
            layout: display.1.layout.or(display.0.layout),
            sort: display.1.sort.or(display.0.sort),
            filter: display.1.filter.or(display.0.filter),
        }),
    }
}

/// Resolve a file config into runtime [`Config`], filling gaps with defaults.
pub fn resolve(file: &ConfigFile) -> Config {
    let defaults = Config::default();
    let auth = file.auth.clone().unwrap_or_default();
    let catalog = file.catalog.clone().unwrap_or_default();
    let display = file.display.clone().unwrap_or_default();

    let mut settings = defaults.settings;
    settings.layout = display.layout.unwrap_or(settings.layout);
    settings.sort = display.sort.unwrap_or(settings.sort);
    settings.filter = display.filter.unwrap_or(settings.filter);

    Config {
        credentials: Credentials::new(auth.api_key, auth.bearer_token),
        base_url: catalog.base_url.unwrap_or(defaults.base_url),
        pages: catalog
            .pages
            .filter(|p| !p.is_empty())
            .unwrap_or(defaults.pages),
        timeout_secs: catalog
            .timeout_secs
            .filter(|&t| t > 0)
            .unwrap_or(defaults.timeout_secs),
        annotations_path: file
            .annotations
            .as_ref()
            .and_then(|a| a.path.as_ref())
            .map(PathBuf::from),
        settings,
    }
}

/// Save the current config to the platform config directory.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf, String> {
    let path = config_path().ok_or_else(|| "Could not determine config directory".to_string())?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let content =
        toml::to_string_pretty(config).map_err(|e| format!("Failed to serialize config: {}", e))?;
    std::fs::write(&path, content).map_err(|e| format!("Failed to write config: {}", e))?;
    Ok(path)
}
