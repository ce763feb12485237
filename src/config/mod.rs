mod settings;

pub use settings::{
    Config, ExportSettings, PrintSettings, ReportSettings, SourceKind, SourceSettings,
};

use crate::error::{ReportError, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the config directory path (~/.opsreport/)
pub fn config_dir() -> Result<PathBuf> {
    // First try XDG-style directories
    if let Some(proj_dirs) = ProjectDirs::from("", "", "opsreport") {
        return Ok(proj_dirs.config_dir().to_path_buf());
    }

    // Fallback to ~/.opsreport/
    let home = dirs_home().ok_or_else(|| {
        ReportError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine home directory",
        ))
    })?;

    Ok(home.join(".opsreport"))
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Expand ~ in paths
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_home() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Resolve a configured path: `~/` expands to home, relative paths hang off the config dir.
pub fn resolve_path(path: &str, cfg_dir: &Path) -> PathBuf {
    let expanded = expand_path(path);
    if expanded.is_absolute() {
        expanded
    } else {
        cfg_dir.join(expanded)
    }
}

/// Load and validate the main config.toml
pub fn load_config(config_dir: &Path) -> Result<Config> {
    let path = config_dir.join("config.toml");
    if !path.exists() {
        return Err(ReportError::ConfigFileNotFound(path));
    }
    let content = fs::read_to_string(&path)?;
    let config: Config =
        toml::from_str(&content).map_err(|e| ReportError::ConfigParse { path, source: e })?;
    config.validate()?;
    Ok(config)
}

/// Template content for config.toml
pub const CONFIG_TEMPLATE: &str = r#"[source]
kind = "http"                                   # "http" or "fixtures"
base_url = "https://reports.example.com/api"
# token = "secret"                              # optional bearer token
timeout_secs = 10
# fixtures_dir = "fixtures"                     # used when kind = "fixtures"

[report]
page_size = 10
currency_symbol = "$"
default_range = "month"                         # week, month, quarter, year

[export]
output_dir = "exports"                          # relative to this directory
delimiter = ","

[print]
typst_bin = "typst"
cleanup_timeout_secs = 60
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &Path, body: &str) {
        fs::write(dir.join("config.toml"), body).unwrap();
    }

    #[test]
    fn test_template_parses_with_defaults() {
        let config: Config = toml::from_str(CONFIG_TEMPLATE).unwrap();
        assert_eq!(config.source.kind, SourceKind::Http);
        assert_eq!(config.report.page_size, 10);
        assert_eq!(config.print.cleanup_timeout_secs, 60);
        config.validate().unwrap();
    }

    #[test]
    fn test_optional_sections_default() {
        let dir = tempfile::tempdir().unwrap();
        write_config(
            dir.path(),
            "[source]\nkind = \"fixtures\"\nfixtures_dir = \"data\"\n",
        );
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.report.page_size, 10);
        assert_eq!(config.export.delimiter, ",");
        assert_eq!(config.print.typst_bin, "typst");
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_config(
            dir.path(),
            "[source]\nkind = \"fixtures\"\nfixtures_dir = \"data\"\n\n[report]\npage_size = 0\n",
        );
        let err = load_config(dir.path()).unwrap_err();
        assert!(err.to_string().contains("report.page_size"), "got: {err}");
    }

    #[test]
    fn test_multichar_delimiter_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_config(
            dir.path(),
            "[source]\nkind = \"fixtures\"\nfixtures_dir = \"data\"\n\n[export]\ndelimiter = \";;\"\n",
        );
        assert!(load_config(dir.path()).is_err());
    }

    #[test]
    fn test_http_requires_base_url() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "[source]\nkind = \"http\"\n");
        let err = load_config(dir.path()).unwrap_err();
        assert!(err.to_string().contains("source.base_url"), "got: {err}");
    }

    #[test]
    fn test_resolve_path_relative_to_config_dir() {
        let base = Path::new("/etc/opsreport");
        assert_eq!(resolve_path("exports", base), base.join("exports"));
        assert_eq!(resolve_path("/tmp/out", base), PathBuf::from("/tmp/out"));
    }
}
