use std::path::{Path, PathBuf};

use reqwest::Url;

use crate::bootstrap::AppPaths;
use crate::config::schema::{AppConfig, OutputFormat, OverlapPolicy};
use crate::error::{AppError, AppResult};
use crate::pipeline::Mode;

#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub api_base: Option<String>,
    pub mode: Option<Mode>,
    pub parallel_branches: Option<bool>,
    pub output_format: Option<OutputFormat>,
}

pub fn load_config(paths: &AppPaths, overrides: &CliOverrides) -> AppResult<AppConfig> {
    let config_path = overrides
        .config_path
        .clone()
        .unwrap_or_else(|| paths.config_file.clone());

    let mut config = if config_path.exists() {
        let raw = std::fs::read_to_string(&config_path)?;
        toml::from_str::<AppConfig>(&raw)?
    } else {
        let defaults = AppConfig::default();
        write_default_config(&config_path, &defaults)?;
        defaults
    };

    apply_env_overrides(&mut config);
    apply_cli_overrides(&mut config, overrides);

    if config.output.download_dir.is_none() {
        config.output.download_dir = Some(paths.downloads_dir.clone());
    }

    validate(&config)?;
    Ok(config)
}

fn write_default_config(path: &Path, defaults: &AppConfig) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let data = toml::to_string_pretty(defaults)?;
    std::fs::write(path, data)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mut perms = std::fs::metadata(path)?.permissions();
        perms.set_mode(0o600);
        std::fs::set_permissions(path, perms)?;
    }

    Ok(())
}

fn validate(config: &AppConfig) -> AppResult<()> {
    let base_url = Url::parse(&config.service.base_url).map_err(|error| {
        AppError::Config(format!(
            "service.base_url `{}` is not a URL: {error}",
            config.service.base_url
        ))
    })?;
    if !matches!(base_url.scheme(), "http" | "https") {
        return Err(AppError::Config(format!(
            "service.base_url must use http or https, got `{}`",
            base_url.scheme()
        )));
    }

    if config.service.request_timeout_seconds == Some(0) {
        return Err(AppError::Config(
            "service.request_timeout_seconds must be > 0".to_owned(),
        ));
    }

    if config.service.credential_header.trim().is_empty() {
        return Err(AppError::Config(
            "service.credential_header must not be empty".to_owned(),
        ));
    }

    Ok(())
}

fn apply_env_overrides(config: &mut AppConfig) {
    if let Ok(value) = std::env::var("MEDIA_DIGEST_API_BASE") {
        if !value.trim().is_empty() {
            config.service.base_url = value.trim().to_owned();
        }
    }
    if let Ok(value) = std::env::var("MEDIA_DIGEST_API_KEY") {
        config.service.api_key = if value.trim().is_empty() {
            None
        } else {
            Some(value)
        };
    }
    if let Ok(value) = std::env::var("MEDIA_DIGEST_CREDENTIAL_HEADER") {
        config.service.credential_header = value;
    }
    if let Ok(value) = std::env::var("MEDIA_DIGEST_TIMEOUT_SECONDS") {
        if let Ok(parsed) = value.parse::<u64>() {
            config.service.request_timeout_seconds = Some(parsed);
        }
    }
    if let Ok(value) = std::env::var("MEDIA_DIGEST_MODE") {
        if let Some(parsed) = parse_mode(&value) {
            config.pipeline.mode = parsed;
        }
    }
    if let Ok(value) = std::env::var("MEDIA_DIGEST_PARALLEL_BRANCHES") {
        if let Some(parsed) = parse_bool(&value) {
            config.pipeline.parallel_branches = parsed;
        }
    }
    if let Ok(value) = std::env::var("MEDIA_DIGEST_OVERLAP_POLICY") {
        if let Some(parsed) = parse_overlap_policy(&value) {
            config.pipeline.overlap_policy = parsed;
        }
    }
    if let Ok(value) = std::env::var("MEDIA_DIGEST_DOWNLOAD_DIR") {
        if !value.trim().is_empty() {
            config.output.download_dir = Some(PathBuf::from(value));
        }
    }
    if let Ok(value) = std::env::var("MEDIA_DIGEST_OUTPUT_FORMAT") {
        if let Some(parsed) = parse_output_format(&value) {
            config.output.format = parsed;
        }
    }
    if let Ok(value) = std::env::var("MEDIA_DIGEST_LOG_LEVEL") {
        config.diagnostics.log_level = value;
    }
}

fn apply_cli_overrides(config: &mut AppConfig, overrides: &CliOverrides) {
    if let Some(value) = &overrides.api_base {
        config.service.base_url = value.clone();
    }
    if let Some(value) = overrides.mode {
        config.pipeline.mode = value;
    }
    if let Some(value) = overrides.parallel_branches {
        config.pipeline.parallel_branches = value;
    }
    if let Some(value) = overrides.output_format {
        config.output.format = value;
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_mode(value: &str) -> Option<Mode> {
    match value.trim().to_ascii_lowercase().as_str() {
        "fast" => Some(Mode::Fast),
        "full" => Some(Mode::Full),
        _ => None,
    }
}

fn parse_overlap_policy(value: &str) -> Option<OverlapPolicy> {
    match value.trim().to_ascii_lowercase().as_str() {
        "supersede" | "replace" => Some(OverlapPolicy::Supersede),
        "reject" => Some(OverlapPolicy::Reject),
        _ => None,
    }
}

fn parse_output_format(value: &str) -> Option<OutputFormat> {
    match value.trim().to_ascii_lowercase().as_str() {
        "text" | "plain" => Some(OutputFormat::Text),
        "json" => Some(OutputFormat::Json),
        _ => None,
    }
}
