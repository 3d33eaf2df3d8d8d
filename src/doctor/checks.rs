use std::path::Path;

use chrono::Utc;
use reqwest::Url;

use crate::config::AppConfig;
use crate::doctor::report::{CheckResult, CheckStatus, DoctorReport};
use crate::stage::BackendProbe;

/// `probe` is `None` when no HTTP client could be built from the config.
pub async fn run_doctor(config: &AppConfig, probe: Option<&dyn BackendProbe>) -> DoctorReport {
    let mut checks = vec![
        check_base_url(&config.service.base_url),
        check_credential(config),
        check_backend(probe, &config.service.base_url).await,
    ];
    if let Some(dir) = &config.output.download_dir {
        checks.push(check_download_dir(dir));
    }

    DoctorReport::from_checks(Utc::now().to_rfc3339(), checks)
}

fn check_base_url(raw: &str) -> CheckResult {
    const NAME: &str = "service_base_url";
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => CheckResult::pass(NAME, raw, true),
        Ok(url) => CheckResult::problem(
            NAME,
            CheckStatus::Fail,
            format!("unsupported scheme `{}`", url.scheme()),
            true,
            "Use an http:// or https:// base URL.",
        ),
        Err(error) => CheckResult::problem(
            NAME,
            CheckStatus::Fail,
            format!("`{raw}` is not a URL: {error}"),
            true,
            "Set service.base_url or MEDIA_DIGEST_API_BASE.",
        ),
    }
}

fn check_credential(config: &AppConfig) -> CheckResult {
    const NAME: &str = "credential";
    match config.service.api_key.as_deref() {
        Some(key) if !key.trim().is_empty() => CheckResult::pass(
            NAME,
            format!("sent as `{}`", config.service.credential_header),
            false,
        ),
        _ => CheckResult::problem(
            NAME,
            CheckStatus::Warn,
            "no api key configured; calls are sent without a credential",
            false,
            "Set service.api_key or MEDIA_DIGEST_API_KEY.",
        ),
    }
}

async fn check_backend(probe: Option<&dyn BackendProbe>, base_url: &str) -> CheckResult {
    const NAME: &str = "backend";
    let Some(probe) = probe else {
        return CheckResult {
            name: NAME.to_owned(),
            status: CheckStatus::Skip,
            detail: "no client could be built from the service settings".to_owned(),
            required: true,
            remediation: None,
        };
    };

    match probe.probe().await {
        Ok(status) => CheckResult::pass(NAME, format!("{base_url} answered `{status}`"), true),
        Err(error) => CheckResult::problem(
            NAME,
            CheckStatus::Fail,
            error,
            true,
            "Start the processing service or point service.base_url at it.",
        ),
    }
}

fn check_download_dir(dir: &Path) -> CheckResult {
    const NAME: &str = "download_dir";
    let probe_file = dir.join(".media-digest-write-probe");
    let writable = std::fs::create_dir_all(dir)
        .and_then(|()| std::fs::write(&probe_file, b""))
        .and_then(|()| std::fs::remove_file(&probe_file));

    match writable {
        Ok(()) => CheckResult::pass(NAME, dir.display().to_string(), false),
        Err(error) => CheckResult::problem(
            NAME,
            CheckStatus::Warn,
            format!("{} is not writable: {error}", dir.display()),
            false,
            "Set output.download_dir or MEDIA_DIGEST_DOWNLOAD_DIR to a writable directory.",
        ),
    }
}
