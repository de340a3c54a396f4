use reqwest::header::{HeaderName, HeaderValue};
use reqwest::Url;

use crate::error::{HistoryError, Result};

use super::Settings;

/// Check settings and surface every problem at once.
pub fn validate_settings(settings: &Settings) -> Result<()> {
    let mut issues = Vec::new();

    validate_pool(settings, &mut issues);
    validate_urls(settings, &mut issues);
    validate_headers(settings, &mut issues);

    if issues.is_empty() {
        Ok(())
    } else {
        Err(HistoryError::message(format!(
            "settings invalid:\n  - {}",
            issues.join("\n  - ")
        )))
    }
}

fn validate_pool(settings: &Settings, issues: &mut Vec<String>) {
    if settings.workers == 0 {
        issues.push("workers must be at least 1".to_string());
    }
    if settings.max_span_days == 0 {
        issues.push("max_span_days must be at least 1".to_string());
    }
    if settings.request_timeout_secs == Some(0) {
        issues.push("request_timeout_secs must be positive when set".to_string());
    }
}

fn validate_urls(settings: &Settings, issues: &mut Vec<String>) {
    let base = match Url::parse(&settings.base_url) {
        Ok(url) => url,
        Err(err) => {
            issues.push(format!("base_url `{}` is invalid: {err}", settings.base_url));
            return;
        }
    };

    for (name, path) in [
        ("stock_history", &settings.endpoints.stock_history),
        ("derivatives", &settings.endpoints.derivatives),
    ] {
        if path.trim().is_empty() {
            issues.push(format!("endpoint `{name}` is empty"));
        } else if let Err(err) = base.join(path) {
            issues.push(format!("endpoint `{name}` is invalid: {err}"));
        }
    }
}

fn validate_headers(settings: &Settings, issues: &mut Vec<String>) {
    for (key, value) in &settings.headers {
        if HeaderName::from_bytes(key.as_bytes()).is_err() {
            issues.push(format!("header name `{key}` is invalid"));
        }
        if HeaderValue::from_str(value).is_err() {
            issues.push(format!("header `{key}` has an invalid value"));
        }
    }
}
