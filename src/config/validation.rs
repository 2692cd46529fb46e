use crate::error::AppError;
use std::path::Path;

use super::policy::{CacheConfig, PolicyConfig};

/// Validates the upstream settings
///
/// # Validation Rules
/// - API domain cannot be empty
/// - API domain must be a valid URL or domain name
/// - If log file path is provided, it cannot be empty
/// - Log file path parent directory must exist or be creatable
pub fn validate_config(api_domain: &str, log_file_path: &Option<String>) -> Result<(), AppError> {
    if api_domain.is_empty() {
        return Err(AppError::config_error("API domain cannot be empty"));
    }

    if !api_domain.starts_with("http://") && !api_domain.starts_with("https://") {
        // Without a scheme it should at least look like a domain
        if !api_domain.contains('.') && !api_domain.starts_with("localhost") {
            return Err(AppError::config_error(
                "API domain must be a valid URL or domain name",
            ));
        }
    }
    if api_domain.chars().any(char::is_whitespace) {
        return Err(AppError::config_error("API domain cannot contain whitespace"));
    }

    if let Some(log_path) = log_file_path {
        if log_path.is_empty() {
            return Err(AppError::config_error("Log file path cannot be empty"));
        }

        if let Some(parent) = Path::new(log_path).parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::config_error(format!(
                    "Cannot create log directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    Ok(())
}

/// Validates the `[cache]` section
pub fn validate_cache(cache: &CacheConfig) -> Result<(), AppError> {
    if cache.capacity == 0 {
        return Err(AppError::config_error("Cache capacity must be at least 1"));
    }
    if cache.maintenance_interval_seconds == 0 {
        return Err(AppError::config_error(
            "Maintenance interval must be at least 1 second",
        ));
    }
    if cache.quota_bytes == Some(0) {
        return Err(AppError::config_error("Durable store quota cannot be zero"));
    }
    if let Some(path) = &cache.persistent_path
        && path.trim().is_empty()
    {
        return Err(AppError::config_error("Persistent store path cannot be empty"));
    }
    Ok(())
}

/// Rejects threshold combinations that would make lifecycle classes overlap
/// or invert.
pub fn validate_policy(policy: &PolicyConfig) -> Result<(), AppError> {
    let require = |ok: bool, msg: &str| {
        if ok {
            Ok(())
        } else {
            Err(AppError::config_error(msg.to_string()))
        }
    };

    require(
        policy.match_duration_seconds > 0,
        "match_duration_seconds must be positive",
    )?;
    require(
        policy.recently_ended_window_seconds < policy.old_ended_window_seconds,
        "recently_ended_window_seconds must be shorter than old_ended_window_seconds",
    )?;
    require(
        policy.upcoming_near_ttl_seconds <= policy.upcoming_far_ttl_seconds,
        "upcoming_near_ttl_seconds cannot exceed upcoming_far_ttl_seconds",
    )?;
    require(
        policy.old_ended_ttl_seconds <= policy.ancient_ended_ttl_seconds,
        "old_ended_ttl_seconds cannot exceed ancient_ended_ttl_seconds",
    )?;
    require(
        policy.today_bucket_ttl_seconds > 0
            && policy.past_bucket_ttl_seconds > 0
            && policy.future_bucket_ttl_seconds > 0,
        "bucket TTLs must be positive",
    )?;
    require(
        policy.recent_record_retention_seconds <= policy.old_record_retention_seconds,
        "recent_record_retention_seconds cannot exceed old_record_retention_seconds",
    )?;
    Ok(())
}
