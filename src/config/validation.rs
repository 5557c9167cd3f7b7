//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ttl > 0, capacity >= 1, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServiceConfig;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("auth.jwt_secret must be set")]
    EmptySecret,

    #[error("auth.token_ttl_secs must be positive, got {0}")]
    NonPositiveTokenTtl(i64),

    #[error("auth.token_ttl_secs {0} is out of range")]
    TokenTtlOutOfRange(i64),

    #[error("rate_limit.capacity must be at least 1")]
    ZeroCapacity,

    #[error("rate_limit.refill_per_second must be positive, got {0}")]
    InvalidRefillRate(f64),

    #[error("rate_limit.sweep_interval_secs must be positive when idle_retention_secs is set")]
    ZeroSweepInterval,

    #[error("listener.bind_address {0:?} is not a socket address")]
    InvalidBindAddress(String),

    #[error("observability.metrics_address {0:?} is not a socket address")]
    InvalidMetricsAddress(String),

    #[error("timeouts.request_secs must be positive")]
    ZeroRequestTimeout,
}

/// Check a parsed config, collecting every problem found.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.auth.jwt_secret.is_empty() {
        errors.push(ValidationError::EmptySecret);
    }
    if config.auth.token_ttl_secs <= 0 {
        errors.push(ValidationError::NonPositiveTokenTtl(config.auth.token_ttl_secs));
    } else if config.auth.try_token_ttl().is_none() {
        errors.push(ValidationError::TokenTtlOutOfRange(config.auth.token_ttl_secs));
    }

    let limits = &config.rate_limit;
    if limits.capacity == 0 {
        errors.push(ValidationError::ZeroCapacity);
    }
    if !(limits.refill_per_second.is_finite() && limits.refill_per_second > 0.0) {
        errors.push(ValidationError::InvalidRefillRate(limits.refill_per_second));
    }
    if limits.idle_retention_secs.is_some() && limits.sweep_interval_secs == 0 {
        errors.push(ValidationError::ZeroSweepInterval);
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    let metrics_address = &config.observability.metrics_address;
    if config.observability.metrics_enabled && metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidMetricsAddress(metrics_address.clone()));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
