use super::models::Config;
use crate::coord::MAX_ZOOM;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("URL template '{template}' is missing placeholder(s): {missing}")]
    MissingPlaceholders { template: String, missing: String },

    #[error("URL template '{template}' must start with http:// or https://")]
    InvalidScheme { template: String },

    #[error("Timeout must be positive: {field} = 0")]
    ZeroTimeout { field: &'static str },

    #[error("Worker count must be positive")]
    ZeroWorkers,

    #[error("Queue capacity must be positive")]
    ZeroQueueCapacity,

    #[error("max_tiles must be positive")]
    ZeroMaxTiles,

    #[error("Zoom level {zoom} exceeds the maximum of {max}")]
    ZoomTooLarge { zoom: u32, max: u32 },

    #[error("Tile size must be positive")]
    ZeroTileSize,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_source(config)?;
    validate_fetch(config)?;
    validate_map(config)?;
    Ok(())
}

fn validate_source(config: &Config) -> Result<(), ValidationError> {
    let template = &config.source.url_template;

    let missing = template.missing_placeholders();
    if !missing.is_empty() {
        return Err(ValidationError::MissingPlaceholders {
            template: template.to_string(),
            missing: missing.join(", "),
        });
    }

    if !template.has_http_scheme() {
        return Err(ValidationError::InvalidScheme {
            template: template.to_string(),
        });
    }

    if config.source.connect_timeout_secs == 0 {
        return Err(ValidationError::ZeroTimeout {
            field: "connect_timeout_secs",
        });
    }

    if config.source.request_timeout_secs == 0 {
        return Err(ValidationError::ZeroTimeout {
            field: "request_timeout_secs",
        });
    }

    Ok(())
}

fn validate_fetch(config: &Config) -> Result<(), ValidationError> {
    if config.fetch.workers == Some(0) {
        return Err(ValidationError::ZeroWorkers);
    }

    if config.fetch.queue_capacity == 0 {
        return Err(ValidationError::ZeroQueueCapacity);
    }

    if config.fetch.max_tiles == 0 {
        return Err(ValidationError::ZeroMaxTiles);
    }

    Ok(())
}

fn validate_map(config: &Config) -> Result<(), ValidationError> {
    if config.map.zoom > MAX_ZOOM {
        return Err(ValidationError::ZoomTooLarge {
            zoom: config.map.zoom,
            max: MAX_ZOOM,
        });
    }

    if config.map.tile_size == 0 {
        return Err(ValidationError::ZeroTileSize);
    }

    Ok(())
}
