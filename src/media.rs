//! Validation of uploaded recordings before they are forwarded upstream.

use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::constants::{
    ERR_INVALID_DURATION, ERR_INVALID_MEDIA_ENCODING, ERR_MISSING_MEDIA,
    ERR_UNSUPPORTED_MIME_TYPE, WARN_MEDIA_BYTES,
};
use crate::error::{AppError, Result};
use crate::tiers::TierLimits;

/// A recording that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedMedia {
    /// Base64 payload without any `data:` prefix
    pub base64: String,
    pub mime_type: String,
    /// Decoded size in bytes
    pub size: usize,
}

/// Strip a `data:<mime>;base64,` prefix if the client sent a data URL
fn strip_data_url(data: &str) -> &str {
    match data.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map(|(_, payload)| payload).unwrap_or(rest),
        None => data,
    }
}

/// Validate media size, encoding, type and declared duration
///
/// The size ceiling is checked against the decoded length so the check
/// does not depend on how the client padded the encoding.
pub fn validate_media(
    video_base64: &str,
    mime_type: &str,
    declared_duration: Option<f64>,
    limits: &TierLimits,
    max_bytes: usize,
) -> Result<ValidatedMedia> {
    let payload = strip_data_url(video_base64.trim());
    let mime_type = mime_type.trim();

    if payload.is_empty() || mime_type.is_empty() {
        return Err(AppError::InvalidInput(ERR_MISSING_MEDIA.to_string()));
    }

    // Reject obviously oversized payloads before decoding them
    let estimated = payload.len() / 4 * 3;
    if estimated > max_bytes + 3 {
        tracing::warn!("Media too large: ~{} bytes (max: {})", estimated, max_bytes);
        return Err(AppError::MediaTooLarge {
            size: estimated,
            max: max_bytes,
        });
    }

    let decoded = STANDARD
        .decode(payload)
        .map_err(|_| AppError::InvalidInput(ERR_INVALID_MEDIA_ENCODING.to_string()))?;
    let size = decoded.len();

    if size > max_bytes {
        tracing::warn!("Media too large: {} bytes (max: {})", size, max_bytes);
        return Err(AppError::MediaTooLarge {
            size,
            max: max_bytes,
        });
    }

    if size > WARN_MEDIA_BYTES {
        tracing::info!("Large media upload: {} bytes", size);
    }

    let lowered = mime_type.to_ascii_lowercase();
    if !(lowered.starts_with("video/") || lowered.starts_with("audio/")) {
        return Err(AppError::InvalidInput(ERR_UNSUPPORTED_MIME_TYPE.to_string()));
    }

    if let Some(duration) = declared_duration {
        if !duration.is_finite() || duration < 0.0 {
            return Err(AppError::InvalidInput(ERR_INVALID_DURATION.to_string()));
        }

        if duration > f64::from(limits.max_video_seconds) {
            tracing::warn!(
                "Video too long: {}s > {}s ({})",
                duration,
                limits.max_video_seconds,
                limits.tier
            );
            return Err(AppError::DurationExceeded {
                tier: limits.tier,
                max_seconds: limits.max_video_seconds,
                actual_seconds: duration,
            });
        }
    }

    Ok(ValidatedMedia {
        base64: payload.to_string(),
        mime_type: mime_type.to_string(),
        size,
    })
}
