//! Pure cost computation.
//!
//! Every function takes the configuration value explicitly — no global
//! state, no I/O. Handlers snapshot the [`PointsStore`](super::PointsStore)
//! and pass the value in.

use serde::Serialize;

use super::PointsError;
use super::config::{self, PointsConfig};

/// Itemized cost of one analysis request.
#[derive(Debug, Clone, Serialize)]
pub struct CostBreakdown {
    pub research_depth: u8,
    /// Base points from the depth level (0 when toggled off).
    pub depth_points: u32,
    /// Points from the selected model (0 when toggled off or no model given).
    pub model_points: u32,
    pub total: u32,
}

/// Base points for a research-depth level. Levels outside 1–5 fail; a level
/// missing from the configured table falls back to the built-in default.
pub fn research_depth_points(cfg: &PointsConfig, level: u8) -> Result<u32, PointsError> {
    if !(1..=5).contains(&level) {
        return Err(PointsError::InvalidLevel(level));
    }
    Ok(cfg
        .research_depth_points
        .get(&level)
        .copied()
        .unwrap_or_else(|| config::default_depth_for(level)))
}

/// Points for a `(provider, model)` pair: exact match, then the provider's
/// `"default"` entry, else 0.
pub fn model_points(cfg: &PointsConfig, provider: &str, model: &str) -> u32 {
    let provider = config::normalize_provider(provider);
    let model = config::normalize_model(model);
    let Some(models) = cfg.model_points.get(&provider) else {
        return 0;
    };
    if let Some(points) = models.get(model) {
        return *points;
    }
    models.get("default").copied().unwrap_or(0)
}

/// Itemized cost for one request. Each component contributes only when its
/// toggle is on; the model component also needs both provider and model.
pub fn quote(
    cfg: &PointsConfig,
    level: u8,
    provider: Option<&str>,
    model: Option<&str>,
) -> Result<CostBreakdown, PointsError> {
    let depth_points = if cfg.enable_research_depth_points {
        research_depth_points(cfg, level)?
    } else {
        0
    };
    let mdl = match (provider, model) {
        (Some(p), Some(m)) if cfg.enable_model_points => model_points(cfg, p, m),
        _ => 0,
    };
    Ok(CostBreakdown {
        research_depth: level,
        depth_points,
        model_points: mdl,
        total: depth_points + mdl,
    })
}

/// Total cost for one request — see [`quote`] for the itemized form.
pub fn analysis_points(
    cfg: &PointsConfig,
    level: u8,
    provider: Option<&str>,
    model: Option<&str>,
) -> Result<u32, PointsError> {
    Ok(quote(cfg, level, provider, model)?.total)
}
