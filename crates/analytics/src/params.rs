use crate::error::AnalyticsError;
use crate::helpers::decimal_from_value;
use engine::PipelineContext;
use rust_decimal::Decimal;

pub const DEFAULT_TOP_N: usize = 50;

/// Per-client parameters the analyses read from `PipelineContext::client_config`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisParams {
    /// Rows kept by ranked tables.
    pub top_n: usize,
    /// Interchange rate as a fraction of spend; zero disables interchange estimates.
    pub ic_rate: Decimal,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            ic_rate: Decimal::ZERO,
        }
    }
}

impl AnalysisParams {
    pub fn from_context(ctx: &PipelineContext) -> Result<Self, AnalyticsError> {
        let mut params = Self::default();

        if let Some(value) = ctx.config_value("top_n") {
            params.top_n = value
                .as_u64()
                .filter(|n| *n > 0)
                .map(|n| n as usize)
                .ok_or_else(|| AnalyticsError::InvalidParameter {
                    key: "top_n".to_string(),
                    value: value.to_string(),
                })?;
        }

        if let Some(value) = ctx.config_value("ic_rate") {
            params.ic_rate = decimal_from_value(value)
                .filter(|rate| *rate >= Decimal::ZERO && *rate < Decimal::ONE)
                .ok_or_else(|| AnalyticsError::InvalidParameter {
                    key: "ic_rate".to_string(),
                    value: value.to_string(),
                })?;
        }

        Ok(params)
    }
}
