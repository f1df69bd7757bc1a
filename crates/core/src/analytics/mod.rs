//! Analytics module - monthly, per-symbol and portfolio aggregates.

mod analytics_model;
mod analytics_service;

pub use analytics_model::{MonthlySummary, PortfolioAnalysis, StockPerformance};
pub use analytics_service::{AnalyticsService, AnalyticsServiceTrait};
