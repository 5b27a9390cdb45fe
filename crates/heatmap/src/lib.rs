//! Liquidation heatmap construction.
//!
//! This crate handles:
//! - Leverage distribution sampling by risk profile
//! - Liquidation price projection of the entry book
//! - Price bucketing with time-aware clearance status
//! - Magnetism (directional pull of untriggered liquidity)
//! - The end-to-end engine and text rendering

pub mod leverage;
pub mod projector;
pub mod clearance;
pub mod binner;
pub mod magnetism;
pub mod engine;
pub mod render;

pub use binner::Binner;
pub use clearance::PriceHistory;
pub use engine::{HeatmapEngine, MapInputs};
pub use leverage::LeverageModel;
pub use magnetism::MagnetismResolver;
pub use projector::{liquidation_price, LiquidationProjector};
pub use render::render_heatmap;
