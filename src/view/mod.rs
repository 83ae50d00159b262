//! Framework-independent interaction core: filtering, zoom/pan, selection,
//! layout and export for one graph view.

pub mod config;
pub mod controller;
pub mod export;
pub mod layout;
pub mod scale;
pub mod state;
pub mod style;

pub use config::{ConfigError, KeyboardConfig, StabilizationConfig, TimelineConfig, ViewConfig};
pub use controller::ViewController;
pub use export::{empty_message, export_svg};
pub use layout::{Point, Progress};
pub use state::{
	KeyAction, Phase, SubscriptionId, Tooltip, Transform, ViewEvent, ViewMode, ViewState, ViewStats,
	Viewport, VisibleStatus,
};
