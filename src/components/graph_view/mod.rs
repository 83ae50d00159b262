//! Canvas chronology graph component.

mod component;
mod details;
mod render;

pub use component::ChronologyGraph;
pub use details::NodeDetails;
