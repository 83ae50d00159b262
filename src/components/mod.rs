//! Leptos components built on the view controller.

pub mod graph_view;
