//! Terminal storefront built on a stale-while-revalidate query cache.
//!
//! [`query`] is the generic cache; [`shop`] holds the store API, query presets
//! and form validation; [`app`] and [`ui`] are the terminal front end.

pub mod app;
pub mod commands;
pub mod config;
pub mod event;
pub mod http;
pub mod logging;
pub mod query;
pub mod shop;
pub mod ui;
