//! Interactive table state with a terminal front end.
//!
//! [`table::TableController`] owns the sort, filter, selection and expansion
//! state of an in-memory [`dataset::Dataset`] and derives the visible rows from
//! it. The remaining modules turn it into a ratatui application.

pub mod controller;
pub mod dataset;
pub mod demo;
pub mod domain;
pub mod export;
pub mod inputter;
pub mod model;
pub mod schema;
pub mod table;
pub mod ui;
