pub mod config;
pub mod domain;
pub mod error;
pub mod harvest;
pub mod output;
pub mod registry;
pub mod scholar;
pub mod snapshot;
pub mod titles;
