//! Dependency graph and its SCC condensation into a component graph (§4.3).

pub mod component;
pub mod dependency;
