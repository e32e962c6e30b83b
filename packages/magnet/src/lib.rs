//! Facade over the layered crates, so front-ends depend on one package.

pub use application;
pub use domain;
pub use infrastructure;
pub use magnet_manifest as manifest;
