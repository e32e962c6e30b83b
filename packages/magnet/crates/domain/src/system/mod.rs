pub mod platform;

pub use platform::{Architecture, OsType, PlatformDetector, PlatformInfo};
