pub mod env;
pub mod server;
pub mod validation;

pub use env::*;
pub use server::*;
pub use validation::*;
