pub mod model;
pub mod sync;
pub mod utils;

pub use model::*;
