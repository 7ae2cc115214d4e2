mod participant;
mod registry;
mod relay;
mod relay_command;
mod router;

pub use participant::*;
pub use registry::*;
pub use relay::*;
pub use relay_command::*;
pub use router::*;
