pub mod shutdown;
pub mod startup;

pub use shutdown::{listen_for_shutdown, perform_shutdown};
pub use startup::{StartupContext, prepare_startup};
