//! Process-wide state shared by the dev server and the actor system.

mod state;

pub use state::{is_shutdown, register_server, setup_shutdown_handler};
