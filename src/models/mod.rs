pub mod connection;
pub mod terminal;

pub use connection::{ProviderId, TerminalConnection};
pub use terminal::{map_point_state, Device, IntentStatus};
