//! Navigation state machine: walks the action tree one keystroke at a time.
mod state;

pub use config::{Action, ActionKind, Group, Node};
pub use leader_protocol::Key;
pub use state::{KeyResponse, State};
