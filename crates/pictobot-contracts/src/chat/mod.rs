mod command_registry;
mod control_id;
mod intent_parser;

pub use command_registry::CHAT_HELP_COMMANDS;
pub use control_id::{ControlId, CONTROL_ID_MAX_CHARS};
pub use intent_parser::{parse_intent, Intent};
