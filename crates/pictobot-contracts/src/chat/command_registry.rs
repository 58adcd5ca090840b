#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CommandAction {
    Regenerate,
    SetProvider,
    ListProviders,
    Help,
    Quit,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: CommandAction,
}

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "regen",
        action: CommandAction::Regenerate,
    },
    CommandSpec {
        command: "regenerate",
        action: CommandAction::Regenerate,
    },
    CommandSpec {
        command: "providers",
        action: CommandAction::ListProviders,
    },
    CommandSpec {
        command: "help",
        action: CommandAction::Help,
    },
    CommandSpec {
        command: "quit",
        action: CommandAction::Quit,
    },
    CommandSpec {
        command: "exit",
        action: CommandAction::Quit,
    },
];

pub(crate) const RAW_ARG_COMMANDS: &[CommandSpec] = &[CommandSpec {
    command: "provider",
    action: CommandAction::SetProvider,
}];

pub const CHAT_HELP_COMMANDS: &[&str] = &["/regen", "/provider", "/providers", "/help", "/quit"];
