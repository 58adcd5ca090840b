use super::command_registry::{CommandAction, CommandSpec, NO_ARG_COMMANDS, RAW_ARG_COMMANDS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Noop,
    Generate { prompt: String },
    Regenerate,
    SetProvider { name: String },
    ListProviders,
    Help,
    Quit,
    Unknown { command: String, arg: String },
}

fn find_action(command: &str, specs: &[CommandSpec]) -> Option<CommandAction> {
    specs
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.action)
}

fn parse_single_arg(arg: &str) -> String {
    if arg.trim().is_empty() {
        return String::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect::<Vec<String>>()
            .join(" "),
        Err(_) => arg.trim().to_string(),
    }
}

fn intent_for(action: CommandAction, arg: &str) -> Intent {
    match action {
        CommandAction::Regenerate => Intent::Regenerate,
        CommandAction::ListProviders => Intent::ListProviders,
        CommandAction::Help => Intent::Help,
        CommandAction::Quit => Intent::Quit,
        CommandAction::SetProvider => Intent::SetProvider {
            name: parse_single_arg(arg).to_ascii_lowercase(),
        },
    }
}

/// Turns one chat line into an intent. Anything that is not a known slash
/// command is a prompt.
pub fn parse_intent(text: &str) -> Intent {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return Intent::Noop;
    }

    if let Some(slash_tail) = raw_trimmed.strip_prefix('/') {
        let command_len = slash_tail
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
            .count();
        if command_len > 0 {
            let command = slash_tail[..command_len].to_ascii_lowercase();
            let arg = slash_tail[command_len..].trim();

            if let Some(action) = find_action(&command, NO_ARG_COMMANDS) {
                return intent_for(action, arg);
            }
            if let Some(action) = find_action(&command, RAW_ARG_COMMANDS) {
                return intent_for(action, arg);
            }
            return Intent::Unknown {
                command,
                arg: arg.to_string(),
            };
        }
    }

    Intent::Generate {
        prompt: raw_trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_intent, Intent};

    #[test]
    fn plain_text_is_a_prompt() {
        assert_eq!(
            parse_intent("  a lighthouse at dusk \n"),
            Intent::Generate {
                prompt: "a lighthouse at dusk".to_string()
            }
        );
    }

    #[test]
    fn blank_lines_are_noop() {
        assert_eq!(parse_intent(""), Intent::Noop);
        assert_eq!(parse_intent("   \t"), Intent::Noop);
    }

    #[test]
    fn regenerate_aliases() {
        assert_eq!(parse_intent("/regen"), Intent::Regenerate);
        assert_eq!(parse_intent("/REGENERATE"), Intent::Regenerate);
    }

    #[test]
    fn provider_command_takes_quoted_name() {
        assert_eq!(
            parse_intent("/provider \"Replicate\""),
            Intent::SetProvider {
                name: "replicate".to_string()
            }
        );
        assert_eq!(parse_intent("/providers"), Intent::ListProviders);
    }

    #[test]
    fn unknown_command_keeps_argument() {
        assert_eq!(
            parse_intent("/magic foo bar"),
            Intent::Unknown {
                command: "magic".to_string(),
                arg: "foo bar".to_string()
            }
        );
    }

    #[test]
    fn lone_slash_is_a_prompt() {
        assert_eq!(
            parse_intent("/ slash art"),
            Intent::Generate {
                prompt: "/ slash art".to_string()
            }
        );
    }
}
