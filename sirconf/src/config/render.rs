//! Turning a diff into the command list sent to the device.

use super::diff::DiffResult;

/// Commands that only move around the CLI and never change configuration.
pub const NOOP_COMMANDS: &[&str] = &["end", "exit", "quit", "eof", "!"];

/// Check whether a command is navigation or a comment.
pub fn is_noop_command(command: &str) -> bool {
    let command = command.trim();
    command.is_empty() || command.starts_with('#') || NOOP_COMMANDS.contains(&command)
}

/// Linearize a diff into commands, wrapped by `before` and `after`.
///
/// Navigation commands and comments are dropped from the diff part.
pub fn render<S: AsRef<str>>(diff: &DiffResult<'_>, before: &[S], after: &[S]) -> Vec<String> {
    let body = diff
        .texts()
        .into_iter()
        .filter(|text| !is_noop_command(text))
        .map(str::to_string);

    before
        .iter()
        .map(|s| s.as_ref().to_string())
        .chain(body)
        .chain(after.iter().map(|s| s.as_ref().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::diff::{DiffOptions, MatchPolicy, difference};
    use crate::config::tree::{ConfigTree, ParseOptions, Syntax};

    #[test]
    fn test_noop_commands() {
        for command in ["end", "exit", "quit", "eof", "!", "# note", "  exit  "] {
            assert!(is_noop_command(command), "{command}");
        }
        assert!(!is_noop_command("exit-address-family"));
        assert!(!is_noop_command("hostname r1"));
    }

    #[test]
    fn test_render_wraps_and_filters() {
        let options = ParseOptions::new(Syntax::Indented { width: 1 });
        let options = ParseOptions {
            comment_tokens: Vec::new(),
            ..options
        };
        let candidate = ConfigTree::parse("tunnel select 1\n ipsec tunnel 101\n exit\nquit\n", &options).unwrap();
        let running = ConfigTree::empty(candidate.syntax());
        let diff = difference(
            &candidate,
            &running,
            &DiffOptions {
                match_policy: MatchPolicy::None,
                ..Default::default()
            },
        );
        let commands = render(&diff, &["save"], &["show status"]);
        assert_eq!(
            commands,
            vec!["save", "tunnel select 1", "ipsec tunnel 101", "show status"]
        );
    }

    #[test]
    fn test_render_empty_diff_keeps_wrappers() {
        let tree = ConfigTree::empty(Syntax::Flat);
        let diff = difference(&tree, &tree, &DiffOptions::default());
        let none: [&str; 0] = [];
        assert!(render(&diff, &none, &none).is_empty());
        assert_eq!(render(&diff, &["a"], &["b"]), vec!["a", "b"]);
    }
}
