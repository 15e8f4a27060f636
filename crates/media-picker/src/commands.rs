//! Line commands for the interactive session.
//!
//! ```text
//!   /text       edit the filter (debounced)
//!   /           submit the current filter now
//!   #fragment   navigate, as if the URL fragment changed
//!   size K | player B | source M | mute | pick N | play | pause | quit
//! ```

use media_proto::protocol::{PlayerBackend, SourceMode};

#[derive(Debug, Clone, PartialEq)]
pub enum LineCommand {
    FilterEdit(String),
    FilterSubmit,
    Navigate(String),
    Size(String),
    Player(PlayerBackend),
    Source(SourceMode),
    ToggleMute,
    Pick(usize),
    Play,
    TogglePause,
    Quit,
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> anyhow::Result<Option<LineCommand>> {
    let line = line.trim_end_matches(['\r', '\n']);

    if let Some(text) = line.strip_prefix('/') {
        return Ok(Some(if text.is_empty() {
            LineCommand::FilterSubmit
        } else {
            LineCommand::FilterEdit(text.to_string())
        }));
    }
    if line.starts_with('#') {
        return Ok(Some(LineCommand::Navigate(line.to_string())));
    }

    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();

    let cmd = match (verb, arg) {
        ("size", Some(key)) => LineCommand::Size(key.to_string()),
        ("player", Some(b)) => LineCommand::Player(b.parse().map_err(anyhow::Error::msg)?),
        ("source", Some(m)) => LineCommand::Source(m.parse().map_err(anyhow::Error::msg)?),
        ("pick", Some(n)) => LineCommand::Pick(n.parse()?),
        ("mute", None) => LineCommand::ToggleMute,
        ("play", None) => LineCommand::Play,
        ("pause", None) => LineCommand::TogglePause,
        ("quit" | "q", None) => LineCommand::Quit,
        _ => anyhow::bail!("unrecognised command: {}", line.trim()),
    };
    Ok(Some(cmd))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_lines() {
        assert_eq!(
            parse_line("/big buck").unwrap(),
            Some(LineCommand::FilterEdit("big buck".into()))
        );
        assert_eq!(parse_line("/").unwrap(), Some(LineCommand::FilterSubmit));
        assert_eq!(parse_line("   ").unwrap(), None);
    }

    #[test]
    fn test_verbs() {
        assert_eq!(
            parse_line("size 720p.webm").unwrap(),
            Some(LineCommand::Size("720p.webm".into()))
        );
        assert_eq!(
            parse_line("player js-cpu").unwrap(),
            Some(LineCommand::Player(PlayerBackend::JsCpu))
        );
        assert_eq!(
            parse_line("source shortlist-cbr").unwrap(),
            Some(LineCommand::Source(SourceMode::ShortlistCbr))
        );
        assert_eq!(parse_line("pick 3").unwrap(), Some(LineCommand::Pick(3)));
        assert_eq!(
            parse_line("#file=Foo.webm&size=360p.ogv").unwrap(),
            Some(LineCommand::Navigate("#file=Foo.webm&size=360p.ogv".into()))
        );
    }

    #[test]
    fn test_bad_input_is_an_error() {
        assert!(parse_line("player flash").is_err());
        assert!(parse_line("pick two").is_err());
        assert!(parse_line("size").is_err());
        assert!(parse_line("rewind").is_err());
    }
}
