use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

/// Where formatted log lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LogTarget {
    Stdout,
    /// Keeps stdout free for command output.
    Stderr,
}

pub(crate) fn parse_level(level: &str) -> Level {
    level.trim().parse().unwrap_or(Level::INFO)
}

/// Install the global subscriber. Later calls are ignored.
pub(crate) fn init(level: &str, target: LogTarget) {
    let writer = match target {
        LogTarget::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogTarget::Stderr => BoxMakeWriter::new(std::io::stderr),
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_level(level))
        .with_writer(writer)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_parse_case_insensitively() {
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level(" warn "), Level::WARN);
        assert_eq!(parse_level("chatty"), Level::INFO);
    }
}
