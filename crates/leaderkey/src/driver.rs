//! Feeds engine inputs from stdin, one token per line.

use std::{
    io::{self, BufRead},
    thread,
};

use leader_engine::{EngineHandle, Input};
use leader_protocol::Key;
use tokio::signal;
use tracing::{debug, warn};

/// Map one input line to an engine input. Blank lines are ignored.
pub fn parse_line(line: &str) -> Option<Input> {
    match line.trim() {
        "" => None,
        "toggle" => Some(Input::Toggle),
        "reload" => Some(Input::Reload),
        "reveal" => Some(Input::RevealConfig),
        "quit" | "exit" => Some(Input::Shutdown),
        token => Key::parse(token).map(Input::Key),
    }
}

/// Forward inputs parsed from `reader` through `send` until a shutdown is sent, `send`
/// reports the engine gone, or the reader ends. The end of input requests shutdown.
pub fn forward(reader: impl BufRead, mut send: impl FnMut(Input) -> bool) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "stdin read failed");
                break;
            }
        };
        let Some(input) = parse_line(&line) else {
            if !line.trim().is_empty() {
                warn!(token = %line.trim(), "unrecognized input");
            }
            continue;
        };
        let stop = matches!(input, Input::Shutdown);
        if !send(input) || stop {
            return;
        }
    }
    if !send(Input::Shutdown) {
        debug!("engine already stopped");
    }
}

/// Read stdin on a detached thread and forward inputs; Ctrl-C requests shutdown.
///
/// A blocked stdin read never holds up exit: the reader thread is not joined.
pub fn spawn(handle: EngineHandle) {
    let on_signal = handle.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            debug!("interrupt received");
            shutdown(&on_signal);
        }
    });
    let spawned = thread::Builder::new()
        .name("leaderkey-stdin".to_string())
        .spawn(move || forward(io::stdin().lock(), |input| handle.send(input).is_ok()));
    if let Err(e) = spawned {
        warn!(error = %e, "failed to start stdin reader");
    }
}

/// Ask the engine to stop; it may already be gone.
fn shutdown(handle: &EngineHandle) {
    if handle.send(Input::Shutdown).is_err() {
        debug!("engine already stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    /// Run `forward` over `text`, collecting what it sends.
    fn forwarded(text: &str) -> Vec<Input> {
        let mut sent = Vec::new();
        forward(Cursor::new(text.to_string()), |input| {
            sent.push(input);
            true
        });
        sent
    }

    #[test]
    fn stops_after_shutdown() {
        let sent = forwarded("toggle\nquit\nt\n");
        assert_eq!(sent.len(), 2);
        assert!(matches!(sent[0], Input::Toggle));
        assert!(matches!(sent[1], Input::Shutdown));
    }

    #[test]
    fn end_of_input_requests_shutdown() {
        let sent = forwarded("toggle\nnonsense\n\nt\n");
        assert_eq!(sent.len(), 3);
        assert!(matches!(sent[1], Input::Key(Key::Char('t'))));
        assert!(matches!(sent[2], Input::Shutdown));
    }

    #[test]
    fn stops_when_engine_is_gone() {
        let mut calls = 0;
        forward(Cursor::new("toggle\ntoggle\n".to_string()), |_| {
            calls += 1;
            false
        });
        assert_eq!(calls, 1);
    }

    #[test]
    fn tokens_map_to_inputs() {
        assert!(matches!(parse_line("toggle"), Some(Input::Toggle)));
        assert!(matches!(parse_line(" reload "), Some(Input::Reload)));
        assert!(matches!(parse_line("reveal"), Some(Input::RevealConfig)));
        assert!(matches!(parse_line("quit"), Some(Input::Shutdown)));
        assert!(matches!(
            parse_line("esc"),
            Some(Input::Key(Key::Escape))
        ));
        assert!(matches!(
            parse_line("bs"),
            Some(Input::Key(Key::Backspace))
        ));
        assert!(matches!(
            parse_line("o"),
            Some(Input::Key(Key::Char('o')))
        ));
        assert!(parse_line("").is_none());
        assert!(parse_line("ab").is_none());
    }
}
