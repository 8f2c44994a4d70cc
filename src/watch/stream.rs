use std::io::BufRead;
use tracing::{debug, info, warn};

use super::event::{GameServerEvent, LabelLookup, UserId};
use crate::errors::{Result, SidecarError};
use crate::system::CancellationToken;

/// How a single watch stream ended
#[derive(Debug, PartialEq, Eq)]
pub enum StreamOutcome {
    Found(UserId),
    /// EOF or read error before any event carried the label
    Closed,
}

/// Read events until one carries `label_key`
///
/// Blank lines are skipped and nothing after the qualifying line is read.
/// A line that is not JSON, or a label value that is not a valid user id,
/// is fatal.
pub fn wait_for_label<R: BufRead + ?Sized>(
    reader: &mut R,
    label_key: &str,
    cancel: &CancellationToken,
) -> Result<StreamOutcome> {
    let mut buf = Vec::new();
    let mut events = 0u64;

    loop {
        if cancel.is_cancelled() {
            return Err(SidecarError::cancelled(format!(
                "watch cancelled after {} events",
                events
            )));
        }

        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => {
                debug!("Watch stream reached EOF after {} events", events);
                return Ok(StreamOutcome::Closed);
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Watch stream read failed after {} events: {}", events, e);
                return Ok(StreamOutcome::Closed);
            }
        }

        let line = buf.trim_ascii();
        if line.is_empty() {
            continue;
        }
        events += 1;

        let event = GameServerEvent::parse(line)?;

        if let Some(error) = event.error() {
            warn!("Agones SDK reported an error on the watch stream: {}", error);
            continue;
        }

        debug!(
            "Game server update #{}: name={:?}, state={:?}",
            events,
            event.name(),
            event.state()
        );

        match event.label(label_key) {
            LabelLookup::Found(value) => {
                let user = UserId::parse(value)?;
                info!("User assigned: {}", user);
                return Ok(StreamOutcome::Found(user));
            }
            LabelLookup::NotAString => {
                warn!(
                    "Label '{}' is present but not a string, ignoring this update",
                    label_key
                );
            }
            LabelLookup::Missing => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor, Read};

    fn run(input: &str) -> Result<StreamOutcome> {
        let mut reader = Cursor::new(input.as_bytes().to_vec());
        wait_for_label(&mut reader, "user", &CancellationToken::new())
    }

    fn found(name: &str) -> StreamOutcome {
        StreamOutcome::Found(UserId::parse(name).unwrap())
    }

    #[test]
    fn test_skips_events_without_label() {
        let input = concat!(
            r#"{"result":{"object_meta":{"labels":{"foo":"bar"}}}}"#,
            "\n",
            r#"{"result":{"object_meta":{"labels":{"user":"alice"}}}}"#,
            "\n",
        );
        assert_eq!(run(input).unwrap(), found("alice"));
    }

    #[test]
    fn test_stops_reading_after_first_match() {
        let input = concat!(
            r#"{"result":{"object_meta":{"labels":{"user":"alice"}}}}"#,
            "\n",
            r#"{"result":{"object_meta":{"labels":{"user":"bob"}}}}"#,
            "\n",
            "this line would be fatal if read\n",
        );
        let mut reader = Cursor::new(input.as_bytes().to_vec());
        let outcome = wait_for_label(&mut reader, "user", &CancellationToken::new()).unwrap();
        assert_eq!(outcome, found("alice"));

        let mut rest = String::new();
        reader.read_to_string(&mut rest).unwrap();
        assert!(rest.starts_with(r#"{"result":{"object_meta":{"labels":{"user":"bob"}}}}"#));
    }

    #[test]
    fn test_blank_lines_and_crlf() {
        let input = concat!(
            "\n\r\n   \n",
            r#"{"result":{"object_meta":{"labels":{"user":"carol"}}}}"#,
            "\r\n",
        );
        assert_eq!(run(input).unwrap(), found("carol"));
    }

    #[test]
    fn test_last_line_without_newline() {
        let input = r#"{"result":{"object_meta":{"labels":{"user":"dave"}}}}"#;
        assert_eq!(run(input).unwrap(), found("dave"));
    }

    #[test]
    fn test_missing_nested_keys_are_skipped() {
        let input = concat!(
            "{}\n",
            r#"{"result":{}}"#,
            "\n",
            r#"{"error":{"code":14,"message":"unavailable"}}"#,
            "\n",
            r#"{"result":{"object_meta":{"labels":{"user":5}}}}"#,
            "\n",
            r#"{"result":{"object_meta":{"labels":{"user":"erin"}}}}"#,
            "\n",
        );
        assert_eq!(run(input).unwrap(), found("erin"));
    }

    #[test]
    fn test_malformed_line_is_fatal() {
        let input = concat!(
            "not-json\n",
            r#"{"result":{"object_meta":{"labels":{"user":"alice"}}}}"#,
            "\n",
        );
        assert!(matches!(run(input), Err(SidecarError::Serialization(_))));
    }

    #[test]
    fn test_traversal_user_is_rejected() {
        let input = r#"{"result":{"object_meta":{"labels":{"user":"../../etc"}}}}"#;
        assert!(matches!(run(input), Err(SidecarError::Validation(_))));
    }

    #[test]
    fn test_eof_without_label_is_closed() {
        let input = concat!(r#"{"result":{"object_meta":{"labels":{}}}}"#, "\n");
        assert_eq!(run(input).unwrap(), StreamOutcome::Closed);
        assert_eq!(run("").unwrap(), StreamOutcome::Closed);
    }

    #[test]
    fn test_read_error_is_closed() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer"))
            }
        }
        let mut reader = io::BufReader::new(Broken);
        let outcome = wait_for_label(&mut reader, "user", &CancellationToken::new()).unwrap();
        assert_eq!(outcome, StreamOutcome::Closed);
    }

    #[test]
    fn test_custom_label_key() {
        let input = concat!(
            r#"{"result":{"object_meta":{"labels":{"user":"ignored","owner":"frank"}}}}"#,
            "\n"
        );
        let mut reader = Cursor::new(input.as_bytes().to_vec());
        let outcome = wait_for_label(&mut reader, "owner", &CancellationToken::new()).unwrap();
        assert_eq!(outcome, found("frank"));
    }

    #[test]
    fn test_cancelled_stream() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut reader = Cursor::new(b"{}\n".to_vec());
        assert!(matches!(
            wait_for_label(&mut reader, "user", &cancel),
            Err(SidecarError::Cancelled(_))
        ));
    }
}
