//! Interactive read-eval-print loop around a [`TurnRunner`].

use std::future::Future;
use std::io::{self, BufRead, Write};

use tokio::sync::mpsc;

use crate::agent::{TurnEvent, TurnReporter, TurnRunner};

pub const PROMPT: &str = "> ";
pub const FAREWELL: &str = "Goodbye!";

/// Prints turn progress to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter;

impl TurnReporter for ConsoleReporter {
    fn report(&self, event: TurnEvent<'_>) {
        match event {
            TurnEvent::Start(content) => println!("START: {}", content),
            TurnEvent::Plan(content) => println!("PLAN: {}", content),
            TurnEvent::ToolCall(call) => {
                println!("TOOL: {}({})", call.function.name, call.function.arguments)
            }
            TurnEvent::Observation(result) => println!("OBSERVE: {}", result.content),
        }
    }
}

/// `exit` in any letter case ends the session.
pub fn is_exit_command(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case("exit")
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The user typed `exit`.
    Exit,
    /// Input reached end of file.
    EndOfInput,
    /// The shutdown signal fired (Ctrl-C).
    Interrupted,
}

/// Lines read from a blocking source, or the read error that ended it.
pub type LineReceiver = mpsc::Receiver<io::Result<String>>;

/// Read lines from `reader` on a dedicated OS thread.
///
/// A blocking read cannot be cancelled, so it must not live on the runtime's
/// blocking pool: the runtime would wait for it on shutdown. The thread ends
/// at end of input, on a read error, or once the receiver is dropped.
pub fn spawn_line_reader<R>(reader: R) -> io::Result<LineReceiver>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(1);
    std::thread::Builder::new()
        .name("line-reader".to_string())
        .spawn(move || {
            for line in reader.lines() {
                let failed = line.is_err();
                if tx.blocking_send(line).is_err() || failed {
                    break;
                }
            }
        })?;
    Ok(rx)
}

/// Lines typed on stdin.
pub fn stdin_lines() -> io::Result<LineReceiver> {
    spawn_line_reader(io::BufReader::new(io::stdin()))
}

/// Run one session: read a line, run a turn, print the answer, repeat.
///
/// The session owns its conversation. A failed turn is logged and returned;
/// `shutdown` resolving ends the session gracefully, even mid-turn.
pub async fn run_session<S>(
    agent: &dyn TurnRunner,
    mut lines: LineReceiver,
    shutdown: S,
) -> anyhow::Result<SessionEnd>
where
    S: Future,
{
    let mut conversation = agent.new_conversation();
    tokio::pin!(shutdown);

    loop {
        print!("\n{}", PROMPT);
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.recv() => line.transpose()?,
            _ = &mut shutdown => {
                println!("\n{}", FAREWELL);
                return Ok(SessionEnd::Interrupted);
            }
        };

        let Some(line) = line else {
            println!();
            return Ok(SessionEnd::EndOfInput);
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if is_exit_command(input) {
            println!("{}", FAREWELL);
            return Ok(SessionEnd::Exit);
        }

        let result = tokio::select! {
            result = agent.run_turn(&mut conversation, input, &ConsoleReporter) => result,
            _ = &mut shutdown => {
                println!("\n{}", FAREWELL);
                return Ok(SessionEnd::Interrupted);
            }
        };

        match result {
            Ok(answer) => println!("OUTPUT: {}", answer),
            Err(e) => {
                tracing::error!("Turn failed: {}", e);
                return Err(e.into());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentError, Conversation};
    use async_trait::async_trait;
    use std::io::{Cursor, Read};
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    fn lines(input: &'static [u8]) -> LineReceiver {
        spawn_line_reader(Cursor::new(input)).unwrap()
    }

    /// A terminal nobody types into: every read blocks forever.
    struct IdleTerminal;

    impl Read for IdleTerminal {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            loop {
                std::thread::park();
            }
        }
    }

    /// Echoes input back, failing on "fail".
    #[derive(Default)]
    struct EchoAgent {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TurnRunner for EchoAgent {
        fn new_conversation(&self) -> Conversation {
            Conversation::with_system_prompt("echo")
        }

        async fn run_turn(
            &self,
            conversation: &mut Conversation,
            input: &str,
            _reporter: &dyn TurnReporter,
        ) -> Result<String, AgentError> {
            conversation.push_user(input);
            self.seen.lock().unwrap().push(format!("{}:{}", conversation.len(), input));
            if input == "fail" {
                return Err(AgentError::EmptyResponse);
            }
            Ok(input.to_string())
        }
    }

    #[test]
    fn exit_is_case_insensitive() {
        assert!(is_exit_command("exit"));
        assert!(is_exit_command("EXIT"));
        assert!(is_exit_command("  Exit "));
        assert!(!is_exit_command("exit now"));
    }

    #[tokio::test]
    async fn session_runs_turns_until_exit() {
        let agent = EchoAgent::default();
        let input = lines(b"hello\n\nagain\nExit\nnever\n");

        let end = run_session(&agent, input, std::future::pending::<()>())
            .await
            .unwrap();

        assert_eq!(end, SessionEnd::Exit);
        // One conversation for the whole session.
        assert_eq!(*agent.seen.lock().unwrap(), vec!["2:hello", "3:again"]);
    }

    #[tokio::test]
    async fn session_ends_at_end_of_input() {
        let agent = EchoAgent::default();
        let end = run_session(&agent, lines(b"hi\n"), std::future::pending::<()>())
            .await
            .unwrap();
        assert_eq!(end, SessionEnd::EndOfInput);
    }

    #[tokio::test]
    async fn shutdown_signal_ends_session() {
        let agent = EchoAgent::default();
        // The sender stays open, so no line and no end of input ever arrive.
        let (_tx, rx) = mpsc::channel(1);

        let end = tokio::time::timeout(
            Duration::from_secs(5),
            run_session(&agent, rx, std::future::ready(())),
        )
        .await
        .expect("session did not end on shutdown")
        .unwrap();
        assert_eq!(end, SessionEnd::Interrupted);
    }

    #[test]
    fn interrupted_session_does_not_hold_up_runtime_shutdown() {
        let (done_tx, done_rx) = std::sync::mpsc::channel();

        std::thread::spawn(move || {
            let started = Instant::now();
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .unwrap();
            let agent = EchoAgent::default();
            let input = spawn_line_reader(io::BufReader::new(IdleTerminal)).unwrap();

            let end = runtime
                .block_on(run_session(&agent, input, std::future::ready(())))
                .unwrap();
            // Dropping the runtime must not wait on the pending read.
            drop(runtime);
            done_tx.send((end, started.elapsed())).unwrap();
        });

        let (end, elapsed) = done_rx
            .recv_timeout(Duration::from_secs(10))
            .expect("runtime shutdown blocked on a pending read");
        assert_eq!(end, SessionEnd::Interrupted);
        assert!(elapsed < Duration::from_secs(10));
    }

    #[test]
    fn line_reader_stops_at_end_of_input() {
        let mut rx = lines(b"one\ntwo\n");
        assert_eq!(rx.blocking_recv().unwrap().unwrap(), "one");
        assert_eq!(rx.blocking_recv().unwrap().unwrap(), "two");
        assert!(rx.blocking_recv().is_none());
    }

    #[tokio::test]
    async fn failed_turn_is_returned() {
        let agent = EchoAgent::default();
        let err = run_session(&agent, lines(b"fail\n"), std::future::pending::<()>())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("empty response"));
    }
}
