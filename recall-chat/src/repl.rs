//! Line-oriented chat loop.
//!
//! Each input line is one turn. A few slash commands are handled here and
//! never reach the controller: `/help`, `/history`, `/new` and `/quit`
//! (alias `/exit`). Anything else, including `/name` commands for registered
//! capabilities, is passed to [`TurnController::run_turn`].

use chat_kernel::{ChatSession, TurnController, TurnOutcome};
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::info;

const PROMPT: &str = "> ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Builtin {
    Help,
    History,
    New,
    Quit,
}

impl Builtin {
    fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "/help" => Some(Self::Help),
            "/history" => Some(Self::History),
            "/new" => Some(Self::New),
            "/quit" | "/exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// Runs the loop until `/quit` or end of input and returns the final session.
///
/// # Errors
///
/// Returns an I/O error if reading input or writing output fails. Turn
/// failures are not errors; they are printed as notices.
pub async fn run<R, W>(
    controller: &TurnController,
    input: R,
    output: &mut W,
) -> io::Result<ChatSession>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut session = ChatSession::new();
    let mut lines = input.lines();
    info!(session = %session.id(), "chat started");

    loop {
        output.write_all(PROMPT.as_bytes()).await?;
        output.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match Builtin::parse(&line) {
            Some(Builtin::Quit) => break,
            Some(Builtin::Help) => write_block(output, &help(controller)).await?,
            Some(Builtin::History) => {
                let transcript = session.transcript();
                if transcript.is_empty() {
                    write_block(output, "(no messages yet)").await?;
                } else {
                    write_block(output, &transcript.render()).await?;
                }
            }
            Some(Builtin::New) => {
                session = ChatSession::new();
                info!(session = %session.id(), "chat restarted");
                write_block(output, "Started a new conversation.").await?;
            }
            None => match controller.run_turn(&mut session, &line).await {
                TurnOutcome::Ignored => {}
                TurnOutcome::Failed { notice, .. } => {
                    write_block(output, &format!("! {notice}")).await?;
                }
                outcome => {
                    if let Some(reply) = outcome.reply() {
                        write_block(output, reply).await?;
                    }
                }
            },
        }
    }

    output.flush().await?;
    info!(session = %session.id(), messages = session.transcript().len(), "chat ended");
    Ok(session)
}

fn help(controller: &TurnController) -> String {
    let mut text = String::from(
        "Type a message and press enter.\n\
         /history  show this conversation\n\
         /new      start a new conversation\n\
         /quit     leave",
    );
    for (name, description) in controller.auxiliary().describe() {
        text.push_str(&format!("\n/{name:<8} {description}"));
    }
    text
}

async fn write_block<W>(output: &mut W, text: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    output.write_all(text.as_bytes()).await?;
    output.write_all(b"\n\n").await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_parse() {
        assert_eq!(Builtin::parse(" /quit "), Some(Builtin::Quit));
        assert_eq!(Builtin::parse("/exit"), Some(Builtin::Quit));
        assert_eq!(Builtin::parse("/history"), Some(Builtin::History));
        assert_eq!(Builtin::parse("/search rust"), None);
        assert_eq!(Builtin::parse("quit"), None);
    }
}
