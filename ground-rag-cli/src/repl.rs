//! The line-oriented question/answer loop.

use std::io::Write;

use anyhow::Result;
use ground_rag::{Answer, RagError, RagPipeline};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::warn;

/// Prompt printed before each question.
pub const PROMPT: &str = "You: ";

/// What one line of input asks for.
#[derive(Debug, PartialEq, Eq)]
pub enum Input<'a> {
    /// `exit` or `quit`, in any case.
    Exit,
    /// Nothing but whitespace.
    Blank,
    /// A trimmed question.
    Question(&'a str),
}

/// Classify one line of input.
pub fn parse_input(line: &str) -> Input<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        Input::Blank
    } else if trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit") {
        Input::Exit
    } else {
        Input::Question(trimmed)
    }
}

/// Options for rendering answers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplOptions {
    /// Print the source documents after each answer.
    pub show_sources: bool,
}

/// Read questions from `input` until `exit`/`quit` or end of input.
///
/// Each question is answered to completion before the next line is read.
/// Errors from a single question are printed with remediation hints and the
/// loop moves on; only I/O errors on `input`/`out` end it early.
pub async fn run_repl<R, W>(
    pipeline: &RagPipeline,
    input: R,
    out: &mut W,
    options: ReplOptions,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    loop {
        write!(out, "{PROMPT}")?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            writeln!(out)?;
            break;
        };

        let question = match parse_input(&line) {
            Input::Exit => break,
            Input::Blank => continue,
            Input::Question(question) => question,
        };

        match pipeline.answer(question).await {
            Ok(answer) => write_answer(out, &answer, options)?,
            Err(e) => {
                warn!(error = %e, "question failed");
                write_error(out, &e)?;
            }
        }
    }
    Ok(())
}

fn write_answer<W: Write>(out: &mut W, answer: &Answer, options: ReplOptions) -> Result<()> {
    writeln!(out, "\nAnswer: {}", answer.text)?;
    if options.show_sources && !answer.chunks.is_empty() {
        writeln!(out, "Sources: {}", answer.sources().join(", "))?;
    }
    writeln!(out)?;
    Ok(())
}

/// Print an error with its remediation hint, if any.
pub fn write_error<W: Write>(out: &mut W, error: &RagError) -> Result<()> {
    writeln!(out, "[error] {error}")?;
    if let Some(hint) = error.remediation() {
        writeln!(out, "  {hint}")?;
    }
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_keywords_are_case_insensitive() {
        assert_eq!(parse_input("exit"), Input::Exit);
        assert_eq!(parse_input("  QUIT "), Input::Exit);
        assert_eq!(parse_input("Exit"), Input::Exit);
    }

    #[test]
    fn blank_lines_are_ignored() {
        assert_eq!(parse_input(""), Input::Blank);
        assert_eq!(parse_input(" \t "), Input::Blank);
    }

    #[test]
    fn questions_are_trimmed() {
        assert_eq!(
            parse_input("  What color is the sky?  "),
            Input::Question("What color is the sky?")
        );
        assert_eq!(parse_input("exit now"), Input::Question("exit now"));
    }
}
