//! Parser for jobsh command lines.
//!
//! Grammar (one pipeline per line):
//!
//! ```text
//! line     := stage ( '|' stage )* [ '&' ]
//! stage    := ( word | '<' word | '>' word )+
//! ```
//!
//! Each redirection may appear at most once per line, in any stage. The
//! parser only builds the [`Pipeline`]; whether `<` sensibly feeds the first
//! stage is the launcher's business.

use std::path::PathBuf;

use crate::error::{ShellError, ShellResult};
use crate::lexer::{tokenize, Token};
use crate::pipeline::{Command, Pipeline};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Redirect {
    Input,
    Output,
}

#[derive(Default)]
struct PipelineBuilder {
    pipeline: Pipeline,
    stage: Vec<String>,
    word: Option<String>,
    pending: Option<Redirect>,
}

impl PipelineBuilder {
    fn push_piece(&mut self, piece: &str) {
        self.word.get_or_insert_with(String::new).push_str(piece);
    }

    /// Finish the word in progress, routing it to a redirection if one is pending.
    fn end_word(&mut self) -> ShellResult<()> {
        let Some(word) = self.word.take() else {
            return Ok(());
        };
        match self.pending.take() {
            Some(Redirect::Input) => {
                if self.pipeline.input.is_some() {
                    return Err(ShellError::Parse("duplicate input redirection".into()));
                }
                self.pipeline.input = Some(PathBuf::from(word));
            }
            Some(Redirect::Output) => {
                if self.pipeline.output.is_some() {
                    return Err(ShellError::Parse("duplicate output redirection".into()));
                }
                self.pipeline.output = Some(PathBuf::from(word));
            }
            None => self.stage.push(word),
        }
        Ok(())
    }

    fn redirect(&mut self, redirect: Redirect) -> ShellResult<()> {
        self.end_word()?;
        if self.pending.is_some() {
            return Err(missing_path());
        }
        self.pending = Some(redirect);
        Ok(())
    }

    fn end_stage(&mut self) -> ShellResult<()> {
        self.end_word()?;
        if self.pending.is_some() {
            return Err(missing_path());
        }
        let mut words = std::mem::take(&mut self.stage).into_iter();
        let Some(program) = words.next() else {
            return Err(ShellError::Parse("empty pipeline stage".into()));
        };
        self.pipeline.commands.push(Command { program, args: words.collect() });
        Ok(())
    }
}

fn missing_path() -> ShellError {
    ShellError::Parse("missing file name after redirection".into())
}

/// Parse one command line into a pipeline descriptor.
pub fn parse(source: &str) -> ShellResult<Pipeline> {
    let tokens = tokenize(source).map_err(|errors| {
        let first = &errors[0];
        ShellError::Parse(format!("{} at column {}", first.token, first.span.start + 1))
    })?;

    let mut builder = PipelineBuilder::default();
    let mut iter = tokens.into_iter().map(|t| t.token).peekable();

    while let Some(token) = iter.next() {
        match token {
            Token::Blank => builder.end_word()?,
            Token::Word(s) | Token::Escaped(s) | Token::SingleQuoted(s) | Token::DoubleQuoted(s) => {
                builder.push_piece(&s)
            }
            Token::Pipe => builder.end_stage()?,
            Token::Lt => builder.redirect(Redirect::Input)?,
            Token::Gt => builder.redirect(Redirect::Output)?,
            Token::Amp => {
                if iter.any(|t| t != Token::Blank) {
                    return Err(ShellError::Parse("'&' must end the command line".into()));
                }
                builder.pipeline.background = true;
            }
        }
    }

    builder.end_stage()?;
    Ok(builder.pipeline)
}
