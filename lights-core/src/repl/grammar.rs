#![allow(clippy::module_name_repetitions)]

//! Lexer and parser for the start-tower console.
//!
//! The lexer uses `regal` to produce a bounded token stream, and the parser
//! composes `winnow` parsers over those tokens to build [`Command`] values.
//! Nothing here allocates, so the firmware console and the emulator share it.

use super::catalog::{self, CommandTag};
use core::fmt;
use core::ops::Range;
use core::time::Duration;

use heapless::Vec as HeaplessVec;
use regal::IncrementalError;
use regal::TokenCache;
use regal_macros::RegalLexer;
use winnow::error::ErrMode;
use winnow::prelude::*;

use crate::lights::{Light, LightState};

/// Maximum number of tokens produced per console line.
pub const MAX_TOKENS: usize = 16;
const MAX_CACHE_RECORDS: usize = MAX_TOKENS * 2;

/// Lexical token kinds recognized by the console grammar.
#[derive(RegalLexer, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TokenKind {
    /// Duration literal ending in `ms` or `s`.
    #[regex(r"[0-9]+(?:ms|s)", priority = 2)]
    Duration,
    /// Unsuffixed integer literal.
    #[regex(r"[0-9]+")]
    Integer,
    /// Identifier or keyword (case-insensitive match performed later).
    #[regex(r"[A-Za-z][A-Za-z0-9-]*")]
    Ident,
    #[regex(r"[ \t]+", skip)]
    Whitespace,
    /// End-of-line token (`\r`, `\n`, or `\r\n`).
    #[token("\r\n")]
    #[token("\n")]
    #[token("\r")]
    Eol,
    /// Pseudo variant used when the lexer encounters unsupported input.
    #[default]
    #[regex(r".", priority = 1024)]
    Error,
}

/// Token emitted by the lexer with a byte span back into the source line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub lexeme: &'a str,
    pub span: Range<usize>,
}

/// Bounded token buffer to avoid dynamic allocation in `no_std` environments.
pub type TokenBuffer<'a> = HeaplessVec<Token<'a>, MAX_TOKENS>;

/// Lexer errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LexError {
    /// Input produced more tokens than the static buffer allows.
    TooManyTokens { processed: usize },
    /// Underlying lexer reported an unrecoverable error.
    Engine,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::TooManyTokens { processed } => {
                write!(f, "token buffer exhausted after {processed} items")
            }
            LexError::Engine => write!(f, "lexer engine error"),
        }
    }
}

/// Grammar errors emitted by the parser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GrammarErrorKind<'a> {
    UnexpectedToken {
        expected: &'static str,
        found: Option<TokenKind>,
        span: Range<usize>,
    },
    UnexpectedEnd {
        expected: &'static str,
    },
    UnknownCommand {
        lexeme: &'a str,
    },
    UnknownLight {
        lexeme: &'a str,
    },
    InvalidState {
        lexeme: &'a str,
    },
    InvalidInteger {
        span: Range<usize>,
    },
    InvalidDuration {
        span: Range<usize>,
    },
    InvalidToken {
        span: Range<usize>,
        lexeme: &'a str,
    },
}

impl fmt::Display for GrammarErrorKind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarErrorKind::UnexpectedToken {
                expected,
                found,
                span,
            } => write!(f, "expected {expected}, found {found:?} at {span:?}"),
            GrammarErrorKind::UnexpectedEnd { expected } => {
                write!(f, "unexpected end of input, expected {expected}")
            }
            GrammarErrorKind::UnknownCommand { lexeme } => {
                write!(f, "unknown command `{lexeme}`, try `help`")
            }
            GrammarErrorKind::UnknownLight { lexeme } => {
                write!(f, "unknown light `{lexeme}`, try `help lights`")
            }
            GrammarErrorKind::InvalidState { lexeme } => {
                write!(f, "expected on, off or toggle, found `{lexeme}`")
            }
            GrammarErrorKind::InvalidInteger { span } => {
                write!(f, "invalid integer literal at {span:?}")
            }
            GrammarErrorKind::InvalidDuration { span } => {
                write!(f, "invalid duration literal at {span:?}")
            }
            GrammarErrorKind::InvalidToken { span, lexeme } => {
                write!(f, "unsupported token `{lexeme}` at {span:?}")
            }
        }
    }
}

/// Wrapper type enabling a consistent error surface for consumers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrammarError<'a> {
    pub kind: GrammarErrorKind<'a>,
}

impl fmt::Display for GrammarError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

impl<'a> GrammarError<'a> {
    fn unexpected(expected: &'static str, token: Option<&Token<'a>>) -> Self {
        GrammarError {
            kind: match token {
                Some(tok) => GrammarErrorKind::UnexpectedToken {
                    expected,
                    found: Some(tok.kind),
                    span: tok.span.clone(),
                },
                None => GrammarErrorKind::UnexpectedEnd { expected },
            },
        }
    }

    fn with_kind(kind: GrammarErrorKind<'a>) -> Self {
        GrammarError { kind }
    }
}

type Input<'src, 'slice> = &'slice [Token<'src>];
type ParseResult<'src, O> = Result<O, ErrMode<GrammarError<'src>>>;

/// Combined lex/parse error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseError<'a> {
    Lex(LexError),
    Grammar(GrammarError<'a>),
}

impl fmt::Display for ParseError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Lex(err) => err.fmt(f),
            ParseError::Grammar(err) => err.fmt(f),
        }
    }
}

/// Structured commands produced by the parser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command<'a> {
    Start,
    Reset,
    Fault(FaultCommand),
    Light(LightCommandArgs),
    Status,
    Wait(Duration),
    Help(HelpCommand<'a>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaultCommand {
    /// Zero-based dog number; range is checked by the executor.
    pub dog: usize,
    pub state: LightState,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LightCommandArgs {
    pub light: Light,
    pub state: LightState,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HelpCommand<'a> {
    pub topic: Option<&'a str>,
}

/// Tokenize the provided line.
///
/// # Errors
///
/// Fails when the line holds more than [`MAX_TOKENS`] tokens.
pub fn lex(line: &str) -> Result<TokenBuffer<'_>, LexError> {
    let compiled = TokenKind::lexer();
    let mut cache: TokenCache<TokenKind, MAX_CACHE_RECORDS> = TokenCache::new();
    let partial = cache
        .rebuild(compiled, line)
        .map_err(map_incremental_error)?;
    let mut buffer = TokenBuffer::new();

    for record in cache.tokens() {
        if record.skipped {
            continue;
        }

        let span = record.start..record.end;
        let lexeme = &line[span.clone()];
        push_token(&mut buffer, record.token, lexeme, span)?;
    }

    if let Some(partial) = partial.filter(|partial| !partial.fragment.is_empty()) {
        let start = partial.start;
        let span = start..start + partial.fragment.len();
        push_token(&mut buffer, TokenKind::Error, partial.fragment, span)?;
    }

    Ok(buffer)
}

fn push_token<'a>(
    buffer: &mut TokenBuffer<'a>,
    kind: TokenKind,
    lexeme: &'a str,
    span: Range<usize>,
) -> Result<(), LexError> {
    buffer
        .push(Token { kind, lexeme, span })
        .map_err(|_| LexError::TooManyTokens {
            processed: buffer.len() + 1,
        })
}

fn map_incremental_error(error: IncrementalError) -> LexError {
    match error {
        IncrementalError::TokenOverflow => LexError::TooManyTokens {
            processed: MAX_TOKENS,
        },
        _ => LexError::Engine,
    }
}

/// Parse a console command from the provided line.
///
/// # Errors
///
/// Returns the first lexer or grammar error found in the line.
pub fn parse(line: &str) -> Result<Command<'_>, ParseError<'_>> {
    let tokens = lex(line).map_err(ParseError::Lex)?;

    if let Some(token) = tokens.iter().find(|token| token.kind == TokenKind::Error) {
        return Err(ParseError::Grammar(GrammarError::with_kind(
            GrammarErrorKind::InvalidToken {
                span: token.span.clone(),
                lexeme: token.lexeme,
            },
        )));
    }

    let mut input = tokens.as_slice();
    let command = match command.parse_next(&mut input) {
        Ok(command) => command,
        Err(ErrMode::Backtrack(err) | ErrMode::Cut(err)) => {
            return Err(ParseError::Grammar(err));
        }
        Err(ErrMode::Incomplete(_)) => {
            return Err(ParseError::Grammar(GrammarError::unexpected(
                "token",
                input.first(),
            )));
        }
    };

    match input.iter().find(|token| token.kind != TokenKind::Eol) {
        Some(token) => Err(ParseError::Grammar(GrammarError::unexpected(
            "end of command",
            Some(token),
        ))),
        None => Ok(command),
    }
}

fn command<'src>(input: &mut Input<'src, '_>) -> ParseResult<'src, Command<'src>> {
    let keyword = expect_kind(TokenKind::Ident, "command keyword").parse_next(input)?;
    let Some(spec) = catalog::find(keyword.lexeme) else {
        return Err(ErrMode::Cut(GrammarError::with_kind(
            GrammarErrorKind::UnknownCommand {
                lexeme: keyword.lexeme,
            },
        )));
    };

    match spec.tag {
        CommandTag::Start => Ok(Command::Start),
        CommandTag::Reset => Ok(Command::Reset),
        CommandTag::Status => Ok(Command::Status),
        CommandTag::Fault => {
            let dog = dog_number(input)?;
            let state = optional_state(input)?.unwrap_or(LightState::On);
            Ok(Command::Fault(FaultCommand { dog, state }))
        }
        CommandTag::Light => {
            let light = light_name(input)?;
            let state = optional_state(input)?.unwrap_or(LightState::Toggle);
            Ok(Command::Light(LightCommandArgs { light, state }))
        }
        CommandTag::Wait => duration.map(Command::Wait).parse_next(input),
        CommandTag::Help => {
            let topic = optional_kind(TokenKind::Ident, input).map(|token| token.lexeme);
            Ok(Command::Help(HelpCommand { topic }))
        }
    }
}

fn dog_number<'src>(input: &mut Input<'src, '_>) -> ParseResult<'src, usize> {
    let token = expect_kind(TokenKind::Integer, "dog number").parse_next(input)?;
    token.lexeme.parse::<usize>().map_err(|_| {
        ErrMode::Cut(GrammarError::with_kind(GrammarErrorKind::InvalidInteger {
            span: token.span.clone(),
        }))
    })
}

fn light_name<'src>(input: &mut Input<'src, '_>) -> ParseResult<'src, Light> {
    let token = expect_kind(TokenKind::Ident, "light name").parse_next(input)?;
    Light::from_name(token.lexeme).ok_or_else(|| {
        ErrMode::Cut(GrammarError::with_kind(GrammarErrorKind::UnknownLight {
            lexeme: token.lexeme,
        }))
    })
}

fn optional_state<'src>(input: &mut Input<'src, '_>) -> ParseResult<'src, Option<LightState>> {
    match optional_kind(TokenKind::Ident, input) {
        None => Ok(None),
        Some(token) => LightState::from_keyword(token.lexeme).map(Some).ok_or_else(|| {
            ErrMode::Cut(GrammarError::with_kind(GrammarErrorKind::InvalidState {
                lexeme: token.lexeme,
            }))
        }),
    }
}

fn duration<'src>(input: &mut Input<'src, '_>) -> ParseResult<'src, Duration> {
    let token = expect_kind(TokenKind::Duration, "duration").parse_next(input)?;
    parse_duration(&token).map_err(ErrMode::Cut)
}

/// Consumes the next token when it has the requested kind.
fn optional_kind<'src>(kind: TokenKind, input: &mut Input<'src, '_>) -> Option<Token<'src>> {
    match input.split_first() {
        Some((token, rest)) if token.kind == kind => {
            *input = rest;
            Some(token.clone())
        }
        _ => None,
    }
}

fn expect_kind<'src, 'slice>(
    kind: TokenKind,
    label: &'static str,
) -> impl Parser<Input<'src, 'slice>, Token<'src>, ErrMode<GrammarError<'src>>>
where
    'src: 'slice,
{
    move |input: &mut Input<'src, 'slice>| match input.split_first() {
        Some((token, rest)) if token.kind == kind => {
            *input = rest;
            Ok(token.clone())
        }
        Some((token, _)) => Err(ErrMode::Backtrack(GrammarError::unexpected(
            label,
            Some(token),
        ))),
        None => Err(ErrMode::Backtrack(GrammarError::unexpected(label, None))),
    }
}

fn parse_duration<'a>(token: &Token<'a>) -> Result<Duration, GrammarError<'a>> {
    let invalid = || {
        GrammarError::with_kind(GrammarErrorKind::InvalidDuration {
            span: token.span.clone(),
        })
    };

    let text = token.lexeme;
    if let Some(rest) = text.strip_suffix("ms") {
        let millis = rest.parse::<u32>().map_err(|_| invalid())?;
        Ok(Duration::from_millis(millis.into()))
    } else if let Some(rest) = text.strip_suffix('s') {
        let seconds = rest.parse::<u32>().map_err(|_| invalid())?;
        Ok(Duration::from_secs(seconds.into()))
    } else {
        Err(invalid())
    }
}
