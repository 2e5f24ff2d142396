// crates/genui-script/src/lexer.rs
// ============================================================================
// Module: Script Lexer
// Description: Tokenizer for the transform script language.
// Purpose: Turn untrusted source text into positioned tokens.
// Dependencies: chumsky, crate::error, crate::value
// ============================================================================

//! ## Overview
//! The character-level grammar is a [`chumsky`] parser over `&str`. Each token
//! records whether a line break preceded it; [`tokenize`] then walks the token
//! stream once to insert the semicolons that line breaks imply and to charge
//! every nesting construct against the sandbox nesting budget, so the token
//! parser never recurses deeper than the budget allows.
//!
//! Template literals are split into text chunks and embedded expression
//! slices. Scanning of `${ ... }` bodies is unrolled to a fixed depth instead
//! of recursing, and the parser lexes each slice again on demand.
//!
//! Regular expression literals are not part of the language; `/` always lexes
//! as division.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use chumsky::Boxed;
use chumsky::prelude::*;

use crate::error::EvalError;
use crate::value::format_number;
use crate::value::parse_integer_digits;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Byte span of a token within the evaluated source.
pub(crate) type Span = SimpleSpan;

/// Error produced by the character-level grammar.
type LexError<'src> = Rich<'src, char, Span>;

/// Parser state for the character-level grammar.
type LexExtra<'src> = extra::Err<LexError<'src>>;

/// Scanner for one unit of embedded template expression source.
type Unit<'src> = Boxed<'src, 'src, &'src str, (), LexExtra<'src>>;

// ============================================================================
// SECTION: Tokens
// ============================================================================

/// Reserved words recognized by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Keyword {
    /// `const`
    Const,
    /// `let`
    Let,
    /// `var`
    Var,
    /// `function`
    Function,
    /// `return`
    Return,
    /// `if`
    If,
    /// `else`
    Else,
    /// `for`
    For,
    /// `of`
    Of,
    /// `in`
    In,
    /// `while`
    While,
    /// `do`
    Do,
    /// `break`
    Break,
    /// `continue`
    Continue,
    /// `true`
    True,
    /// `false`
    False,
    /// `null`
    Null,
    /// `undefined`
    Undefined,
    /// `typeof`
    Typeof,
    /// `new`
    New,
    /// `throw`
    Throw,
    /// `try`
    Try,
    /// `catch`
    Catch,
    /// `finally`
    Finally,
    /// `this`
    This,
    /// `void`
    Void,
}

impl Keyword {
    /// Maps an identifier slice onto a keyword.
    fn lookup(word: &str) -> Option<Self> {
        let keyword = match word {
            "const" => Self::Const,
            "let" => Self::Let,
            "var" => Self::Var,
            "function" => Self::Function,
            "return" => Self::Return,
            "if" => Self::If,
            "else" => Self::Else,
            "for" => Self::For,
            "of" => Self::Of,
            "in" => Self::In,
            "while" => Self::While,
            "do" => Self::Do,
            "break" => Self::Break,
            "continue" => Self::Continue,
            "true" => Self::True,
            "false" => Self::False,
            "null" => Self::Null,
            "undefined" => Self::Undefined,
            "typeof" => Self::Typeof,
            "new" => Self::New,
            "throw" => Self::Throw,
            "try" => Self::Try,
            "catch" => Self::Catch,
            "finally" => Self::Finally,
            "this" => Self::This,
            "void" => Self::Void,
            _ => return None,
        };
        Some(keyword)
    }

    /// Returns the source spelling of the keyword.
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Const => "const",
            Self::Let => "let",
            Self::Var => "var",
            Self::Function => "function",
            Self::Return => "return",
            Self::If => "if",
            Self::Else => "else",
            Self::For => "for",
            Self::Of => "of",
            Self::In => "in",
            Self::While => "while",
            Self::Do => "do",
            Self::Break => "break",
            Self::Continue => "continue",
            Self::True => "true",
            Self::False => "false",
            Self::Null => "null",
            Self::Undefined => "undefined",
            Self::Typeof => "typeof",
            Self::New => "new",
            Self::Throw => "throw",
            Self::Try => "try",
            Self::Catch => "catch",
            Self::Finally => "finally",
            Self::This => "this",
            Self::Void => "void",
        }
    }
}

/// Punctuators and operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Punct {
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `,`
    Comma,
    /// `;`
    Semicolon,
    /// `:`
    Colon,
    /// `.`
    Dot,
    /// `...`
    Ellipsis,
    /// `?.`
    QuestionDot,
    /// `?`
    Question,
    /// `??`
    NullishCoalesce,
    /// `=>`
    Arrow,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `**`
    StarStar,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `++`
    PlusPlus,
    /// `--`
    MinusMinus,
    /// `=`
    Assign,
    /// `+=`
    PlusAssign,
    /// `-=`
    MinusAssign,
    /// `*=`
    StarAssign,
    /// `/=`
    SlashAssign,
    /// `%=`
    PercentAssign,
    /// `??=`
    NullishAssign,
    /// `||=`
    OrAssign,
    /// `&&=`
    AndAssign,
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// `===`
    StrictEq,
    /// `!==`
    StrictNotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `&&`
    AndAnd,
    /// `||`
    OrOr,
    /// `!`
    Bang,
}

impl Punct {
    /// Returns the source spelling of the punctuator.
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::Comma => ",",
            Self::Semicolon => ";",
            Self::Colon => ":",
            Self::Dot => ".",
            Self::Ellipsis => "...",
            Self::QuestionDot => "?.",
            Self::Question => "?",
            Self::NullishCoalesce => "??",
            Self::Arrow => "=>",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::StarStar => "**",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::PlusPlus => "++",
            Self::MinusMinus => "--",
            Self::Assign => "=",
            Self::PlusAssign => "+=",
            Self::MinusAssign => "-=",
            Self::StarAssign => "*=",
            Self::SlashAssign => "/=",
            Self::PercentAssign => "%=",
            Self::NullishAssign => "??=",
            Self::OrAssign => "||=",
            Self::AndAssign => "&&=",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::StrictEq => "===",
            Self::StrictNotEq => "!==",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::AndAnd => "&&",
            Self::OrOr => "||",
            Self::Bang => "!",
        }
    }

    /// Maps a character onto its one-character punctuator.
    const fn single(ch: char) -> Option<Self> {
        let punct = match ch {
            '(' => Self::LParen,
            ')' => Self::RParen,
            '[' => Self::LBracket,
            ']' => Self::RBracket,
            '{' => Self::LBrace,
            '}' => Self::RBrace,
            ',' => Self::Comma,
            ';' => Self::Semicolon,
            ':' => Self::Colon,
            '.' => Self::Dot,
            '?' => Self::Question,
            '+' => Self::Plus,
            '-' => Self::Minus,
            '*' => Self::Star,
            '/' => Self::Slash,
            '%' => Self::Percent,
            '=' => Self::Assign,
            '<' => Self::Lt,
            '>' => Self::Gt,
            '!' => Self::Bang,
            _ => return None,
        };
        Some(punct)
    }
}

/// One piece of a template literal.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TemplateChunk<'src> {
    /// Cooked literal text.
    Text(String),
    /// Embedded `${...}` expression source and its offset.
    Expr {
        /// Expression source slice.
        source: &'src str,
        /// Byte offset of the slice within the lexed text.
        offset: usize,
    },
}

/// Lexer token.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token<'src> {
    /// Identifier.
    Ident(&'src str),
    /// Reserved word.
    Keyword(Keyword),
    /// Numeric literal.
    Number(f64),
    /// String literal with escapes resolved.
    Str(String),
    /// Template literal.
    Template(Vec<TemplateChunk<'src>>),
    /// Punctuator or operator.
    Punct(Punct),
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(name) => f.write_str(name),
            Self::Keyword(keyword) => f.write_str(keyword.as_str()),
            Self::Number(value) => f.write_str(&format_number(*value)),
            Self::Str(_) => f.write_str("string literal"),
            Self::Template(_) => f.write_str("template literal"),
            Self::Punct(punct) => f.write_str(punct.as_str()),
        }
    }
}

/// Token with its span and line-break flag.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Lexeme<'src> {
    /// Token value.
    pub(crate) token: Token<'src>,
    /// Span relative to the lexed slice.
    pub(crate) span: Span,
    /// True when a line terminator precedes the token.
    pub(crate) line_break: bool,
}

/// Raw template piece before adjacent characters are merged.
#[derive(Debug, Clone)]
enum Piece<'src> {
    /// Cooked character; `None` for a line continuation.
    Char(Option<char>),
    /// Embedded expression slice and its offset within the lexed slice.
    Expr(&'src str, usize),
}

// ============================================================================
// SECTION: Character Grammar
// ============================================================================

/// Builds the character-level grammar.
///
/// `template_depth` bounds how deeply braces and templates may nest inside a
/// template's `${ ... }` body.
pub(crate) fn lexer<'src>(
    template_depth: usize,
) -> impl Parser<'src, &'src str, Vec<Lexeme<'src>>, LexExtra<'src>> {
    let line_comment = just("//").then(any().and_is(text::newline().not()).repeated()).ignored();
    let block_comment =
        just("/*").then(any().and_is(just("*/").not()).repeated()).then(just("*/")).ignored();
    let comment = line_comment.or(block_comment);
    let trivia = choice((
        any().filter(|ch: &char| ch.is_whitespace() || *ch == '\u{feff}').ignored(),
        comment.clone(),
    ))
    .repeated();

    let hex_digits =
        |count: usize| any().filter(char::is_ascii_hexdigit).repeated().exactly(count).to_slice();
    let escape = just('\\').ignore_then(choice((
        just('n').to(Some('\n')),
        just('t').to(Some('\t')),
        just('r').to(Some('\r')),
        just('b').to(Some('\u{8}')),
        just('f').to(Some('\u{c}')),
        just('v').to(Some('\u{b}')),
        just('0').then(any().filter(char::is_ascii_digit).not()).to(Some('\0')),
        just("\r\n").to(None),
        one_of("\r\n\u{2028}\u{2029}").to(None),
        just('x').ignore_then(hex_digits(2)).try_map(code_point),
        just('u')
            .ignore_then(choice((
                any()
                    .filter(char::is_ascii_hexdigit)
                    .repeated()
                    .at_least(1)
                    .to_slice()
                    .delimited_by(just('{'), just('}')),
                hex_digits(4),
            )))
            .try_map(code_point),
        none_of("xu").map(Some),
    )));

    let string = |quote: char| {
        just(quote)
            .ignore_then(
                choice((escape.clone(), none_of([quote, '\\', '\n']).map(Some)))
                    .repeated()
                    .collect::<Vec<Option<char>>>(),
            )
            .then_ignore(just(quote))
            .map(|chars| chars.into_iter().flatten().collect::<String>())
    };

    let template_char = choice((
        escape.clone(),
        just('$').then(just('{').not()).to(Some('$')),
        none_of("`\\$").map(Some),
    ));
    let template_with = |unit: Unit<'src>| {
        let embedded = just("${")
            .ignore_then(
                unit.repeated()
                    .to_slice()
                    .map_with(|source: &'src str, extra| Piece::Expr(source, extra.span().start)),
            )
            .then_ignore(just('}'));
        just('`')
            .ignore_then(
                choice((embedded, template_char.clone().map(Piece::Char)))
                    .repeated()
                    .collect::<Vec<_>>(),
            )
            .then_ignore(just('`'))
            .map(template_chunks)
    };

    let quoted = |quote: char| {
        just(quote)
            .then(
                choice((just('\\').then(any()).ignored(), none_of([quote, '\\', '\n']).ignored()))
                    .repeated(),
            )
            .then(just(quote))
            .ignored()
    };
    let flat: Unit<'src> =
        choice((quoted('"'), quoted('\''), comment.clone(), none_of("{}`\"'").ignored())).boxed();
    let mut unit = flat.clone();
    for _ in 0 .. template_depth {
        let braces = just('{').then(unit.clone().repeated()).then(just('}')).ignored();
        let nested = template_with(unit.clone()).ignored();
        unit = choice((braces, nested, flat.clone())).boxed();
    }

    let digit_run = any().filter(|ch: &char| ch.is_ascii_digit() || *ch == '_').repeated();
    let exponent = one_of("eE")
        .then(one_of("+-").or_not())
        .then(any().filter(char::is_ascii_digit).repeated().at_least(1));
    let decimal = choice((
        any()
            .filter(char::is_ascii_digit)
            .then(digit_run.clone())
            .then(just('.').then(digit_run.clone()).or_not())
            .ignored(),
        just('.').then(any().filter(char::is_ascii_digit)).then(digit_run).ignored(),
    ))
    .then(exponent.or_not())
    .to_slice()
    .try_map(|raw: &str, span| {
        raw.replace('_', "").parse::<f64>().map_err(|_| Rich::custom(span, "invalid numeric literal"))
    });
    let radix_number = just('0')
        .ignore_then(choice((one_of("xX").to(16), one_of("oO").to(8), one_of("bB").to(2))))
        .then(
            any()
                .filter(|ch: &char| ch.is_ascii_alphanumeric() || *ch == '_')
                .repeated()
                .at_least(1)
                .to_slice(),
        )
        .try_map(|(radix, raw): (u32, &str), span| {
            let digits: String = raw.chars().filter(|ch| *ch != '_').collect();
            parse_integer_digits(&digits, radix)
                .ok_or_else(|| Rich::custom(span, "invalid numeric literal"))
        });
    let number = choice((radix_number, decimal))
        .then_ignore(any().filter(|ch: &char| is_ident_start(*ch)).not());

    let word = any()
        .filter(|ch: &char| is_ident_start(*ch))
        .then(any().filter(|ch: &char| is_ident_part(*ch)).repeated())
        .to_slice()
        .map(|word: &'src str| Keyword::lookup(word).map_or(Token::Ident(word), Token::Keyword));

    let triple = choice((
        just("===").to(Punct::StrictEq),
        just("!==").to(Punct::StrictNotEq),
        just("...").to(Punct::Ellipsis),
        just("??=").to(Punct::NullishAssign),
        just("||=").to(Punct::OrAssign),
        just("&&=").to(Punct::AndAssign),
    ));
    // `a?.5:b` is a conditional, not optional chaining.
    let double = choice((
        just("=>").to(Punct::Arrow),
        just("==").to(Punct::Eq),
        just("!=").to(Punct::NotEq),
        just("<=").to(Punct::LtEq),
        just(">=").to(Punct::GtEq),
        just("&&").to(Punct::AndAnd),
        just("||").to(Punct::OrOr),
        just("??").to(Punct::NullishCoalesce),
        just("?.").then(any().filter(char::is_ascii_digit).not()).to(Punct::QuestionDot),
        just("++").to(Punct::PlusPlus),
        just("--").to(Punct::MinusMinus),
        just("+=").to(Punct::PlusAssign),
        just("-=").to(Punct::MinusAssign),
        just("**").to(Punct::StarStar),
        just("*=").to(Punct::StarAssign),
        just("/=").to(Punct::SlashAssign),
        just("%=").to(Punct::PercentAssign),
    ));
    let single = any().try_map(|ch: char, span| {
        Punct::single(ch).ok_or_else(|| Rich::custom(span, format!("unexpected character `{ch}`")))
    });

    let token = choice((
        template_with(unit).map(Token::Template),
        string('"').map(Token::Str),
        string('\'').map(Token::Str),
        number.map(Token::Number),
        word,
        choice((triple, double, single)).map(Token::Punct),
    ));

    trivia
        .clone()
        .to_slice()
        .then(token.map_with(|token, extra| (token, extra.span())))
        .map(|(gap, (token, span)): (&str, _)| Lexeme {
            token,
            span,
            line_break: gap.contains(['\n', '\r', '\u{2028}', '\u{2029}']),
        })
        .repeated()
        .collect::<Vec<_>>()
        .then_ignore(trivia)
        .then_ignore(end())
}

/// Decodes a hexadecimal escape body into a character.
fn code_point<'src>(digits: &str, span: Span) -> Result<Option<char>, LexError<'src>> {
    u32::from_str_radix(digits, 16)
        .map(|code| Some(char::from_u32(code).unwrap_or('\u{fffd}')))
        .map_err(|_| Rich::custom(span, "invalid unicode escape"))
}

/// Merges template pieces into text and expression chunks.
fn template_chunks(pieces: Vec<Piece<'_>>) -> Vec<TemplateChunk<'_>> {
    let mut chunks = Vec::new();
    let mut text = String::new();
    for piece in pieces {
        match piece {
            Piece::Char(ch) => text.extend(ch),
            Piece::Expr(source, offset) => {
                if !text.is_empty() {
                    chunks.push(TemplateChunk::Text(std::mem::take(&mut text)));
                }
                chunks.push(TemplateChunk::Expr {
                    source,
                    offset,
                });
            }
        }
    }
    if !text.is_empty() || chunks.is_empty() {
        chunks.push(TemplateChunk::Text(text));
    }
    chunks
}

// ============================================================================
// SECTION: Token Stream
// ============================================================================

/// Lexes `source`, which starts at byte `offset` of the evaluated text.
///
/// `depth` is the nesting already charged by enclosing templates. Spans and
/// template chunk offsets in the result are absolute.
///
/// # Errors
///
/// Returns a syntax [`EvalError`] for malformed tokens and a limit
/// [`EvalError`] when nesting exceeds `max_nesting`.
pub(crate) fn tokenize(
    source: &str,
    offset: usize,
    max_nesting: usize,
    depth: usize,
) -> Result<Vec<(Token<'_>, Span)>, EvalError> {
    let lexemes = lexer(max_nesting).parse(source).into_result().map_err(|errors| {
        errors.first().map_or_else(
            || EvalError::syntax("invalid token", offset),
            |error| EvalError::syntax(error.reason().to_string(), offset + error.span().start),
        )
    })?;
    Layout::new(max_nesting, depth).arrange(lexemes, offset)
}

/// Per-bracket bookkeeping for [`Layout`].
#[derive(Debug, Default)]
struct Level {
    /// Operators and statement heads since the last statement boundary.
    operators: usize,
    /// `else` branches in the current `if` chain.
    branches: usize,
    /// A statement may have just ended; counters reset unless it continues.
    settled: bool,
}

/// Single pass over lexemes that inserts implied semicolons and enforces the
/// nesting budget.
#[derive(Debug)]
struct Layout {
    /// Maximum nesting depth accepted.
    limit: usize,
    /// Depth charged by enclosing templates.
    base: usize,
    /// One entry per open bracket, outermost first.
    levels: Vec<Level>,
    /// One entry per open parenthesis; true when it opens a statement head.
    heads: Vec<bool>,
}

impl Layout {
    /// Creates a layout pass starting at `base` depth.
    fn new(limit: usize, base: usize) -> Self {
        Self {
            limit,
            base,
            levels: vec![Level::default()],
            heads: Vec::new(),
        }
    }

    /// Makes spans absolute, inserts implied semicolons, and charges nesting.
    fn arrange<'src>(
        mut self,
        lexemes: Vec<Lexeme<'src>>,
        offset: usize,
    ) -> Result<Vec<(Token<'src>, Span)>, EvalError> {
        let mut tokens: Vec<(Token<'src>, Span)> = Vec::with_capacity(lexemes.len());
        let mut closed_head = false;
        for lexeme in lexemes {
            let start = lexeme.span.start + offset;
            let span = Span::from(start .. lexeme.span.end + offset);
            if lexeme.line_break
                && let Some((previous, _)) = tokens.last()
                && needs_semicolon(previous, closed_head, &lexeme.token)
            {
                let semicolon = Token::Punct(Punct::Semicolon);
                self.charge(&semicolon, start)?;
                tokens.push((semicolon, Span::from(start..start)));
            }
            closed_head = false;
            match &lexeme.token {
                Token::Punct(Punct::LParen) => self.heads.push(opens_head(&tokens)),
                Token::Punct(Punct::RParen) => closed_head = self.heads.pop().unwrap_or(false),
                _ => {}
            }
            self.charge(&lexeme.token, start)?;
            let token = match lexeme.token {
                Token::Template(chunks) => Token::Template(self.check_template(chunks, offset)?),
                other => other,
            };
            tokens.push((token, span));
        }
        Ok(tokens)
    }

    /// Charges each embedded expression and makes chunk offsets absolute.
    fn check_template<'src>(
        &self,
        chunks: Vec<TemplateChunk<'src>>,
        offset: usize,
    ) -> Result<Vec<TemplateChunk<'src>>, EvalError> {
        chunks
            .into_iter()
            .map(|chunk| match chunk {
                TemplateChunk::Expr {
                    source,
                    offset: relative,
                } => {
                    tokenize(source, relative + offset, self.limit, self.depth())?;
                    Ok(TemplateChunk::Expr {
                        source,
                        offset: relative + offset,
                    })
                }
                text @ TemplateChunk::Text(_) => Ok(text),
            })
            .collect()
    }

    /// Current nesting depth.
    fn depth(&self) -> usize {
        let charged: usize = self.levels.iter().map(|level| level.operators + level.branches).sum();
        self.base + self.levels.len().saturating_sub(1) + charged
    }

    /// Updates the bookkeeping for `token` and checks the budget.
    fn charge(&mut self, token: &Token<'_>, position: usize) -> Result<(), EvalError> {
        if let Some(level) = self.levels.last_mut()
            && level.settled
        {
            level.settled = false;
            if !matches!(token, Token::Keyword(Keyword::Else)) {
                level.branches = 0;
                if starts_statement(token) {
                    level.operators = 0;
                }
            }
        }
        match token {
            Token::Punct(Punct::LParen | Punct::LBracket | Punct::LBrace) => {
                self.levels.push(Level::default());
            }
            Token::Punct(Punct::RParen | Punct::RBracket) => {
                if self.levels.len() > 1 {
                    self.levels.pop();
                }
                return Ok(());
            }
            Token::Punct(Punct::RBrace) => {
                if self.levels.len() > 1 {
                    self.levels.pop();
                }
                if let Some(level) = self.levels.last_mut() {
                    level.settled = true;
                }
                return Ok(());
            }
            Token::Punct(Punct::Semicolon) => {
                if let Some(level) = self.levels.last_mut() {
                    level.operators = 0;
                    level.settled = true;
                }
                return Ok(());
            }
            Token::Punct(Punct::Comma) => {
                if let Some(level) = self.levels.last_mut() {
                    level.operators = 0;
                }
                return Ok(());
            }
            Token::Punct(Punct::Colon | Punct::Ellipsis) => return Ok(()),
            Token::Keyword(Keyword::Else) => {
                if let Some(level) = self.levels.last_mut() {
                    level.branches += 1;
                }
            }
            Token::Punct(_)
            | Token::Template(_)
            | Token::Keyword(
                Keyword::Typeof
                | Keyword::Void
                | Keyword::New
                | Keyword::In
                | Keyword::If
                | Keyword::For
                | Keyword::While
                | Keyword::Do
                | Keyword::Try,
            ) => {
                if let Some(level) = self.levels.last_mut() {
                    level.operators += 1;
                }
            }
            _ => return Ok(()),
        }
        if self.depth() > self.limit {
            return Err(EvalError::limit(format!("nesting exceeds limit of {}", self.limit), position));
        }
        Ok(())
    }
}

/// Returns true when a `(` appended after `tokens` opens a statement head.
fn opens_head(tokens: &[(Token<'_>, Span)]) -> bool {
    let mut recent = tokens.iter().rev().map(|(token, _)| token);
    match recent.next() {
        Some(Token::Keyword(
            Keyword::If | Keyword::For | Keyword::While | Keyword::Catch | Keyword::Function,
        )) => true,
        Some(Token::Ident(_)) => matches!(recent.next(), Some(Token::Keyword(Keyword::Function))),
        _ => false,
    }
}

/// Returns true when a line break between `previous` and `next` ends a statement.
const fn needs_semicolon(previous: &Token<'_>, closed_head: bool, next: &Token<'_>) -> bool {
    if matches!(
        previous,
        Token::Keyword(Keyword::Return | Keyword::Break | Keyword::Continue | Keyword::Throw)
    ) {
        return !matches!(next, Token::Punct(Punct::Semicolon));
    }
    ends_statement(previous, closed_head) && starts_statement(next)
}

/// Returns true when a statement may end after `token`.
const fn ends_statement(token: &Token<'_>, closed_head: bool) -> bool {
    match token {
        Token::Ident(_) | Token::Number(_) | Token::Str(_) | Token::Template(_) => true,
        Token::Keyword(keyword) => matches!(
            keyword,
            Keyword::True | Keyword::False | Keyword::Null | Keyword::Undefined | Keyword::This
        ),
        Token::Punct(Punct::RParen) => !closed_head,
        Token::Punct(punct) => {
            matches!(punct, Punct::RBracket | Punct::RBrace | Punct::PlusPlus | Punct::MinusMinus)
        }
    }
}

/// Returns true when `token` may begin a statement.
const fn starts_statement(token: &Token<'_>) -> bool {
    match token {
        Token::Ident(_) | Token::Number(_) | Token::Str(_) | Token::Template(_) => true,
        Token::Keyword(keyword) => !matches!(
            keyword,
            Keyword::Else | Keyword::Catch | Keyword::Finally | Keyword::In | Keyword::Of
        ),
        Token::Punct(punct) => {
            matches!(punct, Punct::LBrace | Punct::Bang | Punct::PlusPlus | Punct::MinusMinus)
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns true when `ch` may begin an identifier.
fn is_ident_start(ch: char) -> bool {
    ch == '_' || ch == '$' || ch.is_alphabetic()
}

/// Returns true when `ch` may continue an identifier.
fn is_ident_part(ch: char) -> bool {
    is_ident_start(ch) || ch.is_alphanumeric()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        reason = "Test-only assertions."
    )]

    use super::*;
    use crate::error::EvalErrorKind;

    fn tokens(source: &str) -> Vec<Token<'_>> {
        tokenize(source, 0, 64, 0)
            .expect("source should lex")
            .into_iter()
            .map(|(token, _)| token)
            .collect()
    }

    fn rejection(source: &str) -> EvalErrorKind {
        tokenize(source, 0, 64, 0).expect_err("source should be rejected").kind
    }

    #[test]
    fn maximal_munch_prefers_longest_operator() {
        assert_eq!(
            tokens("a ??= b === c"),
            vec![
                Token::Ident("a"),
                Token::Punct(Punct::NullishAssign),
                Token::Ident("b"),
                Token::Punct(Punct::StrictEq),
                Token::Ident("c"),
            ]
        );
    }

    #[test]
    fn question_dot_before_digit_is_a_conditional() {
        assert_eq!(
            tokens("a?.5:b"),
            vec![
                Token::Ident("a"),
                Token::Punct(Punct::Question),
                Token::Number(0.5),
                Token::Punct(Punct::Colon),
                Token::Ident("b"),
            ]
        );
    }

    #[test]
    fn numbers_accept_separators_and_radix_prefixes() {
        assert_eq!(
            tokens("1_000 0xff 0b101 .5 2e3"),
            vec![
                Token::Number(1000.0),
                Token::Number(255.0),
                Token::Number(5.0),
                Token::Number(0.5),
                Token::Number(2000.0),
            ]
        );
        assert_eq!(rejection("3px"), EvalErrorKind::Syntax);
    }

    #[test]
    fn strings_resolve_escapes() {
        assert_eq!(tokens(r"'a\n\x41\u{1F600}B'"), vec![Token::Str("a\nA\u{1F600}B".to_string())]);
    }

    #[test]
    fn templates_split_text_and_expressions() {
        let source = "`a${ {b: 1}.b }c${`x${y}`}`";
        let lexed = tokens(source);
        let [Token::Template(chunks)] = lexed.as_slice() else {
            panic!("expected one template token");
        };
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0], TemplateChunk::Text("a".to_string()));
        assert_eq!(
            chunks[1],
            TemplateChunk::Expr {
                source: " {b: 1}.b ",
                offset: 4,
            }
        );
        assert_eq!(chunks[2], TemplateChunk::Text("c".to_string()));
        assert!(matches!(chunks[3], TemplateChunk::Expr { source: "`x${y}`", .. }));
    }

    #[test]
    fn line_breaks_imply_semicolons_between_statements() {
        assert_eq!(
            tokens("x = 1\ny++\nreturn\nx"),
            vec![
                Token::Ident("x"),
                Token::Punct(Punct::Assign),
                Token::Number(1.0),
                Token::Punct(Punct::Semicolon),
                Token::Ident("y"),
                Token::Punct(Punct::PlusPlus),
                Token::Punct(Punct::Semicolon),
                Token::Keyword(Keyword::Return),
                Token::Punct(Punct::Semicolon),
                Token::Ident("x"),
            ]
        );
    }

    #[test]
    fn line_breaks_inside_expressions_and_heads_are_kept() {
        let source = "rows\n  .map(f)\nif (a)\n  b\nfunction g(x)\n{}";
        let semicolons =
            tokens(source).iter().filter(|token| **token == Token::Punct(Punct::Semicolon)).count();
        assert_eq!(semicolons, 2);
    }

    #[test]
    fn nesting_budget_counts_brackets_and_operator_chains() {
        let nested = format!("{}1{}", "(".repeat(70), ")".repeat(70));
        assert_eq!(rejection(&nested), EvalErrorKind::Limit);
        let chain = vec!["a"; 70].join(" + ");
        assert_eq!(rejection(&chain), EvalErrorKind::Limit);
        let statements = vec!["a + b;"; 70].concat();
        assert!(tokenize(&statements, 0, 64, 0).is_ok());
    }

    #[test]
    fn else_if_chains_are_charged_but_separate_ifs_are_not() {
        let chain = format!("if (a) b;{}", " else if (a) b;".repeat(70));
        assert_eq!(rejection(&chain), EvalErrorKind::Limit);
        let separate = "if (a) { b } else { c }\n".repeat(70);
        assert!(tokenize(&separate, 0, 64, 0).is_ok());
        let inline = "if (a) { b } ".repeat(70);
        assert!(tokenize(&inline, 0, 64, 0).is_ok());
    }

    #[test]
    fn template_expressions_share_the_nesting_budget() {
        let inner = format!("{}1{}", "(".repeat(40), ")".repeat(40));
        let source = format!("{}`${{{inner}}}`{}", "(".repeat(40), ")".repeat(40));
        assert_eq!(rejection(&source), EvalErrorKind::Limit);
    }

    #[test]
    fn unknown_characters_report_their_position() {
        let err = tokenize("a = #", 0, 64, 0).expect_err("`#` is not a token");
        assert_eq!(err.kind, EvalErrorKind::Syntax);
        assert_eq!(err.position, 4);
    }
}
