// crates/genui-script/src/parser.rs
// ============================================================================
// Module: Script Parser
// Description: Token grammar for the transform script language.
// Purpose: Build a bounded-depth syntax tree from untrusted source.
// Dependencies: chumsky, crate::{ast, error, lexer, value}
// ============================================================================

//! ## Overview
//! The parser accepts a function body: statements plus top-level `return`.
//! It is a [`chumsky`] grammar over the token stream produced by
//! [`tokenize`], with binary, logical, and conditional operators handled by a
//! pratt table. Nesting was already charged against the budget while
//! tokenizing, so the grammar itself never recurses past it.
//!
//! Alternatives that share a prefix are split by lookahead instead of
//! backtracking: arrow parameters are recognized by scanning to the matching
//! `)` for a following `=>`, and a statement starting with `{` or
//! `function name` is never retried as an expression.
//!
//! ### Grammar (informal)
//! - **Statements**: `const`/`let`/`var` (with destructuring), `function`,
//!   `return`, `if`/`else`, `for`/`for...of`/`for...in`, `while`,
//!   `do...while`, `break`, `continue`, `throw`, `try`/`catch`/`finally`.
//! - **Expressions**: literals, templates, arrays and objects (spread,
//!   shorthand, computed keys, methods), arrows, member/index/call chains with
//!   optional chaining, unary, binary, logical, conditional, assignment.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use chumsky::Boxed;
use chumsky::input::ValueInput;
use chumsky::pratt::*;
use chumsky::prelude::*;

use crate::ast::AssignOp;
use crate::ast::BinaryOp;
use crate::ast::DeclKind;
use crate::ast::Declarator;
use crate::ast::Element;
use crate::ast::Expr;
use crate::ast::ExprKind;
use crate::ast::FunctionBody;
use crate::ast::FunctionDef;
use crate::ast::LogicalOp;
use crate::ast::Pattern;
use crate::ast::PatternElement;
use crate::ast::PatternProp;
use crate::ast::Program;
use crate::ast::PropKey;
use crate::ast::Property;
use crate::ast::Stmt;
use crate::ast::TemplatePart;
use crate::ast::UnaryOp;
use crate::error::EvalError;
use crate::lexer::Keyword;
use crate::lexer::Punct;
use crate::lexer::Span;
use crate::lexer::TemplateChunk;
use crate::lexer::Token;
use crate::lexer::tokenize;
use crate::value::format_number;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Error produced by the token grammar.
type ParseError<'src> = Rich<'src, Token<'src>, Span>;

/// Parser state for the token grammar.
type Extra<'src> = extra::Err<ParseError<'src>>;

/// Per-match metadata passed to mapping closures.
type Meta<'src, 'b, I> = chumsky::input::MapExtra<'src, 'b, I, Extra<'src>>;

/// Type-erased token parser.
type Grammar<'src, I, O> = Boxed<'src, 'src, I, O, Extra<'src>>;

/// Parameter list entry before the rest parameter is split off.
#[derive(Debug, Clone)]
enum Param {
    /// Positional parameter with an optional default.
    Positional(PatternElement),
    /// `...rest`
    Rest(Pattern),
}

/// Object pattern entry.
#[derive(Debug, Clone)]
enum ObjectItem {
    /// `key: target = default`
    Prop(PatternProp),
    /// `...rest`
    Rest(Pattern),
}

/// Array pattern entry.
#[derive(Debug, Clone)]
enum ArrayItem {
    /// Bound element.
    Element(PatternElement),
    /// Elided element.
    Hole,
    /// `...rest`
    Rest(Pattern),
}

/// What follows a key in an object literal.
#[derive(Debug, Clone)]
enum MemberTail {
    /// `key: value`
    Value(Expr),
    /// `key(params) { body }`
    Method((Vec<PatternElement>, Option<Pattern>), Vec<Stmt>),
}

/// One link of a member, index, or call chain.
#[derive(Debug, Clone)]
enum Link {
    /// `.name` or `?.name`
    Member(String, bool),
    /// `[index]` or `?.[index]`
    Index(Expr, bool),
    /// `(args)` or `?.(args)`
    Call(Vec<Element>, bool),
}

/// Prefix operator.
#[derive(Debug, Clone, Copy)]
enum Prefix {
    /// `!`, `-`, `+`, `typeof`, `void`
    Unary(UnaryOp),
    /// `++` (true) or `--` (false)
    Update(bool),
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Parses `source` as a function body.
///
/// # Errors
///
/// Returns a syntax [`EvalError`] on malformed input and a limit
/// [`EvalError`] when the nesting limit is exceeded.
pub(crate) fn parse_program(source: &str, max_nesting: usize) -> Result<Program, EvalError> {
    let tokens = tokenize(source, 0, max_nesting, 0)?;
    let body = parse_tokens(&tokens, source.len(), max_nesting)?;
    Ok(Program {
        body,
        source_len: source.len(),
    })
}

/// Runs the statement grammar over prepared tokens ending at byte `end`.
fn parse_tokens(
    tokens: &[(Token<'_>, Span)],
    end: usize,
    max_nesting: usize,
) -> Result<Vec<Stmt>, EvalError> {
    program(max_nesting)
        .parse(tokens.map(Span::from(end..end), |(token, span)| (token, span)))
        .into_result()
        .map_err(|errors| {
            errors.first().map_or_else(
                || EvalError::syntax("invalid syntax", end),
                |error| EvalError::syntax(error.reason().to_string(), error.span().start),
            )
        })
}

/// Parses one `${ ... }` slice as an expression.
///
/// The slice is wrapped as `return ( ... )` so the statement grammar can be
/// reused; an object literal at the start of the slice stays an expression.
fn embedded_expression(source: &str, offset: usize, max_nesting: usize) -> Result<Expr, EvalError> {
    let inner = tokenize(source, offset, max_nesting, 0)?;
    if inner.is_empty() {
        return Err(EvalError::syntax("empty template expression", offset));
    }
    let end = offset + source.len();
    let mut tokens = Vec::with_capacity(inner.len() + 3);
    tokens.push((Token::Keyword(Keyword::Return), Span::from(offset..offset)));
    tokens.push((Token::Punct(Punct::LParen), Span::from(offset..offset)));
    tokens.extend(inner);
    tokens.push((Token::Punct(Punct::RParen), Span::from(end..end)));
    let mut body = parse_tokens(&tokens, end, max_nesting)?;
    match (body.pop(), body.is_empty()) {
        (Some(Stmt::Return(Some(expr), _)), true) => Ok(expr),
        _ => Err(EvalError::syntax("invalid template expression", offset)),
    }
}

/// Parses every embedded expression of a template literal.
fn template_parts(
    chunks: Vec<TemplateChunk<'_>>,
    max_nesting: usize,
) -> Result<Vec<TemplatePart>, EvalError> {
    chunks
        .into_iter()
        .map(|chunk| match chunk {
            TemplateChunk::Text(text) => Ok(TemplatePart::Text(text)),
            TemplateChunk::Expr {
                source,
                offset,
            } => embedded_expression(source, offset, max_nesting).map(TemplatePart::Expr),
        })
        .collect()
}

// ============================================================================
// SECTION: Statements
// ============================================================================

/// Builds the function-body grammar.
fn program<'src, I>(max_nesting: usize) -> impl Parser<'src, I, Vec<Stmt>, Extra<'src>>
where
    I: ValueInput<'src, Token = Token<'src>, Span = Span> + 'src,
{
    recursive(|statement| {
        let block: Grammar<'src, I, Vec<Stmt>> = statement
            .clone()
            .repeated()
            .collect::<Vec<Stmt>>()
            .delimited_by(punct(Punct::LBrace), punct(Punct::RBrace))
            .boxed();
        let assignment = expression(block.clone(), max_nesting);
        let pattern = pattern(assignment.clone());
        let expression = sequence(assignment.clone());
        let params = parameters(pattern.clone(), assignment.clone());
        let condition = expression.clone().delimited_by(punct(Punct::LParen), punct(Punct::RParen));
        let terminator = choice((punct(Punct::Semicolon), punct(Punct::RBrace).rewind(), end()));

        let kind = choice((
            keyword(Keyword::Const).to(DeclKind::Const),
            keyword(Keyword::Let).to(DeclKind::Let),
            keyword(Keyword::Var).to(DeclKind::Var),
        ));
        let declarators = pattern
            .clone()
            .then(punct(Punct::Assign).ignore_then(assignment.clone()).or_not())
            .map(|(target, init)| Declarator {
                target,
                init,
            })
            .separated_by(punct(Punct::Comma))
            .at_least(1)
            .collect::<Vec<_>>();
        let declaration = kind.clone().then(declarators).try_map(declaration);

        let function_declaration = keyword(Keyword::Function)
            .ignore_then(identifier())
            .then(params)
            .then(block.clone())
            .map_with(|((name, (params, rest)), body), extra| Stmt::Function {
                name: name.clone(),
                def: Arc::new(FunctionDef {
                    name: Some(name),
                    params,
                    rest,
                    body: FunctionBody::Block(body),
                    arrow: false,
                    position: extra.span().start,
                }),
            });

        let return_statement = keyword(Keyword::Return)
            .map_with(|(), extra: &mut Meta<'src, '_, I>| extra.span().start)
            .then(expression.clone().or_not())
            .then_ignore(terminator.clone())
            .map(|(position, value)| Stmt::Return(value, position));

        let if_statement = keyword(Keyword::If)
            .ignore_then(condition.clone())
            .then(statement.clone())
            .then(keyword(Keyword::Else).ignore_then(statement.clone()).or_not())
            .map(|((test, consequent), alternate)| Stmt::If {
                test,
                consequent: Box::new(consequent),
                alternate: alternate.map(Box::new),
            });

        let for_each = keyword(Keyword::For)
            .ignore_then(
                kind.or_not()
                    .then(pattern.clone())
                    .then(choice((keyword(Keyword::Of).to(false), keyword(Keyword::In).to(true))))
                    .then(assignment.clone())
                    .delimited_by(punct(Punct::LParen), punct(Punct::RParen)),
            )
            .then(statement.clone())
            .map(|((((kind, target), keys), iterable), body)| Stmt::ForEach {
                kind,
                target,
                keys,
                iterable,
                body: Box::new(body),
            });

        let for_init = choice((declaration.clone(), expression.clone().map(Stmt::Expr)));
        let for_loop = keyword(Keyword::For)
            .ignore_then(
                group((
                    for_init.or_not().then_ignore(punct(Punct::Semicolon)),
                    expression.clone().or_not().then_ignore(punct(Punct::Semicolon)),
                    expression.clone().or_not(),
                ))
                .delimited_by(punct(Punct::LParen), punct(Punct::RParen)),
            )
            .then(statement.clone())
            .map(|((init, test, update), body)| Stmt::For {
                init: init.map(Box::new),
                test,
                update,
                body: Box::new(body),
            });

        let while_loop = keyword(Keyword::While)
            .ignore_then(condition.clone())
            .then(statement.clone())
            .map(|(test, body)| Stmt::While {
                test,
                body: Box::new(body),
                post_test: false,
            });
        let do_while = keyword(Keyword::Do)
            .ignore_then(statement.clone())
            .then_ignore(punct(Punct::Semicolon).or_not())
            .then_ignore(keyword(Keyword::While))
            .then(condition)
            .then_ignore(punct(Punct::Semicolon).or_not())
            .map(|(body, test)| Stmt::While {
                test,
                body: Box::new(body),
                post_test: true,
            });

        let break_statement = keyword(Keyword::Break)
            .map_with(|(), extra: &mut Meta<'src, '_, I>| Stmt::Break(extra.span().start))
            .then_ignore(terminator.clone());
        let continue_statement = keyword(Keyword::Continue)
            .map_with(|(), extra: &mut Meta<'src, '_, I>| Stmt::Continue(extra.span().start))
            .then_ignore(terminator.clone());
        let throw_statement = keyword(Keyword::Throw)
            .ignore_then(expression.clone())
            .then_ignore(terminator.clone())
            .map(Stmt::Throw);

        let handler = keyword(Keyword::Catch)
            .ignore_then(pattern.delimited_by(punct(Punct::LParen), punct(Punct::RParen)).or_not())
            .then(block.clone());
        let try_statement = keyword(Keyword::Try)
            .ignore_then(block.clone())
            .then(handler.or_not())
            .then(keyword(Keyword::Finally).ignore_then(block.clone()).or_not())
            .try_map(|((block, handler), finalizer), span| {
                if handler.is_none() && finalizer.is_none() {
                    return Err(Rich::custom(span, "missing catch or finally after try"));
                }
                let (param, handler) = handler.map_or((None, None), |(param, body)| (param, Some(body)));
                Ok(Stmt::Try {
                    block,
                    param,
                    handler,
                    finalizer,
                })
            });

        let expression_statement = punct(Punct::LBrace)
            .not()
            .ignore_then(keyword(Keyword::Function).then(identifier()).not())
            .ignore_then(expression)
            .then_ignore(terminator.clone())
            .map(Stmt::Expr);

        choice((
            block.map(Stmt::Block),
            punct(Punct::Semicolon).to(Stmt::Empty),
            declaration.then_ignore(terminator),
            function_declaration,
            return_statement,
            if_statement,
            for_each,
            for_loop,
            while_loop,
            do_while,
            break_statement,
            continue_statement,
            throw_statement,
            try_statement,
            expression_statement,
        ))
    })
    .repeated()
    .collect()
    .then_ignore(end())
}

/// Checks declarators for required initializers.
fn declaration<'src>(
    (kind, declarators): (DeclKind, Vec<Declarator>),
    span: Span,
) -> Result<Stmt, ParseError<'src>> {
    let missing = declarators.iter().any(|declarator| {
        declarator.init.is_none()
            && (kind == DeclKind::Const || !matches!(declarator.target, Pattern::Ident(_)))
    });
    if missing {
        return Err(Rich::custom(span, "missing initializer in declaration"));
    }
    Ok(Stmt::Declare {
        kind,
        declarators,
    })
}

// ============================================================================
// SECTION: Expressions
// ============================================================================

/// Builds the assignment-expression grammar; `block` parses function bodies.
fn expression<'src, I>(block: Grammar<'src, I, Vec<Stmt>>, max_nesting: usize) -> Grammar<'src, I, Expr>
where
    I: ValueInput<'src, Token = Token<'src>, Span = Span> + 'src,
{
    recursive(|assignment| {
        let assignment: Grammar<'src, I, Expr> = assignment.boxed();
        let pattern = pattern(assignment.clone());
        let expression = sequence(assignment.clone());
        let params = parameters(pattern, assignment.clone());
        let property_name = choice((
            identifier(),
            select! { Token::Keyword(keyword) => keyword.as_str().to_string() },
        ));
        let spreadable = choice((
            punct(Punct::Ellipsis).ignore_then(assignment.clone()).map(Element::Spread),
            assignment.clone().map(Element::Expr),
        ));
        let arguments = spreadable
            .clone()
            .separated_by(punct(Punct::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(punct(Punct::LParen), punct(Punct::RParen));

        // `( ... ) =>` is decided by scanning to the matching parenthesis.
        let balanced = recursive(|balanced| {
            choice((
                balanced
                    .repeated()
                    .delimited_by(punct(Punct::LParen), punct(Punct::RParen))
                    .ignored(),
                any()
                    .filter(|token: &Token<'src>| {
                        !matches!(token, Token::Punct(Punct::LParen | Punct::RParen))
                    })
                    .ignored(),
            ))
        });
        let arrow_ahead = punct(Punct::LParen)
            .then(balanced.repeated())
            .then(punct(Punct::RParen))
            .then(punct(Punct::Arrow))
            .rewind();
        let arrow_params = choice((
            identifier().map(|name| {
                let param = PatternElement {
                    target: Pattern::Ident(name),
                    default: None,
                };
                (vec![param], None)
            }),
            arrow_ahead.ignore_then(params.clone()),
        ));
        let arrow_body = choice((
            block.clone().map(FunctionBody::Block),
            punct(Punct::LBrace)
                .not()
                .ignore_then(assignment.clone())
                .map(|body| FunctionBody::Expr(Box::new(body))),
        ));
        let arrow = arrow_params.then_ignore(punct(Punct::Arrow)).then(arrow_body).map_with(
            |((params, rest), body), extra| {
                let position = extra.span().start;
                let def = FunctionDef {
                    name: None,
                    params,
                    rest,
                    body,
                    arrow: true,
                    position,
                };
                Expr::new(ExprKind::Function(Arc::new(def)), position)
            },
        );

        let function = keyword(Keyword::Function)
            .ignore_then(identifier().or_not())
            .then(params.clone())
            .then(block.clone())
            .map_with(|((name, (params, rest)), body), extra| {
                let position = extra.span().start;
                let def = FunctionDef {
                    name,
                    params,
                    rest,
                    body: FunctionBody::Block(body),
                    arrow: false,
                    position,
                };
                Expr::new(ExprKind::Function(Arc::new(def)), position)
            });

        let literal = select! {
            Token::Number(value) => ExprKind::Number(value),
            Token::Str(text) => ExprKind::Str(text),
            Token::Ident(name) => ExprKind::Ident(name.to_string()),
            Token::Keyword(Keyword::True) => ExprKind::Bool(true),
            Token::Keyword(Keyword::False) => ExprKind::Bool(false),
            Token::Keyword(Keyword::Null) => ExprKind::Null,
            Token::Keyword(Keyword::Undefined) => ExprKind::Undefined,
            Token::Keyword(Keyword::This) => ExprKind::This,
        };

        let template = select! { Token::Template(chunks) => chunks }.try_map(move |chunks, _| {
            template_parts(chunks, max_nesting).map(ExprKind::Template).map_err(|error| {
                Rich::custom(Span::from(error.position..error.position), error.message)
            })
        });

        let array = choice((
            spreadable.clone(),
            empty().to(Element::Hole),
        ))
        .separated_by(punct(Punct::Comma))
        .collect::<Vec<_>>()
        .delimited_by(punct(Punct::LBracket), punct(Punct::RBracket))
        .map(|mut elements| {
            if matches!(elements.last(), Some(Element::Hole)) {
                elements.pop();
            }
            ExprKind::Array(elements)
        });

        let member_tail = choice((
            punct(Punct::Colon).ignore_then(assignment.clone()).map(MemberTail::Value),
            params.clone().then(block.clone()).map(|(params, body)| MemberTail::Method(params, body)),
        ));
        let member = choice((
            punct(Punct::Ellipsis).ignore_then(assignment.clone()).map(Property::Spread),
            property_key(assignment.clone()).then(member_tail.or_not()).try_map(object_member),
        ));
        let object = member
            .separated_by(punct(Punct::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(punct(Punct::LBrace), punct(Punct::RBrace))
            .map(ExprKind::Object);

        let positioned = choice((literal, template, array, object))
            .map_with(|kind, extra| Expr::new(kind, extra.span().start));
        let parenthesized =
            expression.clone().delimited_by(punct(Punct::LParen), punct(Punct::RParen));
        let primary = choice((arrow, parenthesized, function, positioned)).boxed();

        let new = keyword(Keyword::New)
            .ignore_then(primary.clone())
            .then(
                punct(Punct::Dot)
                    .ignore_then(property_name.clone())
                    .map_with(|property, extra: &mut Meta<'src, '_, I>| (property, extra.span().start))
                    .repeated()
                    .collect::<Vec<_>>(),
            )
            .then(arguments.clone().or_not())
            .map_with(|((callee, path), args), extra| {
                let callee = path.into_iter().fold(callee, |object, (property, position)| {
                    Expr::new(
                        ExprKind::Member {
                            object: Box::new(object),
                            property,
                            optional: false,
                        },
                        position,
                    )
                });
                let kind = ExprKind::New {
                    callee: Box::new(callee),
                    args: args.unwrap_or_default(),
                };
                Expr::new(kind, extra.span().start)
            });

        let subscript =
            expression.delimited_by(punct(Punct::LBracket), punct(Punct::RBracket));
        let link = choice((
            punct(Punct::Dot).ignore_then(property_name.clone()).map(|name| Link::Member(name, false)),
            punct(Punct::QuestionDot).ignore_then(choice((
                arguments.clone().map(|args| Link::Call(args, true)),
                subscript.clone().map(|index| Link::Index(index, true)),
                property_name.map(|name| Link::Member(name, true)),
            ))),
            subscript.map(|index| Link::Index(index, false)),
            arguments.map(|args| Link::Call(args, false)),
        ))
        .map_with(|link, extra| (link, extra.span().start));
        let chain = choice((new, primary))
            .then(link.repeated().collect::<Vec<_>>())
            .map(|(head, links)| apply_links(head, links));

        let postfix = chain
            .then(
                choice((punct(Punct::PlusPlus).to(true), punct(Punct::MinusMinus).to(false)))
                    .or_not(),
            )
            .try_map(|(operand, update), span: Span| match update {
                None => Ok(operand),
                Some(increment) => apply_prefix(Prefix::Update(increment), operand, span.start)
                    .map(|expr| match expr.kind {
                        ExprKind::Update {
                            increment,
                            target,
                            ..
                        } => Expr::new(
                            ExprKind::Update {
                                increment,
                                prefix: false,
                                target,
                            },
                            span.start,
                        ),
                        other => Expr::new(other, span.start),
                    })
                    .ok_or_else(|| Rich::custom(span, "invalid update target")),
            });

        let prefix = choice((
            punct(Punct::Bang).to(Prefix::Unary(UnaryOp::Not)),
            punct(Punct::Minus).to(Prefix::Unary(UnaryOp::Neg)),
            punct(Punct::Plus).to(Prefix::Unary(UnaryOp::Plus)),
            keyword(Keyword::Typeof).to(Prefix::Unary(UnaryOp::Typeof)),
            keyword(Keyword::Void).to(Prefix::Unary(UnaryOp::Void)),
            punct(Punct::PlusPlus).to(Prefix::Update(true)),
            punct(Punct::MinusMinus).to(Prefix::Update(false)),
        ))
        .map_with(|op, extra: &mut Meta<'src, '_, I>| (op, extra.span().start));
        let unary = prefix.repeated().collect::<Vec<_>>().then(postfix).try_map(
            |(ops, operand), span: Span| {
                ops.into_iter().rev().try_fold(operand, |operand, (op, position)| {
                    apply_prefix(op, operand, position)
                        .ok_or_else(|| Rich::custom(span, "invalid update target"))
                })
            },
        );

        let operators = unary.pratt((
            infix(right(16), punct(Punct::StarStar), |l, (), r, extra: &mut Meta<'src, '_, I>| {
                binary(BinaryOp::Pow, l, r, extra.span().start)
            }),
            infix(
                left(14),
                choice((
                    punct(Punct::Star).to(BinaryOp::Mul),
                    punct(Punct::Slash).to(BinaryOp::Div),
                    punct(Punct::Percent).to(BinaryOp::Rem),
                )),
                |l, op, r, extra: &mut Meta<'src, '_, I>| binary(op, l, r, extra.span().start),
            ),
            infix(
                left(13),
                choice((
                    punct(Punct::Plus).to(BinaryOp::Add),
                    punct(Punct::Minus).to(BinaryOp::Sub),
                )),
                |l, op, r, extra: &mut Meta<'src, '_, I>| binary(op, l, r, extra.span().start),
            ),
            infix(
                left(11),
                choice((
                    punct(Punct::LtEq).to(BinaryOp::LtEq),
                    punct(Punct::GtEq).to(BinaryOp::GtEq),
                    punct(Punct::Lt).to(BinaryOp::Lt),
                    punct(Punct::Gt).to(BinaryOp::Gt),
                    keyword(Keyword::In).to(BinaryOp::In),
                )),
                |l, op, r, extra: &mut Meta<'src, '_, I>| binary(op, l, r, extra.span().start),
            ),
            infix(
                left(10),
                choice((
                    punct(Punct::StrictEq).to(BinaryOp::StrictEq),
                    punct(Punct::StrictNotEq).to(BinaryOp::StrictNotEq),
                    punct(Punct::Eq).to(BinaryOp::LooseEq),
                    punct(Punct::NotEq).to(BinaryOp::LooseNotEq),
                )),
                |l, op, r, extra: &mut Meta<'src, '_, I>| binary(op, l, r, extra.span().start),
            ),
            infix(left(6), punct(Punct::AndAnd), |l, (), r, extra: &mut Meta<'src, '_, I>| {
                logical(LogicalOp::And, l, r, extra.span().start)
            }),
            infix(left(5), punct(Punct::OrOr), |l, (), r, extra: &mut Meta<'src, '_, I>| {
                logical(LogicalOp::Or, l, r, extra.span().start)
            }),
            infix(left(4), punct(Punct::NullishCoalesce), |l, (), r, extra: &mut Meta<'src, '_, I>| {
                logical(LogicalOp::Nullish, l, r, extra.span().start)
            }),
            infix(
                right(3),
                punct(Punct::Question).ignore_then(assignment.clone()).then_ignore(punct(Punct::Colon)),
                |test, consequent, alternate, extra: &mut Meta<'src, '_, I>| {
                    Expr::new(
                        ExprKind::Conditional(Box::new(test), Box::new(consequent), Box::new(alternate)),
                        extra.span().start,
                    )
                },
            ),
        ));

        let assign_op = choice((
            punct(Punct::Assign).to(AssignOp::Assign),
            punct(Punct::PlusAssign).to(AssignOp::Compound(BinaryOp::Add)),
            punct(Punct::MinusAssign).to(AssignOp::Compound(BinaryOp::Sub)),
            punct(Punct::StarAssign).to(AssignOp::Compound(BinaryOp::Mul)),
            punct(Punct::SlashAssign).to(AssignOp::Compound(BinaryOp::Div)),
            punct(Punct::PercentAssign).to(AssignOp::Compound(BinaryOp::Rem)),
            punct(Punct::NullishAssign).to(AssignOp::Logical(LogicalOp::Nullish)),
            punct(Punct::OrAssign).to(AssignOp::Logical(LogicalOp::Or)),
            punct(Punct::AndAssign).to(AssignOp::Logical(LogicalOp::And)),
        ));
        operators.then(assign_op.then(assignment).or_not()).try_map(|(target, tail), span: Span| {
            match tail {
                None => Ok(target),
                Some((op, value)) if is_simple_target(&target) => Ok(Expr::new(
                    ExprKind::Assign {
                        op,
                        target: Box::new(target),
                        value: Box::new(value),
                    },
                    span.start,
                )),
                Some(_) => Err(Rich::custom(span, "invalid assignment target")),
            }
        })
    })
    .boxed()
}

/// Builds the comma-sequence grammar over `assignment`.
fn sequence<'src, I>(assignment: Grammar<'src, I, Expr>) -> Grammar<'src, I, Expr>
where
    I: ValueInput<'src, Token = Token<'src>, Span = Span> + 'src,
{
    assignment
        .separated_by(punct(Punct::Comma))
        .at_least(1)
        .collect::<Vec<_>>()
        .map_with(|mut items, extra| {
            if items.len() == 1
                && let Some(only) = items.pop()
            {
                only
            } else {
                Expr::new(ExprKind::Sequence(items), extra.span().start)
            }
        })
        .boxed()
}

/// Builds the object key grammar; the second value is the shorthand name.
fn property_key<'src, I>(
    assignment: Grammar<'src, I, Expr>,
) -> Grammar<'src, I, (PropKey, Option<String>)>
where
    I: ValueInput<'src, Token = Token<'src>, Span = Span> + 'src,
{
    choice((
        identifier().map(|name| (PropKey::Static(name.clone()), Some(name))),
        select! {
            Token::Keyword(keyword) => (PropKey::Static(keyword.as_str().to_string()), None),
            Token::Str(text) => (PropKey::Static(text), None),
            Token::Number(value) => (PropKey::Static(format_number(value)), None),
        },
        assignment
            .delimited_by(punct(Punct::LBracket), punct(Punct::RBracket))
            .map(|key| (PropKey::Computed(Box::new(key)), None)),
    ))
    .boxed()
}

/// Builds an object literal member from its key and what followed it.
fn object_member<'src>(
    ((key, shorthand), tail): ((PropKey, Option<String>), Option<MemberTail>),
    span: Span,
) -> Result<Property, ParseError<'src>> {
    let value = match tail {
        Some(MemberTail::Value(value)) => value,
        Some(MemberTail::Method((params, rest), body)) => {
            let name = match &key {
                PropKey::Static(name) => Some(name.clone()),
                PropKey::Computed(_) => None,
            };
            let def = FunctionDef {
                name,
                params,
                rest,
                body: FunctionBody::Block(body),
                arrow: false,
                position: span.start,
            };
            Expr::new(ExprKind::Function(Arc::new(def)), span.start)
        }
        None => match shorthand {
            Some(name) => Expr::new(ExprKind::Ident(name), span.start),
            None => return Err(Rich::custom(span, "expected `:` after property key")),
        },
    };
    Ok(Property::KeyValue(key, value))
}

/// Folds member, index, and call links onto `head`.
fn apply_links(head: Expr, links: Vec<(Link, usize)>) -> Expr {
    let mut optional_chain = false;
    let expr = links.into_iter().fold(head, |object, (link, position)| {
        let kind = match link {
            Link::Member(property, optional) => {
                optional_chain |= optional;
                ExprKind::Member {
                    object: Box::new(object),
                    property,
                    optional,
                }
            }
            Link::Index(index, optional) => {
                optional_chain |= optional;
                ExprKind::Index {
                    object: Box::new(object),
                    index: Box::new(index),
                    optional,
                }
            }
            Link::Call(args, optional) => {
                optional_chain |= optional;
                ExprKind::Call {
                    callee: Box::new(object),
                    args,
                    optional,
                }
            }
        };
        Expr::new(kind, position)
    });
    if optional_chain {
        let position = expr.position;
        Expr::new(ExprKind::OptionalChain(Box::new(expr)), position)
    } else {
        expr
    }
}

/// Applies a prefix operator; `None` when an update targets a non-reference.
fn apply_prefix(op: Prefix, operand: Expr, position: usize) -> Option<Expr> {
    let kind = match op {
        Prefix::Unary(op) => ExprKind::Unary(op, Box::new(operand)),
        Prefix::Update(increment) => {
            if !is_simple_target(&operand) {
                return None;
            }
            ExprKind::Update {
                increment,
                prefix: true,
                target: Box::new(operand),
            }
        }
    };
    Some(Expr::new(kind, position))
}

/// Builds a binary expression.
fn binary(op: BinaryOp, left: Expr, right: Expr, position: usize) -> Expr {
    Expr::new(ExprKind::Binary(op, Box::new(left), Box::new(right)), position)
}

/// Builds a short-circuiting expression.
fn logical(op: LogicalOp, left: Expr, right: Expr, position: usize) -> Expr {
    Expr::new(ExprKind::Logical(op, Box::new(left), Box::new(right)), position)
}

/// Returns true for identifiers, member, and index expressions.
const fn is_simple_target(expr: &Expr) -> bool {
    matches!(expr.kind, ExprKind::Ident(_) | ExprKind::Member { .. } | ExprKind::Index { .. })
}

// ============================================================================
// SECTION: Patterns
// ============================================================================

/// Builds the binding pattern grammar; defaults parse with `assignment`.
fn pattern<'src, I>(assignment: Grammar<'src, I, Expr>) -> Grammar<'src, I, Pattern>
where
    I: ValueInput<'src, Token = Token<'src>, Span = Span> + 'src,
{
    let key = property_key(assignment.clone());
    recursive(move |pattern| {
        let default = punct(Punct::Assign).ignore_then(assignment.clone()).or_not();
        let element = pattern.clone().then(default.clone()).map(|(target, default)| PatternElement {
            target,
            default,
        });

        let object_item = choice((
            punct(Punct::Ellipsis).ignore_then(pattern.clone()).map(ObjectItem::Rest),
            key.then(punct(Punct::Colon).ignore_then(pattern.clone()).or_not())
                .then(default)
                .try_map(|(((key, shorthand), value), default), span: Span| {
                    let value = match (value, shorthand) {
                        (Some(value), _) => value,
                        (None, Some(name)) => Pattern::Ident(name),
                        (None, None) => {
                            return Err(Rich::custom(span, "expected `:` in object pattern"));
                        }
                    };
                    Ok(ObjectItem::Prop(PatternProp {
                        key,
                        value,
                        default,
                    }))
                }),
        ));
        let object = object_item
            .separated_by(punct(Punct::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(punct(Punct::LBrace), punct(Punct::RBrace))
            .try_map(object_pattern);

        let array_item = choice((
            punct(Punct::Ellipsis).ignore_then(pattern.clone()).map(ArrayItem::Rest),
            element.map(ArrayItem::Element),
            empty().to(ArrayItem::Hole),
        ));
        let array = array_item
            .separated_by(punct(Punct::Comma))
            .collect::<Vec<_>>()
            .delimited_by(punct(Punct::LBracket), punct(Punct::RBracket))
            .try_map(array_pattern);

        choice((identifier().map(Pattern::Ident), object, array))
    })
    .boxed()
}

/// Builds a parenthesized parameter list.
fn parameters<'src, I>(
    pattern: Grammar<'src, I, Pattern>,
    assignment: Grammar<'src, I, Expr>,
) -> Grammar<'src, I, (Vec<PatternElement>, Option<Pattern>)>
where
    I: ValueInput<'src, Token = Token<'src>, Span = Span> + 'src,
{
    choice((
        punct(Punct::Ellipsis).ignore_then(pattern.clone()).map(Param::Rest),
        pattern.then(punct(Punct::Assign).ignore_then(assignment).or_not()).map(
            |(target, default)| {
                Param::Positional(PatternElement {
                    target,
                    default,
                })
            },
        ),
    ))
    .separated_by(punct(Punct::Comma))
    .allow_trailing()
    .collect::<Vec<_>>()
    .delimited_by(punct(Punct::LParen), punct(Punct::RParen))
    .try_map(split_params)
    .boxed()
}

/// Splits the rest parameter off a parameter list.
fn split_params<'src>(
    params: Vec<Param>,
    span: Span,
) -> Result<(Vec<PatternElement>, Option<Pattern>), ParseError<'src>> {
    let mut positional = Vec::with_capacity(params.len());
    let mut rest = None;
    for param in params {
        if rest.is_some() {
            return Err(Rich::custom(span, "rest parameter must be last"));
        }
        match param {
            Param::Positional(element) => positional.push(element),
            Param::Rest(pattern) => rest = Some(pattern),
        }
    }
    Ok((positional, rest))
}

/// Assembles an object pattern, requiring any rest entry to come last.
fn object_pattern<'src>(items: Vec<ObjectItem>, span: Span) -> Result<Pattern, ParseError<'src>> {
    let mut props = Vec::with_capacity(items.len());
    let mut rest = None;
    for item in items {
        if rest.is_some() {
            return Err(Rich::custom(span, "rest element must be last"));
        }
        match item {
            ObjectItem::Prop(prop) => props.push(prop),
            ObjectItem::Rest(pattern) => rest = Some(Box::new(pattern)),
        }
    }
    Ok(Pattern::Object {
        props,
        rest,
    })
}

/// Assembles an array pattern, dropping the hole a trailing comma leaves.
fn array_pattern<'src>(mut items: Vec<ArrayItem>, span: Span) -> Result<Pattern, ParseError<'src>> {
    if matches!(items.last(), Some(ArrayItem::Hole)) {
        items.pop();
    }
    let mut elements = Vec::with_capacity(items.len());
    let mut rest = None;
    for item in items {
        if rest.is_some() {
            return Err(Rich::custom(span, "rest element must be last"));
        }
        match item {
            ArrayItem::Element(element) => elements.push(Some(element)),
            ArrayItem::Hole => elements.push(None),
            ArrayItem::Rest(pattern) => rest = Some(Box::new(pattern)),
        }
    }
    Ok(Pattern::Array {
        elements,
        rest,
    })
}

// ============================================================================
// SECTION: Token Helpers
// ============================================================================

/// Matches one punctuator.
fn punct<'src, I>(punct: Punct) -> impl Parser<'src, I, (), Extra<'src>> + Clone
where
    I: ValueInput<'src, Token = Token<'src>, Span = Span>,
{
    just(Token::Punct(punct)).ignored()
}

/// Matches one keyword.
fn keyword<'src, I>(keyword: Keyword) -> impl Parser<'src, I, (), Extra<'src>> + Clone
where
    I: ValueInput<'src, Token = Token<'src>, Span = Span>,
{
    just(Token::Keyword(keyword)).ignored()
}

/// Matches an identifier.
fn identifier<'src, I>() -> impl Parser<'src, I, String, Extra<'src>> + Clone
where
    I: ValueInput<'src, Token = Token<'src>, Span = Span>,
{
    select! { Token::Ident(name) => name.to_string() }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
