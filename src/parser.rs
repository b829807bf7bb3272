use std::rc::Rc;

use crate::ast::*;
use crate::reporter::{ErrorReporter, StateTrackingReporter};
use crate::scanner::Keyword;
use crate::scanner::Pos;
use crate::scanner::Scanner;
use crate::scanner::Symbol;
use crate::scanner::Token;
use crate::scanner::TokenType;
use ordered_float::OrderedFloat;
use thiserror::Error;

// Public error type that is returned from the API
#[derive(Error, Debug)]
#[error("parse error")]
pub struct Error {}

// For unwinding, we don't actually care that much about the internal cause which is reported through the reporter
#[derive(Error, Debug)]
#[error("internal parse error")]
struct ParsePanic {}

const MAX_ARGUMENTS: usize = 255;

pub fn parse<Reporter>(reporter: &mut Reporter, mut scanner: Scanner<'_>) -> Result<Program, Error>
where
    Reporter: ErrorReporter,
{
    let mut reporter = StateTrackingReporter::new(reporter);
    let program = program(&mut reporter, &mut scanner);
    if reporter.errored {
        Err(Error {})
    } else {
        Ok(program)
    }
}

fn program<Reporter>(reporter: &mut Reporter, scanner: &mut Scanner<'_>) -> Program
where
    Reporter: ErrorReporter,
{
    let mut stmts = Vec::<Stmt>::new();
    while !scanner.is_at_eof() {
        match declaration(reporter, scanner) {
            Ok(stmt) => stmts.push(stmt),
            Err(_) => synchronize(reporter, scanner),
        }
    }
    Program(stmts)
}

fn synchronize<Reporter>(reporter: &mut Reporter, scanner: &mut Scanner)
where
    Reporter: ErrorReporter,
{
    // Consume tokens until we have consumed a ';'
    // Avoid consuming EOF since we can abort there
    while !scanner.is_at_eof() {
        match scanner.next() {
            Ok(token) if token.data == Symbol::Semicolon => break,
            Ok(_) => {}
            // Skipped input may still hold scan errors worth reporting
            Err(scan_err) => reporter.report(scan_err.pos, scan_err.error.message()),
        }
    }
}

fn declaration<Reporter>(
    reporter: &mut Reporter,
    scanner: &mut Scanner<'_>,
) -> Result<Stmt, ParsePanic>
where
    Reporter: ErrorReporter,
{
    if let Some(token) = scanner.next_if(|data| *data == Keyword::Var) {
        finish_var_decl(reporter, scanner, token.pos)
    } else if let Some(token) = scanner.next_if(|data| *data == Keyword::Fun) {
        let decl = function(reporter, scanner, "function")?;
        Ok(Stmt::new(token.pos, StmtInner::FunDecl(decl)))
    } else if let Some(token) = scanner.next_if(|data| *data == Keyword::Class) {
        finish_class_decl(reporter, scanner, token.pos)
    } else {
        statement(reporter, scanner)
    }
}

fn finish_var_decl<Reporter>(
    reporter: &mut Reporter,
    scanner: &mut Scanner<'_>,
    pos: Pos,
) -> Result<Stmt, ParsePanic>
where
    Reporter: ErrorReporter,
{
    let (name, _) = expect_identifier(reporter, scanner, "Expect variable name.")?;
    let init = if scanner.next_if(|next| *next == Symbol::Equal).is_some() {
        Some(expr(reporter, scanner)?)
    } else {
        None
    };
    consume(
        reporter,
        scanner,
        Symbol::Semicolon,
        "Expect ';' after variable declaration.",
    )?;
    Ok(Stmt::new(
        pos,
        StmtInner::VarDecl {
            name: name.to_string(),
            init,
        },
    ))
}

fn function<Reporter>(
    reporter: &mut Reporter,
    scanner: &mut Scanner<'_>,
    kind: &str,
) -> Result<Rc<FunDecl>, ParsePanic>
where
    Reporter: ErrorReporter,
{
    let (name, pos) = expect_identifier(reporter, scanner, &format!("Expect {} name.", kind))?;
    consume(
        reporter,
        scanner,
        Symbol::LeftParen,
        &format!("Expect '(' after {} name.", kind),
    )?;

    let mut parameters = Vec::new();
    if scanner
        .next_if(|next| *next == Symbol::RightParen)
        .is_none()
    {
        loop {
            if parameters.len() >= MAX_ARGUMENTS {
                reporter.report(scanner.peek_pos(), "Can't have more than 255 parameters.");
            }
            let (parameter, _) = expect_identifier(reporter, scanner, "Expect parameter name.")?;
            parameters.push(parameter.to_string());
            if scanner.next_if(|next| *next == Symbol::Comma).is_none() {
                break;
            }
        }
        consume(
            reporter,
            scanner,
            Symbol::RightParen,
            "Expect ')' after parameters.",
        )?;
    }
    consume(
        reporter,
        scanner,
        Symbol::LeftBrace,
        &format!("Expect '{{' before {} body.", kind),
    )?;
    let body = block_statements(reporter, scanner)?;
    Ok(Rc::new(FunDecl {
        name: name.to_string(),
        pos,
        parameters,
        body,
    }))
}

fn finish_class_decl<Reporter>(
    reporter: &mut Reporter,
    scanner: &mut Scanner<'_>,
    pos: Pos,
) -> Result<Stmt, ParsePanic>
where
    Reporter: ErrorReporter,
{
    let (name, _) = expect_identifier(reporter, scanner, "Expect class name.")?;
    let superclass = if scanner.next_if(|next| *next == Symbol::Less).is_some() {
        let (parent, parent_pos) =
            expect_identifier(reporter, scanner, "Expect superclass name.")?;
        Some(Expr::new(
            parent_pos,
            ExprInner::Variable {
                name: parent.to_string(),
                scope_distance: None,
            },
        ))
    } else {
        None
    };
    consume(
        reporter,
        scanner,
        Symbol::LeftBrace,
        "Expect '{' before class body.",
    )?;
    let mut methods = Vec::new();
    // Class methods don't have fun prefix
    while !scanner.is_at_eof() && !peek_matches(scanner, Symbol::RightBrace) {
        methods.push(function(reporter, scanner, "method")?);
    }
    consume(
        reporter,
        scanner,
        Symbol::RightBrace,
        "Expect '}' after class body.",
    )?;
    Ok(Stmt::new(
        pos,
        StmtInner::ClassDecl {
            name: name.to_string(),
            superclass,
            methods,
        },
    ))
}

fn statement<Reporter>(
    reporter: &mut Reporter,
    scanner: &mut Scanner<'_>,
) -> Result<Stmt, ParsePanic>
where
    Reporter: ErrorReporter,
{
    if let Some(token) = scanner.next_if(|next| *next == Keyword::If) {
        if_stmt(reporter, scanner, token.pos)
    } else if let Some(token) = scanner.next_if(|next| *next == Keyword::While) {
        while_stmt(reporter, scanner, token.pos)
    } else if let Some(token) = scanner.next_if(|next| *next == Keyword::For) {
        for_stmt(reporter, scanner, token.pos)
    } else if let Some(token) = scanner.next_if(|next| *next == Keyword::Print) {
        let expr = expr(reporter, scanner)?;
        consume(reporter, scanner, Symbol::Semicolon, "Expect ';' after value.")?;
        Ok(Stmt::new(token.pos, StmtInner::Print(expr)))
    } else if let Some(token) = scanner.next_if(|next| *next == Keyword::Return) {
        let value = if scanner.next_if(|next| *next == Symbol::Semicolon).is_some() {
            None
        } else {
            let value = expr(reporter, scanner)?;
            consume(
                reporter,
                scanner,
                Symbol::Semicolon,
                "Expect ';' after return value.",
            )?;
            Some(value)
        };
        Ok(Stmt::new(token.pos, StmtInner::Return(value)))
    } else if let Some(token) = scanner.next_if(|next| *next == Symbol::LeftBrace) {
        let stmts = block_statements(reporter, scanner)?;
        Ok(Stmt::new(token.pos, StmtInner::Block(stmts)))
    } else {
        expr_stmt(reporter, scanner)
    }
}

// Parses the statements of a block whose '{' has already been consumed, including the closing '}'
fn block_statements<Reporter>(
    reporter: &mut Reporter,
    scanner: &mut Scanner<'_>,
) -> Result<Vec<Stmt>, ParsePanic>
where
    Reporter: ErrorReporter,
{
    let mut stmts: Vec<Stmt> = Vec::new();
    while !scanner.is_at_eof() && !peek_matches(scanner, Symbol::RightBrace) {
        stmts.push(declaration(reporter, scanner)?);
    }
    consume(reporter, scanner, Symbol::RightBrace, "Expect '}' after block.")?;
    Ok(stmts)
}

fn if_stmt<Reporter>(
    reporter: &mut Reporter,
    scanner: &mut Scanner<'_>,
    pos: Pos,
) -> Result<Stmt, ParsePanic>
where
    Reporter: ErrorReporter,
{
    consume(reporter, scanner, Symbol::LeftParen, "Expect '(' after 'if'.")?;
    let test_expr = expr(reporter, scanner)?;
    consume(
        reporter,
        scanner,
        Symbol::RightParen,
        "Expect ')' after if condition.",
    )?;
    let then_branch = Box::new(statement(reporter, scanner)?);
    let else_branch = if scanner.next_if(|next| *next == Keyword::Else).is_some() {
        Some(Box::new(statement(reporter, scanner)?))
    } else {
        None
    };
    Ok(Stmt::new(
        pos,
        StmtInner::If {
            expr: test_expr,
            then: then_branch,
            or_else: else_branch,
        },
    ))
}

fn while_stmt<Reporter>(
    reporter: &mut Reporter,
    scanner: &mut Scanner<'_>,
    pos: Pos,
) -> Result<Stmt, ParsePanic>
where
    Reporter: ErrorReporter,
{
    consume(
        reporter,
        scanner,
        Symbol::LeftParen,
        "Expect '(' after 'while'.",
    )?;
    let expr = expr(reporter, scanner)?;
    consume(
        reporter,
        scanner,
        Symbol::RightParen,
        "Expect ')' after condition.",
    )?;
    let body = Box::new(statement(reporter, scanner)?);
    Ok(Stmt::new(pos, StmtInner::Loop { expr, body }))
}

// For loops have no runtime representation, they are rewritten into a while loop in a block
fn for_stmt<Reporter>(
    reporter: &mut Reporter,
    scanner: &mut Scanner<'_>,
    pos: Pos,
) -> Result<Stmt, ParsePanic>
where
    Reporter: ErrorReporter,
{
    consume(reporter, scanner, Symbol::LeftParen, "Expect '(' after 'for'.")?;
    let initializer = if scanner.next_if(|next| *next == Symbol::Semicolon).is_some() {
        None
    } else if let Some(token) = scanner.next_if(|next| *next == Keyword::Var) {
        Some(finish_var_decl(reporter, scanner, token.pos)?)
    } else {
        Some(expr_stmt(reporter, scanner)?)
    };

    let condition = if let Some(token) = scanner.next_if(|next| *next == Symbol::Semicolon) {
        Expr::new(token.pos, ExprInner::Literal(Literal::Boolean(true)))
    } else {
        let cond = expr(reporter, scanner)?;
        consume(
            reporter,
            scanner,
            Symbol::Semicolon,
            "Expect ';' after loop condition.",
        )?;
        cond
    };

    let incr = if scanner
        .next_if(|next| *next == Symbol::RightParen)
        .is_some()
    {
        None
    } else {
        let incr = expr(reporter, scanner)?;
        consume(
            reporter,
            scanner,
            Symbol::RightParen,
            "Expect ')' after for clauses.",
        )?;
        Some(Stmt::new(incr.pos, StmtInner::Expr(incr)))
    };

    let mut body = statement(reporter, scanner)?;
    if let Some(incr) = incr {
        body = Stmt::new(body.pos, StmtInner::Block(vec![body, incr]));
    }

    let for_loop = Stmt::new(
        pos,
        StmtInner::Loop {
            expr: condition,
            body: Box::new(body),
        },
    );

    if let Some(init) = initializer {
        Ok(Stmt::new(pos, StmtInner::Block(vec![init, for_loop])))
    } else {
        Ok(for_loop)
    }
}

fn expr_stmt<Reporter>(
    reporter: &mut Reporter,
    scanner: &mut Scanner<'_>,
) -> Result<Stmt, ParsePanic>
where
    Reporter: ErrorReporter,
{
    let expr = expr(reporter, scanner)?;
    consume(
        reporter,
        scanner,
        Symbol::Semicolon,
        "Expect ';' after expression.",
    )?;
    Ok(Stmt::new(expr.pos, StmtInner::Expr(expr)))
}

// The comma operator binds loosest of all, call arguments skip it and start at assignment
fn expr<Reporter>(reporter: &mut Reporter, scanner: &mut Scanner<'_>) -> Result<Expr, ParsePanic>
where
    Reporter: ErrorReporter,
{
    let mut expr = assignment(reporter, scanner)?;
    while let Some(comma) = scanner.next_if(|next| *next == Symbol::Comma) {
        let right = assignment(reporter, scanner)?;
        expr = Expr::new(
            comma.pos,
            ExprInner::Binary {
                left: Box::new(expr),
                op: BinaryOp::Comma,
                right: Box::new(right),
            },
        );
    }
    Ok(expr)
}

fn assignment<Reporter>(
    reporter: &mut Reporter,
    scanner: &mut Scanner<'_>,
) -> Result<Expr, ParsePanic>
where
    Reporter: ErrorReporter,
{
    let expr = ternary(reporter, scanner)?;
    if let Some(eq) = scanner.next_if(|token| *token == Symbol::Equal) {
        let rhs = Box::new(assignment(reporter, scanner)?);
        match expr.inner {
            // A valid assignment target
            ExprInner::Variable { name, .. } => Ok(Expr::new(
                expr.pos,
                ExprInner::Assignment {
                    target: name,
                    scope_distance: None,
                    expr: rhs,
                },
            )),
            ExprInner::Get { object, property } => Ok(Expr::new(
                expr.pos,
                ExprInner::Set {
                    object,
                    property,
                    value: rhs,
                },
            )),
            // Not a valid assignment target
            // Report the error to trigger top level error, but don't error out here so we continue parsing
            inner => {
                reporter.report(eq.pos, "Invalid assignment target.");
                Ok(Expr::new(expr.pos, inner))
            }
        }
    } else {
        Ok(expr)
    }
}

fn ternary<Reporter>(
    reporter: &mut Reporter,
    scanner: &mut Scanner<'_>,
) -> Result<Expr, ParsePanic>
where
    Reporter: ErrorReporter,
{
    let test = logical_or(reporter, scanner)?;
    if let Some(question) = scanner.next_if(|next| *next == Symbol::Question) {
        let if_true = Box::new(assignment(reporter, scanner)?);
        consume(
            reporter,
            scanner,
            Symbol::Colon,
            "Expect ':' after then branch of conditional expression.",
        )?;
        let if_false = Box::new(ternary(reporter, scanner)?);
        Ok(Expr::new(
            question.pos,
            ExprInner::Ternary {
                test: Box::new(test),
                if_true,
                if_false,
            },
        ))
    } else {
        Ok(test)
    }
}

// This encapsualtes the logic of the recursive parsing of levels of binary expression operators
// We define a set of matching symbols (and we have the symbol -> binary op) as well as a high precendence parser
const EQUALITY_SYMBOLS: [Symbol; 2] = [Symbol::EqualEqual, Symbol::BangEqual];

const COMPARISON_SYMBOLS: [Symbol; 4] = [
    Symbol::Greater,
    Symbol::GreaterEqual,
    Symbol::Less,
    Symbol::LessEqual,
];

const TERM_SYMBOLS: [Symbol; 2] = [Symbol::Minus, Symbol::Plus];

const FACTOR_SYMBOLS: [Symbol; 2] = [Symbol::Star, Symbol::Slash];

// All binary symbols, This is used for error production in primary to recover when we see a binary symbol without a
// left hand operand
const BINARY_SYMBOLS: [Symbol; 9] = [
    Symbol::EqualEqual,
    Symbol::BangEqual,
    Symbol::Greater,
    Symbol::GreaterEqual,
    Symbol::Less,
    Symbol::LessEqual,
    Symbol::Plus,
    Symbol::Star,
    Symbol::Slash,
];

fn logical_or<Reporter>(
    reporter: &mut Reporter,
    scanner: &mut Scanner<'_>,
) -> Result<Expr, ParsePanic>
where
    Reporter: ErrorReporter,
{
    left_recursive_logical_op(reporter, scanner, Keyword::Or, logical_and)
}

fn logical_and<Reporter>(
    reporter: &mut Reporter,
    scanner: &mut Scanner<'_>,
) -> Result<Expr, ParsePanic>
where
    Reporter: ErrorReporter,
{
    left_recursive_logical_op(reporter, scanner, Keyword::And, equality)
}

fn equality<Reporter>(
    reporter: &mut Reporter,
    scanner: &mut Scanner<'_>,
) -> Result<Expr, ParsePanic>
where
    Reporter: ErrorReporter,
{
    left_recursive_binary_op(reporter, scanner, &EQUALITY_SYMBOLS, comparison)
}

fn comparison<Reporter>(
    reporter: &mut Reporter,
    scanner: &mut Scanner<'_>,
) -> Result<Expr, ParsePanic>
where
    Reporter: ErrorReporter,
{
    left_recursive_binary_op(reporter, scanner, &COMPARISON_SYMBOLS, term)
}

fn term<Reporter>(reporter: &mut Reporter, scanner: &mut Scanner<'_>) -> Result<Expr, ParsePanic>
where
    Reporter: ErrorReporter,
{
    left_recursive_binary_op(reporter, scanner, &TERM_SYMBOLS, factor)
}

fn factor<Reporter>(
    reporter: &mut Reporter,
    scanner: &mut Scanner<'_>,
) -> Result<Expr, ParsePanic>
where
    Reporter: ErrorReporter,
{
    left_recursive_binary_op(reporter, scanner, &FACTOR_SYMBOLS, unary)
}

const UNARY_SYMBOLS: [Symbol; 2] = [Symbol::Minus, Symbol::Bang];

fn unary<Reporter>(reporter: &mut Reporter, scanner: &mut Scanner<'_>) -> Result<Expr, ParsePanic>
where
    Reporter: ErrorReporter,
{
    let pos = scanner.peek_pos();
    if let Some(symbol) = scanner.next_if_some(|next| match next {
        TokenType::Symbol(symbol) if UNARY_SYMBOLS.contains(symbol) => Some(*symbol),
        _ => None,
    }) {
        let operator = symbol_to_unary_op(symbol);
        let right = Box::new(unary(reporter, scanner)?);
        Ok(Expr::new(
            pos,
            ExprInner::Unary {
                op: operator,
                expr: right,
            },
        ))
    } else {
        call(reporter, scanner)
    }
}

fn call<Reporter>(reporter: &mut Reporter, scanner: &mut Scanner<'_>) -> Result<Expr, ParsePanic>
where
    Reporter: ErrorReporter,
{
    let mut expr = primary(reporter, scanner)?;
    loop {
        if let Some(paren) = scanner.next_if(|next| *next == Symbol::LeftParen) {
            expr = finish_call(reporter, scanner, expr, paren.pos)?;
        } else if scanner.next_if(|next| *next == Symbol::Dot).is_some() {
            let (name, pos) =
                expect_identifier(reporter, scanner, "Expect property name after '.'.")?;
            expr = Expr::new(
                pos,
                ExprInner::Get {
                    object: Box::new(expr),
                    property: name.to_string(),
                },
            );
        } else {
            break;
        }
    }
    Ok(expr)
}

fn finish_call<Reporter>(
    reporter: &mut Reporter,
    scanner: &mut Scanner<'_>,
    callee: Expr,
    pos: Pos,
) -> Result<Expr, ParsePanic>
where
    Reporter: ErrorReporter,
{
    let mut arguments = Vec::new();
    if scanner
        .next_if(|next| *next == Symbol::RightParen)
        .is_none()
    {
        loop {
            if arguments.len() >= MAX_ARGUMENTS {
                reporter.report(scanner.peek_pos(), "Can't have more than 255 arguments.");
            }
            arguments.push(assignment(reporter, scanner)?);
            if scanner.next_if(|next| *next == Symbol::Comma).is_none() {
                break;
            }
        }
        // Note: we only need to consume the trailing ) if we didn't consume it in the has args branch
        consume(
            reporter,
            scanner,
            Symbol::RightParen,
            "Expect ')' after arguments.",
        )?;
    }
    Ok(Expr::new(
        pos,
        ExprInner::Call {
            callee: Box::new(callee),
            arguments,
        },
    ))
}

fn primary<Reporter>(
    reporter: &mut Reporter,
    scanner: &mut Scanner<'_>,
) -> Result<Expr, ParsePanic>
where
    Reporter: ErrorReporter,
{
    let token = match scanner.next() {
        Ok(token) => token,
        Err(scan_err) => {
            reporter.report(scan_err.pos, scan_err.error.message());
            return Err(ParsePanic {});
        }
    };
    let inner = match token.data {
        TokenType::Keyword(Keyword::True) => ExprInner::Literal(Literal::Boolean(true)),
        TokenType::Keyword(Keyword::False) => ExprInner::Literal(Literal::Boolean(false)),
        TokenType::Keyword(Keyword::Nil) => ExprInner::Literal(Literal::Nil),
        TokenType::String(string) => ExprInner::Literal(Literal::String(string.to_string())),
        TokenType::Number(number) => ExprInner::Literal(Literal::Number(OrderedFloat(number))),
        TokenType::Keyword(Keyword::This) => ExprInner::This {
            scope_distance: None,
        },
        TokenType::Keyword(Keyword::Super) => {
            consume(reporter, scanner, Symbol::Dot, "Expect '.' after 'super'.")?;
            let (method, _) =
                expect_identifier(reporter, scanner, "Expect superclass method name.")?;
            ExprInner::Super {
                method: method.to_string(),
                scope_distance: None,
            }
        }
        TokenType::Identifier(ident) => ExprInner::Variable {
            name: ident.to_string(),
            scope_distance: None,
        },
        TokenType::Symbol(Symbol::LeftParen) => {
            let inner = expr(reporter, scanner)?;
            consume(
                reporter,
                scanner,
                Symbol::RightParen,
                "Expect ')' after expression.",
            )?;
            ExprInner::Group(Box::new(inner))
        }
        // An unexpected binary symbol so lets try and parse the rhs before raising the error
        // - should be trapped by unary
        TokenType::Symbol(symbol) if BINARY_SYMBOLS.contains(&symbol) => {
            reporter.report(token.pos, "Binary operator without a left-hand operand.");
            // result is unimportant, we are bailing anyway
            let _rhs = expr(reporter, scanner);
            return Err(ParsePanic {});
        }
        _ => {
            reporter.report(token.pos, "Expect expression.");
            return Err(ParsePanic {});
        }
    };
    Ok(Expr::new(token.pos, inner))
}

// It occurs to me it might be possible to do this a single recursive call that unfolds generically
// instead of encoding the recursion in separate helpers
fn left_recursive_binary_op<'src, Reporter, F>(
    reporter: &mut Reporter,
    scanner: &mut Scanner<'src>,
    symbols: &[Symbol],
    higher_precedence: F,
) -> Result<Expr, ParsePanic>
where
    Reporter: ErrorReporter,
    F: Fn(&mut Reporter, &mut Scanner<'src>) -> Result<Expr, ParsePanic>,
{
    let mut expr = higher_precedence(reporter, scanner)?;
    loop {
        let pos = scanner.peek_pos();
        let Some(symbol) = scanner.next_if_some(|next| match next {
            TokenType::Symbol(s) if symbols.contains(s) => Some(*s),
            _ => None,
        }) else {
            break;
        };
        let right = Box::new(higher_precedence(reporter, scanner)?);
        expr = Expr::new(
            pos,
            ExprInner::Binary {
                left: Box::new(expr),
                op: symbol_to_binary_op(symbol),
                right,
            },
        );
    }
    Ok(expr)
}

fn left_recursive_logical_op<'src, Reporter, F>(
    reporter: &mut Reporter,
    scanner: &mut Scanner<'src>,
    keyword: Keyword,
    higher_precedence: F,
) -> Result<Expr, ParsePanic>
where
    Reporter: ErrorReporter,
    F: Fn(&mut Reporter, &mut Scanner<'src>) -> Result<Expr, ParsePanic>,
{
    let mut expr = higher_precedence(reporter, scanner)?;
    while let Some(token) = scanner.next_if(|next| *next == keyword) {
        let right = Box::new(higher_precedence(reporter, scanner)?);
        expr = Expr::new(
            token.pos,
            ExprInner::Logical {
                left: Box::new(expr),
                op: keyword_to_logical_op(keyword),
                right,
            },
        );
    }
    Ok(expr)
}

fn symbol_to_binary_op(symbol: Symbol) -> BinaryOp {
    match symbol {
        Symbol::EqualEqual => BinaryOp::Equal,
        Symbol::BangEqual => BinaryOp::NotEqual,
        Symbol::Less => BinaryOp::LessThan,
        Symbol::LessEqual => BinaryOp::LessThanEqual,
        Symbol::Greater => BinaryOp::GreaterThan,
        Symbol::GreaterEqual => BinaryOp::GreaterThanEqual,
        Symbol::Plus => BinaryOp::Add,
        Symbol::Minus => BinaryOp::Subtract,
        Symbol::Star => BinaryOp::Multiply,
        Symbol::Slash => BinaryOp::Divide,
        Symbol::Comma => BinaryOp::Comma,
        s => unreachable!("symbol was not a valid binary operator: {}", s),
    }
}

fn keyword_to_logical_op(kw: Keyword) -> LogicalOp {
    match kw {
        Keyword::And => LogicalOp::And,
        Keyword::Or => LogicalOp::Or,
        kw => unreachable!("keyword was not a valid logical operator: {}", kw),
    }
}

fn symbol_to_unary_op(symbol: Symbol) -> UnaryOp {
    match symbol {
        Symbol::Bang => UnaryOp::Not,
        Symbol::Minus => UnaryOp::Negative,
        s => unreachable!("symbol was not a valid unary operator: {}", s),
    }
}

/// Expect that the next token from scanner is the given symbol, reporting `message` on a mismatch
/// A scan error in that position is reported as itself
fn consume<Reporter>(
    reporter: &mut Reporter,
    scanner: &mut Scanner<'_>,
    symbol: Symbol,
    message: &str,
) -> Result<Pos, ParsePanic>
where
    Reporter: ErrorReporter,
{
    match scanner.next() {
        Ok(token) if token.data == symbol => Ok(token.pos),
        Ok(token) => {
            reporter.report(token.pos, message);
            Err(ParsePanic {})
        }
        Err(scan_err) => {
            reporter.report(scan_err.pos, scan_err.error.message());
            Err(ParsePanic {})
        }
    }
}

fn expect_identifier<'code, Reporter>(
    reporter: &mut Reporter,
    scanner: &mut Scanner<'code>,
    message: &str,
) -> Result<(&'code str, Pos), ParsePanic>
where
    Reporter: ErrorReporter,
{
    match scanner.next() {
        Ok(Token {
            data: TokenType::Identifier(ident),
            pos,
        }) => Ok((ident, pos)),
        Ok(Token { pos, .. }) => {
            reporter.report(pos, message);
            Err(ParsePanic {})
        }
        Err(scan_err) => {
            reporter.report(scan_err.pos, scan_err.error.message());
            Err(ParsePanic {})
        }
    }
}

// Helper to determine if a scanner result matches a specific input
fn peek_matches<'code, A>(scanner: &mut Scanner<'code>, rhs: A) -> bool
where
    TokenType<'code>: PartialEq<A>,
{
    match scanner.peek() {
        Ok(token) => token.data == rhs,
        _ => false,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reporter::CollectingReporter;

    fn parse_ok(code: &str) -> Program {
        let mut reporter = CollectingReporter::default();
        let program = parse(&mut reporter, Scanner::new(code));
        assert!(reporter.diagnostics.is_empty(), "{:?}", reporter.diagnostics);
        program.unwrap()
    }

    fn parse_expr(code: &str) -> String {
        let program = parse_ok(&format!("{};", code));
        match &program.0[0].inner {
            StmtInner::Expr(expr) => expr.to_string(),
            other => panic!("expected an expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_pretty_print() {
        let pos = Pos {
            line: 1,
            offset_in_line: 0,
        };
        // (* (- 123) (group 45.67))
        let expr = Expr::new(
            pos,
            ExprInner::Binary {
                left: Box::new(Expr::new(
                    pos,
                    ExprInner::Unary {
                        op: UnaryOp::Negative,
                        expr: Box::new(Expr::new(
                            pos,
                            ExprInner::Literal(Literal::Number(OrderedFloat(123f64))),
                        )),
                    },
                )),
                op: BinaryOp::Multiply,
                right: Box::new(Expr::new(
                    pos,
                    ExprInner::Group(Box::new(Expr::new(
                        pos,
                        ExprInner::Literal(Literal::Number(OrderedFloat(45.67f64))),
                    ))),
                )),
            },
        );
        assert_eq!("(* (- 123) (group 45.67))", expr.to_string());
    }

    #[test]
    fn test_parse_call() {
        assert_eq!("(call (ident clock))", parse_expr("clock()"));
    }

    #[test]
    fn call_arguments_are_not_comma_expressions() {
        assert_eq!("(call (ident f) 1 2)", parse_expr("f(1, 2)"));
        assert_eq!("(, (, 1 2) 3)", parse_expr("1, 2, 3"));
    }

    #[test]
    fn precedence() {
        assert_eq!("(+ 1 (* 2 3))", parse_expr("1 + 2 * 3"));
        assert_eq!("(or (ident a) (and (ident b) (ident c)))", parse_expr("a or b and c"));
        assert_eq!("(== (< 1 2) true)", parse_expr("1 < 2 == true"));
        assert_eq!("(! (! true))", parse_expr("!!true"));
    }

    #[test]
    fn ternary_is_right_associative() {
        assert_eq!(
            "(? (ident a) (ident b) (? (ident c) (ident d) (ident e)))",
            parse_expr("a ? b : c ? d : e")
        );
    }

    #[test]
    fn assignment_targets() {
        assert_eq!("(= a (= b 1))", parse_expr("a = b = 1"));
        assert_eq!("(set (get (ident a) b) c 2)", parse_expr("a.b.c = 2"));
        assert_eq!("(call (get (super init) x))", parse_expr("super.init.x()"));
    }

    #[test]
    fn test_fun_define() {
        let program = parse_ok(
            "fun add(a, b) {
                print a + b;
            }

            add(1, 2);",
        );
        assert_eq!(2, program.0.len());
        match &program.0[0].inner {
            StmtInner::FunDecl(decl) => {
                assert_eq!("add", decl.name);
                assert_eq!(vec!["a".to_string(), "b".to_string()], decl.parameters);
                assert_eq!(1, decl.body.len());
            }
            other => panic!("expected a function, got {:?}", other),
        }
    }

    #[test]
    fn class_with_superclass() {
        let program = parse_ok("class B < A { init(x) { this.x = x; } go() {} }");
        match &program.0[0].inner {
            StmtInner::ClassDecl {
                name,
                superclass,
                methods,
            } => {
                assert_eq!("B", name);
                assert_eq!(
                    "(ident A)",
                    superclass.as_ref().map(|e| e.to_string()).unwrap()
                );
                let names: Vec<&str> = methods.iter().map(|m| m.name.as_str()).collect();
                assert_eq!(vec!["init", "go"], names);
            }
            other => panic!("expected a class, got {:?}", other),
        }
    }

    #[test]
    fn for_loop_desugars_into_while() {
        let program = parse_ok("for (var i = 0; i < 3; i = i + 1) print i;");
        match &program.0[0].inner {
            StmtInner::Block(stmts) => {
                assert!(matches!(stmts[0].inner, StmtInner::VarDecl { .. }));
                match &stmts[1].inner {
                    StmtInner::Loop { body, .. } => {
                        assert!(matches!(&body.inner, StmtInner::Block(inner) if inner.len() == 2))
                    }
                    other => panic!("expected a loop, got {:?}", other),
                }
            }
            other => panic!("expected a block, got {:?}", other),
        }
    }

    #[test]
    fn invalid_assignment_target_is_reported() {
        let mut reporter = CollectingReporter::default();
        assert!(parse(&mut reporter, Scanner::new("1 + 2 = 3;")).is_err());
        assert_eq!("Invalid assignment target.", reporter.diagnostics[0].1);
    }

    #[test]
    fn recovers_and_reports_every_error() {
        let mut reporter = CollectingReporter::default();
        let result = parse(
            &mut reporter,
            Scanner::new("var = 1;\nprint 2;\nprint (3;\nprint 4;"),
        );
        assert!(result.is_err());
        let lines: Vec<usize> = reporter.diagnostics.iter().map(|(pos, _)| pos.line).collect();
        assert_eq!(vec![1, 3], lines);
    }

    fn messages(code: &str) -> Vec<String> {
        let mut reporter = CollectingReporter::default();
        let _ = parse(&mut reporter, Scanner::new(code));
        reporter
            .diagnostics
            .into_iter()
            .map(|(_, message)| message)
            .collect()
    }

    #[test]
    fn scan_errors_are_reported_where_tokens_are_expected() {
        assert_eq!(vec!["Unexpected character."], messages("print 1 @;"));
        assert_eq!(vec!["Unterminated string."], messages("var x = 1 \"open"));
        assert_eq!(vec!["Unexpected character."], messages("var @ = 1;"));
        assert_eq!(vec!["Unexpected character."], messages("print 1; @ print 2;"));
    }

    #[test]
    fn scan_errors_skipped_during_recovery_are_reported() {
        assert_eq!(
            vec!["Expect expression.", "Unexpected character."],
            messages("print ) @ ;\nprint 2;")
        );
    }

    fn call_with_arguments(count: usize) -> String {
        let arguments = vec!["0"; count].join(", ");
        format!("f({});", arguments)
    }

    fn function_with_parameters(count: usize) -> String {
        let parameters: Vec<String> = (0..count).map(|i| format!("p{}", i)).collect();
        format!("fun f({}) {{}}", parameters.join(", "))
    }

    #[test]
    fn argument_limit() {
        match &parse_ok(&call_with_arguments(255)).0[0].inner {
            StmtInner::Expr(Expr {
                inner: ExprInner::Call { arguments, .. },
                ..
            }) => assert_eq!(255, arguments.len()),
            other => panic!("expected a call, got {:?}", other),
        }
        assert_eq!(
            vec!["Can't have more than 255 arguments."],
            messages(&call_with_arguments(256))
        );
    }

    #[test]
    fn parameter_limit() {
        match &parse_ok(&function_with_parameters(255)).0[0].inner {
            StmtInner::FunDecl(decl) => assert_eq!(255, decl.parameters.len()),
            other => panic!("expected a function, got {:?}", other),
        }
        assert_eq!(
            vec!["Can't have more than 255 parameters."],
            messages(&function_with_parameters(256))
        );
    }

    #[test]
    fn unterminated_block_reports_at_eof() {
        let mut reporter = CollectingReporter::default();
        assert!(parse(&mut reporter, Scanner::new("{ print 1;")).is_err());
        assert_eq!("Expect '}' after block.", reporter.diagnostics[0].1);
    }
}
