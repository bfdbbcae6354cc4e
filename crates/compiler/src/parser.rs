//! Statement parser: turns a single (comment-stripped) script line into a `RawStmt`, and hosts
//! the expression parser used for `if`/`while` conditions, assignment right-hand sides, and
//! command arguments.

use crate::ast::{Accessor, BinOp, Expr, VarRef};
use crate::error::ParseError;
use crate::lexer::{self, Token, split_top_level, strip_comment, tokenize};

#[derive(Debug, Clone, PartialEq)]
pub enum RawStmt {
    Label { name: String, line: usize },
    If { cond: Expr, line: usize },
    ElseIf { cond: Expr, line: usize },
    Else { line: usize },
    While { cond: Expr, line: usize },
    End { line: usize },
    Include { path: String, line: usize },
    Assign { target: VarRef, expr: Expr, line: usize },
    Call { command: String, args: Vec<Expr>, line: usize },
}

/// Parse every non-blank line of a script into `RawStmt`s. `include` lines are left
/// unresolved — resolving them is `lib.rs`'s job, since it requires a caller-supplied resolver.
pub fn parse_source(source: &str) -> Result<Vec<RawStmt>, ParseError> {
    let mut out = Vec::new();
    for (idx, raw_line) in source.lines().enumerate() {
        let line = idx + 1;
        if let Some(stmt) = parse_line(raw_line, line)? {
            out.push(stmt);
        }
    }
    Ok(out)
}

pub fn parse_line(raw: &str, line: usize) -> Result<Option<RawStmt>, ParseError> {
    let stripped = strip_comment(raw);
    let trimmed = stripped.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if let Some(rest) = trimmed.strip_prefix(':') {
        return Ok(Some(RawStmt::Label { name: rest.trim().to_string(), line }));
    }

    let (head, rest) = split_first_word(trimmed);
    let lower = head.to_lowercase();

    match lower.as_str() {
        "if" => Ok(Some(RawStmt::If { cond: parse_expr_str(rest, line)?, line })),
        "elseif" => Ok(Some(RawStmt::ElseIf { cond: parse_expr_str(rest, line)?, line })),
        "else" => Ok(Some(RawStmt::Else { line })),
        "while" => Ok(Some(RawStmt::While { cond: parse_expr_str(rest, line)?, line })),
        "end" => Ok(Some(RawStmt::End { line })),
        "include" => Ok(Some(RawStmt::Include { path: parse_include_path(rest, line)?, line })),
        _ => parse_assign_or_call(head, rest, line),
    }
}

fn split_first_word(s: &str) -> (&str, &str) {
    match s.find(char::is_whitespace) {
        Some(idx) => (&s[..idx], s[idx..].trim_start()),
        None => (s, ""),
    }
}

fn parse_include_path(rest: &str, line: usize) -> Result<String, ParseError> {
    let tokens = tokenize(rest, line)?;
    match tokens.first() {
        Some(Token::Str(s)) => Ok(s.clone()),
        Some(Token::Ident(s)) => Ok(s.clone()),
        _ => Err(ParseError::UnexpectedEndOfExpression { line }),
    }
}

fn parse_assign_or_call(
    head: &str,
    rest: &str,
    line: usize,
) -> Result<Option<RawStmt>, ParseError> {
    let rest_trim = rest.trim_start();
    if let Some(after_eq) = rest_trim.strip_prefix('=') {
        let target = match parse_expr_str(head, line)? {
            Expr::Var(v) => v,
            _ => return Err(ParseError::ExpectedVariable { line }),
        };
        let expr = parse_expr_str(after_eq, line)?;
        return Ok(Some(RawStmt::Assign { target, expr, line }));
    }

    let arg_chunks = split_top_level(rest);
    let mut args = Vec::with_capacity(arg_chunks.len());
    for chunk in &arg_chunks {
        args.push(parse_expr_str(chunk, line)?);
    }
    Ok(Some(RawStmt::Call { command: head.to_string(), args, line }))
}

fn parse_expr_str(s: &str, line: usize) -> Result<Expr, ParseError> {
    let tokens = tokenize(s, line)?;
    parse_expr_tokens(&tokens, line)
}

pub fn parse_expr_tokens(tokens: &[Token], line: usize) -> Result<Expr, ParseError> {
    let mut p = ExprParser { tokens, pos: 0, line };
    let expr = p.parse_logical()?;
    if p.pos != tokens.len() {
        return Err(ParseError::UnexpectedEndOfExpression { line });
    }
    Ok(expr)
}

struct ExprParser<'a> {
    tokens: &'a [Token],
    pos: usize,
    line: usize,
}

impl<'a> ExprParser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn peek_keyword(&self, kw: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(s)) if s.eq_ignore_ascii_case(kw))
    }

    fn peek_op(&self, op: &str) -> bool {
        matches!(self.peek(), Some(Token::Op(s)) if s == op)
    }

    /// `AND` / `OR` / `XOR` — lowest precedence.
    fn parse_logical(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_compare()?;
        loop {
            let op = if self.peek_keyword("and") {
                BinOp::And
            } else if self.peek_keyword("or") {
                BinOp::Or
            } else if self.peek_keyword("xor") {
                BinOp::Xor
            } else {
                break;
            };
            self.advance();
            let right = self.parse_compare()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    /// `= <> < > <= >=`
    fn parse_compare(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_concat()?;
        loop {
            let op = match self.peek() {
                Some(Token::Op(s)) => match s.as_str() {
                    "=" => BinOp::Eq,
                    "<>" => BinOp::Ne,
                    "<" => BinOp::Lt,
                    ">" => BinOp::Gt,
                    "<=" => BinOp::Le,
                    ">=" => BinOp::Ge,
                    _ => break,
                },
                _ => break,
            };
            self.advance();
            let right = self.parse_concat()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    /// `&` string concatenation.
    fn parse_concat(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;
        while self.peek_op("&") {
            self.advance();
            let right = self.parse_additive()?;
            left = Expr::Binary(BinOp::Concat, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    /// `+ -`
    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = if self.peek_op("+") {
                BinOp::Add
            } else if self.peek_op("-") {
                BinOp::Sub
            } else {
                break;
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    /// `* /` — highest-precedence binary operators.
    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = if self.peek_op("*") {
                BinOp::Mul
            } else if self.peek_op("/") {
                BinOp::Div
            } else {
                break;
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.peek_op("-") {
            self.advance();
            let inner = self.parse_unary()?;
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Str(s)) => Ok(Expr::Str(s)),
            Some(Token::LParen) => {
                let e = self.parse_logical()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(e),
                    _ => Err(ParseError::UnexpectedEndOfExpression { line: self.line }),
                }
            }
            Some(Token::Ident(name)) => self.parse_var_ref_tail(name),
            _ => Err(ParseError::UnexpectedEndOfExpression { line: self.line }),
        }
    }

    fn parse_var_ref_tail(&mut self, name: String) -> Result<Expr, ParseError> {
        let base = name.strip_prefix('$').unwrap_or(&name).to_string();

        let mut subscripts = Vec::new();
        while matches!(self.peek(), Some(Token::LBracket)) {
            self.advance();
            let e = self.parse_logical()?;
            self.expect_rbracket()?;
            subscripts.push(e);
        }

        let mut accessors = Vec::new();
        while matches!(self.peek(), Some(Token::Dot)) {
            self.advance();
            let field = match self.advance() {
                Some(Token::Ident(f)) => f,
                _ => return Err(ParseError::ExpectedVariable { line: self.line }),
            };
            if matches!(self.peek(), Some(Token::LBracket)) {
                self.advance();
                let e = self.parse_logical()?;
                self.expect_rbracket()?;
                accessors.push(Accessor::FieldIndex(field, Box::new(e)));
            } else {
                accessors.push(Accessor::Field(field));
            }
        }

        Ok(Expr::Var(VarRef { base, subscripts, accessors }))
    }

    fn expect_rbracket(&mut self) -> Result<(), ParseError> {
        match self.advance() {
            Some(Token::RBracket) => Ok(()),
            _ => Err(ParseError::UnexpectedEndOfExpression { line: self.line }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_label_line() {
        let stmt = parse_line(":Loop", 1).unwrap().unwrap();
        assert_eq!(stmt, RawStmt::Label { name: "Loop".into(), line: 1 });
    }

    #[test]
    fn parses_call_with_multiple_args() {
        let stmt = parse_line("add depth 1", 2).unwrap().unwrap();
        match stmt {
            RawStmt::Call { command, args, .. } => {
                assert_eq!(command, "add");
                assert_eq!(args.len(), 2);
                assert_eq!(args[0], Expr::Var(VarRef::simple("depth")));
                assert_eq!(args[1], Expr::Number(1.0));
            }
            other => panic!("expected Call, got {other:?}"),
        }
    }

    #[test]
    fn parses_if_condition_across_whitespace() {
        let stmt = parse_line("if $x > 5 and $y < 10", 3).unwrap().unwrap();
        assert!(matches!(stmt, RawStmt::If { .. }));
    }

    #[test]
    fn parses_dotted_accessor_and_subscript() {
        let stmt = parse_line("getWord $s.port.class dest 1", 4).unwrap().unwrap();
        match stmt {
            RawStmt::Call { args, .. } => match &args[0] {
                Expr::Var(v) => {
                    assert_eq!(v.base, "s");
                    assert_eq!(v.accessors.len(), 2);
                }
                other => panic!("expected Var, got {other:?}"),
            },
            other => panic!("expected Call, got {other:?}"),
        }
    }

    #[test]
    fn parses_assignment_form() {
        let stmt = parse_line("$total = price * qty", 5).unwrap().unwrap();
        assert!(matches!(stmt, RawStmt::Assign { .. }));
    }

    #[test]
    fn parenthesized_expression_is_a_single_argument() {
        let stmt = parse_line("add total (price * qty)", 6).unwrap().unwrap();
        match stmt {
            RawStmt::Call { args, .. } => {
                assert_eq!(args.len(), 2);
                assert!(matches!(args[1], Expr::Binary(BinOp::Mul, _, _)));
            }
            other => panic!("expected Call, got {other:?}"),
        }
    }

    #[test]
    fn blank_and_comment_only_lines_are_none() {
        assert_eq!(parse_line("   ", 1).unwrap(), None);
        assert_eq!(parse_line("# just a comment", 1).unwrap(), None);
    }
}
