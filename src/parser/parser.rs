//! Recursive-descent parser building the Opal AST and declaration tables.

use super::ast::*;
use super::lexer::{Token, TokenKind};
use super::ParseError;

/// The parser consumes the token stream and produces a [`Program`].
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    structs: StructRegistry,
    functions: FunctionRegistry,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Parser {
        Parser {
            tokens,
            pos: 0,
            structs: StructRegistry::new(),
            functions: FunctionRegistry::new(),
        }
    }

    /// Parse a whole program: top-level `fn`/`struct` declarations are
    /// collected into the registries, everything else into the statement
    /// list.
    pub fn parse_program(mut self) -> Result<Program, ParseError> {
        let mut statements = Vec::new();

        while !self.at_end() {
            match self.peek_kind() {
                Some(TokenKind::Fn) => self.parse_fn_decl()?,
                Some(TokenKind::Struct) => self.parse_struct_decl()?,
                _ => statements.push(self.parse_statement()?),
            }
        }

        Ok(Program {
            statements,
            structs: self.structs,
            functions: self.functions,
        })
    }

    // ---- Declarations ----------------------------------------------------

    fn parse_fn_decl(&mut self) -> Result<(), ParseError> {
        self.expect(&TokenKind::Fn)?;
        let (name, line) = self.expect_ident()?;
        self.expect(&TokenKind::LParen)?;

        let mut params: Vec<String> = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                let (param, param_line) = self.expect_ident()?;
                if params.contains(&param) {
                    return Err(ParseError::DuplicateParameter {
                        name: param,
                        line: param_line,
                    });
                }
                params.push(param);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen)?;

        let body = self.parse_block()?;
        let declared = self.functions.declare(UserFunction { name: name.clone(), params, body });
        if !declared {
            return Err(ParseError::DuplicateFunction { name, line });
        }
        Ok(())
    }

    fn parse_struct_decl(&mut self) -> Result<(), ParseError> {
        self.expect(&TokenKind::Struct)?;
        let (name, line) = self.expect_ident()?;
        self.expect(&TokenKind::LBrace)?;

        let mut members = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            let (member, _) = self.expect_ident()?;
            self.expect(&TokenKind::Semi)?;
            members.push(member);
        }
        self.expect(&TokenKind::RBrace)?;

        if !self.structs.declare(&name, members) {
            return Err(ParseError::DuplicateStruct { name, line });
        }
        Ok(())
    }

    // ---- Statements ------------------------------------------------------

    fn parse_statement(&mut self) -> Result<Ast, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::LBrace) => self.parse_block(),
            Some(TokenKind::Let) => {
                let decl = self.parse_let()?;
                self.expect(&TokenKind::Semi)?;
                Ok(decl)
            }
            Some(TokenKind::If) => self.parse_if(),
            Some(TokenKind::While) => self.parse_while(),
            Some(TokenKind::Do) => self.parse_do_while(),
            Some(TokenKind::For) => self.parse_for(),
            Some(TokenKind::Foreach) => self.parse_foreach(),
            Some(TokenKind::Return) => self.parse_return(),
            Some(TokenKind::Unset) => self.parse_unset(),
            Some(TokenKind::Fn) => Err(ParseError::NotTopLevel {
                keyword: "fn",
                line: self.current_line(),
            }),
            Some(TokenKind::Struct) => Err(ParseError::NotTopLevel {
                keyword: "struct",
                line: self.current_line(),
            }),
            _ => {
                let stmt = self.parse_expr_or_assign()?;
                self.expect(&TokenKind::Semi)?;
                Ok(stmt)
            }
        }
    }

    /// `{ statement* }` as a statement-list node.
    fn parse_block(&mut self) -> Result<Ast, ParseError> {
        self.expect(&TokenKind::LBrace)?;
        let mut statements = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            if self.at_end() {
                return Err(ParseError::UnexpectedEof {
                    expected: "'}'".to_string(),
                });
            }
            statements.push(self.parse_statement()?);
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(Ast::StatementList { statements })
    }

    /// `let target = expr` without the trailing semicolon. The target is a
    /// general postfix expression; the evaluator rejects non-identifier
    /// targets so that illegal lvalues stay runtime failures.
    fn parse_let(&mut self) -> Result<Ast, ParseError> {
        self.expect(&TokenKind::Let)?;
        let target = self.parse_postfix()?;
        self.expect(&TokenKind::Eq)?;
        let init = self.parse_expr()?;
        Ok(Ast::Declare {
            target: Box::new(target),
            init: Box::new(init),
        })
    }

    fn parse_if(&mut self) -> Result<Ast, ParseError> {
        self.expect(&TokenKind::If)?;
        self.expect(&TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(&TokenKind::RParen)?;
        let body = self.parse_statement()?;

        let if_node = Ast::If {
            cond: Box::new(cond),
            body: Box::new(body),
        };

        if self.eat(&TokenKind::Else) {
            let else_body = self.parse_statement()?;
            Ok(Ast::IfElse {
                if_branch: Box::new(if_node),
                else_body: Box::new(else_body),
            })
        } else {
            Ok(if_node)
        }
    }

    fn parse_while(&mut self) -> Result<Ast, ParseError> {
        self.expect(&TokenKind::While)?;
        self.expect(&TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(&TokenKind::RParen)?;
        let body = self.parse_statement()?;
        Ok(Ast::While {
            cond: Box::new(cond),
            body: Box::new(body),
        })
    }

    fn parse_do_while(&mut self) -> Result<Ast, ParseError> {
        self.expect(&TokenKind::Do)?;
        let body = self.parse_statement()?;
        self.expect(&TokenKind::While)?;
        self.expect(&TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(&TokenKind::RParen)?;
        self.expect(&TokenKind::Semi)?;
        Ok(Ast::DoWhile {
            body: Box::new(body),
            cond: Box::new(cond),
        })
    }

    fn parse_for(&mut self) -> Result<Ast, ParseError> {
        self.expect(&TokenKind::For)?;
        self.expect(&TokenKind::LParen)?;
        let init = self.parse_simple()?;
        self.expect(&TokenKind::Semi)?;
        let cond = self.parse_expr()?;
        self.expect(&TokenKind::Semi)?;
        let step = self.parse_simple()?;
        self.expect(&TokenKind::RParen)?;
        let body = self.parse_statement()?;
        Ok(Ast::For {
            init: Box::new(init),
            cond: Box::new(cond),
            step: Box::new(step),
            body: Box::new(body),
        })
    }

    fn parse_foreach(&mut self) -> Result<Ast, ParseError> {
        self.expect(&TokenKind::Foreach)?;
        self.expect(&TokenKind::LParen)?;
        let (var, _) = self.expect_ident()?;
        self.expect(&TokenKind::In)?;
        let iter = self.parse_expr()?;
        self.expect(&TokenKind::RParen)?;
        let body = self.parse_statement()?;
        Ok(Ast::Foreach {
            var,
            iter: Box::new(iter),
            body: Box::new(body),
        })
    }

    fn parse_return(&mut self) -> Result<Ast, ParseError> {
        self.expect(&TokenKind::Return)?;
        let expr = if self.check(&TokenKind::Semi) {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };
        self.expect(&TokenKind::Semi)?;
        Ok(Ast::Return { expr })
    }

    fn parse_unset(&mut self) -> Result<Ast, ParseError> {
        self.expect(&TokenKind::Unset)?;
        let target = self.parse_postfix()?;
        self.expect(&TokenKind::Semi)?;
        Ok(Ast::Unset {
            target: Box::new(target),
        })
    }

    /// A semicolon-less simple statement for `for` headers: a declaration,
    /// an assignment, or a bare expression.
    fn parse_simple(&mut self) -> Result<Ast, ParseError> {
        if self.check(&TokenKind::Let) {
            self.parse_let()
        } else {
            self.parse_expr_or_assign()
        }
    }

    /// An expression, turned into an assignment when followed by `=`.
    fn parse_expr_or_assign(&mut self) -> Result<Ast, ParseError> {
        let expr = self.parse_expr()?;
        if self.eat(&TokenKind::Eq) {
            let value = self.parse_expr()?;
            return Ok(Ast::Assign {
                target: Box::new(expr),
                value: Box::new(value),
            });
        }
        Ok(expr)
    }

    // ---- Expressions -----------------------------------------------------

    fn parse_expr(&mut self) -> Result<Ast, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Ast, ParseError> {
        let mut lhs = self.parse_and()?;
        while self.eat(&TokenKind::OrOr) {
            let rhs = self.parse_and()?;
            lhs = binary(BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Ast, ParseError> {
        let mut lhs = self.parse_equality()?;
        while self.eat(&TokenKind::AndAnd) {
            let rhs = self.parse_equality()?;
            lhs = binary(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Ast, ParseError> {
        let mut lhs = self.parse_comparison()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::EqEq) => BinaryOp::Eq,
                Some(TokenKind::BangEq) => BinaryOp::NotEq,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_comparison()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> Result<Ast, ParseError> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Lt) => BinaryOp::Lt,
                Some(TokenKind::LtEq) => BinaryOp::LtEq,
                Some(TokenKind::Gt) => BinaryOp::Gt,
                Some(TokenKind::GtEq) => BinaryOp::GtEq,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_additive()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Ast, ParseError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Ast, ParseError> {
        let mut lhs = self.parse_type_op()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => BinaryOp::Mul,
                Some(TokenKind::Slash) => BinaryOp::Div,
                Some(TokenKind::Percent) => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_type_op()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    /// `expr as type` / `expr is type`. The type name stays a string here;
    /// unknown names fail at evaluation time.
    fn parse_type_op(&mut self) -> Result<Ast, ParseError> {
        let mut expr = self.parse_power()?;
        loop {
            if self.eat(&TokenKind::As) {
                let (ty, _) = self.expect_ident()?;
                expr = Ast::Cast {
                    expr: Box::new(expr),
                    ty,
                };
            } else if self.eat(&TokenKind::Is) {
                let (ty, _) = self.expect_ident()?;
                expr = Ast::TypeCheck {
                    expr: Box::new(expr),
                    ty,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_power(&mut self) -> Result<Ast, ParseError> {
        let lhs = self.parse_unary()?;
        if self.eat(&TokenKind::StarStar) {
            // Right-associative
            let rhs = self.parse_power()?;
            return Ok(binary(BinaryOp::Pow, lhs, rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Ast, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::Bang) => {
                self.advance();
                let expr = self.parse_unary()?;
                Ok(Ast::Not {
                    expr: Box::new(expr),
                })
            }
            Some(TokenKind::PlusPlus) => {
                self.advance();
                let target = self.parse_postfix()?;
                Ok(Ast::IncDec {
                    op: IncDecOp::PreInc,
                    target: Box::new(target),
                })
            }
            Some(TokenKind::MinusMinus) => {
                self.advance();
                let target = self.parse_postfix()?;
                Ok(Ast::IncDec {
                    op: IncDecOp::PreDec,
                    target: Box::new(target),
                })
            }
            Some(TokenKind::Minus) => {
                // No general negation operator; fold a leading minus into a
                // numeric literal.
                self.advance();
                match self.peek_kind().cloned() {
                    Some(TokenKind::IntLit(n)) => {
                        self.advance();
                        Ok(Ast::Literal {
                            value: Literal::Int(-n),
                        })
                    }
                    Some(TokenKind::FloatLit(v)) => {
                        self.advance();
                        Ok(Ast::Literal {
                            value: Literal::Float(-v),
                        })
                    }
                    _ => Err(self.unexpected("a numeric literal after '-'")),
                }
            }
            _ => self.parse_postfix(),
        }
    }

    /// Postfix chain: indexing, member access, post-increment/decrement.
    fn parse_postfix(&mut self) -> Result<Ast, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek_kind() {
                Some(TokenKind::LBracket) => {
                    self.advance();
                    if self.eat(&TokenKind::RBracket) {
                        // `expr[]` -- the append sentinel
                        expr = Ast::ArrayAccess {
                            base: Box::new(expr),
                            index: None,
                        };
                    } else {
                        let index = self.parse_expr()?;
                        self.expect(&TokenKind::RBracket)?;
                        expr = Ast::ArrayAccess {
                            base: Box::new(expr),
                            index: Some(Box::new(index)),
                        };
                    }
                }
                Some(TokenKind::Dot) => {
                    self.advance();
                    let (member, _) = self.expect_ident()?;
                    expr = Ast::StructAccess {
                        base: Box::new(expr),
                        member,
                    };
                }
                Some(TokenKind::PlusPlus) => {
                    self.advance();
                    expr = Ast::IncDec {
                        op: IncDecOp::PostInc,
                        target: Box::new(expr),
                    };
                }
                Some(TokenKind::MinusMinus) => {
                    self.advance();
                    expr = Ast::IncDec {
                        op: IncDecOp::PostDec,
                        target: Box::new(expr),
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Ast, ParseError> {
        match self.peek_kind().cloned() {
            Some(TokenKind::IntLit(n)) => {
                self.advance();
                Ok(Ast::Literal {
                    value: Literal::Int(n),
                })
            }
            Some(TokenKind::FloatLit(v)) => {
                self.advance();
                Ok(Ast::Literal {
                    value: Literal::Float(v),
                })
            }
            Some(TokenKind::StrLit(s)) => {
                self.advance();
                Ok(Ast::Literal {
                    value: Literal::Str(s),
                })
            }
            Some(TokenKind::True) => {
                self.advance();
                Ok(Ast::Literal {
                    value: Literal::Bool(true),
                })
            }
            Some(TokenKind::False) => {
                self.advance();
                Ok(Ast::Literal {
                    value: Literal::Bool(false),
                })
            }
            Some(TokenKind::Ident(name)) => {
                self.advance();
                if self.eat(&TokenKind::LParen) {
                    let args = self.parse_args()?;
                    Ok(Ast::Call { name, args })
                } else {
                    Ok(Ast::Identifier { name })
                }
            }
            Some(TokenKind::LParen) => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                Ok(expr)
            }
            Some(TokenKind::LBracket) => {
                self.advance();
                let mut elements = Vec::new();
                while !self.check(&TokenKind::RBracket) {
                    elements.push(self.parse_expr()?);
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(&TokenKind::RBracket)?;
                Ok(Ast::ArrayLit { elements })
            }
            Some(TokenKind::Len) => {
                self.advance();
                self.expect(&TokenKind::LParen)?;
                let expr = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                Ok(Ast::Len {
                    expr: Box::new(expr),
                })
            }
            Some(TokenKind::Typeof) => {
                self.advance();
                self.expect(&TokenKind::LParen)?;
                let expr = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                Ok(Ast::Typeof {
                    expr: Box::new(expr),
                })
            }
            Some(TokenKind::New) => {
                self.advance();
                let (name, _) = self.expect_ident()?;
                Ok(Ast::New { name })
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn parse_args(&mut self) -> Result<Vec<Ast>, ParseError> {
        let mut args = Vec::new();
        while !self.check(&TokenKind::RParen) {
            args.push(self.parse_expr()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(args)
    }

    // ---- Token stream helpers --------------------------------------------

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn current_line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.line)
            .unwrap_or(1)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    /// Consume the token when it matches, reporting whether it did.
    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), ParseError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.unexpected(&kind.describe()))
        }
    }

    fn expect_ident(&mut self) -> Result<(String, usize), ParseError> {
        match self.tokens.get(self.pos) {
            Some(Token {
                kind: TokenKind::Ident(name),
                line,
            }) => {
                let result = (name.clone(), *line);
                self.advance();
                Ok(result)
            }
            _ => Err(self.unexpected("an identifier")),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.tokens.get(self.pos) {
            Some(token) => ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: token.kind.describe(),
                line: token.line,
            },
            None => ParseError::UnexpectedEof {
                expected: expected.to_string(),
            },
        }
    }
}

fn binary(op: BinaryOp, lhs: Ast, rhs: Ast) -> Ast {
    Ast::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}
