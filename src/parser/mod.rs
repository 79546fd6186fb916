//=====================================================
// File: parser/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: FSK recursive descent parser
// Objective: Build the statement/expression tree the evaluator walks,
//            desugaring `for` loops and re-parsing template interpolations
//=====================================================

use crate::ast::{
    ArrayElement, ArrayPatternElement, BinaryOp, ClassDecl, Expr, FunctionDecl, Literal,
    LogicalOp, MatchArm, Param, Pattern, Program, Stmt, TemplatePart, UnaryOp,
};
use crate::tokenizer::{Position, TemplateChunk, Token, TokenKind, Tokenizer};
use std::rc::Rc;

/// Parser error types
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    UnexpectedToken {
        expected: String,
        found: TokenKind,
        position: Position,
    },
    UnexpectedEndOfInput {
        expected: String,
        position: Position,
    },
    InvalidSyntax {
        message: String,
        position: Position,
    },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::UnexpectedToken {
                expected,
                found,
                position,
            } => write!(
                f,
                "Expected {} but found '{}' at line {}, column {}",
                expected, found, position.line, position.column
            ),
            ParseError::UnexpectedEndOfInput { expected, position } => write!(
                f,
                "Unexpected end of input, expected {} at line {}, column {}",
                expected, position.line, position.column
            ),
            ParseError::InvalidSyntax { message, position } => write!(
                f,
                "Invalid syntax: {} at line {}, column {}",
                message, position.line, position.column
            ),
        }
    }
}

impl std::error::Error for ParseError {}

/// Tokenize and parse in one step; tokenizer failures surface as `InvalidSyntax`.
pub fn parse_source(source: &str) -> Result<Program, ParseError> {
    let tokens = Tokenizer::new(source)
        .tokenize()
        .map_err(|message| ParseError::InvalidSyntax {
            message,
            position: Position::new(1, 1, 0),
        })?;
    Parser::new(tokens).parse()
}

/// Recursive descent parser for FSK
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !matches!(tokens.last(), Some(token) if token.kind == TokenKind::Eof) {
            let position = tokens.last().map(|t| t.position).unwrap_or_default();
            tokens.push(Token::new(TokenKind::Eof, position));
        }
        Self { tokens, current: 0 }
    }

    /// Parse a complete FSK program
    pub fn parse(&mut self) -> Result<Program, ParseError> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }
        Ok(Program::new(statements))
    }

    //=================================================
    // Statements
    //=================================================

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        match &self.peek().kind {
            TokenKind::Let => {
                self.advance();
                self.parse_let(position)
            }
            TokenKind::Const => {
                self.advance();
                self.parse_const(position)
            }
            TokenKind::Fn if self.peek_kind(1) != Some(&TokenKind::LeftParen) => {
                self.parse_function_declaration(false)
            }
            TokenKind::Async if self.peek_kind(1) == Some(&TokenKind::Fn) => {
                self.advance();
                self.parse_function_declaration(true)
            }
            TokenKind::Class => self.parse_class_declaration(),
            TokenKind::LeftBrace => self.parse_block_statement(),
            TokenKind::If => self.parse_if_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::Return => {
                self.advance();
                let value = if self.at_statement_end() {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.consume_statement_terminator();
                Ok(Stmt::Return { value, position })
            }
            TokenKind::Throw => {
                self.advance();
                let value = self.parse_expression()?;
                self.consume_statement_terminator();
                Ok(Stmt::Throw { value, position })
            }
            TokenKind::Print => {
                self.advance();
                let expr = self.parse_expression()?;
                self.consume_statement_terminator();
                Ok(Stmt::Print { expr, position })
            }
            TokenKind::Import => {
                self.advance();
                let path = self.parse_expression()?;
                self.consume_statement_terminator();
                Ok(Stmt::Import { path, position })
            }
            TokenKind::Try => self.parse_try_statement(),
            TokenKind::Match => self.parse_match_statement(),
            TokenKind::Break => {
                self.advance();
                self.consume_statement_terminator();
                Ok(Stmt::Break { position })
            }
            TokenKind::Continue => {
                self.advance();
                self.consume_statement_terminator();
                Ok(Stmt::Continue { position })
            }
            _ => {
                let expr = self.parse_expression()?;
                self.consume_statement_terminator();
                Ok(Stmt::Expression { expr, position })
            }
        }
    }

    /// `let pattern [: type] [= value]`
    fn parse_let(&mut self, position: Position) -> Result<Stmt, ParseError> {
        let pattern = self.parse_binding_pattern()?;
        let type_hint = if self.match_kind(&TokenKind::Colon) {
            Some(self.parse_type_name()?)
        } else {
            None
        };
        let initializer = if self.match_kind(&TokenKind::Equal) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.consume_statement_terminator();
        Ok(Stmt::Let {
            pattern,
            type_hint,
            initializer,
            position,
        })
    }

    fn parse_const(&mut self, position: Position) -> Result<Stmt, ParseError> {
        let pattern = self.parse_binding_pattern()?;
        if self.match_kind(&TokenKind::Colon) {
            self.parse_type_name()?;
        }
        if !self.match_kind(&TokenKind::Equal) {
            return Err(ParseError::InvalidSyntax {
                message: "const bindings require an initializer".to_string(),
                position: self.current_position(),
            });
        }
        let initializer = self.parse_expression()?;
        self.consume_statement_terminator();
        Ok(Stmt::Const {
            pattern,
            initializer,
            position,
        })
    }

    /// `fn name(params) [-> Type] { body }`
    fn parse_function_declaration(&mut self, is_async: bool) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.consume(&TokenKind::Fn, "'fn'")?;
        let name = self.consume_identifier()?;
        let decl = self.parse_function_rest(name, is_async, position)?;
        Ok(Stmt::Function {
            decl: Rc::new(decl),
        })
    }

    fn parse_function_rest(
        &mut self,
        name: String,
        is_async: bool,
        position: Position,
    ) -> Result<FunctionDecl, ParseError> {
        self.consume(&TokenKind::LeftParen, "'(' before parameters")?;
        let params = self.parse_parameters()?;
        let return_type = if self.match_kind(&TokenKind::Arrow) {
            Some(self.parse_type_name()?)
        } else {
            None
        };
        let body = self.parse_block_body()?;
        Ok(FunctionDecl {
            name,
            params,
            body,
            is_async,
            return_type,
            position,
        })
    }

    // Assumes the opening `(` is consumed; consumes the closing `)`.
    fn parse_parameters(&mut self) -> Result<Vec<Param>, ParseError> {
        let mut params = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                let pattern = self.parse_binding_pattern()?;
                if self.match_kind(&TokenKind::Colon) {
                    self.parse_type_name()?;
                }
                let default = if self.match_kind(&TokenKind::Equal) {
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                params.push(Param { pattern, default });
                if !self.match_kind(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(&TokenKind::RightParen, "')' after parameters")?;
        Ok(params)
    }

    /// `class Name [< Super] { method(params) { } ... }`
    fn parse_class_declaration(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.consume(&TokenKind::Class, "'class'")?;
        let name = self.consume_identifier()?;

        let superclass = if self.match_kind(&TokenKind::Less) {
            let super_position = self.current_position();
            let super_name = self.consume_identifier()?;
            Some(Expr::Variable {
                name: super_name,
                position: super_position,
            })
        } else {
            None
        };

        self.consume(&TokenKind::LeftBrace, "'{' before class body")?;
        let mut methods = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            let is_async = self.match_kind(&TokenKind::Async);
            self.match_kind(&TokenKind::Fn);
            let method_position = self.current_position();
            let method_name = self.consume_identifier()?;
            let decl = self.parse_function_rest(method_name, is_async, method_position)?;
            methods.push(Rc::new(decl));
        }
        self.consume(&TokenKind::RightBrace, "'}' after class body")?;

        Ok(Stmt::Class {
            decl: ClassDecl {
                name,
                superclass,
                methods,
                position,
            },
        })
    }

    fn parse_block_statement(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        let statements = self.parse_block_body()?;
        Ok(Stmt::Block {
            statements,
            position,
        })
    }

    fn parse_block_body(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.consume(&TokenKind::LeftBrace, "'{'")?;
        let mut statements = Vec::new();
        while !self.check(&TokenKind::RightBrace) {
            if self.is_at_end() {
                return Err(ParseError::UnexpectedEndOfInput {
                    expected: "'}'".to_string(),
                    position: self.current_position(),
                });
            }
            statements.push(self.parse_statement()?);
        }
        self.consume(&TokenKind::RightBrace, "'}'")?;
        Ok(statements)
    }

    fn parse_parenthesized_condition(&mut self, keyword: &str) -> Result<Expr, ParseError> {
        self.consume(&TokenKind::LeftParen, &format!("'(' after '{}'", keyword))?;
        let condition = self.parse_expression()?;
        self.consume(&TokenKind::RightParen, "')' after condition")?;
        Ok(condition)
    }

    fn parse_if_statement(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.consume(&TokenKind::If, "'if'")?;
        let condition = self.parse_parenthesized_condition("if")?;
        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.match_kind(&TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
            position,
        })
    }

    fn parse_while_statement(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.consume(&TokenKind::While, "'while'")?;
        let condition = self.parse_parenthesized_condition("while")?;
        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::While {
            condition,
            body,
            step: None,
            position,
        })
    }

    /// `for (init; cond; incr) body` becomes `{ init; while (cond) body /step incr/ }`.
    fn parse_for_statement(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.consume(&TokenKind::For, "'for'")?;
        self.consume(&TokenKind::LeftParen, "'(' after 'for'")?;

        let initializer = if self.match_kind(&TokenKind::Semicolon) {
            None
        } else if self.check(&TokenKind::Let) {
            let let_position = self.current_position();
            self.advance();
            Some(self.parse_let(let_position)?)
        } else {
            let expr_position = self.current_position();
            let expr = self.parse_expression()?;
            self.consume(&TokenKind::Semicolon, "';' after loop initializer")?;
            Some(Stmt::Expression {
                expr,
                position: expr_position,
            })
        };

        let condition = if self.check(&TokenKind::Semicolon) {
            Expr::Literal {
                value: Literal::Bool(true),
                position: self.current_position(),
            }
        } else {
            self.parse_expression()?
        };
        self.consume(&TokenKind::Semicolon, "';' after loop condition")?;

        let step = if self.check(&TokenKind::RightParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume(&TokenKind::RightParen, "')' after for clauses")?;

        let body = Box::new(self.parse_statement()?);
        let looped = Stmt::While {
            condition,
            body,
            step,
            position,
        };

        Ok(match initializer {
            Some(init) => Stmt::Block {
                statements: vec![init, looped],
                position,
            },
            None => looped,
        })
    }

    /// `try stmt catch (name) stmt`
    fn parse_try_statement(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.consume(&TokenKind::Try, "'try'")?;
        let body = Box::new(self.parse_statement()?);
        self.consume(&TokenKind::Catch, "'catch' after try body")?;
        self.consume(&TokenKind::LeftParen, "'(' after 'catch'")?;
        let catch_name = self.consume_identifier()?;
        self.consume(&TokenKind::RightParen, "')' after catch variable")?;
        let handler = Box::new(self.parse_statement()?);
        Ok(Stmt::Try {
            body,
            catch_name,
            handler,
            position,
        })
    }

    /// `match (expr) { pattern -> stmt ... }`
    fn parse_match_statement(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.consume(&TokenKind::Match, "'match'")?;
        let scrutinee = self.parse_parenthesized_condition("match")?;
        self.consume(&TokenKind::LeftBrace, "'{' before match arms")?;

        let mut arms = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            let pattern = self.parse_match_pattern()?;
            self.consume(&TokenKind::Arrow, "'->' after match pattern")?;
            let body = self.parse_statement()?;
            self.match_kind(&TokenKind::Comma);
            arms.push(MatchArm { pattern, body });
        }
        self.consume(&TokenKind::RightBrace, "'}' after match arms")?;

        Ok(Stmt::Match {
            scrutinee,
            arms,
            position,
        })
    }

    //=================================================
    // Patterns
    //=================================================

    fn parse_binding_pattern(&mut self) -> Result<Pattern, ParseError> {
        match &self.peek().kind {
            TokenKind::Identifier(_) => Ok(Pattern::Variable(self.consume_identifier()?)),
            TokenKind::LeftBracket => self.parse_array_pattern(Self::parse_binding_pattern),
            TokenKind::LeftBrace => self.parse_object_pattern(Self::parse_binding_pattern),
            _ => Err(self.unexpected("binding pattern")),
        }
    }

    fn parse_match_pattern(&mut self) -> Result<Pattern, ParseError> {
        let literal = match &self.peek().kind {
            TokenKind::Number(n) => Some(Literal::Number(*n)),
            TokenKind::String(s) => Some(Literal::String(s.clone())),
            TokenKind::True => Some(Literal::Bool(true)),
            TokenKind::False => Some(Literal::Bool(false)),
            TokenKind::Nil => Some(Literal::Nil),
            TokenKind::Minus => {
                if let Some(TokenKind::Number(n)) = self.peek_kind(1) {
                    let value = -*n;
                    self.advance();
                    Some(Literal::Number(value))
                } else {
                    None
                }
            }
            _ => None,
        };
        if let Some(literal) = literal {
            self.advance();
            return Ok(Pattern::Literal(literal));
        }

        match &self.peek().kind {
            TokenKind::Identifier(_) => Ok(Pattern::Variable(self.consume_identifier()?)),
            TokenKind::LeftBracket => self.parse_array_pattern(Self::parse_match_pattern),
            TokenKind::LeftBrace => self.parse_object_pattern(Self::parse_match_pattern),
            _ => Err(self.unexpected("match pattern")),
        }
    }

    fn parse_array_pattern(
        &mut self,
        element: fn(&mut Self) -> Result<Pattern, ParseError>,
    ) -> Result<Pattern, ParseError> {
        self.consume(&TokenKind::LeftBracket, "'['")?;
        let mut elements = Vec::new();
        while !self.check(&TokenKind::RightBracket) {
            let spread = self.match_kind(&TokenKind::Ellipsis);
            let pattern = element(self)?;
            elements.push(ArrayPatternElement { pattern, spread });
            if spread && !self.check(&TokenKind::RightBracket) {
                return Err(ParseError::InvalidSyntax {
                    message: "rest element must be last in an array pattern".to_string(),
                    position: self.current_position(),
                });
            }
            if !self.match_kind(&TokenKind::Comma) {
                break;
            }
        }
        self.consume(&TokenKind::RightBracket, "']' after array pattern")?;
        Ok(Pattern::Array(elements))
    }

    fn parse_object_pattern(
        &mut self,
        element: fn(&mut Self) -> Result<Pattern, ParseError>,
    ) -> Result<Pattern, ParseError> {
        self.consume(&TokenKind::LeftBrace, "'{'")?;
        let mut fields = Vec::new();
        while !self.check(&TokenKind::RightBrace) {
            let key = self.consume_property_name()?;
            let pattern = if self.match_kind(&TokenKind::Colon) {
                element(self)?
            } else {
                Pattern::Variable(key.clone())
            };
            fields.push((key, pattern));
            if !self.match_kind(&TokenKind::Comma) {
                break;
            }
        }
        self.consume(&TokenKind::RightBrace, "'}' after object pattern")?;
        Ok(Pattern::Object(fields))
    }

    //=================================================
    // Expressions
    //=================================================

    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_pipe()?;

        if self.check(&TokenKind::Equal) {
            let position = self.current_position();
            self.advance();
            let value = Box::new(self.parse_assignment()?);
            return match expr {
                Expr::Variable { name, .. } => Ok(Expr::Assign {
                    name,
                    value,
                    position,
                }),
                Expr::Get { object, name, .. } => Ok(Expr::Set {
                    object,
                    name,
                    value,
                    position,
                }),
                Expr::Index { object, index, .. } => Ok(Expr::IndexSet {
                    object,
                    index,
                    value,
                    position,
                }),
                _ => Err(ParseError::InvalidSyntax {
                    message: "Invalid assignment target".to_string(),
                    position,
                }),
            };
        }

        Ok(expr)
    }

    fn parse_pipe(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_coalesce()?;
        while self.check(&TokenKind::PipeGreater) {
            let position = self.current_position();
            self.advance();
            let right = self.parse_coalesce()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op: BinaryOp::Pipe,
                right: Box::new(right),
                position,
            };
        }
        Ok(expr)
    }

    fn parse_logical(
        &mut self,
        kinds: &[TokenKind],
        op: LogicalOp,
        next: fn(&mut Self) -> Result<Expr, ParseError>,
    ) -> Result<Expr, ParseError> {
        let mut expr = next(self)?;
        while kinds.iter().any(|kind| self.check(kind)) {
            let position = self.current_position();
            self.advance();
            let right = next(self)?;
            expr = Expr::Logical {
                left: Box::new(expr),
                op,
                right: Box::new(right),
                position,
            };
        }
        Ok(expr)
    }

    fn parse_coalesce(&mut self) -> Result<Expr, ParseError> {
        self.parse_logical(
            &[TokenKind::QuestionQuestion],
            LogicalOp::Coalesce,
            Self::parse_logical_or,
        )
    }

    fn parse_logical_or(&mut self) -> Result<Expr, ParseError> {
        self.parse_logical(
            &[TokenKind::Or, TokenKind::PipePipe],
            LogicalOp::Or,
            Self::parse_logical_and,
        )
    }

    fn parse_logical_and(&mut self) -> Result<Expr, ParseError> {
        self.parse_logical(
            &[TokenKind::And, TokenKind::AmpAmp],
            LogicalOp::And,
            Self::parse_equality,
        )
    }

    fn parse_binary(
        &mut self,
        table: &[(TokenKind, BinaryOp)],
        next: fn(&mut Self) -> Result<Expr, ParseError>,
    ) -> Result<Expr, ParseError> {
        let mut expr = next(self)?;
        while let Some(op) = self.match_binary_op(table) {
            let position = self.previous().position;
            let right = next(self)?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
                position,
            };
        }
        Ok(expr)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary(
            &[
                (TokenKind::EqualEqual, BinaryOp::Equal),
                (TokenKind::BangEqual, BinaryOp::NotEqual),
            ],
            Self::parse_comparison,
        )
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary(
            &[
                (TokenKind::Less, BinaryOp::Less),
                (TokenKind::LessEqual, BinaryOp::LessEqual),
                (TokenKind::Greater, BinaryOp::Greater),
                (TokenKind::GreaterEqual, BinaryOp::GreaterEqual),
            ],
            Self::parse_term,
        )
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary(
            &[
                (TokenKind::Plus, BinaryOp::Add),
                (TokenKind::Minus, BinaryOp::Subtract),
            ],
            Self::parse_factor,
        )
    }

    fn parse_factor(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary(
            &[
                (TokenKind::Star, BinaryOp::Multiply),
                (TokenKind::Slash, BinaryOp::Divide),
                (TokenKind::Percent, BinaryOp::Modulo),
            ],
            Self::parse_unary,
        )
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let position = self.current_position();
        let op = match self.peek().kind {
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Minus => Some(UnaryOp::Negate),
            TokenKind::Await => {
                self.advance();
                let expr = Box::new(self.parse_unary()?);
                return Ok(Expr::Await { expr, position });
            }
            TokenKind::New => {
                self.advance();
                return self.parse_unary();
            }
            _ => None,
        };

        match op {
            Some(op) => {
                self.advance();
                let operand = Box::new(self.parse_unary()?);
                Ok(Expr::Unary {
                    op,
                    operand,
                    position,
                })
            }
            None => self.parse_call(),
        }
    }

    fn parse_call(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;

        loop {
            let position = self.current_position();
            match self.peek().kind {
                TokenKind::LeftParen => {
                    self.advance();
                    let mut args = Vec::new();
                    if !self.check(&TokenKind::RightParen) {
                        loop {
                            args.push(self.parse_expression()?);
                            if !self.match_kind(&TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.consume(&TokenKind::RightParen, "')' after arguments")?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                        position,
                    };
                }
                TokenKind::Dot | TokenKind::QuestionDot => {
                    let optional = self.peek().kind == TokenKind::QuestionDot;
                    self.advance();
                    let name = self.consume_property_name()?;
                    expr = Expr::Get {
                        object: Box::new(expr),
                        name,
                        optional,
                        position,
                    };
                }
                TokenKind::LeftBracket => {
                    self.advance();
                    let index = Box::new(self.parse_expression()?);
                    self.consume(&TokenKind::RightBracket, "']' after index")?;
                    expr = Expr::Index {
                        object: Box::new(expr),
                        index,
                        position,
                    };
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let position = self.current_position();
        let token = self.peek().clone();

        let literal = |value| Expr::Literal { value, position };

        match token.kind {
            TokenKind::Number(n) => {
                self.advance();
                Ok(literal(Literal::Number(n)))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(literal(Literal::String(s)))
            }
            TokenKind::True => {
                self.advance();
                Ok(literal(Literal::Bool(true)))
            }
            TokenKind::False => {
                self.advance();
                Ok(literal(Literal::Bool(false)))
            }
            TokenKind::Nil => {
                self.advance();
                Ok(literal(Literal::Nil))
            }
            TokenKind::Template(chunks) => {
                self.advance();
                self.parse_template(chunks, position)
            }
            TokenKind::This => {
                self.advance();
                Ok(Expr::This { position })
            }
            TokenKind::Super => {
                self.advance();
                self.consume(&TokenKind::Dot, "'.' after 'super'")?;
                let method = self.consume_identifier()?;
                Ok(Expr::Super { method, position })
            }
            TokenKind::Identifier(name) => {
                if self.peek_kind(1) == Some(&TokenKind::FatArrow) {
                    self.advance();
                    self.advance();
                    let params = vec![Param {
                        pattern: Pattern::Variable(name),
                        default: None,
                    }];
                    return self.parse_arrow_body(params, position);
                }
                self.advance();
                Ok(Expr::Variable { name, position })
            }
            TokenKind::LeftParen => {
                if self.is_arrow_function_ahead() {
                    self.advance();
                    let params = self.parse_parameters()?;
                    self.consume(&TokenKind::FatArrow, "'=>' after arrow parameters")?;
                    return self.parse_arrow_body(params, position);
                }
                self.advance();
                let expr = Box::new(self.parse_expression()?);
                self.consume(&TokenKind::RightParen, "')' after expression")?;
                Ok(Expr::Grouping { expr, position })
            }
            TokenKind::LeftBracket => self.parse_array_literal(),
            TokenKind::LeftBrace => self.parse_object_literal(),
            TokenKind::Fn | TokenKind::Async => {
                let is_async = self.match_kind(&TokenKind::Async);
                self.consume(&TokenKind::Fn, "'fn'")?;
                let decl = self.parse_function_rest(String::new(), is_async, position)?;
                Ok(Expr::Function {
                    decl: Rc::new(decl),
                })
            }
            TokenKind::Eof => Err(ParseError::UnexpectedEndOfInput {
                expected: "expression".to_string(),
                position,
            }),
            _ => Err(self.unexpected("expression")),
        }
    }

    fn parse_arrow_body(&mut self, params: Vec<Param>, position: Position) -> Result<Expr, ParseError> {
        let body = if self.check(&TokenKind::LeftBrace) {
            self.parse_block_body()?
        } else {
            let value_position = self.current_position();
            let value = self.parse_assignment()?;
            vec![Stmt::Return {
                value: Some(value),
                position: value_position,
            }]
        };
        Ok(Expr::Function {
            decl: Rc::new(FunctionDecl {
                name: String::new(),
                params,
                body,
                is_async: false,
                return_type: None,
                position,
            }),
        })
    }

    // Scans to the `)` matching the current `(` and checks for a following `=>`.
    fn is_arrow_function_ahead(&self) -> bool {
        let mut depth = 0usize;
        for (offset, token) in self.tokens[self.current..].iter().enumerate() {
            match token.kind {
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => {
                    depth -= 1;
                    if depth == 0 {
                        return self.peek_kind(offset + 1) == Some(&TokenKind::FatArrow);
                    }
                }
                TokenKind::Eof => return false,
                _ => {}
            }
        }
        false
    }

    fn parse_array_literal(&mut self) -> Result<Expr, ParseError> {
        let position = self.current_position();
        self.consume(&TokenKind::LeftBracket, "'['")?;
        let mut elements = Vec::new();
        while !self.check(&TokenKind::RightBracket) {
            let spread = self.match_kind(&TokenKind::Ellipsis);
            let expr = self.parse_expression()?;
            elements.push(ArrayElement { expr, spread });
            if !self.match_kind(&TokenKind::Comma) {
                break;
            }
        }
        self.consume(&TokenKind::RightBracket, "']' after array elements")?;
        Ok(Expr::Array { elements, position })
    }

    /// `{ key: value, shorthand }`
    fn parse_object_literal(&mut self) -> Result<Expr, ParseError> {
        let position = self.current_position();
        self.consume(&TokenKind::LeftBrace, "'{'")?;
        let mut fields = Vec::new();
        while !self.check(&TokenKind::RightBrace) {
            let key_position = self.current_position();
            let key = self.consume_property_name()?;
            let value = if self.match_kind(&TokenKind::Colon) {
                self.parse_expression()?
            } else {
                Expr::Variable {
                    name: key.clone(),
                    position: key_position,
                }
            };
            fields.push((key, value));
            if !self.match_kind(&TokenKind::Comma) {
                break;
            }
        }
        self.consume(&TokenKind::RightBrace, "'}' after object literal")?;
        Ok(Expr::Object { fields, position })
    }

    fn parse_template(&mut self, chunks: Vec<TemplateChunk>, position: Position) -> Result<Expr, ParseError> {
        let mut parts = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            match chunk {
                TemplateChunk::Text(text) => parts.push(TemplatePart::Text(text)),
                TemplateChunk::Code { source, position } => {
                    let tokens = Tokenizer::starting_at(&source, position)
                        .tokenize()
                        .map_err(|message| ParseError::InvalidSyntax { message, position })?;
                    let mut inner = Parser::new(tokens);
                    let expr = inner.parse_expression()?;
                    if !inner.is_at_end() {
                        return Err(inner.unexpected("end of template interpolation"));
                    }
                    parts.push(TemplatePart::Expr(expr));
                }
            }
        }
        Ok(Expr::Template { parts, position })
    }

    //=================================================
    // Token utilities
    //=================================================

    fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self, ahead: usize) -> Option<&TokenKind> {
        self.tokens.get(self.current + ahead).map(|token| &token.kind)
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn check(&self, kind: &TokenKind) -> bool {
        !self.is_at_end() && &self.peek().kind == kind
    }

    fn match_kind(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_binary_op(&mut self, table: &[(TokenKind, BinaryOp)]) -> Option<BinaryOp> {
        let op = table
            .iter()
            .find(|(kind, _)| self.check(kind))
            .map(|(_, op)| *op)?;
        self.advance();
        Some(op)
    }

    fn consume(&mut self, kind: &TokenKind, expected: &str) -> Result<&Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn consume_identifier(&mut self) -> Result<String, ParseError> {
        match &self.peek().kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    // Property names may be keywords (`obj.catch`, `{ print: 1 }`) or strings.
    fn consume_property_name(&mut self) -> Result<String, ParseError> {
        let name = match &self.peek().kind {
            TokenKind::Identifier(name) | TokenKind::String(name) => name.clone(),
            TokenKind::Number(_) | TokenKind::Template(_) | TokenKind::Eof => {
                return Err(self.unexpected("property name"));
            }
            keyword if keyword.to_string().chars().all(|c| c.is_alphabetic()) => {
                keyword.to_string()
            }
            _ => return Err(self.unexpected("property name")),
        };
        self.advance();
        Ok(name)
    }

    fn parse_type_name(&mut self) -> Result<String, ParseError> {
        if self.match_kind(&TokenKind::LeftBracket) {
            let inner = self.parse_type_name()?;
            self.consume(&TokenKind::RightBracket, "']' after array type")?;
            return Ok(format!("[{}]", inner));
        }
        if self.match_kind(&TokenKind::Nil) {
            return Ok("nil".to_string());
        }
        self.consume_identifier()
    }

    // Semicolons are optional terminators.
    fn consume_statement_terminator(&mut self) {
        self.match_kind(&TokenKind::Semicolon);
    }

    fn at_statement_end(&self) -> bool {
        self.is_at_end()
            || self.check(&TokenKind::Semicolon)
            || self.check(&TokenKind::RightBrace)
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn current_position(&self) -> Position {
        self.peek().position
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.peek();
        if token.kind == TokenKind::Eof {
            ParseError::UnexpectedEndOfInput {
                expected: expected.to_string(),
                position: token.position,
            }
        } else {
            ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: token.kind.clone(),
                position: token.position,
            }
        }
    }
}


//=====================================================
// End of file
//=====================================================
