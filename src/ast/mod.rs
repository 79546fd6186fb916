//=====================================================
// File: ast/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: FSK Abstract Syntax Tree definitions
// Objective: Define AST node types for programs, statements, expressions,
//            and binding/match patterns consumed by the evaluator
//=====================================================

use crate::tokenizer::Position;
use std::fmt;
use std::rc::Rc;

/// A parsed source file. Immutable once built.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

impl Program {
    pub fn new(statements: Vec<Stmt>) -> Self {
        Self { statements }
    }
}

/// Scalar values that can appear directly in source.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    String(String),
    Bool(bool),
    Nil,
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(n) => write!(f, "{}", n),
            Literal::String(s) => write!(f, "\"{}\"", s),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Nil => f.write_str("nil"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Pipe,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::Pipe => "|>",
        };
        f.write_str(symbol)
    }
}

/// Short-circuiting operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Coalesce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
}

/// Function parameter: a binding pattern plus an optional default expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub pattern: Pattern,
    pub default: Option<Expr>,
}

/// Shared by named functions, methods, lambdas and arrow functions.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    pub is_async: bool,
    pub return_type: Option<String>,
    pub position: Position,
}

impl FunctionDecl {
    /// Parameters before the first default are required.
    pub fn min_arity(&self) -> usize {
        self.params
            .iter()
            .take_while(|param| param.default.is_none())
            .count()
    }

    pub fn max_arity(&self) -> usize {
        self.params.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: String,
    pub superclass: Option<Expr>,
    pub methods: Vec<Rc<FunctionDecl>>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchArm {
    pub pattern: Pattern,
    pub body: Stmt,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayPatternElement {
    pub pattern: Pattern,
    pub spread: bool,
}

/// Destructuring and match patterns.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Variable(String),
    Literal(Literal),
    Array(Vec<ArrayPatternElement>),
    Object(Vec<(String, Pattern)>),
}

impl Pattern {
    /// Names the pattern would bind, in source order.
    pub fn bound_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Pattern::Variable(name) => names.push(name.as_str()),
            Pattern::Literal(_) => {}
            Pattern::Array(elements) => {
                for element in elements {
                    element.pattern.collect_names(names);
                }
            }
            Pattern::Object(fields) => {
                for (_, pattern) in fields {
                    pattern.collect_names(names);
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expression {
        expr: Expr,
        position: Position,
    },
    Print {
        expr: Expr,
        position: Position,
    },
    Let {
        pattern: Pattern,
        type_hint: Option<String>,
        initializer: Option<Expr>,
        position: Position,
    },
    Const {
        pattern: Pattern,
        initializer: Expr,
        position: Position,
    },
    Block {
        statements: Vec<Stmt>,
        position: Position,
    },
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
        position: Position,
    },
    /// `step` carries the increment of a desugared `for`; it runs after every
    /// iteration, including ones cut short by `continue`.
    While {
        condition: Expr,
        body: Box<Stmt>,
        step: Option<Expr>,
        position: Position,
    },
    Function {
        decl: Rc<FunctionDecl>,
    },
    Class {
        decl: ClassDecl,
    },
    Return {
        value: Option<Expr>,
        position: Position,
    },
    Throw {
        value: Expr,
        position: Position,
    },
    Try {
        body: Box<Stmt>,
        catch_name: String,
        handler: Box<Stmt>,
        position: Position,
    },
    Match {
        scrutinee: Expr,
        arms: Vec<MatchArm>,
        position: Position,
    },
    Import {
        path: Expr,
        position: Position,
    },
    Break {
        position: Position,
    },
    Continue {
        position: Position,
    },
}

impl Stmt {
    pub fn position(&self) -> Position {
        match self {
            Stmt::Expression { position, .. }
            | Stmt::Print { position, .. }
            | Stmt::Let { position, .. }
            | Stmt::Const { position, .. }
            | Stmt::Block { position, .. }
            | Stmt::If { position, .. }
            | Stmt::While { position, .. }
            | Stmt::Return { position, .. }
            | Stmt::Throw { position, .. }
            | Stmt::Try { position, .. }
            | Stmt::Match { position, .. }
            | Stmt::Import { position, .. }
            | Stmt::Break { position }
            | Stmt::Continue { position } => *position,
            Stmt::Function { decl } => decl.position,
            Stmt::Class { decl } => decl.position,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayElement {
    pub expr: Expr,
    pub spread: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Text(String),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal {
        value: Literal,
        position: Position,
    },
    Variable {
        name: String,
        position: Position,
    },
    Assign {
        name: String,
        value: Box<Expr>,
        position: Position,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
        position: Position,
    },
    Logical {
        left: Box<Expr>,
        op: LogicalOp,
        right: Box<Expr>,
        position: Position,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        position: Position,
    },
    Grouping {
        expr: Box<Expr>,
        position: Position,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        position: Position,
    },
    Get {
        object: Box<Expr>,
        name: String,
        optional: bool,
        position: Position,
    },
    Set {
        object: Box<Expr>,
        name: String,
        value: Box<Expr>,
        position: Position,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        position: Position,
    },
    IndexSet {
        object: Box<Expr>,
        index: Box<Expr>,
        value: Box<Expr>,
        position: Position,
    },
    This {
        position: Position,
    },
    Super {
        method: String,
        position: Position,
    },
    Await {
        expr: Box<Expr>,
        position: Position,
    },
    Function {
        decl: Rc<FunctionDecl>,
    },
    Array {
        elements: Vec<ArrayElement>,
        position: Position,
    },
    Object {
        fields: Vec<(String, Expr)>,
        position: Position,
    },
    Template {
        parts: Vec<TemplatePart>,
        position: Position,
    },
}

impl Expr {
    pub fn position(&self) -> Position {
        match self {
            Expr::Literal { position, .. }
            | Expr::Variable { position, .. }
            | Expr::Assign { position, .. }
            | Expr::Binary { position, .. }
            | Expr::Logical { position, .. }
            | Expr::Unary { position, .. }
            | Expr::Grouping { position, .. }
            | Expr::Call { position, .. }
            | Expr::Get { position, .. }
            | Expr::Set { position, .. }
            | Expr::Index { position, .. }
            | Expr::IndexSet { position, .. }
            | Expr::This { position }
            | Expr::Super { position, .. }
            | Expr::Await { position, .. }
            | Expr::Array { position, .. }
            | Expr::Object { position, .. }
            | Expr::Template { position, .. } => *position,
            Expr::Function { decl } => decl.position,
        }
    }
}


//=====================================================
// End of file
//=====================================================
