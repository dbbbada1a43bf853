//! Abstract Syntax Tree definitions for Opal.
//!
//! The tree is produced once by the parser and is read-only to the
//! evaluator. Alongside the root statement list the parser emits the struct
//! and function registries, populated from top-level declarations.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A literal payload carried by a scalar-literal node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Literal {
    Bool(bool),
    Float(f64),
    Int(i64),
    Str(String),
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    // Logical (short-circuit)
    And,
    Or,
    // Comparison
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    // Arithmetic
    Add,
    Sub,
    Mul,
    Pow,
    Div,
    Mod,
}

impl BinaryOp {
    /// The operator as written in source, for error messages.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Pow => "**",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
        }
    }
}

/// Increment/decrement forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncDecOp {
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

/// One node of the program tree.
///
/// Lvalue targets (`Declare`, `Assign`, `Unset`, `IncDec`) keep their target
/// as a general node; the evaluator validates the kind at run time so that
/// illegal lvalues are runtime failures, not parse failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Ast {
    /// Ordered statement sequence executed in its own block scope
    StatementList { statements: Vec<Ast> },
    /// Scalar literal
    Literal { value: Literal },
    /// Variable reference
    Identifier { name: String },
    /// Array literal `[a, b, c]`
    ArrayLit { elements: Vec<Ast> },
    /// `base[index]`; a missing index is the append sentinel (`base[]`)
    ArrayAccess {
        base: Box<Ast>,
        index: Option<Box<Ast>>,
    },
    /// `base.member`
    StructAccess { base: Box<Ast>, member: String },
    /// `let target = init;`
    Declare { target: Box<Ast>, init: Box<Ast> },
    /// `target = value;`
    Assign { target: Box<Ast>, value: Box<Ast> },
    /// Binary operator application
    Binary {
        op: BinaryOp,
        lhs: Box<Ast>,
        rhs: Box<Ast>,
    },
    /// Boolean negation `!expr`
    Not { expr: Box<Ast> },
    /// `++x` / `--x` / `x++` / `x--`
    IncDec { op: IncDecOp, target: Box<Ast> },
    /// `len(expr)`
    Len { expr: Box<Ast> },
    /// `typeof(expr)`
    Typeof { expr: Box<Ast> },
    /// `expr as type`; the name resolves at evaluation time
    Cast { expr: Box<Ast>, ty: String },
    /// `expr is type`
    TypeCheck { expr: Box<Ast>, ty: String },
    /// `new StructName`
    New { name: String },
    /// `name(args...)`
    Call { name: String, args: Vec<Ast> },
    /// `return;` / `return expr;`
    Return { expr: Option<Box<Ast>> },
    /// `unset target;`
    Unset { target: Box<Ast> },
    /// `if (cond) body` -- yields a transient flag telling whether it ran
    If { cond: Box<Ast>, body: Box<Ast> },
    /// `if (...) ... else body`; the first child is always an `If` node
    IfElse {
        if_branch: Box<Ast>,
        else_body: Box<Ast>,
    },
    /// `for (init; cond; step) body`
    For {
        init: Box<Ast>,
        cond: Box<Ast>,
        step: Box<Ast>,
        body: Box<Ast>,
    },
    /// `foreach (var in iter) body`
    Foreach {
        var: String,
        iter: Box<Ast>,
        body: Box<Ast>,
    },
    /// `do body while (cond);`
    DoWhile { body: Box<Ast>, cond: Box<Ast> },
    /// `while (cond) body`
    While { cond: Box<Ast>, body: Box<Ast> },
}

/// A user-defined function: parameter names plus a statement-list body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserFunction {
    pub name: String,
    pub params: Vec<String>,
    pub body: Ast,
}

/// Immutable name-to-declaration table for user functions, populated once
/// at parse time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionRegistry {
    functions: HashMap<String, UserFunction>,
}

impl FunctionRegistry {
    pub fn new() -> FunctionRegistry {
        FunctionRegistry::default()
    }

    /// Register a function. Returns false when the name is already taken.
    pub fn declare(&mut self, function: UserFunction) -> bool {
        if self.functions.contains_key(&function.name) {
            return false;
        }
        self.functions.insert(function.name.clone(), function);
        true
    }

    pub fn get(&self, name: &str) -> Option<&UserFunction> {
        self.functions.get(name)
    }
}

/// Immutable struct-name-to-member-list table, populated once at parse time.
/// Members have no default values; instantiation binds them all to the
/// placeholder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructRegistry {
    structs: HashMap<String, Vec<String>>,
}

impl StructRegistry {
    pub fn new() -> StructRegistry {
        StructRegistry::default()
    }

    /// Register a struct shape. Returns false when the name is already taken.
    pub fn declare(&mut self, name: &str, members: Vec<String>) -> bool {
        if self.structs.contains_key(name) {
            return false;
        }
        self.structs.insert(name.to_string(), members);
        true
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.structs.get(name).map(|m| m.as_slice())
    }
}

/// A fully parsed program: top-level statements plus the declaration tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub statements: Vec<Ast>,
    pub structs: StructRegistry,
    pub functions: FunctionRegistry,
}
