//! Expression nodes of the XR tree

use super::ident::{Ident, BID};
use super::query::Query;
use super::types::XRType;
use super::XR;
use std::fmt;

/// Scalar expression (or a row value built from scalars)
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Reference to a bound variable
    Ident(Ident),

    /// Literal value
    Const(Const),

    /// Field access `of.name`
    Property {
        /// Row being accessed
        of: Box<Expr>,
        /// Field name
        name: String,
    },

    /// Binary operation
    BinaryOp {
        /// Left operand
        a: Box<Expr>,
        /// Operator
        op: BinaryOperator,
        /// Right operand
        b: Box<Expr>,
    },

    /// Unary operation
    UnaryOp {
        /// Operator
        op: UnaryOperator,
        /// Operand
        expr: Box<Expr>,
    },

    /// Lambda `{ params -> body }`
    FunctionN {
        /// Parameters
        params: Vec<Ident>,
        /// Body
        body: Box<Expr>,
    },

    /// Application of a function value to arguments
    FunctionApply {
        /// Function being applied
        function: Box<Expr>,
        /// Arguments
        args: Vec<Expr>,
    },

    /// Call of a named method on a receiver: `head.name(args)`
    MethodCall {
        /// Receiver
        head: Box<Expr>,
        /// Method name
        name: String,
        /// Arguments
        args: Vec<Expr>,
        /// Purity / aggregation class
        call_type: CallType,
        /// Result type
        ty: XRType,
    },

    /// Call of a free function: `name(args)`
    GlobalCall {
        /// Function name
        name: String,
        /// Arguments
        args: Vec<Expr>,
        /// Purity / aggregation class
        call_type: CallType,
        /// Result type
        ty: XRType,
    },

    /// Local variables followed by an output expression
    Block {
        /// `val name = rhs` bindings in order
        variables: Vec<Variable>,
        /// Result of the block
        output: Box<Expr>,
    },

    /// Conditional `when { cond -> then ... else -> or_else }`
    When {
        /// Branches tried in order
        branches: Vec<Branch>,
        /// Fallback
        or_else: Box<Expr>,
    },

    /// Row constructor with named fields
    Product {
        /// Record name
        name: String,
        /// Ordered named fields
        fields: Vec<(String, Expr)>,
    },

    /// Placeholder for a runtime parameter value
    TagForParam {
        /// Binding id
        id: BID,
        /// Parameter type
        ty: XRType,
    },

    /// Placeholder for a SQL fragment spliced in at runtime
    TagForSqlExpression {
        /// Binding id
        id: BID,
        /// Fragment type
        ty: XRType,
    },

    /// Raw SQL template
    Infix(Infix),

    /// A query used as a value (subquery)
    QueryToExpr(Box<Query>),
}

/// Literal values
#[derive(Debug, Clone, PartialEq)]
pub enum Const {
    /// Boolean literal
    Boolean(bool),
    /// Integer literal
    Int(i64),
    /// Floating point literal
    Double(f64),
    /// Character literal
    Char(char),
    /// String literal
    String(String),
    /// SQL NULL
    Null,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    /// `==`
    EqEq,
    /// `!=`
    NotEq,
    /// `&&`
    And,
    /// `||`
    Or,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `+` on numbers
    Plus,
    /// `-`
    Minus,
    /// `*`
    Mult,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// `+` on strings
    StrPlus,
}

impl BinaryOperator {
    /// Binding strength, higher binds tighter
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOperator::Or => 1,
            BinaryOperator::And => 2,
            BinaryOperator::EqEq
            | BinaryOperator::NotEq
            | BinaryOperator::Gt
            | BinaryOperator::GtEq
            | BinaryOperator::Lt
            | BinaryOperator::LtEq => 3,
            BinaryOperator::Plus | BinaryOperator::Minus | BinaryOperator::StrPlus => 4,
            BinaryOperator::Mult | BinaryOperator::Div | BinaryOperator::Mod => 5,
        }
    }

    /// Operators where `a op (b op c) == (a op b) op c`
    pub fn is_associative(&self) -> bool {
        matches!(
            self,
            BinaryOperator::And
                | BinaryOperator::Or
                | BinaryOperator::Plus
                | BinaryOperator::Mult
                | BinaryOperator::StrPlus
        )
    }

    /// Type of `a op b`
    pub fn result_type(&self) -> XRType {
        match self {
            BinaryOperator::EqEq
            | BinaryOperator::NotEq
            | BinaryOperator::And
            | BinaryOperator::Or
            | BinaryOperator::Gt
            | BinaryOperator::GtEq
            | BinaryOperator::Lt
            | BinaryOperator::LtEq => XRType::BooleanExpression,
            _ => XRType::Value,
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOperator::EqEq => "==",
            BinaryOperator::NotEq => "!=",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
            BinaryOperator::Gt => ">",
            BinaryOperator::GtEq => ">=",
            BinaryOperator::Lt => "<",
            BinaryOperator::LtEq => "<=",
            BinaryOperator::Plus | BinaryOperator::StrPlus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Mult => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Mod => "%",
        };
        write!(f, "{}", symbol)
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    /// Logical negation
    Not,
    /// Arithmetic negation
    Minus,
    /// The operand query has no rows
    IsEmpty,
    /// The operand query has at least one row
    NonEmpty,
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOperator::Not => write!(f, "!"),
            UnaryOperator::Minus => write!(f, "-"),
            UnaryOperator::IsEmpty => write!(f, "isEmpty"),
            UnaryOperator::NonEmpty => write!(f, "nonEmpty"),
        }
    }
}

/// Purity and aggregation class of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallType {
    /// Deterministic scalar function
    PureFunction,
    /// Function with side effects or non-deterministic results
    ImpureFunction,
    /// Row aggregation such as `max(x.age)`
    Aggregator,
    /// Aggregation of an entire query such as `people.size()`
    QueryAggregator,
}

impl CallType {
    /// True for both aggregation kinds
    pub fn is_aggregator(&self) -> bool {
        matches!(self, CallType::Aggregator | CallType::QueryAggregator)
    }
}

/// Raw SQL template with interleaved parameters.
///
/// `parts` always has exactly one more element than `params`.
#[derive(Debug, Clone, PartialEq)]
pub struct Infix {
    /// Literal SQL fragments
    pub parts: Vec<String>,
    /// Values spliced between the fragments
    pub params: Vec<XR>,
    /// Whether the fragment may be duplicated or reordered freely
    pub pure: bool,
    /// Result type
    pub ty: XRType,
}

impl Infix {
    /// Template with no parameters
    pub fn raw(sql: impl Into<String>, pure: bool, ty: XRType) -> Self {
        Self {
            parts: vec![sql.into()],
            params: Vec::new(),
            pure,
            ty,
        }
    }
}

/// One `cond -> then` arm of a [`Expr::When`]
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    /// Condition
    pub cond: Expr,
    /// Value when the condition holds
    pub then: Expr,
}

/// One `val name = rhs` binding of a [`Expr::Block`]
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// Bound name
    pub name: Ident,
    /// Bound value
    pub rhs: Expr,
}

impl Expr {
    /// Reference to `id`
    pub fn ident(id: &Ident) -> Self {
        Expr::Ident(id.clone())
    }

    /// `of.name`
    pub fn property(of: Expr, name: impl Into<String>) -> Self {
        Expr::Property {
            of: Box::new(of),
            name: name.into(),
        }
    }

    /// `a op b`
    pub fn binary(a: Expr, op: BinaryOperator, b: Expr) -> Self {
        Expr::BinaryOp {
            a: Box::new(a),
            op,
            b: Box::new(b),
        }
    }

    /// `a && b`
    pub fn and(a: Expr, b: Expr) -> Self {
        Expr::binary(a, BinaryOperator::And, b)
    }

    /// `a == b`
    pub fn eq(a: Expr, b: Expr) -> Self {
        Expr::binary(a, BinaryOperator::EqEq, b)
    }

    /// `op expr`
    pub fn unary(op: UnaryOperator, expr: Expr) -> Self {
        Expr::UnaryOp {
            op,
            expr: Box::new(expr),
        }
    }

    /// Row constructor
    pub fn product(name: impl Into<String>, fields: Vec<(String, Expr)>) -> Self {
        Expr::Product {
            name: name.into(),
            fields,
        }
    }

    /// Subquery used as a value
    pub fn query(q: Query) -> Self {
        Expr::QueryToExpr(Box::new(q))
    }

    /// True when this expression is exactly a reference to `id`
    pub fn is_ident_of(&self, id: &Ident) -> bool {
        matches!(self, Expr::Ident(i) if i == id)
    }

    /// Light type of the expression
    pub fn ty(&self) -> XRType {
        match self {
            Expr::Ident(id) => id.ty.clone(),
            Expr::Const(Const::Boolean(_)) => XRType::BooleanValue,
            Expr::Const(_) => XRType::Value,
            Expr::Property { of, name } => of.ty().field(name).cloned().unwrap_or(XRType::Value),
            Expr::BinaryOp { op, .. } => op.result_type(),
            Expr::UnaryOp { op, .. } => match op {
                UnaryOperator::Minus => XRType::Value,
                _ => XRType::BooleanExpression,
            },
            Expr::FunctionN { .. } => XRType::Generic,
            Expr::FunctionApply { function, .. } => match function.as_ref() {
                Expr::FunctionN { body, .. } => body.ty(),
                _ => XRType::Generic,
            },
            Expr::MethodCall { ty, .. }
            | Expr::GlobalCall { ty, .. }
            | Expr::TagForParam { ty, .. }
            | Expr::TagForSqlExpression { ty, .. } => ty.clone(),
            Expr::Block { output, .. } => output.ty(),
            Expr::When { branches, or_else } => branches
                .first()
                .map(|branch| branch.then.ty())
                .unwrap_or_else(|| or_else.ty()),
            Expr::Product { name, fields } => XRType::Product {
                name: name.clone(),
                fields: fields
                    .iter()
                    .map(|(field, value)| (field.clone(), value.ty()))
                    .collect(),
            },
            Expr::Infix(infix) => infix.ty.clone(),
            Expr::QueryToExpr(q) => q.ty(),
        }
    }
}
