//! The bound tree handed to code generation.
//!
//! Bound nodes mirror the AST nesting but carry resolved symbols and types
//! instead of names. Composite statements are filled child by child while
//! the binder walks their AST children, see [`BoundStatement::add_statement`].

use cmc_ast::{BinaryOp, LiteralValue, UnaryOp};
use cmc_common::{CompileError, CompileResult, Span};
use cmc_symbols::{ConstValue, SymbolId, TypeId};

// =============================================================================
// Expressions
// =============================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum BoundExpressionKind {
    Literal(LiteralValue),
    Parameter(SymbolId),
    LocalVariable(SymbolId),
    /// `object` is `None` for static member variables.
    MemberVariable {
        object: Option<Box<BoundExpression>>,
        variable: SymbolId,
    },
    Constant {
        constant: SymbolId,
        value: Option<ConstValue>,
    },
    EnumConstant {
        constant: SymbolId,
        value: Option<ConstValue>,
    },
    This(SymbolId),
    Unary {
        op: UnaryOp,
        operand: Box<BoundExpression>,
    },
    Binary {
        op: BinaryOp,
        left: Box<BoundExpression>,
        right: Box<BoundExpression>,
    },
    /// `object` is the receiver of a non-static member function call.
    FunctionCall {
        function: SymbolId,
        object: Option<Box<BoundExpression>>,
        arguments: Vec<BoundExpression>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct BoundExpression {
    pub kind: BoundExpressionKind,
    pub type_id: TypeId,
    pub span: Span,
}

impl BoundExpression {
    pub fn new(kind: BoundExpressionKind, type_id: TypeId, span: Span) -> BoundExpression {
        BoundExpression {
            kind,
            type_id,
            span,
        }
    }

    /// Parameters, locals and member variables can be assigned to.
    #[must_use]
    pub fn is_variable(&self) -> bool {
        matches!(
            self.kind,
            BoundExpressionKind::Parameter(_)
                | BoundExpressionKind::LocalVariable(_)
                | BoundExpressionKind::MemberVariable { .. }
        )
    }
}

// =============================================================================
// Statements
// =============================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum BoundStatementKind {
    Compound {
        statements: Vec<BoundStatement>,
    },
    /// Binds an incoming argument to its parameter.
    Receive {
        parameter: SymbolId,
    },
    Return {
        expression: Option<BoundExpression>,
        return_value: SymbolId,
    },
    If {
        condition: BoundExpression,
        then_statement: Option<Box<BoundStatement>>,
        else_statement: Option<Box<BoundStatement>>,
        has_else: bool,
    },
    While {
        condition: BoundExpression,
        body: Option<Box<BoundStatement>>,
    },
    Do {
        body: Option<Box<BoundStatement>>,
        condition: BoundExpression,
    },
    /// `condition` is `None` for `for (;;)`.
    For {
        init: Option<Box<BoundStatement>>,
        condition: Option<BoundExpression>,
        increment: Option<BoundExpression>,
        body: Option<Box<BoundStatement>>,
        has_init: bool,
    },
    Switch {
        condition: BoundExpression,
        cases: Vec<BoundStatement>,
        default: Option<Box<BoundStatement>>,
    },
    Case {
        values: Vec<BoundExpression>,
        statements: Vec<BoundStatement>,
    },
    Default {
        statements: Vec<BoundStatement>,
    },
    Break,
    Continue,
    Construction {
        local: SymbolId,
        /// `SymbolId::NONE` for non-class types and classes without constructors.
        constructor: SymbolId,
        arguments: Vec<BoundExpression>,
    },
    Assignment {
        target: BoundExpression,
        source: BoundExpression,
    },
    Expression(BoundExpression),
    Throw(BoundExpression),
    Empty,
    /// Base or delegated constructor call at the start of a constructor.
    InitializerCall {
        class: SymbolId,
        constructor: SymbolId,
        arguments: Vec<BoundExpression>,
    },
    InitializeVtablePointer {
        class: SymbolId,
    },
    InitializeMember {
        variable: SymbolId,
        arguments: Vec<BoundExpression>,
    },
    DestroyMember {
        variable: SymbolId,
    },
    DestroyBase {
        class: SymbolId,
        destructor: SymbolId,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct BoundStatement {
    pub kind: BoundStatementKind,
    pub span: Span,
}

impl BoundStatement {
    pub fn new(kind: BoundStatementKind, span: Span) -> BoundStatement {
        BoundStatement { kind, span }
    }

    pub fn compound(span: Span) -> BoundStatement {
        BoundStatement::new(
            BoundStatementKind::Compound {
                statements: Vec::new(),
            },
            span,
        )
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self.kind {
            BoundStatementKind::Compound { .. } => "compound",
            BoundStatementKind::Receive { .. } => "receive",
            BoundStatementKind::Return { .. } => "return",
            BoundStatementKind::If { .. } => "if",
            BoundStatementKind::While { .. } => "while",
            BoundStatementKind::Do { .. } => "do",
            BoundStatementKind::For { .. } => "for",
            BoundStatementKind::Switch { .. } => "switch",
            BoundStatementKind::Case { .. } => "case",
            BoundStatementKind::Default { .. } => "default",
            BoundStatementKind::Break => "break",
            BoundStatementKind::Continue => "continue",
            BoundStatementKind::Construction { .. } => "construction",
            BoundStatementKind::Assignment { .. } => "assignment",
            BoundStatementKind::Expression(_) => "expression",
            BoundStatementKind::Throw(_) => "throw",
            BoundStatementKind::Empty => "empty",
            BoundStatementKind::InitializerCall { .. } => "initializer call",
            BoundStatementKind::InitializeVtablePointer { .. } => "vtable pointer initialization",
            BoundStatementKind::InitializeMember { .. } => "member initialization",
            BoundStatementKind::DestroyMember { .. } => "member destruction",
            BoundStatementKind::DestroyBase { .. } => "base destruction",
        }
    }

    #[must_use]
    pub fn is_loop(&self) -> bool {
        matches!(
            self.kind,
            BoundStatementKind::While { .. }
                | BoundStatementKind::Do { .. }
                | BoundStatementKind::For { .. }
        )
    }

    /// Attach a completed child to this composite statement.
    ///
    /// Slots fill in source order: `if` takes its then branch and then its
    /// else branch, `for` its init statement and then its body, `switch`
    /// its case clauses and at most one default clause. Adding past the
    /// last slot or to a non-composite statement is an internal error.
    pub fn add_statement(&mut self, child: BoundStatement) -> CompileResult<()> {
        let name = self.name();
        let overflow = || {
            CompileError::internal(format!("{name} statement has no free slot for a child statement"))
        };
        match &mut self.kind {
            BoundStatementKind::Compound { statements }
            | BoundStatementKind::Case { statements, .. }
            | BoundStatementKind::Default { statements } => {
                statements.push(child);
                Ok(())
            }
            BoundStatementKind::If {
                then_statement,
                else_statement,
                has_else,
                ..
            } => {
                if then_statement.is_none() {
                    *then_statement = Some(Box::new(child));
                } else if *has_else && else_statement.is_none() {
                    *else_statement = Some(Box::new(child));
                } else {
                    return Err(overflow());
                }
                Ok(())
            }
            BoundStatementKind::While { body, .. } | BoundStatementKind::Do { body, .. } => {
                if body.is_some() {
                    return Err(overflow());
                }
                *body = Some(Box::new(child));
                Ok(())
            }
            BoundStatementKind::For {
                init,
                body,
                has_init,
                ..
            } => {
                if *has_init && init.is_none() {
                    *init = Some(Box::new(child));
                } else if body.is_none() {
                    *body = Some(Box::new(child));
                } else {
                    return Err(overflow());
                }
                Ok(())
            }
            BoundStatementKind::Switch { cases, default, .. } => match child.kind {
                BoundStatementKind::Case { .. } => {
                    cases.push(child);
                    Ok(())
                }
                BoundStatementKind::Default { .. } if default.is_none() => {
                    *default = Some(Box::new(child));
                    Ok(())
                }
                _ => Err(CompileError::internal(format!(
                    "switch statement cannot contain a {} statement",
                    child.name()
                ))),
            },
            _ => Err(CompileError::internal(format!(
                "cannot add a statement to a {name} statement"
            ))),
        }
    }

    /// Statements of a compound, case or default statement.
    #[must_use]
    pub fn statements(&self) -> &[BoundStatement] {
        match &self.kind {
            BoundStatementKind::Compound { statements }
            | BoundStatementKind::Case { statements, .. }
            | BoundStatementKind::Default { statements } => statements,
            _ => &[],
        }
    }
}

// =============================================================================
// Functions, classes, compile units
// =============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct BoundFunction {
    pub function: SymbolId,
    pub body: BoundStatement,
    /// Body fabricated from the class layout instead of bound from source.
    pub synthesized: bool,
}

impl BoundFunction {
    #[must_use]
    pub fn statements(&self) -> &[BoundStatement] {
        self.body.statements()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum BoundNode {
    Class(BoundClass),
    Function(BoundFunction),
}

#[derive(Clone, Debug, PartialEq)]
pub struct BoundClass {
    pub class: SymbolId,
    pub members: Vec<BoundNode>,
}

impl BoundClass {
    pub fn new(class: SymbolId) -> BoundClass {
        BoundClass {
            class,
            members: Vec::new(),
        }
    }

    pub fn functions(&self) -> impl Iterator<Item = &BoundFunction> {
        self.members.iter().filter_map(|m| match m {
            BoundNode::Function(f) => Some(f),
            BoundNode::Class(_) => None,
        })
    }

    pub fn function(&self, function: SymbolId) -> Option<&BoundFunction> {
        self.functions().find(|f| f.function == function)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoundCompileUnit {
    pub file_name: String,
    pub nodes: Vec<BoundNode>,
}

impl BoundCompileUnit {
    pub fn new(file_name: impl Into<String>) -> BoundCompileUnit {
        BoundCompileUnit {
            file_name: file_name.into(),
            nodes: Vec::new(),
        }
    }

    /// Every bound function of the unit, classes searched depth-first.
    pub fn functions(&self) -> Vec<&BoundFunction> {
        fn collect<'a>(nodes: &'a [BoundNode], out: &mut Vec<&'a BoundFunction>) {
            for node in nodes {
                match node {
                    BoundNode::Function(f) => out.push(f),
                    BoundNode::Class(c) => collect(&c.members, out),
                }
            }
        }
        let mut out = Vec::new();
        collect(&self.nodes, &mut out);
        out
    }

    pub fn function(&self, function: SymbolId) -> Option<&BoundFunction> {
        self.functions().into_iter().find(|f| f.function == function)
    }

    pub fn class(&self, class: SymbolId) -> Option<&BoundClass> {
        fn find(nodes: &[BoundNode], class: SymbolId) -> Option<&BoundClass> {
            for node in nodes {
                if let BoundNode::Class(c) = node {
                    if c.class == class {
                        return Some(c);
                    }
                    if let Some(found) = find(&c.members, class) {
                        return Some(found);
                    }
                }
            }
            None
        }
        find(&self.nodes, class)
    }
}
