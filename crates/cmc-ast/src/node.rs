//! Node kinds, specifiers and per-kind node data.

use crate::base::NodeIndex;
use cmc_common::{FileId, Span};
use serde::{Deserialize, Serialize};

/// The node-kind tag the binder dispatches on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    CompileUnit,
    Namespace,
    UsingNamespace,
    Class,
    Interface,
    Enum,
    EnumConstant,
    Constant,
    Typedef,
    Delegate,
    ClassDelegate,
    Concept,
    TemplateParameter,
    Function,
    Constructor,
    Destructor,
    ConversionFunction,
    Parameter,
    MemberVariable,
    Initializer,
    // Statements
    Compound,
    Return,
    If,
    While,
    Do,
    For,
    Switch,
    Case,
    Default,
    Break,
    Continue,
    Construction,
    Assignment,
    ExpressionStatement,
    Throw,
    Empty,
    // Expressions
    Literal,
    Identifier,
    This,
    Unary,
    Binary,
    Invoke,
    Dot,
    // Type expressions
    TypeName,
    DerivedType,
    TemplateId,
}

impl NodeKind {
    /// Nodes that declare a function body owner.
    #[must_use]
    pub const fn is_function_like(self) -> bool {
        matches!(
            self,
            NodeKind::Function
                | NodeKind::Constructor
                | NodeKind::Destructor
                | NodeKind::ConversionFunction
        )
    }

    #[must_use]
    pub const fn is_statement(self) -> bool {
        matches!(
            self,
            NodeKind::Compound
                | NodeKind::Return
                | NodeKind::If
                | NodeKind::While
                | NodeKind::Do
                | NodeKind::For
                | NodeKind::Switch
                | NodeKind::Case
                | NodeKind::Default
                | NodeKind::Break
                | NodeKind::Continue
                | NodeKind::Construction
                | NodeKind::Assignment
                | NodeKind::ExpressionStatement
                | NodeKind::Throw
                | NodeKind::Empty
        )
    }

    /// Statements that end the enclosing function on every path through them.
    #[must_use]
    pub const fn is_function_terminating(self) -> bool {
        matches!(self, NodeKind::Return | NodeKind::Throw)
    }
}

bitflags::bitflags! {
    /// Declaration specifiers as written in source.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Specifiers: u32 {
        const PUBLIC = 1 << 0;
        const PROTECTED = 1 << 1;
        const PRIVATE = 1 << 2;
        const INTERNAL = 1 << 3;
        const STATIC = 1 << 4;
        const VIRTUAL = 1 << 5;
        const OVERRIDE = 1 << 6;
        const ABSTRACT = 1 << 7;
        const EXPLICIT = 1 << 8;
        const EXTERNAL = 1 << 9;
        const SUPPRESS = 1 << 10;
        const DEFAULT = 1 << 11;
        const INLINE = 1 << 12;
        const CONSTEXPR = 1 << 13;
        const CDECL = 1 << 14;
        const NOTHROW = 1 << 15;
        const THROW = 1 << 16;
        const NEW = 1 << 17;

        const ACCESS = Self::PUBLIC.bits()
            | Self::PROTECTED.bits()
            | Self::PRIVATE.bits()
            | Self::INTERNAL.bits();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Neg,
}

impl UnaryOp {
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    And,
    Or,
}

impl BinaryOp {
    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::Less
                | BinaryOp::LessEq
                | BinaryOp::Greater
                | BinaryOp::GreaterEq
        )
    }

    #[must_use]
    pub const fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEq => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEq => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LiteralValue {
    Bool(bool),
    Int(i64),
    Char(char),
    String(String),
    Null,
}

/// Reference kind of a derived type expression.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefKind {
    #[default]
    None,
    LValue,
    RValue,
}

/// The derivations applied to a base type: `const Foo*&` is
/// `{ is_const: true, pointers: 1, reference: LValue }`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Derivations {
    pub is_const: bool,
    pub pointers: u8,
    pub reference: RefKind,
}

impl Derivations {
    pub const NONE: Derivations = Derivations {
        is_const: false,
        pointers: 0,
        reference: RefKind::None,
    };
    pub const CONST_REF: Derivations = Derivations {
        is_const: true,
        pointers: 0,
        reference: RefKind::LValue,
    };
    pub const RVALUE_REF: Derivations = Derivations {
        is_const: false,
        pointers: 0,
        reference: RefKind::RValue,
    };
    pub const POINTER: Derivations = Derivations {
        is_const: false,
        pointers: 1,
        reference: RefKind::None,
    };

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !self.is_const && self.pointers == 0 && matches!(self.reference, RefKind::None)
    }
}

/// Target of a constructor initializer.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum InitializerTarget {
    Base,
    This,
    Member(String),
}

// =============================================================================
// Node data
// =============================================================================

#[derive(Clone, Debug, Default)]
pub struct CompileUnitData {
    pub file_name: String,
    pub members: Vec<NodeIndex>,
}

#[derive(Clone, Debug, Default)]
pub struct NamespaceData {
    /// Possibly dotted: `System.Collections`.
    pub name: String,
    pub members: Vec<NodeIndex>,
}

#[derive(Clone, Debug, Default)]
pub struct UsingNamespaceData {
    pub namespace: String,
}

#[derive(Clone, Debug, Default)]
pub struct ClassData {
    pub name: String,
    pub specifiers: Specifiers,
    pub template_parameters: Vec<NodeIndex>,
    /// Base class and implemented interfaces, in source order.
    pub base_types: Vec<NodeIndex>,
    pub members: Vec<NodeIndex>,
}

#[derive(Clone, Debug, Default)]
pub struct InterfaceData {
    pub name: String,
    pub specifiers: Specifiers,
    pub members: Vec<NodeIndex>,
}

#[derive(Clone, Debug, Default)]
pub struct EnumData {
    pub name: String,
    pub specifiers: Specifiers,
    pub underlying_type: NodeIndex,
    pub constants: Vec<NodeIndex>,
}

#[derive(Clone, Debug, Default)]
pub struct EnumConstantData {
    pub name: String,
    pub value: NodeIndex,
}

#[derive(Clone, Debug, Default)]
pub struct ConstantData {
    pub name: String,
    pub specifiers: Specifiers,
    pub type_expr: NodeIndex,
    pub value: NodeIndex,
}

#[derive(Clone, Debug, Default)]
pub struct TypedefData {
    pub name: String,
    pub specifiers: Specifiers,
    pub type_expr: NodeIndex,
}

#[derive(Clone, Debug, Default)]
pub struct DelegateData {
    pub name: String,
    pub specifiers: Specifiers,
    pub return_type: NodeIndex,
    pub parameters: Vec<NodeIndex>,
}

#[derive(Clone, Debug, Default)]
pub struct ConceptData {
    pub name: String,
    pub specifiers: Specifiers,
    pub type_parameters: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct TemplateParameterData {
    pub name: String,
}

/// Shared by free functions, member functions, constructors, destructors and
/// conversion functions; the node kind tells them apart.
#[derive(Clone, Debug)]
pub struct FunctionData {
    pub name: String,
    pub specifiers: Specifiers,
    pub return_type: NodeIndex,
    pub template_parameters: Vec<NodeIndex>,
    pub parameters: Vec<NodeIndex>,
    /// Constructor initializers (`: base(x), member(y)`).
    pub initializers: Vec<NodeIndex>,
    pub body: NodeIndex,
    /// Textual `where` clause, appended to the overload name.
    pub constraint: Option<String>,
}

impl FunctionData {
    pub fn new(name: impl Into<String>) -> Self {
        FunctionData {
            name: name.into(),
            specifiers: Specifiers::empty(),
            return_type: NodeIndex::NONE,
            template_parameters: Vec::new(),
            parameters: Vec::new(),
            initializers: Vec::new(),
            body: NodeIndex::NONE,
            constraint: None,
        }
    }

    #[must_use]
    pub fn specifiers(mut self, specifiers: Specifiers) -> Self {
        self.specifiers = specifiers;
        self
    }

    #[must_use]
    pub fn returns(mut self, return_type: NodeIndex) -> Self {
        self.return_type = return_type;
        self
    }

    #[must_use]
    pub fn params(mut self, parameters: Vec<NodeIndex>) -> Self {
        self.parameters = parameters;
        self
    }

    #[must_use]
    pub fn template_params(mut self, template_parameters: Vec<NodeIndex>) -> Self {
        self.template_parameters = template_parameters;
        self
    }

    #[must_use]
    pub fn initializers(mut self, initializers: Vec<NodeIndex>) -> Self {
        self.initializers = initializers;
        self
    }

    #[must_use]
    pub fn body(mut self, body: NodeIndex) -> Self {
        self.body = body;
        self
    }

    #[must_use]
    pub fn constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraint = Some(constraint.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }
}

#[derive(Clone, Debug, Default)]
pub struct ParameterData {
    pub name: Option<String>,
    pub type_expr: NodeIndex,
}

#[derive(Clone, Debug, Default)]
pub struct MemberVariableData {
    pub name: String,
    pub specifiers: Specifiers,
    pub type_expr: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct InitializerData {
    pub target: InitializerTarget,
    pub arguments: Vec<NodeIndex>,
}

#[derive(Clone, Debug, Default)]
pub struct BlockData {
    pub statements: Vec<NodeIndex>,
}

#[derive(Clone, Debug, Default)]
pub struct ReturnData {
    pub expression: NodeIndex,
}

#[derive(Clone, Debug, Default)]
pub struct IfData {
    pub condition: NodeIndex,
    pub then_statement: NodeIndex,
    pub else_statement: NodeIndex,
}

/// `while` and `do` statements.
#[derive(Clone, Debug, Default)]
pub struct LoopData {
    pub condition: NodeIndex,
    pub body: NodeIndex,
}

#[derive(Clone, Debug, Default)]
pub struct ForData {
    pub init: NodeIndex,
    /// `NONE` for `for (;;)`.
    pub condition: NodeIndex,
    pub increment: NodeIndex,
    pub body: NodeIndex,
}

#[derive(Clone, Debug, Default)]
pub struct SwitchData {
    pub condition: NodeIndex,
    pub cases: Vec<NodeIndex>,
    pub default: NodeIndex,
}

/// `case` and `default` clauses; `values` is empty for `default`.
#[derive(Clone, Debug, Default)]
pub struct ClauseData {
    pub values: Vec<NodeIndex>,
    pub statements: Vec<NodeIndex>,
}

#[derive(Clone, Debug, Default)]
pub struct ConstructionData {
    pub name: String,
    pub type_expr: NodeIndex,
    pub arguments: Vec<NodeIndex>,
}

#[derive(Clone, Debug, Default)]
pub struct AssignmentData {
    pub target: NodeIndex,
    pub source: NodeIndex,
}

/// Expression statements and `throw`.
#[derive(Clone, Debug, Default)]
pub struct ExpressionData {
    pub expression: NodeIndex,
}

#[derive(Clone, Debug, Default)]
pub struct IdentifierData {
    pub name: String,
}

#[derive(Clone, Debug)]
pub struct UnaryData {
    pub op: UnaryOp,
    pub operand: NodeIndex,
}

#[derive(Clone, Debug)]
pub struct BinaryData {
    pub op: BinaryOp,
    pub left: NodeIndex,
    pub right: NodeIndex,
}

#[derive(Clone, Debug, Default)]
pub struct InvokeData {
    pub callee: NodeIndex,
    pub arguments: Vec<NodeIndex>,
}

#[derive(Clone, Debug, Default)]
pub struct DotData {
    pub subject: NodeIndex,
    pub member: String,
}

#[derive(Clone, Debug, Default)]
pub struct TypeNameData {
    /// Possibly qualified: `System.String`.
    pub name: String,
}

#[derive(Clone, Debug, Default)]
pub struct DerivedTypeData {
    pub base: NodeIndex,
    pub derivations: Derivations,
}

#[derive(Clone, Debug, Default)]
pub struct TemplateIdData {
    pub primary: NodeIndex,
    pub arguments: Vec<NodeIndex>,
}

#[derive(Clone, Debug)]
pub enum NodeData {
    None,
    CompileUnit(CompileUnitData),
    Namespace(NamespaceData),
    UsingNamespace(UsingNamespaceData),
    Class(ClassData),
    Interface(InterfaceData),
    Enum(EnumData),
    EnumConstant(EnumConstantData),
    Constant(ConstantData),
    Typedef(TypedefData),
    Delegate(DelegateData),
    Concept(ConceptData),
    TemplateParameter(TemplateParameterData),
    Function(FunctionData),
    Parameter(ParameterData),
    MemberVariable(MemberVariableData),
    Initializer(InitializerData),
    Block(BlockData),
    Return(ReturnData),
    If(IfData),
    Loop(LoopData),
    For(ForData),
    Switch(SwitchData),
    Clause(ClauseData),
    Construction(ConstructionData),
    Assignment(AssignmentData),
    Expression(ExpressionData),
    Literal(LiteralValue),
    Identifier(IdentifierData),
    Unary(UnaryData),
    Binary(BinaryData),
    Invoke(InvokeData),
    Dot(DotData),
    TypeName(TypeNameData),
    DerivedType(DerivedTypeData),
    TemplateId(TemplateIdData),
}

impl NodeData {
    /// Direct children in source order. Used to wire parent links.
    #[must_use]
    pub fn children(&self) -> Vec<NodeIndex> {
        let mut out = Vec::new();
        let mut push = |idx: NodeIndex| {
            if idx.is_some() {
                out.push(idx);
            }
        };
        match self {
            NodeData::None
            | NodeData::UsingNamespace(_)
            | NodeData::Concept(_)
            | NodeData::TemplateParameter(_)
            | NodeData::Literal(_)
            | NodeData::Identifier(_)
            | NodeData::TypeName(_) => {}
            NodeData::CompileUnit(data) => data.members.iter().copied().for_each(push),
            NodeData::Namespace(data) => data.members.iter().copied().for_each(push),
            NodeData::Class(data) => {
                data.template_parameters.iter().copied().for_each(&mut push);
                data.base_types.iter().copied().for_each(&mut push);
                data.members.iter().copied().for_each(&mut push);
            }
            NodeData::Interface(data) => data.members.iter().copied().for_each(push),
            NodeData::Enum(data) => {
                push(data.underlying_type);
                data.constants.iter().copied().for_each(&mut push);
            }
            NodeData::EnumConstant(data) => push(data.value),
            NodeData::Constant(data) => {
                push(data.type_expr);
                push(data.value);
            }
            NodeData::Typedef(data) => push(data.type_expr),
            NodeData::Delegate(data) => {
                push(data.return_type);
                data.parameters.iter().copied().for_each(&mut push);
            }
            NodeData::Function(data) => {
                push(data.return_type);
                data.template_parameters.iter().copied().for_each(&mut push);
                data.parameters.iter().copied().for_each(&mut push);
                data.initializers.iter().copied().for_each(&mut push);
                push(data.body);
            }
            NodeData::Parameter(data) => push(data.type_expr),
            NodeData::MemberVariable(data) => push(data.type_expr),
            NodeData::Initializer(data) => data.arguments.iter().copied().for_each(push),
            NodeData::Block(data) => data.statements.iter().copied().for_each(push),
            NodeData::Return(data) => push(data.expression),
            NodeData::If(data) => {
                push(data.condition);
                push(data.then_statement);
                push(data.else_statement);
            }
            NodeData::Loop(data) => {
                push(data.condition);
                push(data.body);
            }
            NodeData::For(data) => {
                push(data.init);
                push(data.condition);
                push(data.increment);
                push(data.body);
            }
            NodeData::Switch(data) => {
                push(data.condition);
                data.cases.iter().copied().for_each(&mut push);
                push(data.default);
            }
            NodeData::Clause(data) => {
                data.values.iter().copied().for_each(&mut push);
                data.statements.iter().copied().for_each(&mut push);
            }
            NodeData::Construction(data) => {
                push(data.type_expr);
                data.arguments.iter().copied().for_each(&mut push);
            }
            NodeData::Assignment(data) => {
                push(data.target);
                push(data.source);
            }
            NodeData::Expression(data) => push(data.expression),
            NodeData::Unary(data) => push(data.operand),
            NodeData::Binary(data) => {
                push(data.left);
                push(data.right);
            }
            NodeData::Invoke(data) => {
                push(data.callee);
                data.arguments.iter().copied().for_each(&mut push);
            }
            NodeData::Dot(data) => push(data.subject),
            NodeData::DerivedType(data) => push(data.base),
            NodeData::TemplateId(data) => {
                push(data.primary);
                data.arguments.iter().copied().for_each(&mut push);
            }
        }
        out
    }
}

/// A single AST node.
#[derive(Clone, Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    pub parent: NodeIndex,
    pub data: NodeData,
}

/// Owns every node of one compile unit.
#[derive(Clone, Debug, Default)]
pub struct NodeArena {
    pub(crate) nodes: Vec<Node>,
    pub(crate) file: FileId,
}
