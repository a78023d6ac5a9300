//! NodeArena creation methods (add_* methods).
//!
//! Children must be created before their parent; adding a node wires the
//! parent link of every direct child. Nodes created without an explicit span
//! get a synthetic, unique one so diagnostics can still tell them apart.

use crate::base::NodeIndex;
use crate::node::*;
use cmc_common::{FileId, Span};

impl NodeArena {
    /// Width of the synthetic span given to nodes built without one.
    const SYNTHETIC_SPAN_WIDTH: u32 = 8;

    pub fn new() -> NodeArena {
        NodeArena::default()
    }

    pub fn with_file(file: FileId) -> NodeArena {
        NodeArena {
            nodes: Vec::new(),
            file,
        }
    }

    #[inline]
    pub fn file(&self) -> FileId {
        self.file
    }

    pub fn add_node(&mut self, kind: NodeKind, data: NodeData) -> NodeIndex {
        let start = (self.nodes.len() as u32 + 1) * Self::SYNTHETIC_SPAN_WIDTH;
        let span = Span::new(self.file, start, start + Self::SYNTHETIC_SPAN_WIDTH);
        self.add_node_with_span(kind, span, data)
    }

    pub fn add_node_with_span(&mut self, kind: NodeKind, span: Span, data: NodeData) -> NodeIndex {
        let idx = NodeIndex(self.nodes.len() as u32);
        let children = data.children();
        self.nodes.push(Node {
            kind,
            span,
            parent: NodeIndex::NONE,
            data,
        });
        for child in children {
            if let Some(node) = self.nodes.get_mut(child.0 as usize) {
                node.parent = idx;
            }
        }
        idx
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    pub fn add_compile_unit(&mut self, file_name: &str, members: Vec<NodeIndex>) -> NodeIndex {
        self.add_node(
            NodeKind::CompileUnit,
            NodeData::CompileUnit(CompileUnitData {
                file_name: file_name.to_string(),
                members,
            }),
        )
    }

    pub fn add_namespace(&mut self, name: &str, members: Vec<NodeIndex>) -> NodeIndex {
        self.add_node(
            NodeKind::Namespace,
            NodeData::Namespace(NamespaceData {
                name: name.to_string(),
                members,
            }),
        )
    }

    pub fn add_using_namespace(&mut self, namespace: &str) -> NodeIndex {
        self.add_node(
            NodeKind::UsingNamespace,
            NodeData::UsingNamespace(UsingNamespaceData {
                namespace: namespace.to_string(),
            }),
        )
    }

    pub fn add_class(&mut self, data: ClassData) -> NodeIndex {
        self.add_node(NodeKind::Class, NodeData::Class(data))
    }

    /// Shorthand for a non-template class without bases.
    pub fn add_class_decl(
        &mut self,
        name: &str,
        specifiers: Specifiers,
        members: Vec<NodeIndex>,
    ) -> NodeIndex {
        self.add_class(ClassData {
            name: name.to_string(),
            specifiers,
            members,
            ..ClassData::default()
        })
    }

    pub fn add_interface(
        &mut self,
        name: &str,
        specifiers: Specifiers,
        members: Vec<NodeIndex>,
    ) -> NodeIndex {
        self.add_node(
            NodeKind::Interface,
            NodeData::Interface(InterfaceData {
                name: name.to_string(),
                specifiers,
                members,
            }),
        )
    }

    pub fn add_enum(
        &mut self,
        name: &str,
        specifiers: Specifiers,
        underlying_type: NodeIndex,
        constants: Vec<NodeIndex>,
    ) -> NodeIndex {
        self.add_node(
            NodeKind::Enum,
            NodeData::Enum(EnumData {
                name: name.to_string(),
                specifiers,
                underlying_type,
                constants,
            }),
        )
    }

    pub fn add_enum_constant(&mut self, name: &str, value: NodeIndex) -> NodeIndex {
        self.add_node(
            NodeKind::EnumConstant,
            NodeData::EnumConstant(EnumConstantData {
                name: name.to_string(),
                value,
            }),
        )
    }

    pub fn add_constant(
        &mut self,
        name: &str,
        specifiers: Specifiers,
        type_expr: NodeIndex,
        value: NodeIndex,
    ) -> NodeIndex {
        self.add_node(
            NodeKind::Constant,
            NodeData::Constant(ConstantData {
                name: name.to_string(),
                specifiers,
                type_expr,
                value,
            }),
        )
    }

    pub fn add_typedef(&mut self, name: &str, specifiers: Specifiers, type_expr: NodeIndex) -> NodeIndex {
        self.add_node(
            NodeKind::Typedef,
            NodeData::Typedef(TypedefData {
                name: name.to_string(),
                specifiers,
                type_expr,
            }),
        )
    }

    pub fn add_delegate(
        &mut self,
        name: &str,
        specifiers: Specifiers,
        return_type: NodeIndex,
        parameters: Vec<NodeIndex>,
    ) -> NodeIndex {
        self.add_node(
            NodeKind::Delegate,
            NodeData::Delegate(DelegateData {
                name: name.to_string(),
                specifiers,
                return_type,
                parameters,
            }),
        )
    }

    pub fn add_class_delegate(
        &mut self,
        name: &str,
        specifiers: Specifiers,
        return_type: NodeIndex,
        parameters: Vec<NodeIndex>,
    ) -> NodeIndex {
        self.add_node(
            NodeKind::ClassDelegate,
            NodeData::Delegate(DelegateData {
                name: name.to_string(),
                specifiers,
                return_type,
                parameters,
            }),
        )
    }

    pub fn add_concept(&mut self, name: &str, specifiers: Specifiers, type_parameters: &[&str]) -> NodeIndex {
        self.add_node(
            NodeKind::Concept,
            NodeData::Concept(ConceptData {
                name: name.to_string(),
                specifiers,
                type_parameters: type_parameters.iter().map(|p| p.to_string()).collect(),
            }),
        )
    }

    pub fn add_template_parameter(&mut self, name: &str) -> NodeIndex {
        self.add_node(
            NodeKind::TemplateParameter,
            NodeData::TemplateParameter(TemplateParameterData {
                name: name.to_string(),
            }),
        )
    }

    /// Add a function-like node. `kind` must be one of `Function`,
    /// `Constructor`, `Destructor` or `ConversionFunction`.
    pub fn add_function(&mut self, kind: NodeKind, data: FunctionData) -> NodeIndex {
        debug_assert!(kind.is_function_like());
        self.add_node(kind, NodeData::Function(data))
    }

    pub fn add_parameter(&mut self, name: &str, type_expr: NodeIndex) -> NodeIndex {
        self.add_node(
            NodeKind::Parameter,
            NodeData::Parameter(ParameterData {
                name: Some(name.to_string()),
                type_expr,
            }),
        )
    }

    pub fn add_member_variable(
        &mut self,
        name: &str,
        specifiers: Specifiers,
        type_expr: NodeIndex,
    ) -> NodeIndex {
        self.add_node(
            NodeKind::MemberVariable,
            NodeData::MemberVariable(MemberVariableData {
                name: name.to_string(),
                specifiers,
                type_expr,
            }),
        )
    }

    pub fn add_initializer(&mut self, target: InitializerTarget, arguments: Vec<NodeIndex>) -> NodeIndex {
        self.add_node(
            NodeKind::Initializer,
            NodeData::Initializer(InitializerData { target, arguments }),
        )
    }

    // =========================================================================
    // Statements
    // =========================================================================

    pub fn add_block(&mut self, statements: Vec<NodeIndex>) -> NodeIndex {
        self.add_node(NodeKind::Compound, NodeData::Block(BlockData { statements }))
    }

    pub fn add_return(&mut self, expression: NodeIndex) -> NodeIndex {
        self.add_node(NodeKind::Return, NodeData::Return(ReturnData { expression }))
    }

    pub fn add_if(
        &mut self,
        condition: NodeIndex,
        then_statement: NodeIndex,
        else_statement: NodeIndex,
    ) -> NodeIndex {
        self.add_node(
            NodeKind::If,
            NodeData::If(IfData {
                condition,
                then_statement,
                else_statement,
            }),
        )
    }

    pub fn add_while(&mut self, condition: NodeIndex, body: NodeIndex) -> NodeIndex {
        self.add_node(NodeKind::While, NodeData::Loop(LoopData { condition, body }))
    }

    pub fn add_do(&mut self, body: NodeIndex, condition: NodeIndex) -> NodeIndex {
        self.add_node(NodeKind::Do, NodeData::Loop(LoopData { condition, body }))
    }

    pub fn add_for(
        &mut self,
        init: NodeIndex,
        condition: NodeIndex,
        increment: NodeIndex,
        body: NodeIndex,
    ) -> NodeIndex {
        self.add_node(
            NodeKind::For,
            NodeData::For(ForData {
                init,
                condition,
                increment,
                body,
            }),
        )
    }

    pub fn add_switch(
        &mut self,
        condition: NodeIndex,
        cases: Vec<NodeIndex>,
        default: NodeIndex,
    ) -> NodeIndex {
        self.add_node(
            NodeKind::Switch,
            NodeData::Switch(SwitchData {
                condition,
                cases,
                default,
            }),
        )
    }

    pub fn add_case(&mut self, values: Vec<NodeIndex>, statements: Vec<NodeIndex>) -> NodeIndex {
        self.add_node(NodeKind::Case, NodeData::Clause(ClauseData { values, statements }))
    }

    pub fn add_default(&mut self, statements: Vec<NodeIndex>) -> NodeIndex {
        self.add_node(
            NodeKind::Default,
            NodeData::Clause(ClauseData {
                values: Vec::new(),
                statements,
            }),
        )
    }

    pub fn add_break(&mut self) -> NodeIndex {
        self.add_node(NodeKind::Break, NodeData::None)
    }

    pub fn add_continue(&mut self) -> NodeIndex {
        self.add_node(NodeKind::Continue, NodeData::None)
    }

    pub fn add_empty(&mut self) -> NodeIndex {
        self.add_node(NodeKind::Empty, NodeData::None)
    }

    pub fn add_construction(
        &mut self,
        name: &str,
        type_expr: NodeIndex,
        arguments: Vec<NodeIndex>,
    ) -> NodeIndex {
        self.add_node(
            NodeKind::Construction,
            NodeData::Construction(ConstructionData {
                name: name.to_string(),
                type_expr,
                arguments,
            }),
        )
    }

    pub fn add_assignment(&mut self, target: NodeIndex, source: NodeIndex) -> NodeIndex {
        self.add_node(
            NodeKind::Assignment,
            NodeData::Assignment(AssignmentData { target, source }),
        )
    }

    pub fn add_expression_statement(&mut self, expression: NodeIndex) -> NodeIndex {
        self.add_node(
            NodeKind::ExpressionStatement,
            NodeData::Expression(ExpressionData { expression }),
        )
    }

    pub fn add_throw(&mut self, expression: NodeIndex) -> NodeIndex {
        self.add_node(NodeKind::Throw, NodeData::Expression(ExpressionData { expression }))
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    pub fn add_literal(&mut self, value: LiteralValue) -> NodeIndex {
        self.add_node(NodeKind::Literal, NodeData::Literal(value))
    }

    pub fn add_bool(&mut self, value: bool) -> NodeIndex {
        self.add_literal(LiteralValue::Bool(value))
    }

    pub fn add_int(&mut self, value: i64) -> NodeIndex {
        self.add_literal(LiteralValue::Int(value))
    }

    pub fn add_identifier(&mut self, name: &str) -> NodeIndex {
        self.add_node(
            NodeKind::Identifier,
            NodeData::Identifier(IdentifierData {
                name: name.to_string(),
            }),
        )
    }

    pub fn add_this(&mut self) -> NodeIndex {
        self.add_node(NodeKind::This, NodeData::None)
    }

    pub fn add_unary(&mut self, op: UnaryOp, operand: NodeIndex) -> NodeIndex {
        self.add_node(NodeKind::Unary, NodeData::Unary(UnaryData { op, operand }))
    }

    pub fn add_binary(&mut self, op: BinaryOp, left: NodeIndex, right: NodeIndex) -> NodeIndex {
        self.add_node(NodeKind::Binary, NodeData::Binary(BinaryData { op, left, right }))
    }

    pub fn add_invoke(&mut self, callee: NodeIndex, arguments: Vec<NodeIndex>) -> NodeIndex {
        self.add_node(NodeKind::Invoke, NodeData::Invoke(InvokeData { callee, arguments }))
    }

    pub fn add_dot(&mut self, subject: NodeIndex, member: &str) -> NodeIndex {
        self.add_node(
            NodeKind::Dot,
            NodeData::Dot(DotData {
                subject,
                member: member.to_string(),
            }),
        )
    }

    // =========================================================================
    // Type expressions
    // =========================================================================

    pub fn add_type_name(&mut self, name: &str) -> NodeIndex {
        self.add_node(
            NodeKind::TypeName,
            NodeData::TypeName(TypeNameData {
                name: name.to_string(),
            }),
        )
    }

    pub fn add_derived_type(&mut self, base: NodeIndex, derivations: Derivations) -> NodeIndex {
        self.add_node(
            NodeKind::DerivedType,
            NodeData::DerivedType(DerivedTypeData { base, derivations }),
        )
    }

    /// `const T&` for the named type `T`.
    pub fn add_const_ref(&mut self, type_name: &str) -> NodeIndex {
        let base = self.add_type_name(type_name);
        self.add_derived_type(base, Derivations::CONST_REF)
    }

    /// `T&&` for the named type `T`.
    pub fn add_rvalue_ref(&mut self, type_name: &str) -> NodeIndex {
        let base = self.add_type_name(type_name);
        self.add_derived_type(base, Derivations::RVALUE_REF)
    }

    pub fn add_template_id(&mut self, primary: NodeIndex, arguments: Vec<NodeIndex>) -> NodeIndex {
        self.add_node(
            NodeKind::TemplateId,
            NodeData::TemplateId(TemplateIdData { primary, arguments }),
        )
    }
}
