//! NodeArena access methods.
//!
//! Each `get_*` accessor returns the kind-specific data of a node, or `None`
//! when the node is of a different shape.

use crate::base::NodeIndex;
use crate::node::*;
use cmc_common::Span;

impl NodeArena {
    /// Get a node by index
    #[inline]
    pub fn get(&self, index: NodeIndex) -> Option<&Node> {
        if index.is_none() {
            None
        } else {
            self.nodes.get(index.0 as usize)
        }
    }

    #[inline]
    pub fn get_mut(&mut self, index: NodeIndex) -> Option<&mut Node> {
        if index.is_none() {
            None
        } else {
            self.nodes.get_mut(index.0 as usize)
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn kind(&self, index: NodeIndex) -> Option<NodeKind> {
        self.get(index).map(|n| n.kind)
    }

    /// Parent of a node; `NONE` for roots and unknown indices.
    #[inline]
    pub fn parent(&self, index: NodeIndex) -> NodeIndex {
        self.get(index).map_or(NodeIndex::NONE, |n| n.parent)
    }

    /// Span of a node; `Span::DUMMY` for unknown indices.
    #[inline]
    pub fn span(&self, index: NodeIndex) -> Span {
        self.get(index).map_or(Span::DUMMY, |n| n.span)
    }

    /// Override the span of an existing node.
    pub fn set_span(&mut self, index: NodeIndex, span: Span) {
        if let Some(node) = self.get_mut(index) {
            node.span = span;
        }
    }

    pub fn get_compile_unit<'n>(&self, node: &'n Node) -> Option<&'n CompileUnitData> {
        match &node.data {
            NodeData::CompileUnit(data) => Some(data),
            _ => None,
        }
    }

    pub fn get_namespace<'n>(&self, node: &'n Node) -> Option<&'n NamespaceData> {
        match &node.data {
            NodeData::Namespace(data) => Some(data),
            _ => None,
        }
    }

    pub fn get_using_namespace<'n>(&self, node: &'n Node) -> Option<&'n UsingNamespaceData> {
        match &node.data {
            NodeData::UsingNamespace(data) => Some(data),
            _ => None,
        }
    }

    pub fn get_class<'n>(&self, node: &'n Node) -> Option<&'n ClassData> {
        match &node.data {
            NodeData::Class(data) => Some(data),
            _ => None,
        }
    }

    pub fn get_interface<'n>(&self, node: &'n Node) -> Option<&'n InterfaceData> {
        match &node.data {
            NodeData::Interface(data) => Some(data),
            _ => None,
        }
    }

    pub fn get_enum<'n>(&self, node: &'n Node) -> Option<&'n EnumData> {
        match &node.data {
            NodeData::Enum(data) => Some(data),
            _ => None,
        }
    }

    pub fn get_enum_constant<'n>(&self, node: &'n Node) -> Option<&'n EnumConstantData> {
        match &node.data {
            NodeData::EnumConstant(data) => Some(data),
            _ => None,
        }
    }

    pub fn get_constant<'n>(&self, node: &'n Node) -> Option<&'n ConstantData> {
        match &node.data {
            NodeData::Constant(data) => Some(data),
            _ => None,
        }
    }

    pub fn get_typedef<'n>(&self, node: &'n Node) -> Option<&'n TypedefData> {
        match &node.data {
            NodeData::Typedef(data) => Some(data),
            _ => None,
        }
    }

    /// Delegates and class delegates.
    pub fn get_delegate<'n>(&self, node: &'n Node) -> Option<&'n DelegateData> {
        match &node.data {
            NodeData::Delegate(data) => Some(data),
            _ => None,
        }
    }

    pub fn get_concept<'n>(&self, node: &'n Node) -> Option<&'n ConceptData> {
        match &node.data {
            NodeData::Concept(data) => Some(data),
            _ => None,
        }
    }

    pub fn get_template_parameter<'n>(&self, node: &'n Node) -> Option<&'n TemplateParameterData> {
        match &node.data {
            NodeData::TemplateParameter(data) => Some(data),
            _ => None,
        }
    }

    /// Function-like declarations: functions, constructors, destructors and
    /// conversion functions.
    pub fn get_function<'n>(&self, node: &'n Node) -> Option<&'n FunctionData> {
        match &node.data {
            NodeData::Function(data) => Some(data),
            _ => None,
        }
    }

    pub fn get_parameter<'n>(&self, node: &'n Node) -> Option<&'n ParameterData> {
        match &node.data {
            NodeData::Parameter(data) => Some(data),
            _ => None,
        }
    }

    pub fn get_member_variable<'n>(&self, node: &'n Node) -> Option<&'n MemberVariableData> {
        match &node.data {
            NodeData::MemberVariable(data) => Some(data),
            _ => None,
        }
    }

    pub fn get_initializer<'n>(&self, node: &'n Node) -> Option<&'n InitializerData> {
        match &node.data {
            NodeData::Initializer(data) => Some(data),
            _ => None,
        }
    }

    pub fn get_block<'n>(&self, node: &'n Node) -> Option<&'n BlockData> {
        match &node.data {
            NodeData::Block(data) => Some(data),
            _ => None,
        }
    }

    pub fn get_return<'n>(&self, node: &'n Node) -> Option<&'n ReturnData> {
        match &node.data {
            NodeData::Return(data) => Some(data),
            _ => None,
        }
    }

    pub fn get_if_statement<'n>(&self, node: &'n Node) -> Option<&'n IfData> {
        match &node.data {
            NodeData::If(data) => Some(data),
            _ => None,
        }
    }

    /// `while` and `do` statements.
    pub fn get_loop<'n>(&self, node: &'n Node) -> Option<&'n LoopData> {
        match &node.data {
            NodeData::Loop(data) => Some(data),
            _ => None,
        }
    }

    pub fn get_for<'n>(&self, node: &'n Node) -> Option<&'n ForData> {
        match &node.data {
            NodeData::For(data) => Some(data),
            _ => None,
        }
    }

    pub fn get_switch<'n>(&self, node: &'n Node) -> Option<&'n SwitchData> {
        match &node.data {
            NodeData::Switch(data) => Some(data),
            _ => None,
        }
    }

    pub fn get_clause<'n>(&self, node: &'n Node) -> Option<&'n ClauseData> {
        match &node.data {
            NodeData::Clause(data) => Some(data),
            _ => None,
        }
    }

    pub fn get_construction<'n>(&self, node: &'n Node) -> Option<&'n ConstructionData> {
        match &node.data {
            NodeData::Construction(data) => Some(data),
            _ => None,
        }
    }

    pub fn get_assignment<'n>(&self, node: &'n Node) -> Option<&'n AssignmentData> {
        match &node.data {
            NodeData::Assignment(data) => Some(data),
            _ => None,
        }
    }

    /// Expression statements and `throw`.
    pub fn get_expression_statement<'n>(&self, node: &'n Node) -> Option<&'n ExpressionData> {
        match &node.data {
            NodeData::Expression(data) => Some(data),
            _ => None,
        }
    }

    pub fn get_literal<'n>(&self, node: &'n Node) -> Option<&'n LiteralValue> {
        match &node.data {
            NodeData::Literal(value) => Some(value),
            _ => None,
        }
    }

    pub fn get_identifier<'n>(&self, node: &'n Node) -> Option<&'n IdentifierData> {
        match &node.data {
            NodeData::Identifier(data) => Some(data),
            _ => None,
        }
    }

    pub fn get_unary<'n>(&self, node: &'n Node) -> Option<&'n UnaryData> {
        match &node.data {
            NodeData::Unary(data) => Some(data),
            _ => None,
        }
    }

    pub fn get_binary<'n>(&self, node: &'n Node) -> Option<&'n BinaryData> {
        match &node.data {
            NodeData::Binary(data) => Some(data),
            _ => None,
        }
    }

    pub fn get_invoke<'n>(&self, node: &'n Node) -> Option<&'n InvokeData> {
        match &node.data {
            NodeData::Invoke(data) => Some(data),
            _ => None,
        }
    }

    pub fn get_dot<'n>(&self, node: &'n Node) -> Option<&'n DotData> {
        match &node.data {
            NodeData::Dot(data) => Some(data),
            _ => None,
        }
    }

    pub fn get_type_name<'n>(&self, node: &'n Node) -> Option<&'n TypeNameData> {
        match &node.data {
            NodeData::TypeName(data) => Some(data),
            _ => None,
        }
    }

    pub fn get_derived_type<'n>(&self, node: &'n Node) -> Option<&'n DerivedTypeData> {
        match &node.data {
            NodeData::DerivedType(data) => Some(data),
            _ => None,
        }
    }

    pub fn get_template_id<'n>(&self, node: &'n Node) -> Option<&'n TemplateIdData> {
        match &node.data {
            NodeData::TemplateId(data) => Some(data),
            _ => None,
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Declared name of a declaration node, if it has one.
    pub fn declared_name(&self, index: NodeIndex) -> Option<&str> {
        let node = self.get(index)?;
        let name = match &node.data {
            NodeData::Namespace(d) => &d.name,
            NodeData::Class(d) => &d.name,
            NodeData::Interface(d) => &d.name,
            NodeData::Enum(d) => &d.name,
            NodeData::EnumConstant(d) => &d.name,
            NodeData::Constant(d) => &d.name,
            NodeData::Typedef(d) => &d.name,
            NodeData::Delegate(d) => &d.name,
            NodeData::Concept(d) => &d.name,
            NodeData::TemplateParameter(d) => &d.name,
            NodeData::Function(d) => &d.name,
            NodeData::MemberVariable(d) => &d.name,
            NodeData::Construction(d) => &d.name,
            NodeData::Parameter(d) => return d.name.as_deref(),
            _ => return None,
        };
        Some(name.as_str())
    }

    /// A constructor carrying the `static` specifier.
    pub fn is_static_constructor(&self, index: NodeIndex) -> bool {
        let Some(node) = self.get(index) else {
            return false;
        };
        node.kind == NodeKind::Constructor
            && self
                .get_function(node)
                .is_some_and(|f| f.specifiers.contains(Specifiers::STATIC))
    }

    /// Nearest ancestor (not including `index`) whose kind satisfies `pred`.
    pub fn find_ancestor(&self, index: NodeIndex, pred: impl Fn(NodeKind) -> bool) -> NodeIndex {
        let mut current = self.parent(index);
        let mut steps = 0usize;
        while current.is_some() && steps < cmc_common::limits::MAX_NODE_PARENT_WALK {
            match self.get(current) {
                Some(node) if pred(node.kind) => return current,
                Some(node) => current = node.parent,
                None => break,
            }
            steps += 1;
        }
        NodeIndex::NONE
    }

    /// Iterate over all node indices in creation order.
    pub fn indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        (0..self.nodes.len() as u32).map(NodeIndex)
    }
}
