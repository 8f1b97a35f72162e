//! Abstract syntax tree of the Neon language.
//!
//! Each node owns its children and carries a [`NodeId`] assigned during
//! construction; side tables (the type map, the codegen value map) key on it
//! instead of holding back references into the tree.

mod builder;
mod import_finder;
mod printer;
mod type_finder;

pub use builder::AstBuilder;
pub use import_finder::ImportFinder;
pub use printer::{flatten_ast, print_ast, print_ast_test_case, print_expression};
pub use type_finder::{CompositeType, TypeFinder};

use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Void,
    Int,
    Float,
    Bool,
}

impl DataType {
    pub fn from_name(name: &str) -> Option<DataType> {
        match name {
            "void" => Some(DataType::Void),
            "int" => Some(DataType::Int),
            "float" => Some(DataType::Float),
            "bool" => Some(DataType::Bool),
            _ => None,
        }
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DataType::Void => "void",
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::Bool => "bool",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOperator {
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Add | BinaryOperator::Sub | BinaryOperator::Mul | BinaryOperator::Div
        )
    }

    pub fn is_relational(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Eq
                | BinaryOperator::Neq
                | BinaryOperator::Lt
                | BinaryOperator::Le
                | BinaryOperator::Gt
                | BinaryOperator::Ge
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOperator::And | BinaryOperator::Or)
    }
}

impl Display for BinaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Eq => "==",
            BinaryOperator::Neq => "!=",
            BinaryOperator::Lt => "<",
            BinaryOperator::Le => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::Ge => ">=",
            BinaryOperator::And => "and",
            BinaryOperator::Or => "or",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeMember {
    pub name: String,
    pub data_type: DataType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AstNode {
    pub id: NodeId,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Sequence {
        children: Vec<AstNode>,
    },
    Statement {
        is_return: bool,
        child: Option<Box<AstNode>>,
    },
    IntegerLiteral {
        value: i64,
    },
    FloatLiteral {
        value: f64,
    },
    BoolLiteral {
        value: bool,
    },
    Variable {
        name: String,
        index: Option<Box<AstNode>>,
    },
    VariableDefinition {
        name: String,
        data_type: DataType,
    },
    Assignment {
        left: Box<AstNode>,
        right: Box<AstNode>,
    },
    UnaryOperation {
        op: UnaryOperator,
        child: Box<AstNode>,
    },
    BinaryOperation {
        op: BinaryOperator,
        left: Box<AstNode>,
        right: Box<AstNode>,
    },
    Function {
        name: String,
        return_type: DataType,
        arguments: Vec<AstNode>,
        /// `None` for extern declarations; defined functions always carry a
        /// body, possibly an empty sequence.
        body: Option<Box<AstNode>>,
    },
    Call {
        name: String,
        arguments: Vec<AstNode>,
    },
    IfStatement {
        condition: Box<AstNode>,
        if_body: Option<Box<AstNode>>,
        else_body: Option<Box<AstNode>>,
    },
    ForStatement {
        init: Box<AstNode>,
        condition: Box<AstNode>,
        update: Box<AstNode>,
        body: Option<Box<AstNode>>,
    },
    Assert {
        condition: Box<AstNode>,
    },
    Import {
        file_name: String,
    },
    TypeDeclaration {
        name: String,
        members: Vec<TypeMember>,
    },
}

impl AstNode {
    /// Name of the node kind, used by the printers.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::Sequence { .. } => "Sequence",
            NodeKind::Statement { .. } => "Statement",
            NodeKind::IntegerLiteral { .. } => "IntegerLiteral",
            NodeKind::FloatLiteral { .. } => "FloatLiteral",
            NodeKind::BoolLiteral { .. } => "BoolLiteral",
            NodeKind::Variable { .. } => "Variable",
            NodeKind::VariableDefinition { .. } => "VariableDefinition",
            NodeKind::Assignment { .. } => "Assignment",
            NodeKind::UnaryOperation { .. } => "UnaryOperation",
            NodeKind::BinaryOperation { .. } => "BinaryOperation",
            NodeKind::Function { .. } => "Function",
            NodeKind::Call { .. } => "Call",
            NodeKind::IfStatement { .. } => "IfStatement",
            NodeKind::ForStatement { .. } => "ForStatement",
            NodeKind::Assert { .. } => "Assert",
            NodeKind::Import { .. } => "Import",
            NodeKind::TypeDeclaration { .. } => "TypeDeclaration",
        }
    }

    /// Whether the node, read textually, ends in a return statement. Decides
    /// if a lowered branch still needs a jump to its merge block.
    pub fn ends_in_return(&self) -> bool {
        match &self.kind {
            NodeKind::Statement { is_return, .. } => *is_return,
            NodeKind::Sequence { children } => {
                children.last().is_some_and(AstNode::ends_in_return)
            }
            _ => false,
        }
    }
}
