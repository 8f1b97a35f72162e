//! Collects declared composite types.

use super::{AstNode, NodeKind, TypeMember};

#[derive(Debug, Clone, PartialEq)]
pub struct CompositeType {
    pub name: String,
    pub members: Vec<TypeMember>,
}

#[derive(Default)]
pub struct TypeFinder {
    pub types: Vec<CompositeType>,
}

impl TypeFinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run(&mut self, root: &AstNode) {
        match &root.kind {
            NodeKind::Sequence { children } => {
                for child in children {
                    self.run(child);
                }
            }
            NodeKind::Statement {
                child: Some(child), ..
            } => self.run(child),
            NodeKind::TypeDeclaration { name, members } => {
                self.types.push(CompositeType {
                    name: name.clone(),
                    members: members.clone(),
                });
            }
            _ => {}
        }
    }
}
