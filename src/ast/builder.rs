//! Reduction of the concrete parse tree into the AST.
//!
//! The builder walks the parse tree recursively. Chain productions collapse
//! through the single-child pass-through, statement lists flatten into one
//! sequence, and sugar such as parenthesised factors disappears. Malformed
//! shapes are reported and elided rather than aborting the build.

use crate::{
    diagnostics::Diagnostics,
    parser::{GrammarSymbol, ParseTreeNode},
};

use super::{
    AstNode, BinaryOperator, DataType, NodeId, NodeKind, TypeMember, UnaryOperator,
};

pub struct AstBuilder {
    next_id: u32,
}

impl Default for AstBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AstBuilder {
    pub fn new() -> Self {
        Self { next_id: 0 }
    }

    /// Consumes the parse tree and returns the AST root, if any.
    pub fn run(
        &mut self,
        root: ParseTreeNode,
        diagnostics: &mut Diagnostics,
    ) -> Option<AstNode> {
        self.reduce(&root, diagnostics)
    }

    fn node(&mut self, kind: NodeKind) -> AstNode {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        AstNode { id, kind }
    }

    fn reduce(&mut self, node: &ParseTreeNode, diagnostics: &mut Diagnostics) -> Option<AstNode> {
        use GrammarSymbol::*;

        if is_binary_operation(node) {
            return self.reduce_binary_operation(node, diagnostics);
        }
        if is_unary_operation(node) {
            return self.reduce_unary_operation(node, diagnostics);
        }
        if is_literal(node) {
            return self.reduce_literal(node, diagnostics);
        }
        if is_sequence(node) {
            return self.reduce_sequence(node, diagnostics);
        }

        match node.symbol {
            Stmt => self.reduce_statement(node, diagnostics),
            VariableName => Some(self.node(NodeKind::Variable {
                name: node.token_content().to_owned(),
                index: None,
            })),
            ArrayAccess => self.reduce_array_access(node, diagnostics),
            VariableDefinition => self.reduce_variable_definition(node, diagnostics),
            Assignment => self.reduce_assignment(node, diagnostics),
            Call => self.reduce_call(node, diagnostics),
            Function => self.reduce_function(node, diagnostics),
            ExternFunction => self.reduce_extern_function(node, diagnostics),
            IfStatement => self.reduce_if_statement(node, diagnostics),
            ForStatement => self.reduce_for_statement(node, diagnostics),
            AssertStatement => self.reduce_assert(node, diagnostics),
            ImportStatement => self.reduce_import(node),
            TypeDeclaration => self.reduce_type_declaration(node, diagnostics),
            Semicolon | EndOfFile => None,
            _ => {
                if node.children.len() == 1 || node.symbol == Program {
                    return self.reduce(&node.children[0], diagnostics);
                }
                if node.symbol == Factor
                    && node.children.len() == 3
                    && node.children[0].symbol == LeftParen
                    && node.children[2].symbol == RightParen
                {
                    return self.reduce(&node.children[1], diagnostics);
                }

                diagnostics.report(format!(
                    "no suitable AST mapping for {:?}",
                    node.symbol
                ));
                None
            }
        }
    }

    fn reduce_binary_operation(
        &mut self,
        node: &ParseTreeNode,
        diagnostics: &mut Diagnostics,
    ) -> Option<AstNode> {
        let Some(op) = binary_operator_of(node.children[1].symbol) else {
            diagnostics.report(format!(
                "unknown binary operator {:?}",
                node.children[1].symbol
            ));
            return None;
        };
        let left = self.reduce(&node.children[0], diagnostics)?;
        let right = self.reduce(&node.children[2], diagnostics)?;
        Some(self.node(NodeKind::BinaryOperation {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }))
    }

    fn reduce_unary_operation(
        &mut self,
        node: &ParseTreeNode,
        diagnostics: &mut Diagnostics,
    ) -> Option<AstNode> {
        let child = self.reduce(&node.children[1], diagnostics)?;
        Some(self.node(NodeKind::UnaryOperation {
            op: UnaryOperator::Not,
            child: Box::new(child),
        }))
    }

    fn reduce_literal(
        &mut self,
        node: &ParseTreeNode,
        diagnostics: &mut Diagnostics,
    ) -> Option<AstNode> {
        let content = node.token_content();
        match node.symbol {
            GrammarSymbol::Integer => match content.parse::<i64>() {
                Ok(value) => Some(self.node(NodeKind::IntegerLiteral { value })),
                Err(_) => {
                    diagnostics.report(format!("invalid integer literal '{content}'"));
                    None
                }
            },
            GrammarSymbol::Float => match content.parse::<f64>() {
                Ok(value) => Some(self.node(NodeKind::FloatLiteral { value })),
                Err(_) => {
                    diagnostics.report(format!("invalid float literal '{content}'"));
                    None
                }
            },
            GrammarSymbol::True => Some(self.node(NodeKind::BoolLiteral { value: true })),
            GrammarSymbol::False => Some(self.node(NodeKind::BoolLiteral { value: false })),
            _ => None,
        }
    }

    /// Flattens a statement list. Nested lists append into the same sequence;
    /// a sequence left with a single child becomes that child.
    fn reduce_sequence(
        &mut self,
        node: &ParseTreeNode,
        diagnostics: &mut Diagnostics,
    ) -> Option<AstNode> {
        let mut children = vec![];
        self.collect_sequence(node, &mut children, diagnostics);

        if children.len() == 1 {
            return children.pop();
        }
        Some(self.node(NodeKind::Sequence { children }))
    }

    fn collect_sequence(
        &mut self,
        node: &ParseTreeNode,
        out: &mut Vec<AstNode>,
        diagnostics: &mut Diagnostics,
    ) {
        for child in &node.children {
            if is_sequence(child) {
                self.collect_sequence(child, out, diagnostics);
                continue;
            }
            if let Some(reduced) = self.reduce(child, diagnostics) {
                out.push(reduced);
            }
        }
    }

    fn reduce_statement(
        &mut self,
        node: &ParseTreeNode,
        diagnostics: &mut Diagnostics,
    ) -> Option<AstNode> {
        if node.children.is_empty() {
            diagnostics.report("statement without content");
            return None;
        }

        let is_return = node.children[0].symbol == GrammarSymbol::Return;
        let child_index = usize::from(is_return);
        let child = node
            .children
            .get(child_index)
            .and_then(|child| self.reduce(child, diagnostics))
            .map(Box::new);

        Some(self.node(NodeKind::Statement { is_return, child }))
    }

    fn reduce_array_access(
        &mut self,
        node: &ParseTreeNode,
        diagnostics: &mut Diagnostics,
    ) -> Option<AstNode> {
        let index = self.reduce(&node.children[2], diagnostics)?;
        Some(self.node(NodeKind::Variable {
            name: node.children[0].token_content().to_owned(),
            index: Some(Box::new(index)),
        }))
    }

    fn reduce_variable_definition(
        &mut self,
        node: &ParseTreeNode,
        diagnostics: &mut Diagnostics,
    ) -> Option<AstNode> {
        let data_type = self.data_type_of(&node.children[0], diagnostics);
        Some(self.node(NodeKind::VariableDefinition {
            name: node.children[1].token_content().to_owned(),
            data_type,
        }))
    }

    fn reduce_assignment(
        &mut self,
        node: &ParseTreeNode,
        diagnostics: &mut Diagnostics,
    ) -> Option<AstNode> {
        let left = self.reduce(&node.children[0], diagnostics);
        let right = self.reduce(&node.children[2], diagnostics);
        let (Some(left), Some(right)) = (left, right) else {
            diagnostics.report("malformed assignment");
            return None;
        };
        Some(self.node(NodeKind::Assignment {
            left: Box::new(left),
            right: Box::new(right),
        }))
    }

    fn reduce_call(
        &mut self,
        node: &ParseTreeNode,
        diagnostics: &mut Diagnostics,
    ) -> Option<AstNode> {
        let header = &node.children[0];
        let name = header.children[0].token_content().to_owned();

        let mut arguments = vec![];
        if node.children.len() == 3 {
            self.collect_call_args(&node.children[1], &mut arguments, diagnostics);
        }

        Some(self.node(NodeKind::Call { name, arguments }))
    }

    /// `CallArgs` is left-recursive; recursing into the head first keeps the
    /// arguments in source order.
    fn collect_call_args(
        &mut self,
        node: &ParseTreeNode,
        out: &mut Vec<AstNode>,
        diagnostics: &mut Diagnostics,
    ) {
        if node.children.len() == 3 {
            self.collect_call_args(&node.children[0], out, diagnostics);
            if let Some(argument) = self.reduce(&node.children[2], diagnostics) {
                out.push(argument);
            }
            return;
        }
        if let Some(argument) = self.reduce(&node.children[0], diagnostics) {
            out.push(argument);
        }
    }

    fn reduce_function(
        &mut self,
        node: &ParseTreeNode,
        diagnostics: &mut Diagnostics,
    ) -> Option<AstNode> {
        // children: FUN name ( [args] ) type { [body] }
        if node.children.len() < 7 {
            diagnostics.report("malformed function node");
            return None;
        }

        let name = node.children[1].token_content().to_owned();
        let has_args = node.children[3].symbol == GrammarSymbol::FunctionArgs;

        let mut arguments = vec![];
        if has_args {
            self.collect_function_args(&node.children[3], &mut arguments, diagnostics);
        }

        let type_index = if has_args { 5 } else { 4 };
        let return_type = self.data_type_of(&node.children[type_index], diagnostics);

        let body_node = &node.children[type_index + 2];
        let body = if body_node.symbol == GrammarSymbol::RightCurly {
            self.node(NodeKind::Sequence { children: vec![] })
        } else {
            self.reduce(body_node, diagnostics)?
        };

        Some(self.node(NodeKind::Function {
            name,
            return_type,
            arguments,
            body: Some(Box::new(body)),
        }))
    }

    fn reduce_extern_function(
        &mut self,
        node: &ParseTreeNode,
        diagnostics: &mut Diagnostics,
    ) -> Option<AstNode> {
        // children: EXTERN FUN name ( [args] ) type
        let name = node.children[2].token_content().to_owned();
        let has_args = node.children[4].symbol == GrammarSymbol::FunctionArgs;

        let mut arguments = vec![];
        if has_args {
            self.collect_function_args(&node.children[4], &mut arguments, diagnostics);
        }

        let type_index = if has_args { 6 } else { 5 };
        let return_type = self.data_type_of(&node.children[type_index], diagnostics);

        Some(self.node(NodeKind::Function {
            name,
            return_type,
            arguments,
            body: None,
        }))
    }

    fn collect_function_args(
        &mut self,
        node: &ParseTreeNode,
        out: &mut Vec<AstNode>,
        diagnostics: &mut Diagnostics,
    ) {
        if node.children.len() == 3 {
            self.collect_function_args(&node.children[0], out, diagnostics);
            self.push_function_arg(&node.children[2], out, diagnostics);
            return;
        }
        self.push_function_arg(&node.children[0], out, diagnostics);
    }

    fn push_function_arg(
        &mut self,
        node: &ParseTreeNode,
        out: &mut Vec<AstNode>,
        diagnostics: &mut Diagnostics,
    ) {
        if let Some(argument) = self.reduce_variable_definition(node, diagnostics) {
            out.push(argument);
        }
    }

    fn reduce_if_statement(
        &mut self,
        node: &ParseTreeNode,
        diagnostics: &mut Diagnostics,
    ) -> Option<AstNode> {
        // body: IF ( EXPR ) { [STMTS]
        let header = &node.children[0];
        let condition = self.reduce(&header.children[2], diagnostics)?;

        let if_body = match header.children.get(5) {
            Some(stmts) => self.reduce(stmts, diagnostics),
            None => Some(self.node(NodeKind::Sequence { children: vec![] })),
        };

        let else_body = match node.children.get(2) {
            Some(else_clause) => {
                // else clause header: ELSE { [STMTS]
                let else_header = &else_clause.children[0];
                match else_header.children.get(2) {
                    Some(stmts) => self.reduce(stmts, diagnostics),
                    None => Some(self.node(NodeKind::Sequence { children: vec![] })),
                }
            }
            None => None,
        };

        Some(self.node(NodeKind::IfStatement {
            condition: Box::new(condition),
            if_body: if_body.map(Box::new),
            else_body: else_body.map(Box::new),
        }))
    }

    fn reduce_for_statement(
        &mut self,
        node: &ParseTreeNode,
        diagnostics: &mut Diagnostics,
    ) -> Option<AstNode> {
        // children: FOR ( STMT ; EXPR ; STMT ) { [STMTS] }
        let init = self.reduce(&node.children[2], diagnostics)?;
        let condition = self.reduce(&node.children[4], diagnostics)?;
        let update = self.reduce(&node.children[6], diagnostics)?;

        let body_node = &node.children[9];
        let body = if body_node.symbol == GrammarSymbol::RightCurly {
            Some(self.node(NodeKind::Sequence { children: vec![] }))
        } else {
            self.reduce(body_node, diagnostics)
        };

        Some(self.node(NodeKind::ForStatement {
            init: Box::new(init),
            condition: Box::new(condition),
            update: Box::new(update),
            body: body.map(Box::new),
        }))
    }

    fn reduce_assert(
        &mut self,
        node: &ParseTreeNode,
        diagnostics: &mut Diagnostics,
    ) -> Option<AstNode> {
        let condition = self.reduce(&node.children[1], diagnostics)?;
        Some(self.node(NodeKind::Assert {
            condition: Box::new(condition),
        }))
    }

    fn reduce_import(&mut self, node: &ParseTreeNode) -> Option<AstNode> {
        Some(self.node(NodeKind::Import {
            file_name: node.children[1].token_content().to_owned(),
        }))
    }

    fn reduce_type_declaration(
        &mut self,
        node: &ParseTreeNode,
        diagnostics: &mut Diagnostics,
    ) -> Option<AstNode> {
        let name = node.children[1].token_content().to_owned();
        let mut members = vec![];
        self.collect_type_members(&node.children[3], &mut members, diagnostics);

        Some(self.node(NodeKind::TypeDeclaration { name, members }))
    }

    fn collect_type_members(
        &mut self,
        node: &ParseTreeNode,
        out: &mut Vec<TypeMember>,
        diagnostics: &mut Diagnostics,
    ) {
        let definition = if node.children.len() == 3 {
            self.collect_type_members(&node.children[0], out, diagnostics);
            &node.children[1]
        } else {
            &node.children[0]
        };

        out.push(TypeMember {
            name: definition.children[1].token_content().to_owned(),
            data_type: self.data_type_of(&definition.children[0], diagnostics),
        });
    }

    fn data_type_of(&self, node: &ParseTreeNode, diagnostics: &mut Diagnostics) -> DataType {
        match DataType::from_name(node.token_content()) {
            Some(data_type) => data_type,
            None => {
                diagnostics.report(format!(
                    "unknown data type '{}'",
                    node.token_content()
                ));
                DataType::Void
            }
        }
    }
}

fn is_binary_operation(node: &ParseTreeNode) -> bool {
    matches!(
        node.symbol,
        GrammarSymbol::Sum
            | GrammarSymbol::Term
            | GrammarSymbol::Disjunction
            | GrammarSymbol::Conjunction
            | GrammarSymbol::Relation
    ) && node.children.len() == 3
}

fn is_unary_operation(node: &ParseTreeNode) -> bool {
    node.symbol == GrammarSymbol::Negation && node.children.len() == 2
}

fn is_literal(node: &ParseTreeNode) -> bool {
    matches!(
        node.symbol,
        GrammarSymbol::Integer | GrammarSymbol::Float | GrammarSymbol::True | GrammarSymbol::False
    )
}

fn is_sequence(node: &ParseTreeNode) -> bool {
    node.symbol == GrammarSymbol::Stmts && node.children.len() > 1
}

fn binary_operator_of(symbol: GrammarSymbol) -> Option<BinaryOperator> {
    match symbol {
        GrammarSymbol::Plus => Some(BinaryOperator::Add),
        GrammarSymbol::Minus => Some(BinaryOperator::Sub),
        GrammarSymbol::Star => Some(BinaryOperator::Mul),
        GrammarSymbol::Div => Some(BinaryOperator::Div),
        GrammarSymbol::DoubleEquals => Some(BinaryOperator::Eq),
        GrammarSymbol::NotEquals => Some(BinaryOperator::Neq),
        GrammarSymbol::LessThan => Some(BinaryOperator::Lt),
        GrammarSymbol::LessEquals => Some(BinaryOperator::Le),
        GrammarSymbol::GreaterThan => Some(BinaryOperator::Gt),
        GrammarSymbol::GreaterEquals => Some(BinaryOperator::Ge),
        GrammarSymbol::And => Some(BinaryOperator::And),
        GrammarSymbol::Or => Some(BinaryOperator::Or),
        _ => None,
    }
}
