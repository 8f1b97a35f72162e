//! Concrete parse tree produced by the LR driver.

use std::fmt::Write;

use crate::lexer::Token;

use super::grammar::GrammarSymbol;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTreeNode {
    pub symbol: GrammarSymbol,
    /// Present iff the node is a terminal leaf.
    pub token: Option<Token>,
    pub children: Vec<ParseTreeNode>,
}

impl ParseTreeNode {
    pub fn leaf(symbol: GrammarSymbol, token: Token) -> Self {
        Self {
            symbol,
            token: Some(token),
            children: vec![],
        }
    }

    pub fn inner(symbol: GrammarSymbol, children: Vec<ParseTreeNode>) -> Self {
        Self {
            symbol,
            token: None,
            children,
        }
    }

    pub fn token_content(&self) -> &str {
        self.token.as_ref().map(|t| t.content.as_str()).unwrap_or("")
    }

    /// Preorder flattening into `(depth, symbol)` pairs. The pair list fully
    /// determines the tree shape, which makes it handy for test fixtures.
    pub fn flatten(&self) -> Vec<(usize, GrammarSymbol)> {
        let mut out = vec![];
        self.flatten_into(0, &mut out);
        out
    }

    fn flatten_into(&self, depth: usize, out: &mut Vec<(usize, GrammarSymbol)>) {
        out.push((depth, self.symbol));
        for child in &self.children {
            child.flatten_into(depth + 1, out);
        }
    }
}

/// Indented rendering of a parse tree, one node per line.
pub fn print_parse_tree(root: &ParseTreeNode) -> String {
    let mut out = String::new();
    for (depth, symbol) in root.flatten() {
        for _ in 0..depth {
            out.push_str("  ");
        }
        let _ = writeln!(out, "{symbol:?}");
    }
    out
}

/// Renders a parse tree as a pair list that can be pasted into a test.
pub fn print_parse_tree_test_case(root: &ParseTreeNode) -> String {
    let mut out = String::new();
    for (depth, symbol) in root.flatten() {
        let _ = writeln!(out, "({depth}, GrammarSymbol::{symbol:?}),");
    }
    out
}
