//! Table-driven LR parser.
//!
//! The parser keeps two parallel stacks, one of automaton states and one of
//! parse-tree nodes, with `|states| == |nodes| + 1` as the loop invariant.
//! Each step consults the ACTION table for the current state and lookahead
//! terminal and either shifts a leaf, reduces a production into a fresh
//! non-terminal node, accepts, or fails.

mod grammar;
mod parse_tree;
mod table;

pub use grammar::{GrammarSymbol, PRODUCTIONS};
pub use parse_tree::{print_parse_tree, print_parse_tree_test_case, ParseTreeNode};

use std::{error::Error, fmt::Display};

use crate::{
    diagnostics::Diagnostics,
    lexer::{Lexer, Position},
};

use table::{Action, PARSE_TABLE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub position: Position,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {}:{}",
            self.message, self.position.0, self.position.1
        )
    }
}

impl Error for ParseError {}

pub struct Parser {
    lexer: Lexer,
}

impl Parser {
    pub fn new(lexer: Lexer) -> Self {
        Self { lexer }
    }

    pub fn create_parse_tree(
        &mut self,
        diagnostics: &mut Diagnostics,
    ) -> Result<ParseTreeNode, ParseError> {
        let table = &*PARSE_TABLE;
        let mut states: Vec<usize> = vec![0];
        let mut nodes: Vec<ParseTreeNode> = vec![];

        loop {
            let token = self.lexer.peek(0, diagnostics).clone();
            let terminal = GrammarSymbol::from_token_kind(token.kind);
            let state = *states.last().expect("state stack is never empty");

            match table.action(state, terminal) {
                Some(Action::Shift(next)) => {
                    nodes.push(ParseTreeNode::leaf(terminal, token));
                    states.push(next);
                    self.lexer.next(diagnostics);
                }
                Some(Action::Reduce(index)) => {
                    let production = &PRODUCTIONS[index];
                    let count = production.rhs.len();

                    let children = nodes.split_off(nodes.len() - count);
                    states.truncate(states.len() - count);
                    debug_assert!(
                        children
                            .iter()
                            .map(|c| c.symbol)
                            .eq(production.rhs.iter().copied()),
                        "popped nodes do not match the production right-hand side"
                    );

                    let state = *states.last().expect("state stack is never empty");
                    let Some(target) = table.goto(state, production.lhs) else {
                        return Err(ParseError {
                            message: format!(
                                "no goto for {:?} after reduction",
                                production.lhs
                            ),
                            position: token.position,
                        });
                    };
                    nodes.push(ParseTreeNode::inner(production.lhs, children));
                    states.push(target);
                }
                Some(Action::Accept) => {
                    return nodes.pop().ok_or(ParseError {
                        message: "accepted an empty parse".to_string(),
                        position: token.position,
                    });
                }
                None => {
                    return Err(ParseError {
                        message: format!("unexpected token '{}'", token.content),
                        position: token.position,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::StringCodeProvider;

    fn parse(source: &str) -> Result<ParseTreeNode, ParseError> {
        let mut diagnostics = Diagnostics::new();
        let lexer = Lexer::new(Box::new(StringCodeProvider::from_source(source)));
        Parser::new(lexer).create_parse_tree(&mut diagnostics)
    }

    #[test]
    fn test_accepts_expression_statement() {
        let root = parse("1 + 1;").expect("should parse");
        assert_eq!(root.symbol, GrammarSymbol::Program);
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[1].symbol, GrammarSymbol::EndOfFile);
    }

    #[test]
    fn test_rejects_unbalanced_parens() {
        let error = parse("(1 + 2;").expect_err("should fail");
        assert!(error.message.contains("unexpected token"));
    }

    #[test]
    fn test_error_carries_position() {
        let error = parse("1 + ;").expect_err("should fail");
        assert_eq!(error.position, (1, 5));
    }
}
