//! Collects the files imported by a module.

use std::path::{Path, PathBuf};

use crate::loader::resolve_import;

use super::{AstNode, NodeKind};

/// Walks sequences and statements and resolves every `import` against the
/// importing file's directory. Imports are returned in first-encounter order;
/// duplicates are kept, dropping them is the driver's call.
pub struct ImportFinder {
    directory: PathBuf,
    pub imports: Vec<PathBuf>,
}

impl ImportFinder {
    pub fn new(directory: &Path) -> Self {
        Self {
            directory: directory.to_path_buf(),
            imports: vec![],
        }
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
            NodeKind::Import { file_name } => {
                self.imports.push(resolve_import(&self.directory, file_name));
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::AstBuilder, diagnostics::Diagnostics, lexer::Lexer, loader::StringCodeProvider,
        parser::Parser,
    };

    fn ast_of(source: &str) -> AstNode {
        let mut diagnostics = Diagnostics::new();
        let lexer = Lexer::new(Box::new(StringCodeProvider::from_source(source)));
        let tree = Parser::new(lexer)
            .create_parse_tree(&mut diagnostics)
            .expect("parse should succeed");
        AstBuilder::new()
            .run(tree, &mut diagnostics)
            .expect("AST should build")
    }

    #[test]
    fn test_finds_imports_in_order() {
        let root = ast_of("import \"a.ne\"; import \"b.ne\"; 1 + 1;");
        let mut finder = ImportFinder::new(Path::new("/src"));
        finder.run(&root);

        assert_eq!(
            finder.imports,
            vec![PathBuf::from("/src/a.ne"), PathBuf::from("/src/b.ne")]
        );
    }

    #[test]
    fn test_duplicates_are_kept() {
        let root = ast_of("import \"a.ne\"; import \"a.ne\";");
        let mut finder = ImportFinder::new(Path::new("/src"));
        finder.run(&root);

        assert_eq!(finder.imports.len(), 2);
    }
}
