use std::collections::HashMap;

use crate::ast::DataType;

/// Stack of name-to-type maps mirroring the lexical block structure. Lookup
/// returns the innermost binding, so inner definitions shadow outer ones.
#[derive(Debug, Clone)]
pub struct Scope {
    stack: Vec<HashMap<String, DataType>>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Scope {
    pub fn new() -> Scope {
        Scope {
            stack: vec![HashMap::new()],
        }
    }

    pub fn enter_scope(&mut self) {
        self.stack.push(HashMap::new());
    }

    pub fn exit_scope(&mut self) {
        self.stack.pop();
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn add_variable(&mut self, name: impl ToString, data_type: DataType) {
        if let Some(scope) = self.stack.last_mut() {
            scope.insert(name.to_string(), data_type);
        }
    }

    pub fn get_variable(&self, name: &str) -> Option<DataType> {
        self.stack
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_finds_binding() {
        let mut scope = Scope::new();
        scope.add_variable("a", DataType::Int);

        assert_eq!(scope.get_variable("a"), Some(DataType::Int));
        assert_eq!(scope.get_variable("b"), None);
    }

    #[test]
    fn test_inner_scope_shadows_outer() {
        let mut scope = Scope::new();
        scope.add_variable("a", DataType::Int);

        scope.enter_scope();
        scope.add_variable("a", DataType::Bool);
        assert_eq!(scope.get_variable("a"), Some(DataType::Bool));

        scope.exit_scope();
        assert_eq!(scope.get_variable("a"), Some(DataType::Int));
    }

    #[test]
    fn test_bindings_die_with_their_scope() {
        let mut scope = Scope::new();
        scope.enter_scope();
        scope.add_variable("local", DataType::Float);
        scope.exit_scope();

        assert_eq!(scope.get_variable("local"), None);
    }
}
