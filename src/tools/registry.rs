use std::sync::Arc;

use super::Tool;

/// Tools known to the server, in registration order.
///
/// Tools are shared with the per-call tasks, hence `Arc`.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tool. A tool with the same name replaces the previous one.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolError;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct NamedTool(&'static str, &'static str);

    #[async_trait]
    impl Tool for NamedTool {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            self.1
        }

        fn input_schema(&self) -> Value {
            json!({"type": "object"})
        }

        async fn call(&self, _arguments: Value) -> Result<Value, ToolError> {
            Ok(json!({}))
        }
    }

    #[test]
    fn test_new_registry_is_empty() {
        let registry = ToolRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert!(registry.get("anything").is_none());
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(NamedTool("a", "first")));
        registry.register(Arc::new(NamedTool("b", "second")));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("b").unwrap().description(), "second");
        let names: Vec<&str> = registry.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_register_same_name_replaces() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(NamedTool("a", "old")));
        registry.register(Arc::new(NamedTool("a", "new")));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("a").unwrap().description(), "new");
    }
}
