//! Read-only department lookup consumed for document numbering
use std::collections::HashMap;

pub trait DepartmentDirectory: Send + Sync {
    fn name_of(&self, department_id: &str) -> anyhow::Result<String>;
}

/// A fixed department table, for deployments without an org service and for tests.
#[derive(Debug, Default, Clone)]
pub struct StaticDirectory {
    names: HashMap<String, String>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_department(mut self, department_id: &str, name: &str) -> Self {
        self.names.insert(department_id.to_string(), name.to_string());
        self
    }
}

impl DepartmentDirectory for StaticDirectory {
    fn name_of(&self, department_id: &str) -> anyhow::Result<String> {
        self.names
            .get(department_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown department {department_id}"))
    }
}
