//! Tool catalog: registry of tool descriptors

use super::entities::{ToolCategory, ToolDescriptor};
use crate::chart::ChartType;
use crate::session::entities::RESET_VIEW_TOOL;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors from building or querying a [`ToolCatalog`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("tool '{0}' is registered more than once")]
    DuplicateTool(String),

    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("invalid descriptor for '{name}': {reason}")]
    InvalidDescriptor { name: String, reason: String },
}

/// Read-only registry of every tool a session may call.
///
/// Built once through [`ToolCatalog::builder`] and shared by reference for
/// the lifetime of the process. Names are unique; iteration is in name
/// order.
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: BTreeMap<String, ToolDescriptor>,
}

impl ToolCatalog {
    pub fn builder() -> ToolCatalogBuilder {
        ToolCatalogBuilder::default()
    }

    /// Look up a descriptor by exact name
    pub fn lookup(&self, name: &str) -> Result<&ToolDescriptor, CatalogError> {
        self.tools
            .get(name)
            .ok_or_else(|| CatalogError::UnknownTool(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Descriptors applicable to `chart_type`, in name order
    pub fn list_applicable(&self, chart_type: ChartType) -> Vec<&ToolDescriptor> {
        self.tools
            .values()
            .filter(|d| d.is_applicable(chart_type))
            .collect()
    }

    pub fn by_category(&self, category: ToolCategory) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.values().filter(move |d| d.category == category)
    }

    pub fn all(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Collects descriptors; [`build`](Self::build) rejects duplicates and
/// malformed descriptors.
#[derive(Debug, Default)]
pub struct ToolCatalogBuilder {
    descriptors: Vec<ToolDescriptor>,
}

impl ToolCatalogBuilder {
    /// Queue a descriptor. Nothing is checked here: duplicate names and
    /// malformed descriptors are reported by [`build`](Self::build), which
    /// fails on the first offending descriptor in registration order.
    pub fn register(mut self, descriptor: ToolDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Queue several descriptors; checked by [`build`](Self::build) like
    /// [`register`](Self::register)
    pub fn register_all(mut self, descriptors: impl IntoIterator<Item = ToolDescriptor>) -> Self {
        self.descriptors.extend(descriptors);
        self
    }

    pub fn build(self) -> Result<ToolCatalog, CatalogError> {
        let mut tools = BTreeMap::new();
        for descriptor in self.descriptors {
            check_descriptor(&descriptor)?;
            if tools.contains_key(&descriptor.name) {
                return Err(CatalogError::DuplicateTool(descriptor.name));
            }
            tools.insert(descriptor.name.clone(), descriptor);
        }
        Ok(ToolCatalog { tools })
    }
}

fn check_descriptor(descriptor: &ToolDescriptor) -> Result<(), CatalogError> {
    let invalid = |reason: String| CatalogError::InvalidDescriptor {
        name: descriptor.name.clone(),
        reason,
    };

    if descriptor.name.trim().is_empty() || descriptor.name.contains(char::is_whitespace) {
        return Err(invalid("name must be a non-empty identifier".to_string()));
    }
    if descriptor.name == RESET_VIEW_TOOL {
        return Err(invalid("name is reserved for the session".to_string()));
    }
    if descriptor.applicable_chart_types.contains(&ChartType::Unknown) {
        return Err(invalid("'unknown' is not an applicable chart type".to_string()));
    }
    for (name, param) in &descriptor.params {
        if let Some(default) = &param.default
            && !param.param_type.matches(default)
        {
            return Err(invalid(format!(
                "default for '{}' is not a {}",
                name, param.param_type
            )));
        }
    }
    Ok(())
}
