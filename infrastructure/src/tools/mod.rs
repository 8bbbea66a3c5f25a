//! Built-in chart tools and their executor
//!
//! Tools are grouped by the chart family they apply to. Each family module
//! exposes its tool name constants, `descriptors()` for the catalog, and
//! `bindings()` pairing each name with its implementation.
//!
//! | Module | Applies to |
//! |--------|-----------|
//! | `common` | every chart type |
//! | `bar` | bar charts |
//! | `line` | line charts |
//! | `scatter` | scatter plots |
//! | `heatmap` | heatmaps |
//! | `parallel` | parallel coordinates |
//! | `sankey` | sankey diagrams |

pub mod bar;
pub mod common;
pub mod heatmap;
pub mod line;
pub mod parallel;
pub mod sankey;
pub mod scatter;

mod executor;
mod schema;
mod stats;
mod support;

pub use executor::LocalToolExecutor;
pub use schema::JsonSchemaToolConverter;
pub use support::ToolBinding;

use chartscout_domain::{CatalogError, ToolCatalog, ToolDescriptor};

/// Descriptors of every built-in tool
pub fn builtin_descriptors() -> Vec<ToolDescriptor> {
    let mut descriptors = common::descriptors();
    descriptors.extend(bar::descriptors());
    descriptors.extend(line::descriptors());
    descriptors.extend(scatter::descriptors());
    descriptors.extend(heatmap::descriptors());
    descriptors.extend(parallel::descriptors());
    descriptors.extend(sankey::descriptors());
    descriptors
}

/// Catalog of every built-in tool
pub fn default_catalog() -> Result<ToolCatalog, CatalogError> {
    ToolCatalog::builder()
        .register_all(builtin_descriptors())
        .build()
}

/// Implementations of every built-in tool
pub fn default_bindings() -> Vec<ToolBinding> {
    let mut bindings = common::bindings();
    bindings.extend(bar::bindings());
    bindings.extend(line::bindings());
    bindings.extend(scatter::bindings());
    bindings.extend(heatmap::bindings());
    bindings.extend(parallel::bindings());
    bindings.extend(sankey::bindings());
    bindings
}
