//! Chart domain module
//!
//! A chart is described declaratively by a Vega-Lite specification. The
//! [`ChartState`] value object wraps that specification and is the only thing
//! tools read and produce: every successful tool execution yields a *new*
//! state, the previous one is never modified in place.
//!
//! [`ChartType`] drives tool applicability in the catalog.

pub mod chart_type;
pub mod state;

pub use chart_type::ChartType;
pub use state::ChartState;
