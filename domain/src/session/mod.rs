//! Exploration session domain.
//!
//! - [`entities::Session`]: one exploration of one chart, with its state machine
//! - [`decision::Decision`]: the closed set of answers a model may give per round
//! - [`message::Message`]: a chat message sent to a decision model

pub mod decision;
pub mod entities;
pub mod message;

pub use decision::{
    Decision, DecisionParseError, ProposedCall, parse_decision, require_offered_tools,
};
pub use entities::{
    RESET_VIEW_TOOL, Session, SessionError, SessionStatus, reset_view_descriptor,
};
pub use message::{Message, Role};
