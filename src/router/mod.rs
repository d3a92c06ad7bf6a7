//! The `router` module owns topic membership and resolves the set of
//! connections an outbound event is delivered to.

pub mod table;
pub mod topic;

pub use table::Router;
pub use topic::{Topic, TopicMembers};
