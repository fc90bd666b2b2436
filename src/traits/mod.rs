pub mod actor;

pub use actor::Actor;
pub use crate::engine::ActorContext;
