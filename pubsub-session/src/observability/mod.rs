//! Observability vocabulary shared by session components.

pub mod events;
pub mod fields;
