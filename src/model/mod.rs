pub mod pipeline;
pub mod role;
pub mod snapshot;
