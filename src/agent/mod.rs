//! Agent loop: per-turn tool retrieval, inference and tool dispatch.

pub mod context;
pub mod loop_;
pub mod system_prompt;

pub use loop_::{run_chat_loop, Agent};
