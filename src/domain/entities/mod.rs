pub mod image_job;
pub mod operation;
pub mod tool_usage;
pub mod user_context;
