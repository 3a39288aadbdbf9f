mod builtins;
pub mod catalog;
mod registry;

pub use builtins::{handle_add_numbers, handle_multiply_numbers, handle_transcribe_audio};
pub use catalog::{build_registry, catalog, catalog_executor, declare_tool, CatalogEntry};
pub use registry::{
    executor, DuplicatePolicy, PreparedCall, SharedRegistry, StagedTool, ToolContext,
    ToolDescriptor, ToolExecutor, ToolRegistry, ToolSettings,
};
