pub mod catalogue;
pub mod router;

pub use catalogue::build_tool_definitions;
pub use router::{ToolMetrics, ToolRouter};
