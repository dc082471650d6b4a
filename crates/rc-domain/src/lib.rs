pub mod config;
pub mod error;
pub mod message;
pub mod model;
pub mod stream;
pub mod tool;

pub use error::{Error, Result};
pub use message::{ContentPart, Message, MessageContent, Role};
pub use model::{
    BookingRecord, CallMetrics, ConversationTurn, Greeting, ServiceEntry, TenantSnapshot,
    ToolPolicy, TurnRole, TurnState, VoiceConfig, WorkingHoursEntry,
};
pub use stream::{BoxStream, StreamEvent, Usage};
pub use tool::{ToolCall, ToolCallRecord, ToolDefinition, ToolErrorTag, ToolOutcome};
