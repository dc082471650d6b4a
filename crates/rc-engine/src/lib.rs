pub mod engine;
pub mod prompt;

pub use engine::{run_engine, EngineInput, EngineOutput};
pub use prompt::build_system_prompt;

#[cfg(test)]
mod tests;
