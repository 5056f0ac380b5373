//! # Weather Agent
//!
//! A minimal conversational agent that answers weather questions by letting
//! the model call a weather lookup tool.
//!
//! This library provides:
//! - An OpenAI-compatible LLM client with native function calling
//! - A tool registry and a concurrent tool dispatcher
//! - Two turn loops: native function calling and structured JSON steps
//! - An interactive REPL
//!
//! ## Architecture
//!
//! The agent follows the "tools in a loop" pattern:
//! 1. Append user input to the session's conversation
//! 2. Call the LLM with the conversation and available tools
//! 3. Run any requested tool calls concurrently, feed results back by call id
//! 4. Repeat until the LLM produces a final answer
//!
//! ## Example
//!
//! ```rust,ignore
//! use weather_agent::{agent::build_agent, cli::ConsoleReporter, config::Config};
//!
//! let config = Config::from_env()?;
//! let agent = build_agent(&config);
//! let mut conversation = agent.new_conversation();
//! let answer = agent
//!     .run_turn(&mut conversation, "What's the weather in Paris?", &ConsoleReporter)
//!     .await?;
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod llm;
pub mod tools;

pub use config::Config;
