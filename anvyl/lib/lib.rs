//! `anvyl` is a single-node infrastructure orchestrator for Docker containers.
//!
//! # Overview
//!
//! Anvyl lets an operator manage containers and query system state through
//! three cooperating long-lived services and a command-line front end:
//!
//! - **Infrastructure service**: HTTP/JSON API over the host Docker engine
//!   and a local host/container inventory backed by SQLite.
//! - **MCP server**: exposes the infrastructure tool set over the Model
//!   Context Protocol (JSON-RPC 2.0) for AI clients.
//! - **Agent service**: forwards natural-language queries to an
//!   OpenAI-compatible model provider and relays tool calls through the MCP
//!   server.
//!
//! The three services run as independent OS processes under a PID-file based
//! supervisor; no long-lived parent process is required.
//!
//! # Modules
//!
//! - [`supervisor`] - Service lifecycle via PID files and signals
//! - [`infra`] - Infrastructure service and HTTP API
//! - [`docker`] - Typed adapter over the Docker engine
//! - [`store`] - Host and container persistence
//! - [`mcp`] - Model Context Protocol server
//! - [`agent`] - AI agent service
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Environment-driven configuration
//! - [`utils`] - Common utilities and helpers
//!
//! # Platform Support
//!
//! - Linux and macOS. Windows is not supported (the supervisor relies on
//!   POSIX process groups and signals).

#![warn(missing_docs)]

mod error;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub mod agent;
pub mod cli;
pub mod config;
pub mod docker;
pub mod infra;
pub mod mcp;
pub mod store;
pub mod supervisor;
pub mod utils;

pub use error::*;
