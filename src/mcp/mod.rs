//! Model Context Protocol server over stdio.
//!
//! Framing, the handshake and request cancellation come from `rmcp`; this
//! module only maps the tool registry onto its server handler.

pub mod server;

pub use server::SandboxServer;
