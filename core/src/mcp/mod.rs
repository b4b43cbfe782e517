//! The MCP fleet: one client per configured server, managed as a unit.

pub mod manager;
