//! In-process collaborator implementations.

pub mod jsonl;
pub mod memory;
pub mod simulator;

pub use jsonl::JsonlAuditLog;
pub use memory::{LogNotifier, MemoryAttendees, MemoryAuditLog, MemoryLedger};
pub use simulator::SimulatorGateway;
