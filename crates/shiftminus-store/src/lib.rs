//! # shiftminus store
//! Data store clients: the hosted PostgREST tables and an in-memory
//! stand-in with the same semantics for tests.

pub mod memory;
pub mod postgrest;

pub use memory::MemoryStore;
pub use postgrest::PostgrestStore;
