//! Shared test infrastructure.


/// Scripted neighbour components.
pub mod mocks;
