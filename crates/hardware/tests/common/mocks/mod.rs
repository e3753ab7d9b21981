//! Scripted neighbour components.
//!
//! Both mocks keep their state behind an `Arc<Mutex<_>>` so a test can keep a
//! probe while the component itself is boxed into the hierarchy arena.



pub use lower::{LowerProbe, ScriptedLower};
pub use upper::{Delivery, RecordingUpper, UpperProbe};
