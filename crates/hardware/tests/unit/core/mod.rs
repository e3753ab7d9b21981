
/// Reorder buffer ordering and completion.
pub mod rob;
