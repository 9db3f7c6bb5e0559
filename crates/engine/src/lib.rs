//! Notification dispatch: turns a new `notifications` row into push sends and
//! writes the delivery result back.

pub mod dispatcher;
pub mod guard;
pub mod payload;
pub mod pruner;
pub mod status;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;
