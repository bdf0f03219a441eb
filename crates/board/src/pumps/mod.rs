//! Background tasks that move bytes between a session and its transport.

pub(crate) mod read;
pub(crate) mod write;
