//! Background work spawned from request handlers.
//!
//! Handlers never run the publishing pipeline inline: a publish involves a
//! clone, a push and a polling loop that can take tens of seconds. They hand
//! the post id to [`publish::PublishDispatcher`] and return immediately.

pub mod publish;
