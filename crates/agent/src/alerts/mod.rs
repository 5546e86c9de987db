//! Alerts overview
//!
//! Devices raise alerts through one of the ingresses (`api` or `broker`),
//! which store each alert as `unsent` and then try to deliver it right away.
//! Alerts which couldn't be delivered stay `unsent` and are picked up by the
//! batch pipeline, which runs periodically and processes the oldest pending
//! alerts first, a bounded number at a time.
//!
//! Delivering an alert means:
//! - resolver: work out the recipient address. A home's override address
//!   beats the user's address from the identity provider.
//! - notifier: render and send one email.
//! - pipeline: mark the alert `sent`, which only ever happens after the email
//!   was dispatched.
//!
//! If marking the alert fails after its email went out, the alert remains
//! `unsent` and will be emailed again by a later batch. Recipients may
//! therefore see a duplicate, but never miss an alert that was stored.
mod notifier;
mod pipeline;
mod resolver;
mod sender;

pub use notifier::Notifier;
pub use pipeline::{AlertFailure, Ingested, Pipeline};
pub use resolver::resolve_recipient;
pub use sender::{EmailSender, ResendSender, Sender};
