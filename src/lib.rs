//! Solving ACME DNS-01 challenges by declaring the TXT record instead of writing it.
//!
//! For each challenge, a `DNSEndpoint` object is created in the cluster. An external DNS
//! synchronization controller watches these objects and publishes the records with the actual
//! DNS provider. Once the ACME server has validated the challenge, the object is deleted again.
//!
//! # Usage
//!
//! Build a [`ChallengeBridge`] once at start up and hand it the challenges the dispatcher
//! receives. See [`ChallengeBridge`] for an example.
//!
//! # Matching Challenges
//!
//! Challenge requests carry no identity of their own, and multiple certificate orders may be in
//! flight for the same name at once. Objects are therefore created with a generated name and
//! labelled with the normalized domain, FQDN, and zone of the challenge (see [`label`]).
//!
//! Cleaning up is done in two steps:
//!
//! 1. list the objects whose `fqdn` label matches the challenge;
//! 2. delete those whose TXT record value is exactly the challenge key.
//!
//! Labels only narrow the search. The key is the sole thing deciding what gets deleted, so
//! concurrent challenges for the same FQDN are left alone.
//!
//! # Out of Scope
//!
//! This crate does not wait for DNS propagation, does not resolve records, and does not retry
//! failed store calls. Errors are returned as soon as they happen; API failures can be
//! inspected with [`store::api_error`].

#![deny(rust_2018_idioms, nonstandard_style, future_incompatible)]

mod solver;

pub mod api;
pub mod label;
pub mod store;


pub use crate::solver::{ChallengeBridge, Solver};
