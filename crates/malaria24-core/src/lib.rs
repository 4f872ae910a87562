//! Core types and trait definitions for the Malaria24 case-tracking service.
//!
//! No HTTP or database dependencies.
//! Storage backends implement [`store::MalariaStore`]; mail transports
//! implement [`mail::Mailer`].

#![allow(async_fn_in_trait)]

pub mod actor;
pub mod case;
pub mod error;
pub mod facility;
pub mod inbound;
pub mod mail;
pub mod store;
pub mod user;
pub mod validation;

pub use error::{Error, Result};
