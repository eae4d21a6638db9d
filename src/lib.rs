//! Catalog and playback resolution for remote video catalogs.
//!
//! `vidcat` sits between a paginated, rate-limited remote video-catalog API
//! and a presentation host that lists and plays media. It:
//!
//! * lists catalog pages through a TTL cache keyed by call signature
//! * resolves complete catalogs across pages, optionally resuming at an item
//! * orders catalogs as listed, reversed or shuffled
//! * picks the stream variant closest to the preferred video quality
//! * tracks the login session and clears the cache when it changes
//!
//! The entry point for hosts is [`provider::Provider`], which maps request
//! paths onto these operations and turns failures into notifications. The
//! remote API is abstracted by [`remote::RemoteApi`] and implemented over
//! HTTP by [`gateway::Gateway`].
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

#[macro_use]
extern crate log;

pub mod cache;
pub mod catalog;
pub mod config;
pub mod credentials;
pub mod error;
pub mod fetcher;
pub mod gateway;
pub mod http;
pub mod order;
pub mod protocol;
pub mod provider;
pub mod remote;
pub mod resolver;
pub mod router;
pub mod session;
pub mod stream;
pub mod tokens;
