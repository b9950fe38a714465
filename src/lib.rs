//! AI MultiModal Hub client
//!
//! A front end for a small inference server exposing image classification,
//! sentiment analysis, and a session-based chat. It validates input locally,
//! issues one HTTP request per user action, and renders the JSON answer.
//!
//! # Architecture
//!
//! - **Transport**: [`client::HubApi`] trait, implemented over `reqwest` by [`client::HubClient`]
//! - **Controller**: [`controller::ClientController`] owns all client state and publishes view snapshots
//! - **View-model**: [`view::ViewState`], rendered to text by [`render`]
//! - **Chat**: optional capability in [`chat`], keyed by a client-generated [`session::SessionId`]
//!
//! # Modules
//!
//! - [`config`]: Layered configuration (defaults, YAML file, env, CLI)
//! - [`error`]: Error types
//! - [`types`]: Wire DTOs
//! - [`upload`]: Staged images and the upload-area state machine

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]

pub mod chat;
pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod render;
pub mod session;
pub mod types;
pub mod upload;
pub mod view;

pub use client::{HubApi, HubClient};
pub use controller::{ClientController, ControllerOptions};
pub use error::{Error, Result};
