// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Folio session layer: token storage, expiry scheduling, an authenticated
//! HTTP client for the folio REST backend, and the session controller that
//! ties them together.

pub mod command;
pub mod config;
pub mod context;
pub mod controller;
pub mod error;
pub mod events;
pub mod http;
pub mod model;
pub mod policy;
pub mod scheduler;
pub mod storage;
pub mod token_store;

pub use crate::config::ClientConfig;
pub use crate::context::SessionContext;
pub use crate::controller::{SessionController, SessionStatus, SessionView};
pub use crate::error::{ClientError, ErrorCode};
pub use crate::events::{EventBus, SessionEvent};
pub use crate::http::HttpClient;
pub use crate::model::User;
pub use crate::storage::{FileStorage, MemoryStorage, Storage};
pub use crate::token_store::TokenStore;
