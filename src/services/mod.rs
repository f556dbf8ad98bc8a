// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod account;
pub mod classifier;
pub mod etag;
pub mod provider;
pub mod sync;
pub mod tokens;
pub mod vault;

pub use account::AccountService;
pub use etag::ResponseCache;
pub use provider::{ProviderClient, ProviderTokenManager, StravaClient};
pub use sync::SyncPipeline;
pub use tokens::TokenService;
pub use vault::CredentialVault;
