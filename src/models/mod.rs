// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod user;

pub use activity::{
    ActivityDetail, ActivitySummary, ClassificationDetail, Lap, RecoveryPattern, StreamData,
    TrainingActivity,
};
pub use user::{ProviderTokenRecord, RefreshTokenRecord, User};
