// SPDX-FileCopyrightText: 2026 GHL Assistant Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for CRUD operations on storage entities.

pub mod catalog;
pub mod clients;
pub mod credentials;
pub mod sessions;
pub mod usage;
pub mod webhooks;
