// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Outbound notification side effects (email).
//!
//! Notifications are best-effort by contract: the recovery state machine
//! commits first, then notifies, and a delivery failure is logged only.

pub mod mailer;

pub use mailer::{Mailer, MailerError};
