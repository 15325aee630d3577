// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration Constants
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Root directory for encrypted storage | `/data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `TLS_CERT_PATH` | PEM certificate chain for HTTPS | Optional (HTTP without it) |
//! | `TLS_KEY_PATH` | PEM private key for HTTPS | Optional |
//! | `AUTH_JWKS_URL` | Identity provider JWKS endpoint for JWT verification | Required for production |
//! | `AUTH_ISSUER` | Expected JWT issuer claim | Required for production |
//! | `AUTH_AUDIENCE` | Expected JWT audience claim | Optional |
//! | `EMAIL_API_URL` | Transactional email API base URL | Optional (notifications off) |
//! | `EMAIL_API_KEY` | Email API key | Optional |
//! | `EMAIL_FROM` | From address for notifications | `Legacy Locker <noreply@example.com>` |
//! | `INTERNAL_SCAN_SECRET` | Shared secret for scheduler endpoints | Optional (internal surface off) |
//! | `EXPIRY_POLL_INTERVAL_SECS` | Background sweep interval | `300` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

/// Environment variable name for the encrypted data directory path.
///
/// The data directory is mounted as an encrypted volume by the deployment
/// platform. All locker rows, recovery requests, profiles, and audit logs
/// are stored here.
///
/// # Default
/// `/data` (set as the encrypted mount point in the deployment manifest)
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Environment variable name for the scheduler shared secret.
///
/// Without it the internal scan endpoint rejects every caller.
pub const INTERNAL_SCAN_SECRET_ENV: &str = "INTERNAL_SCAN_SECRET";

/// Environment variable name for the background sweep interval (seconds).
pub const EXPIRY_POLL_INTERVAL_ENV: &str = "EXPIRY_POLL_INTERVAL_SECS";
