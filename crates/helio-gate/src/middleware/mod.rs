// SPDX-License-Identifier: BUSL-1.1
//! Middleware for the gated router.
//!
//! Execution order (outermost → innermost):
//!   TraceLayer → metrics → access gate (matcher scope, then gate) → proxy

pub mod access;
pub mod metrics;
