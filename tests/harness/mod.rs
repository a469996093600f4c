// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test harness for abuse simulation against the contact relay.
//!
//! Traffic runs on a simulated clock so that hours of client behaviour can be
//! replayed in a single test without sleeping.

pub mod attacks;
pub mod generators;
pub mod metrics;
