// Copyright (C) 2025 Vince Vasta
// SPDX-License-Identifier: Apache-2.0

//! Riverboat Poker server.
#![warn(clippy::all, rust_2018_idioms, missing_docs)]

pub mod ledger;
pub mod server;
pub mod table;
pub use server::{Config, run};
