// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod chain;
pub mod config;
pub mod errors;
pub mod intake;
pub mod ledger;
pub mod persistence;
pub mod runner;
pub mod server;
pub mod store;
pub mod telemetry;
