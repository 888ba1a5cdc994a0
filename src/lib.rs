// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod cli;
pub mod config;
pub mod db;
pub mod models;
pub mod utils;
pub mod api;
pub mod wizard;
pub mod reconcile;
pub mod analytics;
pub mod commands;
