// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod settings;
pub mod expenses;
pub mod budgets;
pub mod importer;
pub mod reconcile;
pub mod splitwise;
pub mod dashboard;
