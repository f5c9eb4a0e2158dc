// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod milestones;
pub mod recurrence;
pub mod rollup;
pub mod runner;
pub mod schedules;
pub mod snapshot;
