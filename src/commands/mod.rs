// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod trades;
pub mod movements;
pub mod importer;
pub mod reconcile;
pub mod report;
pub mod doctor;
