// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod balance;
pub mod budget;
pub mod classifier;
pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod goals;
pub mod ledger;
pub mod limits;
pub mod models;
pub mod monthly;
pub mod repository;
pub mod utils;
pub mod voucher;
