// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Config storage port and saved run profiles for sdc-hunt.
//! Storage adapters (filesystem, memory) stay outside this crate.

pub mod config;
pub mod profile;
