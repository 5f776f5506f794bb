// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Operand generation.
//!
//! Randomized operands are `rand % (max - min) + min`. Operand 2 adds
//! [`OPERAND2_OFFSET`] on top, shifting its range to `[min + 1, max]`; operand
//! 1 stays in `[min, max)`.
//!
//! The draw is 32 bits wide, so ranges wider than `2^32` only reach their
//! lowest `2^32` values above `min`.

use crate::config::{OperandMode, OperandSpec};
use crate::rng::RandomSource;

/// Extra offset applied to randomized operand 2.
pub const OPERAND2_OFFSET: u64 = 1;

/// Operand 1 for the next cycle.
pub fn next_operand1<R: RandomSource + ?Sized>(spec: &OperandSpec, rng: &mut R) -> u64 {
    match spec.mode {
        OperandMode::Fixed => spec.value,
        OperandMode::Randomized => draw(spec, rng, 0),
    }
}

/// Operand 2 for the next cycle.
pub fn next_operand2<R: RandomSource + ?Sized>(spec: &OperandSpec, rng: &mut R) -> u64 {
    match spec.mode {
        OperandMode::Fixed => spec.value,
        OperandMode::Randomized => draw(spec, rng, OPERAND2_OFFSET),
    }
}

fn draw<R: RandomSource + ?Sized>(spec: &OperandSpec, rng: &mut R, offset: u64) -> u64 {
    // RunConfig::validate rejects empty ranges; max(1) keeps an unvalidated
    // spec from dividing by zero.
    let span = spec.value.saturating_sub(spec.min).max(1);
    (u64::from(rng.next_u32()) % span)
        .wrapping_add(offset)
        .wrapping_add(spec.min)
}
