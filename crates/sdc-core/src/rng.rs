// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Random sources for operand generation.
//!
//! Production runs draw from `RDRAND` so the operand stream does not share
//! execution units with a software generator. Tests (and CPUs without the
//! instruction, when explicitly allowed) use [`XorShiftRng`].

use crate::error::RngUnavailable;
use crate::task::WorkerId;

/// Capability for drawing 32-bit random values.
pub trait RandomSource: Send {
    /// Returns the next random value.
    fn next_u32(&mut self) -> u32;
}

/// `RDRAND`-backed generator. Only obtainable through [`HardwareRng::detect`].
#[derive(Debug, Clone, Copy)]
pub struct HardwareRng {
    _detected: (),
}

impl HardwareRng {
    /// Returns a handle when the CPU supports `RDRAND`.
    pub fn detect() -> Result<Self, RngUnavailable> {
        if rdrand_supported() {
            Ok(Self { _detected: () })
        } else {
            Err(RngUnavailable)
        }
    }
}

impl RandomSource for HardwareRng {
    fn next_u32(&mut self) -> u32 {
        // RDRAND reports transient underflow through the carry flag.
        loop {
            if let Some(value) = rdrand32() {
                return value;
            }
            std::hint::spin_loop();
        }
    }
}

#[cfg(target_arch = "x86_64")]
fn rdrand_supported() -> bool {
    std::arch::is_x86_feature_detected!("rdrand")
}

#[cfg(not(target_arch = "x86_64"))]
const fn rdrand_supported() -> bool {
    false
}

#[cfg(target_arch = "x86_64")]
#[allow(unsafe_code)]
fn rdrand32() -> Option<u32> {
    let mut value = 0u32;
    // SAFETY: only reachable through a `HardwareRng`, which `detect` hands out
    // after confirming the CPU implements RDRAND.
    let ok = unsafe { core::arch::x86_64::_rdrand32_step(&mut value) };
    (ok == 1).then_some(value)
}

#[cfg(not(target_arch = "x86_64"))]
const fn rdrand32() -> Option<u32> {
    None
}

/// Deterministic xorshift64* generator.
#[derive(Debug, Clone)]
pub struct XorShiftRng {
    state: u64,
}

impl XorShiftRng {
    /// Creates a generator from `seed`. A zero seed is replaced with 1
    /// (xorshift would otherwise emit zeros forever).
    pub fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    /// Derives an independent stream for `worker` from a shared run seed.
    pub fn for_worker(seed: u64, worker: WorkerId) -> Self {
        Self::new(splitmix64(seed ^ splitmix64(worker.index() as u64)))
    }

    /// Returns the next value of the xorshift64* sequence.
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }
}

impl RandomSource for XorShiftRng {
    #[allow(clippy::cast_possible_truncation)]
    fn next_u32(&mut self) -> u32 {
        // high half; the low bits of xorshift64* are the weakest
        (self.next_u64() >> 32) as u32
    }
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// What to do about the random source before a run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RngPolicy {
    /// `RDRAND` or nothing.
    Hardware,
    /// Seeded software generator.
    Software {
        /// Run seed; each worker derives its own stream from it.
        seed: u64,
    },
    /// `RDRAND` when present, the seeded software generator otherwise.
    HardwareOrSoftware {
        /// Run seed used on fallback.
        seed: u64,
    },
}

impl RngPolicy {
    /// Applies the policy against the running CPU.
    pub fn resolve(self) -> Result<RngFactory, RngUnavailable> {
        match self {
            Self::Hardware => HardwareRng::detect().map(RngFactory::Hardware),
            Self::Software { seed } => Ok(RngFactory::Software { seed }),
            Self::HardwareOrSoftware { seed } => match HardwareRng::detect() {
                Ok(hw) => Ok(RngFactory::Hardware(hw)),
                Err(RngUnavailable) => {
                    tracing::warn!(seed, "RDRAND unavailable; falling back to software generator");
                    Ok(RngFactory::Software { seed })
                }
            },
        }
    }
}

/// Resolved random source, handing out one generator per worker.
#[derive(Debug, Clone, Copy)]
pub enum RngFactory {
    /// Every worker uses `RDRAND`.
    Hardware(HardwareRng),
    /// Every worker gets its own seeded xorshift stream.
    Software {
        /// Run seed.
        seed: u64,
    },
}

impl RngFactory {
    /// Generator for `worker`.
    pub fn for_worker(&self, worker: WorkerId) -> WorkerRng {
        match *self {
            Self::Hardware(hw) => WorkerRng::Hardware(hw),
            Self::Software { seed } => WorkerRng::Software(XorShiftRng::for_worker(seed, worker)),
        }
    }

    /// Short label for summaries.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Hardware(_) => "rdrand",
            Self::Software { .. } => "xorshift64*",
        }
    }
}

/// A worker's generator, whichever backend the policy chose.
#[derive(Debug, Clone)]
pub enum WorkerRng {
    /// `RDRAND`.
    Hardware(HardwareRng),
    /// Seeded software stream.
    Software(XorShiftRng),
}

impl RandomSource for WorkerRng {
    fn next_u32(&mut self) -> u32 {
        match self {
            Self::Hardware(rng) => rng.next_u32(),
            Self::Software(rng) => rng.next_u32(),
        }
    }
}
