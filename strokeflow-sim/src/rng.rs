//! Per-replication random streams.
//!
//! Every stochastic quantity in a model draws from its own stream so that
//! changing how often one quantity is sampled never shifts the values seen by
//! another. A [`StreamSet`] derives a replication seed from the master seed
//! and the replication index, then spawns a fixed number of child seeds from
//! it. Each child can be bound exactly once, to one named purpose.
//!
//! ```
//! use strokeflow_sim::StreamSet;
//!
//! let mut set = StreamSet::new(42, 0, 4).unwrap();
//! let mut consult = set.bind(0, "consult").unwrap();
//! let draw = consult.uniform();
//! assert!((0.0..1.0).contains(&draw));
//!
//! // The same child cannot serve a second purpose
//! assert!(set.bind(0, "ct").is_err());
//! ```

use std::collections::HashMap;

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::{SimError, SimResult};

/// Mixes the master seed with a replication index into a replication seed.
///
/// SplitMix64 finaliser over the pair, so that neighbouring master seeds do not
/// share replication seeds the way `master + index` would.
pub fn replication_seed(master_seed: u64, replication: u64) -> u64 {
    let mut z = master_seed
        .wrapping_add(replication.wrapping_mul(0x9E37_79B9_7F4A_7C15))
        .wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// A single independent random stream bound to one purpose.
#[derive(Debug, Clone)]
pub struct RandomStream {
    name: &'static str,
    rng: ChaCha8Rng,
}

impl RandomStream {
    /// Builds a stream directly from a 32-byte seed.
    pub fn from_seed(name: &'static str, seed: [u8; 32]) -> Self {
        Self {
            name,
            rng: ChaCha8Rng::from_seed(seed),
        }
    }

    /// Purpose this stream was bound to.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Uniform draw in `[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        self.rng.gen()
    }

    /// Mutable access to the underlying generator for `rand_distr` sampling.
    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }
}

impl RngCore for RandomStream {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}

/// Fixed set of child seeds for one replication.
#[derive(Debug)]
pub struct StreamSet {
    seed: u64,
    children: Vec<[u8; 32]>,
    bound: HashMap<usize, &'static str>,
}

impl StreamSet {
    /// Spawns `provisioned` child seeds for `replication` of `master_seed`.
    pub fn new(master_seed: u64, replication: u64, provisioned: usize) -> SimResult<Self> {
        let seed = replication_seed(master_seed, replication);
        let mut root = ChaCha8Rng::seed_from_u64(seed);
        let mut children: Vec<[u8; 32]> = Vec::with_capacity(provisioned);
        for index in 0..provisioned {
            let mut child = [0u8; 32];
            root.fill_bytes(&mut child);
            if let Some(first) = children.iter().position(|seen| *seen == child) {
                return Err(SimError::DuplicateSeed {
                    first,
                    second: index,
                });
            }
            children.push(child);
        }
        debug!(master_seed, replication, seed, provisioned, "stream set spawned");
        Ok(Self {
            seed,
            children,
            bound: HashMap::new(),
        })
    }

    /// The derived replication seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of child streams available.
    pub fn provisioned(&self) -> usize {
        self.children.len()
    }

    /// Binds child `index` to `name`. Each child may be bound only once.
    pub fn bind(&mut self, index: usize, name: &'static str) -> SimResult<RandomStream> {
        let seed = *self
            .children
            .get(index)
            .ok_or(SimError::StreamNotProvisioned {
                index,
                name,
                provisioned: self.children.len(),
            })?;
        if let Some(&bound_to) = self.bound.get(&index) {
            return Err(SimError::StreamAlreadyBound {
                index,
                bound_to,
                name,
            });
        }
        self.bound.insert(index, name);
        Ok(RandomStream::from_seed(name, seed))
    }
}
