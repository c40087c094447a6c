//! Seeded index generator for oracle discovery.
//!
//! Indexes only decide which oracles may answer which requests, so a
//! deterministic generator is enough. The seed is SHA-256 over a domain tag, the
//! caller, a sequence number and the process nonce. This is not
//! cryptographically secure and must not guard funds.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

use crate::types::AccountId;

/// Oracle indexes are drawn from `0..ORACLE_INDEX_RANGE`.
pub const ORACLE_INDEX_RANGE: u8 = 10;

const ORACLE_DOMAIN: &[u8] = b"oracle-indexes";
const REQUEST_DOMAIN: &[u8] = b"status-request";

#[derive(Debug, Clone)]
pub struct IndexGenerator {
    nonce: [u8; 32],
}

impl IndexGenerator {
    pub fn new(nonce: [u8; 32]) -> Self {
        Self { nonce }
    }

    /// Three indexes for a newly registered oracle. Duplicates are possible.
    pub fn oracle_indexes(&self, oracle: &AccountId, sequence: u64) -> [u8; 3] {
        let mut rng = self.rng_for(ORACLE_DOMAIN, oracle, sequence);
        let mut next = || rng.gen_range(0..ORACLE_INDEX_RANGE);
        [next(), next(), next()]
    }

    /// Index selecting which oracles may answer a status request.
    pub fn request_index(&self, requester: &AccountId, sequence: u64) -> u8 {
        self.rng_for(REQUEST_DOMAIN, requester, sequence)
            .gen_range(0..ORACLE_INDEX_RANGE)
    }

    fn rng_for(&self, domain: &[u8], caller: &AccountId, sequence: u64) -> StdRng {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        hasher.update(caller.as_str().as_bytes());
        hasher.update(sequence.to_be_bytes());
        hasher.update(self.nonce);
        let digest = hasher.finalize();

        let mut seed = [0u8; 32];
        seed.copy_from_slice(&digest);
        StdRng::from_seed(seed)
    }
}
