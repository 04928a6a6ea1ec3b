use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Zipf};

use kvstate::Key;

use crate::conf::{ConfError, WorkloadConf};

/// HOT_KEY is shared by every client in hot-key mode, to create write contention.
pub const HOT_KEY: Key = 42;

/// Cold keys start right above the hot key so that they never collide with it.
pub const COLD_KEY_BASE: Key = 43;

/// MAX_START_RANGE is the largest start range whose cold keys all fit in a Key, for every
/// request id.
pub const MAX_START_RANGE: i64 = i64::MAX - COLD_KEY_BASE - u32::MAX as i64;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum KeyPolicy {
    /// `conflicts` percent of draws hit HOT_KEY, the others get a key no other draw of this
    /// client ever gets.
    HotKey { conflicts: u32, start_range: i64 },

    /// Keys in `[0, keys)`, lower keys more likely. A larger `theta` is more skewed.
    Zipfian { theta: f64, keys: u64 },
}

impl KeyPolicy {
    pub fn from_conf(conf: &WorkloadConf) -> KeyPolicy {
        if conf.conflicts >= 0 {
            KeyPolicy::HotKey {
                conflicts: conf.conflicts as u32,
                start_range: conf.start_range,
            }
        } else {
            KeyPolicy::Zipfian {
                theta: conf.theta,
                keys: conf.zipf_keys,
            }
        }
    }
}

enum Sampler {
    HotKey { conflicts: u32, start_range: i64 },
    Zipfian(Zipf<f64>),
}

pub struct KeyDistribution {
    sampler: Sampler,
    rng: StdRng,
}

impl KeyDistribution {
    pub fn new(policy: KeyPolicy, rng: StdRng) -> Result<KeyDistribution, ConfError> {
        let sampler = match policy {
            KeyPolicy::HotKey {
                conflicts,
                start_range,
            } => {
                if !(0..=MAX_START_RANGE).contains(&start_range) {
                    return Err(ConfError::OutOfRange("start_range", start_range));
                }
                Sampler::HotKey {
                    conflicts,
                    start_range,
                }
            }
            KeyPolicy::Zipfian { theta, keys } => {
                let z = Zipf::new(keys, theta).map_err(|e| ConfError::BadZipf(format!("{}", e)))?;
                Sampler::Zipfian(z)
            }
        };

        Ok(KeyDistribution { sampler, rng })
    }

    /// next_key returns the key for request `id` of this client.
    pub fn next_key(&mut self, id: i32) -> Key {
        match &self.sampler {
            Sampler::HotKey {
                conflicts,
                start_range,
            } => {
                let r: u32 = self.rng.gen_range(0..100);
                if r < *conflicts {
                    HOT_KEY
                } else {
                    // ids wrap at i32; reading them as u32 keeps cold keys distinct for 2^32
                    // requests.
                    start_range + COLD_KEY_BASE + (id as u32) as Key
                }
            }
            // Zipf samples are in [1, keys].
            Sampler::Zipfian(z) => z.sample(&mut self.rng) as Key - 1,
        }
    }
}
