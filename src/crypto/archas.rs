//! Archas hash implementation
//!
//! A custom 32-byte compression function with a fixed collapse/avalanche
//! schedule. Block hashes, Merkle leaves, and transaction identifiers all
//! depend on it, so the byte-level schedule here must never change.

use super::Hash32;

/// Initial working block, read as raw ASCII bytes.
const BLOCK_CONSTANT: &[u8] = b"XxFg1yY7HND109623hirD8K8ZjyR3vvzvNnfB2O8rNIaEC4VqJvZyM7--8TzCfu";

/// Mixing key, cycled through absorb, collapse, and finalize.
const ARCHAS_KEY: &[u8] = b"ARCHAS MATUOLIS";

/// Counter that cycles 0..=limit, used to drive the collapse mixing.
struct PeriodicCounter {
    count: usize,
    limit: usize,
}

impl PeriodicCounter {
    fn new(limit: usize) -> Self {
        Self {
            count: 0,
            limit: limit.max(1),
        }
    }

    fn increment(&mut self) {
        self.count += 1;
        if self.count > self.limit {
            self.count = 0;
        }
    }

    fn get(&self) -> usize {
        self.count
    }
}

fn rotl8(a: u8, b: u8) -> u8 {
    a.rotate_left((b % 8) as u32)
}

/// Hash arbitrary bytes with the Archas schedule.
///
/// Deterministic and total; two invocations over equal input always produce
/// identical bytes.
pub fn archas(data: &[u8]) -> Hash32 {
    let mut block = BLOCK_CONSTANT.to_vec();
    let len = block.len();

    // Absorb: fold each message byte into the block at a moving index, with
    // a non-linear second tap and a rotated echo eleven positions ahead.
    for (i, &d) in data.iter().enumerate() {
        let idx = i % len;
        block[idx] ^= d;

        let nl = (idx * 139 + 13) % len;
        block[idx] ^= rotl8(block[nl], (i % 8) as u8);

        let rot = (i.wrapping_mul(13) as u8) ^ block[nl];
        block[(idx + 11) % len] ^= rotl8(d.wrapping_add(i as u8), rot);
    }

    // Diffuse: key the block, then chain a nibble swap through it so every
    // byte depends on its predecessor.
    for i in 0..len - 1 {
        block[i] ^= ARCHAS_KEY[i % ARCHAS_KEY.len()];
        block[i + 1] = (block[i + 1] << 4 | block[i + 1] >> 4) ^ block[i].wrapping_add(i as u8);
    }

    collapse(&mut block, 32);
    finalize(&mut block);

    let mut out = [0u8; 32];
    out.copy_from_slice(&block);
    Hash32(out)
}

/// Fold the excess tail into the 32-byte head, one full pass over the head
/// per remaining excess byte. The excess bytes themselves mutate as they are
/// consumed, so every pass sees fresh material.
fn collapse(block: &mut Vec<u8>, collapse_size: usize) {
    debug_assert!(collapse_size > 0 && block.len() > collapse_size);
    let mut pc = PeriodicCounter::new(5);

    let mut excess = block.split_off(collapse_size);

    while !excess.is_empty() {
        let mut cnt: usize = 0;
        for i in 0..block.len() {
            let ex_idx = cnt % excess.len();
            let val = ((pc.get() + excess[ex_idx] as usize) % 256) as u8;
            pc.increment();

            match val % 6 {
                0 => block[i] = block[i].wrapping_add(val),
                1 => block[i] = block[i].wrapping_sub(val),
                2 => {
                    let rot = rotl8(block[i], val);
                    block[i] = block[i].wrapping_add(val) ^ rot;
                }
                3 => block[i] ^= val,
                4 => block[i] &= val,
                5 => block[i] |= val,
                _ => unreachable!(),
            }

            block[i] = rotl8(block[i], ARCHAS_KEY[cnt % ARCHAS_KEY.len()]);
            block[i] ^= val.wrapping_mul(37);
            block[i] ^= excess[ex_idx];
            excess[ex_idx] = excess[ex_idx]
                .wrapping_add(block[i])
                .wrapping_add((cnt + 1) as u8);
            cnt += 1;
        }
        excess.remove(0);
    }
}

/// Three cross-mixing rounds over the collapsed 32 bytes, plus a rare
/// leading-word bias (one input in roughly 2.9e8 triggers it; it must stay
/// byte-for-byte as-is for digests to remain stable).
fn finalize(block: &mut [u8]) {
    debug_assert_eq!(block.len(), 32);

    for r in 0..3usize {
        for i in 0..32usize {
            let j = (i * 7 + r) % 32;
            block[i] ^= rotl8(block[j], ((r + i) & 0xFF) as u8);
            block[i] = block[i].wrapping_add(ARCHAS_KEY[(i + r) % ARCHAS_KEY.len()]);
            block[i] = rotl8(block[i], block[(i * 3 + 1) % 32]);
        }
    }

    let w = u32::from_le_bytes([block[0], block[1], block[2], block[3]]);
    if w % 290_000_717 == 0 {
        block[0] = block[0].rotate_left(3) ^ 0xA5;
    }
}

/// Archas applied twice; the digest signed for transaction inputs.
pub fn archas_double(data: &[u8]) -> Hash32 {
    let first = archas(data);
    archas(&first.0)
}
