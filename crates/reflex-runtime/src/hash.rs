//! MurmurHash3 32-bit, used by the `hash(...)` feature op.
//!
//! Deterministic across platforms; hashes the UTF-8 bytes of the input.

pub fn murmur3_32(key: &str, seed: u32) -> u32 {
    const C1: u32 = 0xcc9e_2d51;
    const C2: u32 = 0x1b87_3593;

    let data = key.as_bytes();
    let mut h = seed;

    let mut chunks = data.chunks_exact(4);
    for chunk in &mut chunks {
        let mut k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        k = k.wrapping_mul(C1);
        k = k.rotate_left(15);
        k = k.wrapping_mul(C2);

        h ^= k;
        h = h.rotate_left(13);
        h = h.wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        let mut k = 0u32;
        if tail.len() >= 3 {
            k ^= (tail[2] as u32) << 16;
        }
        if tail.len() >= 2 {
            k ^= (tail[1] as u32) << 8;
        }
        k ^= tail[0] as u32;
        k = k.wrapping_mul(C1);
        k = k.rotate_left(15);
        k = k.wrapping_mul(C2);
        h ^= k;
    }

    h ^= data.len() as u32;
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;

    h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vectors() {
        assert_eq!(murmur3_32("", 0), 0);
        assert_eq!(murmur3_32("", 1), 0x514e_28b7);
        assert_eq!(murmur3_32("test", 0), 0xba6b_d213);
    }

    #[test]
    fn deterministic_per_seed() {
        assert_eq!(murmur3_32("click", 42), murmur3_32("click", 42));
        assert_ne!(murmur3_32("click", 42), murmur3_32("click", 43));
        assert_ne!(murmur3_32("click", 42), murmur3_32("clack", 42));
    }
}
