//! Blake2b (RFC 7693) and the Argon2 variable-length hash H'.
//!
//! Argon2 uses Blake2b in three places: the parameter digest H0, the
//! seeding/finalization hash H', and (indirectly) the block permutation,
//! which reuses the round structure but not this code. The context here
//! supports digests of 1..=64 bytes and an optional key, which is all
//! RFC 9106 requires.

use zeroize::Zeroize;

pub(crate) const BLOCK_BYTES: usize = 128;
pub(crate) const MAX_OUT_BYTES: usize = 64;

const IV: [u64; 8] = [
    0x6a09_e667_f3bc_c908,
    0xbb67_ae85_84ca_a73b,
    0x3c6e_f372_fe94_f82b,
    0xa54f_f53a_5f1d_36f1,
    0x510e_527f_ade6_82d1,
    0x9b05_688c_2b3e_6c1f,
    0x1f83_d9ab_fb41_bd6b,
    0x5be0_cd19_137e_2179,
];

/// Message word schedule. Rounds 10 and 11 repeat rows 0 and 1.
const SIGMA: [[usize; 16]; 12] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
    [14, 10, 4, 8, 9, 15, 13, 6, 1, 12, 0, 2, 11, 7, 5, 3],
    [11, 8, 12, 0, 5, 2, 15, 13, 10, 14, 3, 6, 7, 1, 9, 4],
    [7, 9, 3, 1, 13, 12, 11, 14, 2, 6, 5, 10, 4, 0, 15, 8],
    [9, 0, 5, 7, 2, 4, 10, 15, 14, 1, 11, 12, 6, 8, 3, 13],
    [2, 12, 6, 10, 0, 11, 8, 3, 4, 13, 7, 5, 15, 14, 1, 9],
    [12, 5, 1, 15, 14, 13, 4, 10, 0, 7, 6, 3, 9, 2, 8, 11],
    [13, 11, 7, 14, 12, 1, 3, 9, 5, 0, 15, 4, 8, 6, 2, 10],
    [6, 15, 14, 9, 11, 3, 0, 8, 12, 2, 13, 7, 1, 4, 10, 5],
    [10, 2, 8, 4, 7, 6, 1, 5, 15, 11, 9, 14, 3, 12, 13, 0],
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
    [14, 10, 4, 8, 9, 15, 13, 6, 1, 12, 0, 2, 11, 7, 5, 3],
];

/// Incremental Blake2b context.
///
/// Inputs fed to this crate never reach 2^64 bytes, so the byte counter is
/// a single 64-bit word.
pub(crate) struct Blake2b {
    h: [u64; 8],
    t: u64,
    buf: [u8; BLOCK_BYTES],
    buf_len: usize,
    out_len: usize,
}

impl Blake2b {
    pub(crate) fn new(out_len: usize) -> Self {
        Self::new_keyed(out_len, &[])
    }

    /// Keyed hashing: the key is padded to a full block and compressed
    /// ahead of the message, per RFC 7693 §3.3.
    pub(crate) fn new_keyed(out_len: usize, key: &[u8]) -> Self {
        debug_assert!(key.len() <= MAX_OUT_BYTES);
        let mut ctx = Self::with_params(out_len, key.len());
        if !key.is_empty() {
            ctx.buf[..key.len()].copy_from_slice(key);
            ctx.buf_len = BLOCK_BYTES;
        }
        ctx
    }

    fn with_params(out_len: usize, key_len: usize) -> Self {
        debug_assert!((1..=MAX_OUT_BYTES).contains(&out_len));
        let mut h = IV;
        h[0] ^= 0x0101_0000 ^ ((key_len as u64) << 8) ^ out_len as u64;
        Self {
            h,
            t: 0,
            buf: [0u8; BLOCK_BYTES],
            buf_len: 0,
            out_len,
        }
    }

    pub(crate) fn update(&mut self, mut input: &[u8]) {
        if input.is_empty() {
            return;
        }

        // A full buffer is only compressed once more input arrives, so the
        // final block is always still in hand when `finalize_into` runs.
        let fill = BLOCK_BYTES - self.buf_len;
        if input.len() > fill {
            self.buf[self.buf_len..].copy_from_slice(&input[..fill]);
            self.buf_len = 0;
            self.t = self.t.wrapping_add(BLOCK_BYTES as u64);
            compress(&mut self.h, &self.buf, self.t, false);
            input = &input[fill..];

            while input.len() > BLOCK_BYTES {
                self.t = self.t.wrapping_add(BLOCK_BYTES as u64);
                let block: &[u8; BLOCK_BYTES] = input[..BLOCK_BYTES].try_into().unwrap();
                compress(&mut self.h, block, self.t, false);
                input = &input[BLOCK_BYTES..];
            }
        }

        self.buf[self.buf_len..self.buf_len + input.len()].copy_from_slice(input);
        self.buf_len += input.len();
    }

    pub(crate) fn finalize_into(mut self, out: &mut [u8]) {
        debug_assert_eq!(out.len(), self.out_len);

        self.t = self.t.wrapping_add(self.buf_len as u64);
        self.buf[self.buf_len..].fill(0);
        compress(&mut self.h, &self.buf, self.t, true);

        let mut digest = [0u8; MAX_OUT_BYTES];
        for (chunk, word) in digest.chunks_exact_mut(8).zip(self.h.iter()) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        out.copy_from_slice(&digest[..out.len()]);

        digest.zeroize();
        self.h.zeroize();
        self.buf.zeroize();
    }
}

/// One-shot hash of a sequence of input segments.
pub(crate) fn blake2b(out: &mut [u8], inputs: &[&[u8]]) {
    let mut ctx = Blake2b::new(out.len());
    for input in inputs {
        ctx.update(input);
    }
    ctx.finalize_into(out);
}

/// Argon2 variable-length hash H' (RFC 9106 §3.3).
///
/// Short outputs are a single length-prefixed Blake2b call. Longer outputs
/// chain 64-byte digests, emitting the first 32 bytes of each link, and
/// close with one digest sized to the remainder. The output is written
/// directly into `out`; nothing is allocated on that path.
pub(crate) fn hash_variable(out: &mut [u8], inputs: &[&[u8]]) {
    let len_prefix = (out.len() as u32).to_le_bytes();

    if out.len() <= MAX_OUT_BYTES {
        let mut ctx = Blake2b::new(out.len());
        ctx.update(&len_prefix);
        for input in inputs {
            ctx.update(input);
        }
        ctx.finalize_into(out);
        return;
    }

    let mut link = [0u8; MAX_OUT_BYTES];
    let mut ctx = Blake2b::new(MAX_OUT_BYTES);
    ctx.update(&len_prefix);
    for input in inputs {
        ctx.update(input);
    }
    ctx.finalize_into(&mut link);

    out[..32].copy_from_slice(&link[..32]);
    let mut written = 32;

    while out.len() - written > MAX_OUT_BYTES {
        let mut next = [0u8; MAX_OUT_BYTES];
        blake2b(&mut next, &[&link]);
        link.zeroize();
        link = next;
        out[written..written + 32].copy_from_slice(&link[..32]);
        written += 32;
    }

    let rest = out.len() - written;
    let mut ctx = Blake2b::new(rest);
    ctx.update(&link);
    ctx.finalize_into(&mut out[written..]);
    link.zeroize();
}

#[inline(always)]
fn g(v: &mut [u64; 16], a: usize, b: usize, c: usize, d: usize, x: u64, y: u64) {
    v[a] = v[a].wrapping_add(v[b]).wrapping_add(x);
    v[d] = (v[d] ^ v[a]).rotate_right(32);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(24);
    v[a] = v[a].wrapping_add(v[b]).wrapping_add(y);
    v[d] = (v[d] ^ v[a]).rotate_right(16);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(63);
}

fn compress(h: &mut [u64; 8], block: &[u8; BLOCK_BYTES], t: u64, last: bool) {
    let mut m = [0u64; 16];
    for (word, chunk) in m.iter_mut().zip(block.chunks_exact(8)) {
        *word = u64::from_le_bytes(chunk.try_into().unwrap());
    }

    let mut v = [0u64; 16];
    v[..8].copy_from_slice(h);
    v[8..].copy_from_slice(&IV);
    v[12] ^= t;
    if last {
        v[14] = !v[14];
    }

    for s in &SIGMA {
        g(&mut v, 0, 4, 8, 12, m[s[0]], m[s[1]]);
        g(&mut v, 1, 5, 9, 13, m[s[2]], m[s[3]]);
        g(&mut v, 2, 6, 10, 14, m[s[4]], m[s[5]]);
        g(&mut v, 3, 7, 11, 15, m[s[6]], m[s[7]]);
        g(&mut v, 0, 5, 10, 15, m[s[8]], m[s[9]]);
        g(&mut v, 1, 6, 11, 12, m[s[10]], m[s[11]]);
        g(&mut v, 2, 7, 8, 13, m[s[12]], m[s[13]]);
        g(&mut v, 3, 4, 9, 14, m[s[14]], m[s[15]]);
    }

    for i in 0..8 {
        h[i] ^= v[i] ^ v[i + 8];
    }

    m.zeroize();
    v.zeroize();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc7693_abc_vector() {
        let mut out = [0u8; 64];
        blake2b(&mut out, &[b"abc"]);
        assert_eq!(
            hex::encode(out),
            "ba80a53f981c4d0d6a2797b69f12f6e94c212f14685ac4b74b12bb6fdbffa2d1\
             7d87c5392aab792dc252d5de4533cc9518d38aa8dbf1925ab92386edd4009923"
        );
    }

    #[test]
    fn empty_input_vector() {
        let mut out = [0u8; 64];
        blake2b(&mut out, &[]);
        assert_eq!(
            hex::encode(out),
            "786a02f742015903c6c6fd852552d272912f4740e15847618a86e217f71f5419\
             d25e1031afee585313896444934eb04b903a685b1448b755d56f701afe9be2ce"
        );
    }

    #[test]
    fn split_updates_match_one_shot() {
        let data = [0xabu8; 300];
        let mut whole = [0u8; 64];
        blake2b(&mut whole, &[&data]);

        let mut ctx = Blake2b::new(64);
        ctx.update(&data[..1]);
        ctx.update(&data[1..129]);
        ctx.update(&data[129..]);
        let mut split = [0u8; 64];
        ctx.finalize_into(&mut split);

        assert_eq!(whole, split);
    }

    #[test]
    fn keyed_hash_differs_from_unkeyed() {
        let mut keyed = [0u8; 32];
        let mut ctx = Blake2b::new_keyed(32, b"supersecretpepper");
        ctx.update(b"message");
        ctx.finalize_into(&mut keyed);

        let mut plain = [0u8; 32];
        blake2b(&mut plain, &[b"message"]);

        assert_ne!(keyed, plain);
    }

    #[test]
    fn variable_hash_is_not_a_prefix_function() {
        let mut short = [0u8; 32];
        let mut long = [0u8; 48];
        hash_variable(&mut short, &[b"input data"]);
        hash_variable(&mut long, &[b"input data"]);
        assert_ne!(&long[..32], &short[..]);
    }

    #[test]
    fn variable_hash_long_outputs_walk_the_chain() {
        // Exercise the remainder arithmetic around the 64-byte boundary.
        for len in [65usize, 96, 97, 100, 1024] {
            let mut out = vec![0u8; len];
            hash_variable(&mut out, &[b"chained"]);
            assert!(out.iter().any(|&b| b != 0), "length {len} produced zeros");
        }
    }
}
