//! The 1024-byte working block and the compression function G.
//!
//! G is built from the Blake2b round, with the additions replaced by
//! `a + b + 2·trunc32(a)·trunc32(b)` for diffusion (RFC 9106 §3.5). A block
//! is mixed by running the permutation over its eight 16-word rows and then
//! over eight interleaved column groups, and XOR-ing the result back onto
//! the pre-permutation state.

use zeroize::Zeroize;

/// Size of one memory block in bytes.
pub const BLOCK_SIZE: usize = 1024;

pub(crate) const WORDS_PER_BLOCK: usize = 128;

/// One cell of the Argon2 memory matrix: 128 little-endian 64-bit words.
///
/// Blocks wipe themselves when dropped, so the matrix (and every temporary
/// block the engine produces) leaves no residue on any exit path.
#[derive(Clone)]
pub struct Block(pub(crate) [u64; WORDS_PER_BLOCK]);

impl Block {
    pub(crate) const ZERO: Self = Self([0u64; WORDS_PER_BLOCK]);

    pub(crate) fn from_bytes(bytes: &[u8; BLOCK_SIZE]) -> Self {
        let words = core::array::from_fn(|i| {
            u64::from_le_bytes(bytes[i * 8..i * 8 + 8].try_into().unwrap())
        });
        Self(words)
    }

    pub(crate) fn to_bytes(&self) -> [u8; BLOCK_SIZE] {
        let mut out = [0u8; BLOCK_SIZE];
        for (chunk, word) in out.chunks_exact_mut(8).zip(self.0.iter()) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        out
    }

    pub(crate) fn xor_assign(&mut self, other: &Self) {
        for (word, rhs) in self.0.iter_mut().zip(other.0.iter()) {
            *word ^= rhs;
        }
    }

    /// The word the data-dependent indexing mode draws (J1, J2) from.
    pub(crate) fn first_word(&self) -> u64 {
        self.0[0]
    }

    /// G(X, Y) = P(P(X ⊕ Y)) ⊕ X ⊕ Y.
    pub(crate) fn compress(x: &Self, y: &Self) -> Self {
        let mut r = [0u64; WORDS_PER_BLOCK];
        for (word, (a, b)) in r.iter_mut().zip(x.0.iter().zip(y.0.iter())) {
            *word = a ^ b;
        }

        let mut q = r;
        permute_rows(&mut q);
        permute_columns(&mut q);
        for (word, pre) in q.iter_mut().zip(r.iter()) {
            *word ^= pre;
        }

        r.zeroize();
        Self(q)
    }

    /// One block of the data-independent address stream: G(0, G(0, input)),
    /// where `input` packs the position counter (RFC 9106 §3.4.1.2).
    pub(crate) fn address_block(input: &Self) -> Self {
        let inner = Self::compress(&Self::ZERO, input);
        Self::compress(&Self::ZERO, &inner)
    }
}

impl Default for Block {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Zeroize for Block {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

impl Drop for Block {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// Lower-half multiply-add from the Argon2 round: a + b + 2·L(a)·L(b).
#[inline(always)]
fn mul_add(a: u64, b: u64) -> u64 {
    let low = 2u64
        .wrapping_mul(a as u32 as u64)
        .wrapping_mul(b as u32 as u64);
    a.wrapping_add(b).wrapping_add(low)
}

#[inline(always)]
fn mix(v: &mut [u64; 16], a: usize, b: usize, c: usize, d: usize) {
    v[a] = mul_add(v[a], v[b]);
    v[d] = (v[d] ^ v[a]).rotate_right(32);
    v[c] = mul_add(v[c], v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(24);
    v[a] = mul_add(v[a], v[b]);
    v[d] = (v[d] ^ v[a]).rotate_right(16);
    v[c] = mul_add(v[c], v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(63);
}

/// Permutation P: the Blake2b round over a 4×4 matrix of 16-byte words,
/// columns first, then diagonals.
#[inline(always)]
fn permute(v: &mut [u64; 16]) {
    mix(v, 0, 4, 8, 12);
    mix(v, 1, 5, 9, 13);
    mix(v, 2, 6, 10, 14);
    mix(v, 3, 7, 11, 15);

    mix(v, 0, 5, 10, 15);
    mix(v, 1, 6, 11, 12);
    mix(v, 2, 7, 8, 13);
    mix(v, 3, 4, 9, 14);
}

fn permute_rows(words: &mut [u64; WORDS_PER_BLOCK]) {
    for row in 0..8 {
        let base = row * 16;
        let mut v: [u64; 16] = words[base..base + 16].try_into().unwrap();
        permute(&mut v);
        words[base..base + 16].copy_from_slice(&v);
    }
}

/// Column pass: group `col` gathers the word pairs (2·col, 2·col + 1) of
/// every row.
fn permute_columns(words: &mut [u64; WORDS_PER_BLOCK]) {
    for col in 0..8 {
        let mut v = [0u64; 16];
        for row in 0..8 {
            v[2 * row] = words[16 * row + 2 * col];
            v[2 * row + 1] = words[16 * row + 2 * col + 1];
        }
        permute(&mut v);
        for row in 0..8 {
            words[16 * row + 2 * col] = v[2 * row];
            words[16 * row + 2 * col + 1] = v[2 * row + 1];
        }
    }
}
