//! Memory matrix layout and the pass/slice/lane scheduler.
//!
//! The matrix is one contiguous run of blocks indexed
//! `lane * lane_length + column`. A pass walks the four slices in order;
//! inside a slice every lane fills its segment independently, and the join
//! at the slice boundary is the synchronization point that makes blocks of
//! earlier slices safe to reference from any lane.

use crate::block::Block;
use crate::cancel::CancellationToken;
use crate::error::{Error, Result};
use crate::reference::reference_position;
use crate::{Algorithm, Version, blake2b};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use zeroize::Zeroize;

/// Number of slices (synchronization points) per pass.
pub(crate) const SYNC_POINTS: u32 = 4;

/// (J1, J2) pairs carried by one address block.
const ADDRESSES_PER_BLOCK: u32 = 128;

/// Derived matrix dimensions. `block_count` is m' = 4p * floor(m_cost / 4p);
/// the caller guarantees `m_cost >= 8 * lanes`, so every segment holds at
/// least two blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Geometry {
    pub lanes: u32,
    pub lane_length: u32,
    pub segment_length: u32,
    pub block_count: u32,
}

impl Geometry {
    pub(crate) fn new(m_cost: u32, lanes: u32) -> Self {
        let group = SYNC_POINTS * lanes;
        let block_count = (m_cost / group) * group;
        let lane_length = block_count / lanes;
        Self {
            lanes,
            lane_length,
            segment_length: lane_length / SYNC_POINTS,
            block_count,
        }
    }

    #[inline]
    pub(crate) fn index(&self, lane: u32, column: u32) -> usize {
        (lane * self.lane_length + column) as usize
    }
}

/// Seeds columns 0 and 1 of every lane from H0 (RFC 9106 §3.2 steps 5-6).
pub(crate) fn seed_lanes(blocks: &mut [Block], geometry: &Geometry, h0: &[u8; 64]) {
    let mut seed = [0u8; crate::block::BLOCK_SIZE];
    for lane in 0..geometry.lanes {
        for column in 0..2u32 {
            blake2b::hash_variable(
                &mut seed,
                &[h0, &column.to_le_bytes(), &lane.to_le_bytes()],
            );
            blocks[geometry.index(lane, column)] = Block::from_bytes(&seed);
        }
    }
    seed.zeroize();
}

/// Runs all passes over the matrix. Cancellation is polled between slices
/// only; the caller wipes the matrix on every outcome.
pub(crate) fn fill(
    blocks: &mut [Block],
    geometry: &Geometry,
    algorithm: Algorithm,
    version: Version,
    t_cost: u32,
    token: Option<&CancellationToken>,
) -> Result<()> {
    let matrix = MatrixPtr {
        blocks: blocks.as_mut_ptr(),
    };

    for pass in 0..t_cost {
        for slice in 0..SYNC_POINTS {
            if let Some(token) = token {
                if token.is_cancelled() {
                    return Err(Error::Cancelled);
                }
            }

            // One worker per lane; the iterator join is the slice barrier.
            #[cfg(feature = "parallel")]
            (0..geometry.lanes).into_par_iter().for_each(|lane| {
                fill_segment(&matrix, geometry, algorithm, version, t_cost, pass, slice, lane);
            });

            #[cfg(not(feature = "parallel"))]
            for lane in 0..geometry.lanes {
                fill_segment(&matrix, geometry, algorithm, version, t_cost, pass, slice, lane);
            }
        }
    }

    Ok(())
}

/// XOR of every lane's last column, hashed down to the output tag.
pub(crate) fn finalize(blocks: &[Block], geometry: &Geometry, out: &mut [u8]) {
    let mut last = blocks[geometry.index(0, geometry.lane_length - 1)].clone();
    for lane in 1..geometry.lanes {
        last.xor_assign(&blocks[geometry.index(lane, geometry.lane_length - 1)]);
    }

    let mut bytes = last.to_bytes();
    blake2b::hash_variable(out, &[&bytes]);
    bytes.zeroize();
}

/// Shared view of the matrix for the lane workers of one slice.
///
/// Lane workers write disjoint segments and only read blocks that are
/// stable for the duration of the slice (prior slices, or earlier columns
/// of their own lane), so handing each worker the same base pointer is
/// race-free. The `Sync` impl encodes exactly that argument.
struct MatrixPtr {
    blocks: *mut Block,
}

unsafe impl Send for MatrixPtr {}
unsafe impl Sync for MatrixPtr {}

impl MatrixPtr {
    /// # Safety
    /// `index` must be in bounds and the block must not be concurrently
    /// written (see the type-level rules).
    unsafe fn block(&self, index: usize) -> &Block {
        unsafe { &*self.blocks.add(index) }
    }

    /// # Safety
    /// `index` must be in bounds and owned by the calling lane worker for
    /// the current slice.
    #[allow(clippy::mut_from_ref)]
    unsafe fn block_mut(&self, index: usize) -> &mut Block {
        unsafe { &mut *self.blocks.add(index) }
    }
}

#[allow(clippy::too_many_arguments)]
fn fill_segment(
    matrix: &MatrixPtr,
    geometry: &Geometry,
    algorithm: Algorithm,
    version: Version,
    t_cost: u32,
    pass: u32,
    slice: u32,
    lane: u32,
) {
    let data_independent = match algorithm {
        Algorithm::Argon2d => false,
        Algorithm::Argon2i => true,
        Algorithm::Argon2id => pass == 0 && slice < SYNC_POINTS / 2,
    };

    let mut stream = if data_independent {
        Some(AddressStream::new(geometry, algorithm, t_cost, pass, slice, lane))
    } else {
        None
    };

    // Columns 0 and 1 are seeded from H0.
    let start = if pass == 0 && slice == 0 { 2 } else { 0 };

    for index in start..geometry.segment_length {
        let column = slice * geometry.segment_length + index;
        let prev_column = if column == 0 {
            geometry.lane_length - 1
        } else {
            column - 1
        };

        // SAFETY: `prev_column` belongs to this worker's lane and was
        // written earlier in this segment (or in the last slice of the
        // previous pass, which is behind the barrier).
        let prev = unsafe { matrix.block(geometry.index(lane, prev_column)) };

        let (j1, j2) = match stream.as_mut() {
            Some(stream) => stream.next_pair(index),
            None => split_words(prev.first_word()),
        };

        let (ref_lane, ref_column) =
            reference_position(pass, slice, lane, index, geometry, j1, j2);

        // SAFETY: the indexing rules only ever select blocks from finished
        // slices or the finished prefix of this worker's own segment.
        let reference = unsafe { matrix.block(geometry.index(ref_lane, ref_column)) };
        let mixed = Block::compress(prev, reference);

        // SAFETY: this worker is the only writer of its segment.
        let current = unsafe { matrix.block_mut(geometry.index(lane, column)) };
        if pass == 0 || version == Version::V0x10 {
            *current = mixed;
        } else {
            // Version 0x13 folds the previous contents of the cell in, so
            // later passes cannot be shortcut.
            current.xor_assign(&mixed);
        }
    }
}

#[inline]
fn split_words(word: u64) -> (u32, u32) {
    (word as u32, (word >> 32) as u32)
}

/// Data-independent (J1, J2) source for one (pass, slice, lane) segment.
///
/// Each refill produces 128 pairs as G(0, G(0, input)) over an input block
/// holding the position and a running counter.
struct AddressStream {
    input: Block,
    addresses: Block,
}

impl AddressStream {
    fn new(
        geometry: &Geometry,
        algorithm: Algorithm,
        t_cost: u32,
        pass: u32,
        slice: u32,
        lane: u32,
    ) -> Self {
        let mut input = Block::ZERO;
        input.0[0] = u64::from(pass);
        input.0[1] = u64::from(lane);
        input.0[2] = u64::from(slice);
        input.0[3] = u64::from(geometry.block_count);
        input.0[4] = u64::from(t_cost);
        input.0[5] = algorithm as u64;

        let mut stream = Self {
            input,
            addresses: Block::ZERO,
        };
        stream.refill();
        stream
    }

    fn refill(&mut self) {
        self.input.0[6] += 1;
        self.addresses = Block::address_block(&self.input);
    }

    fn next_pair(&mut self, index: u32) -> (u32, u32) {
        let slot = index % ADDRESSES_PER_BLOCK;
        if slot == 0 && index != 0 {
            self.refill();
        }
        split_words(self.addresses.0[slot as usize])
    }
}
