//! A resizable array of bits.

use std::ops::Range;

/// A resizable array of bits with `Vec<u64>` storage.
///
/// The bits are stored in little-endian order within an array of `u64` words:
/// bit 0 is the least significant bit of the first word, bit 64 the least significant
/// bit of the second word, and so on. The number of words is always `len.div_ceil(64)`
/// and any bits beyond `len` in the final word are kept at 0, so word-level counting
/// never sees stale tail bits.
///
/// The mask carries no meaning of its own: the readers use it as a null bitmap
/// (bit set = row is null), as a deleted-row bitmap (bit set = row is deleted) and as a
/// row-group skip bitmap (bit set = row group can be skipped).
#[derive(Clone, Default, PartialEq, Eq)]
pub struct BitMask {
    len: usize,
    words: Vec<u64>,
}

impl BitMask {
    /// Creates a new mask with all bits set to 0.
    pub fn empty(len: usize) -> BitMask {
        BitMask {
            len,
            words: vec![0u64; len.div_ceil(64)],
        }
    }

    /// Creates a new mask with all bits set to 1.
    pub fn full(len: usize) -> BitMask {
        let mut words = vec![u64::MAX; len.div_ceil(64)];
        Self::mask_tail(&mut words, len);
        BitMask { len, words }
    }

    /// Creates a new mask with bits set at the specified positions.
    ///
    /// # Panics
    ///
    /// Panics if any position is `>= len`.
    pub fn from_positions(positions: impl IntoIterator<Item = usize>, len: usize) -> BitMask {
        let mut mask = BitMask::empty(len);
        for position in positions {
            assert!(position < len, "position {position} out of bounds (len: {len})");
            mask.set(position);
        }
        mask
    }

    /// Creates a new mask where bit `i` is set when `flags[i]` is `true`.
    pub fn from_bools(flags: &[bool]) -> BitMask {
        let mut mask = BitMask::empty(flags.len());
        for (i, &flag) in flags.iter().enumerate() {
            if flag {
                mask.set(i);
            }
        }
        mask
    }

    /// Creates a mask from LSB-ordered `u64` words, masking any bits beyond `len`.
    ///
    /// # Panics
    ///
    /// Panics if `len > words.len() * 64`.
    pub fn from_lsb_words(words: &[u64], len: usize) -> BitMask {
        assert!(len <= words.len() * 64);
        let mut words = words[..len.div_ceil(64)].to_vec();
        Self::mask_tail(&mut words, len);
        BitMask { len, words }
    }

    /// Returns the number of bits in the mask.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the mask has zero length.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Sets the bit at the given index to 1.
    #[inline]
    pub fn set(&mut self, index: usize) {
        debug_assert!(
            index < self.len,
            "Index {index} out of bounds (len: {})",
            self.len
        );
        let (word_index, bit_position) = Self::bit_position(index);
        self.words[word_index] |= 1u64 << bit_position;
    }

    /// Resets the bit at the given index to 0.
    #[inline]
    pub fn reset(&mut self, index: usize) {
        debug_assert!(
            index < self.len,
            "Index {index} out of bounds (len: {})",
            self.len
        );
        let (word_index, bit_position) = Self::bit_position(index);
        self.words[word_index] &= !(1u64 << bit_position);
    }

    /// Sets the bit at the given index to the specified value.
    #[inline]
    pub fn set_value(&mut self, index: usize, value: bool) {
        debug_assert!(
            index < self.len,
            "Index {index} out of bounds (len: {})",
            self.len
        );
        let (word_index, bit_position) = Self::bit_position(index);
        let mask = 1u64 << bit_position;
        let word = &mut self.words[word_index];
        *word = (*word & !mask) | (mask & (-(value as i64) as u64));
    }

    /// Checks if the bit at the given index is set.
    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        debug_assert!(
            index < self.len,
            "Index {index} out of bounds (len: {})",
            self.len
        );
        let (word_index, bit_position) = Self::bit_position(index);
        (self.words[word_index] & (1u64 << bit_position)) != 0
    }

    /// Like [`contains`](Self::contains), but positions beyond the mask length read as 0.
    #[inline]
    pub fn get(&self, index: usize) -> bool {
        index < self.len && self.contains(index)
    }

    /// Clears all bits (sets all to 0).
    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    /// Sets all bits in `[range.start, range.end)` to 1.
    ///
    /// # Panics
    ///
    /// Panics if `range.end > self.len()`.
    pub fn set_range(&mut self, range: Range<usize>) {
        self.process_range(range, |word, mask| *word |= mask);
    }

    /// Resets all bits in `[range.start, range.end)` to 0.
    ///
    /// # Panics
    ///
    /// Panics if `range.end > self.len()`.
    pub fn reset_range(&mut self, range: Range<usize>) {
        self.process_range(range, |word, mask| *word &= !mask);
    }

    /// Changes the length of the mask in place. Bits added at the end are 0;
    /// the existing word storage is kept and only grows when needed.
    pub fn resize(&mut self, len: usize) {
        self.words.resize(len.div_ceil(64), 0);
        Self::mask_tail(&mut self.words, len);
        self.len = len;
    }

    /// Counts the number of set bits.
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// Counts the number of unset bits.
    pub fn count_zeros(&self) -> usize {
        self.len - self.count_ones()
    }

    /// Counts the set bits within `[range.start, range.end)`.
    ///
    /// # Panics
    ///
    /// Panics if `range.end > self.len()`.
    pub fn count_ones_in(&self, range: Range<usize>) -> usize {
        if range.start >= range.end {
            return 0;
        }
        assert!(
            range.end <= self.len,
            "Range end {} out of bounds (len: {})",
            range.end,
            self.len
        );
        let (start_word, start_bit) = Self::bit_position(range.start);
        let (end_word, end_bit) = Self::bit_position(range.end);
        if start_word == end_word {
            let mask = ((1u64 << end_bit) - 1) & !((1u64 << start_bit) - 1);
            return (self.words[start_word] & mask).count_ones() as usize;
        }
        let mut count = (self.words[start_word] & !((1u64 << start_bit) - 1)).count_ones() as usize;
        count += self.words[start_word + 1..end_word]
            .iter()
            .map(|word| word.count_ones() as usize)
            .sum::<usize>();
        if end_bit > 0 {
            count += (self.words[end_word] & ((1u64 << end_bit) - 1)).count_ones() as usize;
        }
        count
    }

    /// Returns `true` if any bit is set.
    pub fn any(&self) -> bool {
        self.words.iter().any(|&word| word != 0)
    }

    /// Returns an iterator over the positions of set bits, in ascending order.
    pub fn iter(&self) -> BitMaskIter<'_> {
        BitMaskIter {
            words: &self.words,
            current_word: self.words.first().copied().unwrap_or(0),
            word_index: 0,
            end: self.len,
            invert: false,
        }
    }

    /// Returns an iterator over the positions of unset bits within
    /// `[0, end)`, in ascending order. Positions at or beyond the mask length
    /// are reported as unset.
    pub fn iter_unset_until(&self, end: usize) -> impl Iterator<Item = usize> + '_ {
        let within = end.min(self.len);
        let tail = within..end;
        BitMaskIter {
            words: &self.words[..within.div_ceil(64)],
            current_word: self.words.first().map_or(0, |word| !word),
            word_index: 0,
            end: within,
            invert: true,
        }
        .chain(tail)
    }

    /// Calls `f(pos)` for every set bit in ascending position order and returns
    /// the number of visited bits.
    pub fn for_each_set_bit(&self, mut f: impl FnMut(usize)) -> usize {
        let mut count = 0;
        for (word_index, &w0) in self.words.iter().enumerate() {
            let mut w = w0;
            let base = word_index * 64;
            while w != 0 {
                f(base + w.trailing_zeros() as usize);
                count += 1;
                w &= w - 1;
            }
        }
        count
    }

    /// Returns the underlying LSB-ordered word storage.
    #[inline]
    pub fn storage(&self) -> &[u64] {
        &self.words
    }

    fn process_range(&mut self, range: Range<usize>, mask_fn: impl Fn(&mut u64, u64)) {
        let start = range.start;
        let end = range.end;
        if start >= end {
            return;
        }
        assert!(
            end <= self.len,
            "Range end {} out of bounds (len: {})",
            end,
            self.len
        );

        let (start_word, start_bit) = Self::bit_position(start);
        let (end_word, end_bit) = Self::bit_position(end);
        let bits = &mut self.words;

        if start_word == end_word {
            let mask = ((1u64 << end_bit) - 1) & !((1u64 << start_bit) - 1);
            mask_fn(&mut bits[start_word], mask);
        } else {
            mask_fn(&mut bits[start_word], !((1u64 << start_bit) - 1));
            for item in bits.iter_mut().take(end_word).skip(start_word + 1) {
                mask_fn(item, u64::MAX);
            }
            if end_bit > 0 {
                mask_fn(&mut bits[end_word], (1u64 << end_bit) - 1);
            }
        }
    }

    #[inline]
    fn bit_position(index: usize) -> (usize, usize) {
        (index / 64, index % 64)
    }

    fn mask_tail(words: &mut [u64], len: usize) {
        let tail = len % 64;
        if tail != 0 {
            if let Some(last) = words.last_mut() {
                *last &= (1u64 << tail) - 1;
            }
        }
    }
}

impl std::fmt::Debug for BitMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitMask")
            .field("len", &self.len)
            .field("set", &self.iter().collect::<Vec<_>>())
            .finish()
    }
}

/// Iterator over set (or, when inverted, unset) bit positions of a [`BitMask`].
pub struct BitMaskIter<'a> {
    words: &'a [u64],
    current_word: u64,
    word_index: usize,
    end: usize,
    invert: bool,
}

impl Iterator for BitMaskIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        loop {
            if self.current_word != 0 {
                let pos = self.word_index * 64 + self.current_word.trailing_zeros() as usize;
                if pos >= self.end {
                    self.current_word = 0;
                    self.word_index = self.words.len();
                    return None;
                }
                self.current_word &= self.current_word - 1;
                return Some(pos);
            }
            self.word_index += 1;
            let word = *self.words.get(self.word_index)?;
            self.current_word = if self.invert { !word } else { word };
        }
    }
}
