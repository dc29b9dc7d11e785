use core::ops::Range;

const BITS: usize = u64::BITS as usize;

/// Index-based frame bitmap over externally provided storage.
///
/// Bit `i` set means frame `i` is free. Only frames inside the trackable
/// span `[first, end)` are ever handed out.
pub struct FrameBitmap<'a> {
    words: &'a mut [u64],
    first: usize,
    end: usize,
    free: usize,
}

impl<'a> FrameBitmap<'a> {
    /// Wrap `words`, marking every frame as used.
    ///
    /// # Panics
    /// If `words` cannot cover `end` frames.
    pub fn new(words: &'a mut [u64], span: Range<usize>) -> Self {
        assert!(span.end <= words.len() * BITS, "bitmap storage too small");
        words.fill(0);
        Self {
            words,
            first: span.start,
            end: span.end,
            free: 0,
        }
    }

    #[inline]
    fn test(&self, frame: usize) -> bool {
        self.words[frame / BITS] & (1 << (frame % BITS)) != 0
    }

    /// Flip the bits of `frames` (clamped to the span) to `free`, returning
    /// how many actually changed.
    fn assign(&mut self, frames: Range<usize>, free: bool) -> usize {
        let start = frames.start.max(self.first);
        let end = frames.end.min(self.end);
        let mut changed = 0;
        for frame in start..end {
            let mask = 1 << (frame % BITS);
            let word = &mut self.words[frame / BITS];
            if (*word & mask != 0) != free {
                *word ^= mask;
                changed += 1;
            }
        }
        changed
    }

    /// Return `frames` to the free set.
    pub fn release(&mut self, frames: Range<usize>) {
        debug_assert!(
            frames.start >= self.first && frames.end <= self.end,
            "freeing frames {frames:?} outside the tracked span"
        );
        self.free += self.assign(frames, true);
    }

    /// Take `frames` out of the free set.
    pub fn reserve(&mut self, frames: Range<usize>) {
        self.free -= self.assign(frames, false);
    }

    /// First index of `count` consecutive free frames.
    #[must_use]
    pub fn find_run(&self, count: usize) -> Option<usize> {
        if count == 0 || count > self.free {
            return None;
        }
        let mut run_start = self.first;
        let mut run = 0;
        let mut frame = self.first;
        while frame < self.end {
            if frame % BITS == 0 && self.words[frame / BITS] == 0 {
                run = 0;
                frame += BITS;
                continue;
            }
            if self.test(frame) {
                if run == 0 {
                    run_start = frame;
                }
                run += 1;
                if run == count {
                    return Some(run_start);
                }
            } else {
                run = 0;
            }
            frame += 1;
        }
        None
    }

    /// First-fit allocation of `count` contiguous frames.
    pub fn alloc(&mut self, count: usize) -> Option<usize> {
        let start = self.find_run(count)?;
        self.reserve(start..start + count);
        Some(start)
    }

    #[inline]
    #[must_use]
    pub const fn free_frames(&self) -> usize {
        self.free
    }

    /// The trackable frame index range.
    #[inline]
    #[must_use]
    pub const fn span(&self) -> Range<usize> {
        self.first..self.end
    }

    #[inline]
    #[must_use]
    pub fn is_free(&self, frame: usize) -> bool {
        (self.first..self.end).contains(&frame) && self.test(frame)
    }

    /// Raw bitmap words.
    #[inline]
    #[must_use]
    pub fn words(&self) -> &[u64] {
        self.words
    }
}
