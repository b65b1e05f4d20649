use crate::error::{HardwareError, Result};
use tessera_data::HeadState;

/// A cursor into one memory space.
///
/// The raw position is kept as written; every read goes through
/// [`Head::position`], which reduces it modulo the current length of the
/// space, so a head stays valid while the space grows and shrinks under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Head {
    space: usize,
    position: usize,
    advance: bool,
}

impl Default for Head {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl Head {
    #[must_use]
    pub const fn new(space: usize, position: usize) -> Self {
        Self {
            space,
            position,
            advance: true,
        }
    }

    #[inline]
    #[must_use]
    pub fn space(&self) -> usize {
        self.space
    }

    #[inline]
    #[must_use]
    pub fn raw_position(&self) -> usize {
        self.position
    }

    /// Position normalized against a space of length `len`.
    #[inline]
    pub fn position(&self, len: usize) -> Result<usize> {
        if len == 0 {
            Err(HardwareError::EmptySpace { space: self.space })
        } else {
            Ok(self.position % len)
        }
    }

    pub fn set(&mut self, space: usize, position: usize) {
        self.space = space;
        self.position = position;
    }

    pub fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    /// Moves to the location of another head, keeping this head's flag.
    pub fn move_to(&mut self, other: &Head) {
        self.space = other.space;
        self.position = other.position;
    }

    #[inline]
    #[must_use]
    pub fn advance_flag(&self) -> bool {
        self.advance
    }

    pub fn set_advance(&mut self, advance: bool) {
        self.advance = advance;
    }

    /// Steps forward by one, wrapping within a space of length `len`.
    pub fn step(&mut self, len: usize) {
        if len > 0 {
            self.position = (self.position % len + 1) % len;
        } else {
            self.position = 0;
        }
    }

    /// Steps forward only if the advance flag is set.
    pub fn advance(&mut self, len: usize) {
        if self.advance {
            self.step(len);
        }
    }

    /// Moves by a signed offset with wrap-around.
    pub fn jump(&mut self, offset: i64, len: usize) {
        if len == 0 {
            self.position = 0;
            return;
        }
        let len = len as i64;
        self.position = (self.position as i64 % len + offset).rem_euclid(len) as usize;
    }

    #[must_use]
    pub fn state(&self) -> HeadState {
        HeadState {
            space: self.space,
            position: self.position,
            advance: self.advance,
        }
    }

    #[must_use]
    pub fn from_state(state: &HeadState) -> Self {
        Self {
            space: state.space,
            position: state.position,
            advance: state.advance,
        }
    }
}
