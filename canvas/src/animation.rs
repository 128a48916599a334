//! Cancellation tokens for in-flight throws.
//!
//! Every throw gets a fresh [`AnimationToken`]. The host schedules step and
//! emit callbacks carrying that token; the engine acts on a callback only if
//! its token is still the active one for the block. Pre-empting a throw simply
//! retires the token, so late callbacks from the old throw fall through as
//! no-ops no matter when the host delivers them.

/// Identity of one throw instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnimationToken(u64);

impl AnimationToken {
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Issues strictly increasing tokens.
#[derive(Debug, Default)]
pub struct TokenSource {
    next: u64,
}

impl TokenSource {
    pub fn issue(&mut self) -> AnimationToken {
        self.next += 1;
        AnimationToken(self.next)
    }
}
