//! Request/grant handshake for the surface height.

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    Stable,
    RequestPending { height: u32 },
}

/// What the caller should do with a freshly computed required height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeDecision {
    /// The grant matches; paint at this size.
    Paint { width: u32, height: u32, scale: i32 },
    /// Ask the host for `height`.
    Request { height: u32 },
    /// The same height is already requested; wait for the host.
    Wait,
}

/// Granted size, output scale and the outstanding height request.
#[derive(Debug, Clone)]
pub struct SizeNegotiator {
    width: u32,
    height: u32,
    scale: i32,
    state: NegotiationState,
    last_serial: Option<u32>,
}

impl Default for SizeNegotiator {
    fn default() -> Self {
        Self::new()
    }
}

impl SizeNegotiator {
    pub fn new() -> Self {
        Self {
            width: 0,
            height: 0,
            scale: 1,
            state: NegotiationState::Stable,
            last_serial: None,
        }
    }

    pub fn current(&self) -> NegotiationState {
        self.state
    }

    pub fn granted(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn scale(&self) -> i32 {
        self.scale
    }

    pub fn last_serial(&self) -> Option<u32> {
        self.last_serial
    }

    /// Records a grant. Any outstanding request is considered answered.
    pub fn on_configure(&mut self, width: u32, height: u32, serial: u32) {
        debug!(width, height, serial, previous = ?self.state, "surface configured");
        self.width = width;
        self.height = height;
        self.last_serial = Some(serial);
        self.state = NegotiationState::Stable;
    }

    /// Returns whether the scale actually changed.
    pub fn on_scale(&mut self, scale: i32) -> bool {
        let scale = scale.max(1);
        if scale == self.scale {
            return false;
        }
        self.scale = scale;
        true
    }

    pub fn decide(&mut self, required: u32) -> SizeDecision {
        match self.state {
            NegotiationState::RequestPending { height } if height == required => SizeDecision::Wait,
            NegotiationState::Stable if required == self.height => SizeDecision::Paint {
                width: self.width,
                height: self.height,
                scale: self.scale,
            },
            _ => {
                self.state = NegotiationState::RequestPending { height: required };
                SizeDecision::Request { height: required }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_then_grant_then_paint() {
        let mut sm = SizeNegotiator::new();
        assert_eq!(sm.decide(40), SizeDecision::Request { height: 40 });
        assert_eq!(sm.current(), NegotiationState::RequestPending { height: 40 });
        assert_eq!(sm.decide(40), SizeDecision::Wait);

        sm.on_configure(800, 40, 7);
        assert_eq!(sm.current(), NegotiationState::Stable);
        assert_eq!(
            sm.decide(40),
            SizeDecision::Paint {
                width: 800,
                height: 40,
                scale: 1
            }
        );
        assert_eq!(sm.last_serial(), Some(7));
    }

    #[test]
    fn changed_requirement_replaces_pending_request() {
        let mut sm = SizeNegotiator::new();
        sm.on_configure(800, 30, 1);
        assert_eq!(sm.decide(40), SizeDecision::Request { height: 40 });
        assert_eq!(sm.decide(30), SizeDecision::Request { height: 30 });
        assert_eq!(sm.current(), NegotiationState::RequestPending { height: 30 });
    }

    #[test]
    fn grant_that_misses_the_request_asks_again() {
        let mut sm = SizeNegotiator::new();
        sm.decide(40);
        sm.on_configure(800, 38, 2);
        assert_eq!(sm.decide(40), SizeDecision::Request { height: 40 });
    }

    #[test]
    fn scale_is_at_least_one() {
        let mut sm = SizeNegotiator::new();
        assert!(!sm.on_scale(0));
        assert!(sm.on_scale(2));
        assert!(!sm.on_scale(2));
        assert_eq!(sm.scale(), 2);
    }
}
