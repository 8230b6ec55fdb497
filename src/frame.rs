// Frame pacing - the pure decision layer of the render loop
//
// The render manager drives its per-frame choices off these types, which
// keeps the loop's policy testable without a GPU: tests feed in raw
// swapchain results and observe the decision.

use ash::vk;

/// Default number of frames whose GPU work may overlap CPU recording.
pub const DEFAULT_FRAMES_IN_FLIGHT: usize = 2;

/// Cycles the in-flight frame slot. The index is advanced exactly once per
/// frame, after presentation, and never leaves `0..count`.
#[derive(Debug)]
pub struct FrameCursor {
    index: usize,
    count: usize,
}

impl FrameCursor {
    pub fn new(count: usize) -> Self {
        assert!(count > 0, "at least one frame in flight is required");
        Self { index: 0, count }
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn advance(&mut self) {
        self.index = (self.index + 1) % self.count;
    }
}

/// Result of acquiring a swapchain image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// An image is ready. `suboptimal` flags that the swapchain still works
    /// but no longer matches the surface and should be rebuilt after this
    /// frame completes.
    Ready { image_index: u32, suboptimal: bool },
    /// The swapchain no longer matches the surface; the frame must be
    /// abandoned before any fence reset or submission.
    OutOfDate,
}

impl AcquireOutcome {
    /// Classify a raw `vkAcquireNextImageKHR` result. Out-of-date is a
    /// recoverable outcome; everything else fatal stays an error.
    pub fn from_raw(raw: Result<(u32, bool), vk::Result>) -> Result<Self, vk::Result> {
        match raw {
            Ok((image_index, suboptimal)) => Ok(Self::Ready {
                image_index,
                suboptimal,
            }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(Self::OutOfDate),
            Err(e) => Err(e),
        }
    }
}

/// Result of presenting a swapchain image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Complete,
    /// Presented (or dropped) against a stale swapchain; rebuild before the
    /// next frame.
    Stale,
}

impl PresentOutcome {
    /// Classify a raw `vkQueuePresentKHR` result.
    pub fn from_raw(raw: Result<bool, vk::Result>) -> Result<Self, vk::Result> {
        match raw {
            Ok(false) => Ok(Self::Complete),
            Ok(true) => Ok(Self::Stale),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(Self::Stale),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_cycles_through_exactly_n_slots() {
        let mut cursor = FrameCursor::new(2);
        let mut seen = Vec::new();
        for _ in 0..6 {
            seen.push(cursor.index());
            assert!(cursor.index() < cursor.count());
            cursor.advance();
        }
        assert_eq!(seen, vec![0, 1, 0, 1, 0, 1]);
    }

    #[test]
    fn cursor_with_three_slots_wraps_at_three() {
        let mut cursor = FrameCursor::new(3);
        for expected in [0, 1, 2, 0, 1, 2] {
            assert_eq!(cursor.index(), expected);
            cursor.advance();
        }
    }

    #[test]
    #[should_panic]
    fn cursor_rejects_zero_slots() {
        FrameCursor::new(0);
    }

    #[test]
    fn acquire_success_is_ready() {
        let outcome = AcquireOutcome::from_raw(Ok((1, false))).unwrap();
        assert_eq!(
            outcome,
            AcquireOutcome::Ready {
                image_index: 1,
                suboptimal: false
            }
        );
    }

    #[test]
    fn acquire_suboptimal_still_yields_image() {
        let outcome = AcquireOutcome::from_raw(Ok((0, true))).unwrap();
        assert_eq!(
            outcome,
            AcquireOutcome::Ready {
                image_index: 0,
                suboptimal: true
            }
        );
    }

    #[test]
    fn acquire_out_of_date_abandons_frame() {
        let outcome = AcquireOutcome::from_raw(Err(vk::Result::ERROR_OUT_OF_DATE_KHR)).unwrap();
        assert_eq!(outcome, AcquireOutcome::OutOfDate);
    }

    #[test]
    fn acquire_device_lost_stays_an_error() {
        let err = AcquireOutcome::from_raw(Err(vk::Result::ERROR_DEVICE_LOST)).unwrap_err();
        assert_eq!(err, vk::Result::ERROR_DEVICE_LOST);
    }

    #[test]
    fn present_maps_suboptimal_and_out_of_date_to_stale() {
        assert_eq!(
            PresentOutcome::from_raw(Ok(false)).unwrap(),
            PresentOutcome::Complete
        );
        assert_eq!(
            PresentOutcome::from_raw(Ok(true)).unwrap(),
            PresentOutcome::Stale
        );
        assert_eq!(
            PresentOutcome::from_raw(Err(vk::Result::ERROR_OUT_OF_DATE_KHR)).unwrap(),
            PresentOutcome::Stale
        );
    }

    #[test]
    fn present_surface_lost_stays_an_error() {
        let err = PresentOutcome::from_raw(Err(vk::Result::ERROR_SURFACE_LOST_KHR)).unwrap_err();
        assert_eq!(err, vk::Result::ERROR_SURFACE_LOST_KHR);
    }
}
