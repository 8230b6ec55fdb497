// Renderer lifecycle
//
// The render manager tracks which phase it is in and refuses operations
// that are illegal for the current phase, instead of discovering the
// problem as a Vulkan error deep in a frame.

use std::fmt;

/// Phases a renderer moves through, in order, with one loop: a stale
/// swapchain bounces back to `Initialized` once rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Uninitialized,
    Initialized,
    SwapchainStale,
    ShuttingDown,
    Destroyed,
}

impl LifecyclePhase {
    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(self, next: LifecyclePhase) -> bool {
        use LifecyclePhase::*;
        matches!(
            (self, next),
            (Uninitialized, Initialized)
                | (Initialized, SwapchainStale)
                | (SwapchainStale, Initialized)
                | (Initialized, ShuttingDown)
                | (SwapchainStale, ShuttingDown)
                | (ShuttingDown, Destroyed)
        )
    }

    /// Frames may only be drawn while fully initialized or while a rebuild
    /// is pending (the draw itself performs the rebuild).
    pub fn can_draw(self) -> bool {
        matches!(self, LifecyclePhase::Initialized | LifecyclePhase::SwapchainStale)
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecyclePhase::Uninitialized => "uninitialized",
            LifecyclePhase::Initialized => "initialized",
            LifecyclePhase::SwapchainStale => "swapchain-stale",
            LifecyclePhase::ShuttingDown => "shutting-down",
            LifecyclePhase::Destroyed => "destroyed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::LifecyclePhase::*;

    #[test]
    fn forward_path_is_legal() {
        assert!(Uninitialized.can_transition_to(Initialized));
        assert!(Initialized.can_transition_to(ShuttingDown));
        assert!(ShuttingDown.can_transition_to(Destroyed));
    }

    #[test]
    fn stale_swapchain_loops_back_to_initialized() {
        assert!(Initialized.can_transition_to(SwapchainStale));
        assert!(SwapchainStale.can_transition_to(Initialized));
    }

    #[test]
    fn shutdown_is_reachable_from_stale() {
        assert!(SwapchainStale.can_transition_to(ShuttingDown));
    }

    #[test]
    fn backwards_and_skipping_transitions_are_illegal() {
        assert!(!Initialized.can_transition_to(Uninitialized));
        assert!(!Uninitialized.can_transition_to(SwapchainStale));
        assert!(!Uninitialized.can_transition_to(Destroyed));
        assert!(!Destroyed.can_transition_to(Initialized));
        assert!(!ShuttingDown.can_transition_to(Initialized));
    }

    #[test]
    fn drawing_is_allowed_only_while_live() {
        assert!(Initialized.can_draw());
        assert!(SwapchainStale.can_draw());
        assert!(!Uninitialized.can_draw());
        assert!(!ShuttingDown.can_draw());
        assert!(!Destroyed.can_draw());
    }
}
