//! Bootstrap phases and their ordering rules.
//!
//! [`BootstrapStep::ALL`] lists the creation steps in the order they run.
//! Every step declares the steps whose resources it uses directly; the list
//! is a topological order of that graph. A step also requires its
//! predecessor in the list, so steps complete strictly in order.
//! [`PhaseTracker`] records which steps have completed, rejects a step whose
//! prerequisites are missing, and yields teardown as the fixed reverse list
//! restricted to completed steps.

use std::fmt;

use crate::error::{RendererError, RendererResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BootstrapStep {
    Instance,
    Surface,
    Device,
    Swapchain,
    DepthBuffer,
    UniformBuffer,
    Descriptors,
    RenderPass,
    Framebuffers,
    GeometryBuffers,
    Pipeline,
    CommandBuffers,
    SyncObjects,
}

impl BootstrapStep {
    pub const COUNT: usize = 13;

    /// Creation order.
    pub const ALL: [BootstrapStep; Self::COUNT] = [
        BootstrapStep::Instance,
        BootstrapStep::Surface,
        BootstrapStep::Device,
        BootstrapStep::Swapchain,
        BootstrapStep::DepthBuffer,
        BootstrapStep::UniformBuffer,
        BootstrapStep::Descriptors,
        BootstrapStep::RenderPass,
        BootstrapStep::Framebuffers,
        BootstrapStep::GeometryBuffers,
        BootstrapStep::Pipeline,
        BootstrapStep::CommandBuffers,
        BootstrapStep::SyncObjects,
    ];

    /// Steps whose resources this step uses directly.
    pub fn prerequisites(self) -> &'static [BootstrapStep] {
        use BootstrapStep::*;
        match self {
            Instance => &[],
            Surface => &[Instance],
            Device => &[Instance, Surface],
            Swapchain => &[Instance, Surface, Device],
            DepthBuffer => &[Instance, Device, Swapchain],
            UniformBuffer => &[Device],
            Descriptors => &[Device, UniformBuffer],
            RenderPass => &[Device, Swapchain, DepthBuffer],
            Framebuffers => &[Device, Swapchain, DepthBuffer, RenderPass],
            GeometryBuffers => &[Device],
            Pipeline => &[Device, Descriptors, RenderPass],
            CommandBuffers => &[
                Device,
                Swapchain,
                Descriptors,
                RenderPass,
                Framebuffers,
                GeometryBuffers,
                Pipeline,
            ],
            SyncObjects => &[Device],
        }
    }

    /// The step immediately before this one in [`BootstrapStep::ALL`].
    pub fn predecessor(self) -> Option<BootstrapStep> {
        self.index().checked_sub(1).map(|i| Self::ALL[i])
    }

    /// The step immediately after this one in [`BootstrapStep::ALL`].
    pub fn successor(self) -> Option<BootstrapStep> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            BootstrapStep::Instance => "instance",
            BootstrapStep::Surface => "surface",
            BootstrapStep::Device => "device",
            BootstrapStep::Swapchain => "swapchain",
            BootstrapStep::DepthBuffer => "depth buffer",
            BootstrapStep::UniformBuffer => "uniform buffer",
            BootstrapStep::Descriptors => "descriptors",
            BootstrapStep::RenderPass => "render pass",
            BootstrapStep::Framebuffers => "framebuffers",
            BootstrapStep::GeometryBuffers => "geometry buffers",
            BootstrapStep::Pipeline => "pipeline",
            BootstrapStep::CommandBuffers => "command buffers",
            BootstrapStep::SyncObjects => "sync objects",
        }
    }

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for BootstrapStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Completion flags for every [`BootstrapStep`].
#[derive(Clone, Debug, Default)]
pub struct PhaseTracker {
    completed: [bool; BootstrapStep::COUNT],
}

impl PhaseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks that `step` may run now: not yet created, its direct
    /// prerequisites and its predecessor alive.
    ///
    /// A missing direct prerequisite is reported before a missing predecessor.
    pub fn require(&self, step: BootstrapStep) -> RendererResult<()> {
        if self.is_complete(step) {
            return Err(RendererError::AlreadyCreated { step });
        }
        match step
            .prerequisites()
            .iter()
            .copied()
            .chain(step.predecessor())
            .find(|&prerequisite| !self.is_complete(prerequisite))
        {
            Some(missing) => Err(RendererError::Precondition { step, missing }),
            None => Ok(()),
        }
    }

    pub fn complete(&mut self, step: BootstrapStep) {
        self.completed[step.index()] = true;
    }

    #[inline]
    pub fn is_complete(&self, step: BootstrapStep) -> bool {
        self.completed[step.index()]
    }

    /// First step, in creation order, that has not completed.
    pub fn first_missing(&self) -> Option<BootstrapStep> {
        BootstrapStep::ALL
            .into_iter()
            .find(|&step| !self.is_complete(step))
    }

    pub fn is_fully_bootstrapped(&self) -> bool {
        self.first_missing().is_none()
    }

    /// Completed steps in reverse creation order.
    pub fn teardown_order(&self) -> Vec<BootstrapStep> {
        BootstrapStep::ALL
            .into_iter()
            .rev()
            .filter(|&step| self.is_complete(step))
            .collect()
    }

    /// Clears `step`, refusing while a completed step still depends on it,
    /// directly or as its successor.
    ///
    /// Clearing a step that never completed is a no-op.
    pub fn mark_destroyed(&mut self, step: BootstrapStep) -> RendererResult<()> {
        if !self.is_complete(step) {
            return Ok(());
        }
        if let Some(dependent) = BootstrapStep::ALL.into_iter().find(|&other| {
            self.is_complete(other)
                && (other.prerequisites().contains(&step) || step.successor() == Some(other))
        }) {
            return Err(RendererError::TeardownOrder { step, dependent });
        }
        self.completed[step.index()] = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker_through(last: BootstrapStep) -> PhaseTracker {
        let mut tracker = PhaseTracker::new();
        for step in BootstrapStep::ALL {
            tracker.require(step).unwrap();
            tracker.complete(step);
            if step == last {
                break;
            }
        }
        tracker
    }

    #[test]
    fn test_all_is_in_declaration_order() {
        for (i, step) in BootstrapStep::ALL.into_iter().enumerate() {
            assert_eq!(step.index(), i);
        }
    }

    #[test]
    fn test_prerequisites_come_earlier() {
        for step in BootstrapStep::ALL {
            for &prerequisite in step.prerequisites() {
                assert!(
                    prerequisite < step,
                    "{step} lists {prerequisite} which runs later"
                );
            }
        }
    }

    #[test]
    fn test_first_step_needs_nothing() {
        let tracker = PhaseTracker::new();
        assert!(tracker.require(BootstrapStep::Instance).is_ok());
        assert_eq!(tracker.first_missing(), Some(BootstrapStep::Instance));
    }

    #[test]
    fn test_require_reports_first_missing_prerequisite() {
        let tracker = tracker_through(BootstrapStep::Instance);
        match tracker.require(BootstrapStep::Swapchain) {
            Err(RendererError::Precondition { step, missing }) => {
                assert_eq!(step, BootstrapStep::Swapchain);
                assert_eq!(missing, BootstrapStep::Surface);
            }
            other => panic!("expected precondition error, got {other:?}"),
        }
    }

    #[test]
    fn test_require_rejects_repeat() {
        let tracker = tracker_through(BootstrapStep::Device);
        assert!(matches!(
            tracker.require(BootstrapStep::Device),
            Err(RendererError::AlreadyCreated {
                step: BootstrapStep::Device
            })
        ));
    }

    #[test]
    fn test_full_run_is_bootstrapped() {
        let tracker = tracker_through(BootstrapStep::SyncObjects);
        assert!(tracker.is_fully_bootstrapped());
        assert_eq!(tracker.first_missing(), None);
    }

    #[test]
    fn test_teardown_order_is_reverse_of_completed() {
        let tracker = tracker_through(BootstrapStep::RenderPass);
        assert_eq!(
            tracker.teardown_order(),
            vec![
                BootstrapStep::RenderPass,
                BootstrapStep::Descriptors,
                BootstrapStep::UniformBuffer,
                BootstrapStep::DepthBuffer,
                BootstrapStep::Swapchain,
                BootstrapStep::Device,
                BootstrapStep::Surface,
                BootstrapStep::Instance,
            ]
        );
    }

    #[test]
    fn test_mark_destroyed_refuses_live_dependent() {
        let mut tracker = tracker_through(BootstrapStep::Swapchain);
        match tracker.mark_destroyed(BootstrapStep::Device) {
            Err(RendererError::TeardownOrder { step, dependent }) => {
                assert_eq!(step, BootstrapStep::Device);
                assert_eq!(dependent, BootstrapStep::Swapchain);
            }
            other => panic!("expected teardown order error, got {other:?}"),
        }
        assert!(tracker.is_complete(BootstrapStep::Device));
    }

    #[test]
    fn test_teardown_order_always_succeeds() {
        let mut tracker = tracker_through(BootstrapStep::SyncObjects);
        for step in tracker.teardown_order() {
            tracker.mark_destroyed(step).unwrap();
        }
        assert!(tracker.teardown_order().is_empty());
        assert_eq!(tracker.first_missing(), Some(BootstrapStep::Instance));
    }

    #[test]
    fn test_require_rejects_skipping_ahead() {
        let tracker = tracker_through(BootstrapStep::Device);
        for step in [BootstrapStep::GeometryBuffers, BootstrapStep::SyncObjects] {
            match tracker.require(step) {
                Err(RendererError::Precondition { missing, .. }) => {
                    assert_eq!(Some(missing), step.predecessor());
                }
                other => panic!("{step}: expected precondition error, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_predecessor_and_successor_walk_all() {
        assert_eq!(BootstrapStep::Instance.predecessor(), None);
        assert_eq!(BootstrapStep::SyncObjects.successor(), None);
        for pair in BootstrapStep::ALL.windows(2) {
            assert_eq!(pair[1].predecessor(), Some(pair[0]));
            assert_eq!(pair[0].successor(), Some(pair[1]));
        }
    }

    #[test]
    fn test_mark_destroyed_refuses_live_successor() {
        let mut tracker = tracker_through(BootstrapStep::SyncObjects);
        match tracker.mark_destroyed(BootstrapStep::CommandBuffers) {
            Err(RendererError::TeardownOrder { dependent, .. }) => {
                assert_eq!(dependent, BootstrapStep::SyncObjects);
            }
            other => panic!("expected teardown order error, got {other:?}"),
        }
    }

    #[test]
    fn test_mark_destroyed_on_missing_step_is_noop() {
        let mut tracker = PhaseTracker::new();
        assert!(tracker.mark_destroyed(BootstrapStep::Pipeline).is_ok());
    }
}
