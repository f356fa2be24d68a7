//! Renderer error type.
//!
//! Every failure names the bootstrap or frame step it came from.

use meshview_rhi::RhiError;
use thiserror::Error;

use crate::bootstrap::BootstrapStep;

#[derive(Error, Debug)]
pub enum RendererError {
    /// A graphics call failed during a named step
    #[error("{step} failed: {source}")]
    Step {
        step: &'static str,
        #[source]
        source: RhiError,
    },

    /// A bootstrap step ran before one of its prerequisites
    #[error("{step} requires {missing} to be created first")]
    Precondition {
        step: BootstrapStep,
        missing: BootstrapStep,
    },

    /// A bootstrap step ran twice
    #[error("{step} has already been created")]
    AlreadyCreated { step: BootstrapStep },

    /// Teardown of a step was attempted while something built on it is alive
    #[error("cannot destroy {step} while {dependent} is still alive")]
    TeardownOrder {
        step: BootstrapStep,
        dependent: BootstrapStep,
    },

    /// A frame operation ran before bootstrap finished
    #[error("{operation} requires a fully bootstrapped renderer, {missing} is missing")]
    NotBootstrapped {
        operation: &'static str,
        missing: BootstrapStep,
    },
}

pub type RendererResult<T> = std::result::Result<T, RendererError>;

/// Attaches a step name to a lower-level failure.
pub(crate) trait StepContext<T> {
    fn step(self, step: &'static str) -> RendererResult<T>;
}

impl<T, E: Into<RhiError>> StepContext<T> for Result<T, E> {
    fn step(self, step: &'static str) -> RendererResult<T> {
        self.map_err(|e| RendererError::Step {
            step,
            source: e.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk;

    #[test]
    fn test_step_error_names_step() {
        let result: Result<(), vk::Result> = Err(vk::Result::ERROR_OUT_OF_DATE_KHR);
        let err = result.step("acquire").unwrap_err();
        assert!(err.to_string().starts_with("acquire failed: "), "{err}");
        assert!(matches!(
            err,
            RendererError::Step {
                step: "acquire",
                source: RhiError::VulkanError(vk::Result::ERROR_OUT_OF_DATE_KHR),
            }
        ));
    }

    #[test]
    fn test_precondition_message() {
        let err = RendererError::Precondition {
            step: BootstrapStep::Pipeline,
            missing: BootstrapStep::RenderPass,
        };
        assert_eq!(
            err.to_string(),
            "pipeline requires render pass to be created first"
        );
    }
}
