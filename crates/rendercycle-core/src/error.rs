use std::fmt;

use thiserror::Error;

use crate::ComponentId;

pub type BoxError = Box<dyn std::error::Error + 'static>;

/// Outcome of user-authored asynchronous work (hooks and event callbacks).
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task was cancelled")]
    Cancelled,
    #[error(transparent)]
    Failed(BoxError),
}

impl TaskError {
    pub fn failed(error: impl Into<BoxError>) -> Self {
        TaskError::Failed(error.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskError::Cancelled)
    }
}

/// Failures reported by the host when it cannot accept a render request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("component {0} is not registered with this host")]
    UnknownComponent(ComponentId),
    #[error("component {component} has no `{event}` handler in its latest render")]
    MissingHandler {
        component: ComponentId,
        event: String,
    },
    #[error("host has been disposed")]
    Disposed,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HookKind {
    OnRender,
    OnAfterRender,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookKind::OnRender => f.write_str("on_render"),
            HookKind::OnAfterRender => f.write_str("on_after_render"),
        }
    }
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("component {component} is already attached to a host")]
    AlreadyAttached { component: ComponentId },
    #[error("component has not been attached to a host")]
    NotAttached,
    #[error("render state touched outside the dispatcher context")]
    WrongContext,
    #[error("component is already borrowed by another lifecycle step")]
    ComponentBusy,
    #[error("host rejected render for component {component}")]
    Enqueue {
        component: ComponentId,
        #[source]
        source: HostError,
    },
    #[error("{hook} hook failed")]
    Hook {
        hook: HookKind,
        #[source]
        source: TaskError,
    },
    #[error("event callback failed")]
    Callback {
        #[source]
        source: BoxError,
    },
    #[error("dispatcher dropped work before running it")]
    DispatchDropped,
}

impl LifecycleError {
    pub(crate) fn hook(hook: HookKind, source: TaskError) -> Self {
        LifecycleError::Hook { hook, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn enqueue_failure_exposes_host_error_as_source() {
        let err = LifecycleError::Enqueue {
            component: 7,
            source: HostError::UnknownComponent(7),
        };
        assert_eq!(err.to_string(), "host rejected render for component 7");
        let source = err.source().expect("host error source");
        assert_eq!(source.to_string(), "component 7 is not registered with this host");
    }

    #[test]
    fn hook_failure_names_the_hook() {
        let err = LifecycleError::hook(HookKind::OnAfterRender, TaskError::Cancelled);
        assert_eq!(err.to_string(), "on_after_render hook failed");
    }
}
