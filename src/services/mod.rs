pub mod attempt_controller;
pub mod autosave;
pub mod duration;
pub mod handoff;
pub mod navigation_guard;
pub mod session_service;

pub use attempt_controller::{AttemptController, AttemptState};
pub use autosave::{spawn_autosave, AutosaveHandle};
pub use duration::DurationTracker;
pub use handoff::{GeneratedQuestion, HandoffStore};
pub use navigation_guard::{
    DraftSaver, GuardDecision, GuardOutcome, LeaveChoice, NavigationGuard, NavigationRequest,
};
pub use session_service::SessionService;
