use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::{AppError, AppResult};

/// Something holding work that may be lost by leaving the page.
#[async_trait]
pub trait DraftSaver: Send + Sync {
    fn has_unsaved_changes(&self) -> bool;
    async fn save(&self) -> AppResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationRequest {
    Back,
    Forward,
    Reload,
    CloseTab,
}

impl NavigationRequest {
    /// Reload and tab close can only be confirmed through the browser's own
    /// dialog; history moves can be intercepted and prompted in-app.
    fn is_interceptable(self) -> bool {
        matches!(self, NavigationRequest::Back | NavigationRequest::Forward)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    /// Show the leave prompt. The history move was undone by restoring
    /// `restore_location`.
    Prompt { restore_location: String },
    /// Ask the browser to show its native leave confirmation.
    BrowserConfirm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveChoice {
    SaveAndLeave,
    LeaveWithoutSaving,
    Stay,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    Leave(NavigationRequest),
    Stay,
    /// Saving failed; the user is still on the page and the prompt stays open.
    SaveFailed { message: String },
}

/// Intercepts navigation away from an attempt with unsaved changes.
pub struct NavigationGuard<S: DraftSaver + ?Sized> {
    saver: Arc<S>,
    location: String,
    pending: Option<NavigationRequest>,
}

impl<S: DraftSaver + ?Sized> NavigationGuard<S> {
    pub fn new(saver: Arc<S>, location: impl Into<String>) -> Self {
        Self {
            saver,
            location: location.into(),
            pending: None,
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn pending(&self) -> Option<NavigationRequest> {
        self.pending
    }

    pub fn intercept(&mut self, request: NavigationRequest) -> GuardDecision {
        if !self.saver.has_unsaved_changes() {
            return GuardDecision::Proceed;
        }
        if !request.is_interceptable() {
            log::debug!("Asking for browser confirmation before {:?}", request);
            return GuardDecision::BrowserConfirm;
        }
        log::debug!("Holding {:?} at {} until the user decides", request, self.location);
        self.pending = Some(request);
        GuardDecision::Prompt {
            restore_location: self.location.clone(),
        }
    }

    pub async fn resolve(&mut self, choice: LeaveChoice) -> AppResult<GuardOutcome> {
        let request = self.pending.ok_or_else(|| {
            AppError::ValidationError("No navigation is waiting for a decision".to_string())
        })?;

        match choice {
            LeaveChoice::Stay => {
                self.pending = None;
                Ok(GuardOutcome::Stay)
            }
            LeaveChoice::LeaveWithoutSaving => {
                log::info!("Leaving {} without saving", self.location);
                self.pending = None;
                Ok(GuardOutcome::Leave(request))
            }
            LeaveChoice::SaveAndLeave => match self.saver.save().await {
                Ok(()) if self.saver.has_unsaved_changes() => {
                    log::warn!("Save before leaving {} left changes unsaved", self.location);
                    Ok(GuardOutcome::SaveFailed {
                        message: "Changes are still unsaved".to_string(),
                    })
                }
                Ok(()) => {
                    self.pending = None;
                    Ok(GuardOutcome::Leave(request))
                }
                Err(e) => {
                    log::warn!("Save before leaving {} failed: {}", self.location, e);
                    Ok(GuardOutcome::SaveFailed {
                        message: e.to_string(),
                    })
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct FakeSaver {
        dirty: AtomicBool,
        fail: bool,
        saves: AtomicUsize,
    }

    impl FakeSaver {
        fn new(dirty: bool, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                dirty: AtomicBool::new(dirty),
                fail,
                saves: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl DraftSaver for FakeSaver {
        fn has_unsaved_changes(&self) -> bool {
            self.dirty.load(Ordering::SeqCst)
        }

        async fn save(&self) -> AppResult<()> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AppError::SaveFailed("offline".to_string()));
            }
            self.dirty.store(false, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn clean_attempt_never_prompts() {
        let mut guard = NavigationGuard::new(FakeSaver::new(false, false), "/questions/42");

        assert_eq!(guard.intercept(NavigationRequest::Back), GuardDecision::Proceed);
        assert_eq!(guard.intercept(NavigationRequest::Reload), GuardDecision::Proceed);
        assert!(guard.pending().is_none());
    }

    #[test]
    fn reload_uses_browser_confirmation() {
        let mut guard = NavigationGuard::new(FakeSaver::new(true, false), "/questions/42");

        assert_eq!(
            guard.intercept(NavigationRequest::CloseTab),
            GuardDecision::BrowserConfirm
        );
        assert!(guard.pending().is_none());
    }

    #[tokio::test]
    async fn save_and_leave_saves_once() {
        let saver = FakeSaver::new(true, false);
        let mut guard = NavigationGuard::new(saver.clone(), "/questions/42");

        let decision = guard.intercept(NavigationRequest::Forward);
        let outcome = guard.resolve(LeaveChoice::SaveAndLeave).await.unwrap();

        assert_eq!(
            decision,
            GuardDecision::Prompt {
                restore_location: "/questions/42".to_string()
            }
        );
        assert_eq!(outcome, GuardOutcome::Leave(NavigationRequest::Forward));
        assert_eq!(saver.saves.load(Ordering::SeqCst), 1);
        assert!(guard.pending().is_none());
    }

    #[tokio::test]
    async fn failed_save_keeps_request_pending() {
        let saver = FakeSaver::new(true, true);
        let mut guard = NavigationGuard::new(saver.clone(), "/questions/42");
        guard.intercept(NavigationRequest::Back);

        let outcome = guard.resolve(LeaveChoice::SaveAndLeave).await.unwrap();

        assert!(matches!(outcome, GuardOutcome::SaveFailed { .. }));
        assert_eq!(guard.pending(), Some(NavigationRequest::Back));
        assert_eq!(
            guard.resolve(LeaveChoice::Stay).await.unwrap(),
            GuardOutcome::Stay
        );
    }

    /// Reports success without storing anything.
    struct SilentSaver;

    #[async_trait]
    impl DraftSaver for SilentSaver {
        fn has_unsaved_changes(&self) -> bool {
            true
        }

        async fn save(&self) -> AppResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn save_that_leaves_changes_unsaved_does_not_leave() {
        let mut guard = NavigationGuard::new(Arc::new(SilentSaver), "/questions/42");
        guard.intercept(NavigationRequest::Back);

        let outcome = guard.resolve(LeaveChoice::SaveAndLeave).await.unwrap();

        assert!(matches!(outcome, GuardOutcome::SaveFailed { .. }));
        assert_eq!(guard.pending(), Some(NavigationRequest::Back));
    }

    #[tokio::test]
    async fn resolve_without_request_is_rejected() {
        let mut guard = NavigationGuard::new(FakeSaver::new(true, false), "/questions/42");

        assert!(matches!(
            guard.resolve(LeaveChoice::LeaveWithoutSaving).await,
            Err(AppError::ValidationError(_))
        ));
    }
}
