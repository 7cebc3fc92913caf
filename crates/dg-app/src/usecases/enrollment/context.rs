use std::sync::Arc;

use tokio::sync::Mutex;

use dg_core::enrollment::{EnrollmentSession, VisibleSteps, WizardState};

/// Shared enrollment context: wizard state, session data and dispatch lock.
///
/// ## Lock Ordering
/// Acquire `dispatch_lock` first, then `inner`.
/// - `dispatch_lock`: held for a whole dispatch (transition + actions + store).
/// - `inner`: short critical sections for reads and typed updates.
pub struct EnrollmentContext {
    inner: Mutex<Inner>,
    dispatch_lock: Mutex<()>,
}

struct Inner {
    state: WizardState,
    session: Option<EnrollmentSession>,
    visible: Option<VisibleSteps>,
}

impl EnrollmentContext {
    /// Empty context. Without a session the wizard reports `Completed`.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: WizardState::Completed,
                session: None,
                visible: None,
            }),
            dispatch_lock: Mutex::new(()),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub async fn acquire_dispatch_lock(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.dispatch_lock.lock().await
    }

    pub async fn state(&self) -> WizardState {
        self.inner.lock().await.state.clone()
    }

    pub async fn session(&self) -> Option<EnrollmentSession> {
        self.inner.lock().await.session.clone()
    }

    pub async fn visible_steps(&self) -> Option<VisibleSteps> {
        self.inner.lock().await.visible.clone()
    }

    /// Install a session and put the wizard at its step.
    ///
    /// Should only be called while holding `dispatch_lock`.
    pub async fn install(&self, session: EnrollmentSession) {
        let mut inner = self.inner.lock().await;
        inner.state = session.wizard_state();
        inner.visible = Some(VisibleSteps::compute(session.flags));
        inner.session = Some(session);
    }

    /// Set the wizard state; keeps the session's step in sync.
    pub async fn set_state(&self, state: WizardState) {
        let mut inner = self.inner.lock().await;
        if let (Some(step), Some(session)) = (state.step(), inner.session.as_mut()) {
            session.step = step;
        }
        inner.state = state;
    }

    /// Apply a typed update to the session. Returns `None` without a session.
    pub async fn update_session<R>(&self, f: impl FnOnce(&mut EnrollmentSession) -> R) -> Option<R> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        let session = inner.session.as_mut()?;
        let result = f(session);
        let flags = session.flags;
        if inner.visible.as_ref().map(VisibleSteps::flags) != Some(flags) {
            inner.visible = Some(VisibleSteps::compute(flags));
        }
        Some(result)
    }

    /// Drop the session; the wizard ends in `terminal`.
    pub async fn reset(&self, terminal: WizardState) {
        let mut inner = self.inner.lock().await;
        inner.state = terminal;
        inner.session = None;
        inner.visible = None;
    }
}

impl Default for EnrollmentContext {
    fn default() -> Self {
        Self::new()
    }
}
