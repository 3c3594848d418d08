//! Session-expiry prompt with at most one showing per navigation.
//!
//! Both the transport (on a 401) and the auth gate (on a failed liveness
//! check) report expiry here. The prompt is shown only while the current
//! navigation targets a non-public resource, and only once until the next
//! navigation begins.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, warn};

use crate::gate::Access;

/// Presents the blocking "your session expired" notice to the user.
pub trait ReauthPrompt: Send + Sync {
    /// Show the notice. The caller then navigates to `login_entry`.
    fn session_expired(&self, login_entry: &str);
}

/// Prompt that only logs; used by the command line.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPrompt;

impl ReauthPrompt for LogPrompt {
    fn session_expired(&self, login_entry: &str) {
        warn!(login_entry, "Session expired, please sign in again");
    }
}

/// Tracks the current navigation and latches the expiry prompt.
#[derive(Clone)]
pub struct SessionExpiryNotice {
    inner: Arc<NoticeInner>,
}

struct NoticeInner {
    prompt: Arc<dyn ReauthPrompt>,
    navigation: RwLock<Navigation>,
    shown: AtomicBool,
}

#[derive(Debug, Clone)]
struct Navigation {
    access: Access,
    login_entry: &'static str,
}

impl SessionExpiryNotice {
    /// Start with a public navigation, so nothing is shown until a protected
    /// resource is entered.
    #[must_use]
    pub fn new(prompt: Arc<dyn ReauthPrompt>) -> Self {
        Self {
            inner: Arc::new(NoticeInner {
                prompt,
                navigation: RwLock::new(Navigation {
                    access: Access::Public,
                    login_entry: crate::gate::LOGIN_PAGE,
                }),
                shown: AtomicBool::new(false),
            }),
        }
    }

    /// Record a new navigation and re-arm the prompt.
    pub fn begin_navigation(&self, path: &str) {
        let access = Access::classify(path);
        let login_entry = Access::login_entry(path);
        *self
            .inner
            .navigation
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Navigation {
            access,
            login_entry,
        };
        self.inner.shown.store(false, Ordering::SeqCst);
    }

    /// Access requirement of the current navigation.
    #[must_use]
    pub fn current_access(&self) -> Access {
        self.inner
            .navigation
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .access
    }

    /// Report that the session expired.
    ///
    /// Returns `true` if the prompt was shown by this call.
    pub fn session_expired(&self) -> bool {
        let navigation = self
            .inner
            .navigation
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        if navigation.access.is_public() {
            debug!("Session expired on a public resource, no prompt");
            return false;
        }
        if self.inner.shown.swap(true, Ordering::SeqCst) {
            debug!("Session-expiry prompt already shown for this navigation");
            return false;
        }
        self.inner.prompt.session_expired(navigation.login_entry);
        true
    }
}
