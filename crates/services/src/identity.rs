//! Signed-in identity as a stream of state transitions.

use quiz_core::model::UserId;
use tokio::sync::watch;

/// An authenticated user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: UserId,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

impl Identity {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: UserId::new(id),
            display_name: None,
            email: None,
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Name to greet the user with: display name, then email, then "User".
    #[must_use]
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or("User")
    }
}

/// Source of identity transitions. `None` means signed out.
pub trait IdentityProvider: Send + Sync {
    fn subscribe(&self) -> watch::Receiver<Option<Identity>>;
}

/// Identity provider driven directly by the embedding application.
#[derive(Debug)]
pub struct WatchIdentityProvider {
    tx: watch::Sender<Option<Identity>>,
}

impl Default for WatchIdentityProvider {
    fn default() -> Self {
        Self::new(None)
    }
}

impl WatchIdentityProvider {
    #[must_use]
    pub fn new(initial: Option<Identity>) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn sign_in(&self, identity: Identity) {
        self.tx.send_replace(Some(identity));
    }

    pub fn sign_out(&self) {
        self.tx.send_replace(None);
    }

    #[must_use]
    pub fn current(&self) -> Option<Identity> {
        self.tx.borrow().clone()
    }
}

impl IdentityProvider for WatchIdentityProvider {
    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_prefers_display_name_then_email() {
        assert_eq!(Identity::new("u").label(), "User");
        assert_eq!(Identity::new("u").with_email("a@b.test").label(), "a@b.test");
        assert_eq!(
            Identity::new("u")
                .with_email("a@b.test")
                .with_display_name("Ada")
                .label(),
            "Ada"
        );
    }

    #[tokio::test]
    async fn subscribers_observe_transitions() {
        let provider = WatchIdentityProvider::default();
        let mut rx = provider.subscribe();
        assert!(rx.borrow_and_update().is_none());

        provider.sign_in(Identity::new("u1"));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_ref().map(|i| i.id.as_str()), Some("u1"));

        provider.sign_out();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_none());
    }
}
