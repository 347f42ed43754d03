use std::{sync::Arc, time::Duration};

use maelstrom_common::{Message, incoming, internal};

use crate::{
    auth::SharedSecret, error::DispatchError, provider::TRANSPORT_FAILURE, registry::Registry,
    throttle::Throttle,
};

/// Turns a send request into exactly one provider call, or a reason why not.
///
/// Every step is terminal: a provider that fails after being selected is not
/// replaced by another one, and a refused request is never retried here.
#[derive(Debug)]
pub struct Dispatcher {
    registry: Arc<Registry>,
    throttle: Throttle,
    secret: SharedSecret,
    send_timeout: Duration,
}

impl Dispatcher {
    #[must_use]
    pub const fn new(
        registry: Arc<Registry>,
        throttle: Throttle,
        secret: SharedSecret,
        send_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            throttle,
            secret,
            send_timeout,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub const fn throttle(&self) -> &Throttle {
        &self.throttle
    }

    /// Authorise, validate, select a provider, take a throttle slot and send.
    ///
    /// On success the provider's own status code is returned unchanged, even
    /// when it signals failure. A send that exceeds the send timeout is
    /// reported as 500.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] if the token does not match the shared
    /// secret, an address is malformed, no provider is healthy or the
    /// throttle is full. Nothing is sent in any of these cases.
    pub async fn send_message(
        &self,
        message: Message,
        token: Option<&str>,
    ) -> Result<u16, DispatchError> {
        if !self.secret.verify(token) {
            incoming!(level = WARN, "Rejected send request with a bad password");
            return Err(DispatchError::Forbidden);
        }

        message.validate()?;

        let provider = self.registry.pick_healthy().ok_or_else(|| {
            internal!(level = WARN, "No mail server available for {}", message);
            DispatchError::Unavailable
        })?;

        if !self.throttle.try_acquire() {
            return Err(DispatchError::Throttled);
        }

        internal!(level = INFO, "Sending {} via {}", message, provider.name());

        let status = match tokio::time::timeout(self.send_timeout, provider.send(&message)).await
        {
            Ok(status) => status,
            Err(_) => {
                tracing::error!(
                    provider = %provider.name(),
                    timeout_secs = self.send_timeout.as_secs(),
                    "Send timed out"
                );
                TRANSPORT_FAILURE
            }
        };

        internal!("{} answered {}", provider.name(), status);

        Ok(status)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::atomic::Ordering;

    use maelstrom_common::{AddressField, ValidationError};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{Provider, registry::tests::StubProvider};

    const SECRET: &str = "hunter2";
    const WINDOW: Duration = Duration::from_secs(1);
    const SEND_TIMEOUT: Duration = Duration::from_secs(5);

    fn message(to: &str) -> Message {
        Message::new("b@example.com", [to], "S", "T")
    }

    fn dispatcher(stubs: &[Arc<StubProvider>], capacity: usize) -> Dispatcher {
        let mut registry = Registry::new();
        for stub in stubs {
            registry.register(Arc::clone(stub) as Arc<dyn Provider>);
            registry.set_health(stub.name(), stub.healthy.load(Ordering::SeqCst));
        }

        Dispatcher::new(
            Arc::new(registry),
            Throttle::new(capacity, WINDOW),
            SharedSecret::new(SECRET),
            SEND_TIMEOUT,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn wrong_password_is_forbidden() {
        let stub = Arc::new(StubProvider::new("Mock"));
        let dispatcher = dispatcher(&[Arc::clone(&stub)], 5);

        let missing = dispatcher.send_message(message("a@example.com"), None).await;
        let wrong = dispatcher
            .send_message(message("a@example.com"), Some("hunter3"))
            .await;

        assert!(matches!(missing, Err(DispatchError::Forbidden)));
        assert!(matches!(wrong, Err(DispatchError::Forbidden)));
        assert_eq!(stub.sends.load(Ordering::SeqCst), 0);
        assert_eq!(dispatcher.throttle().outstanding(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_address_never_reaches_a_provider() {
        let stub = Arc::new(StubProvider::new("Mock"));
        let dispatcher = dispatcher(&[Arc::clone(&stub)], 5);

        let err = dispatcher
            .send_message(message("not-an-email"), Some(SECRET))
            .await
            .unwrap_err();

        match err {
            DispatchError::InvalidAddress(ValidationError::InvalidAddress { field, address }) => {
                assert_eq!(field, AddressField::To);
                assert_eq!(address, "not-an-email");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(stub.sends.load(Ordering::SeqCst), 0);
        assert_eq!(dispatcher.throttle().outstanding(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn no_providers_is_unavailable() {
        let dispatcher = dispatcher(&[], 5);

        let result = dispatcher
            .send_message(message("a@example.com"), Some(SECRET))
            .await;

        assert!(matches!(result, Err(DispatchError::Unavailable)));
        assert_eq!(dispatcher.throttle().outstanding(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unhealthy_providers_are_never_used() {
        let stub = Arc::new(StubProvider::unhealthy("Mock"));
        let dispatcher = dispatcher(&[Arc::clone(&stub)], 5);

        let result = dispatcher
            .send_message(message("a@example.com"), Some(SECRET))
            .await;

        assert!(matches!(result, Err(DispatchError::Unavailable)));
        assert_eq!(stub.sends.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn second_send_in_window_is_throttled() {
        let stub = Arc::new(StubProvider::new("Mock"));
        let dispatcher = dispatcher(&[Arc::clone(&stub)], 1);

        let first = dispatcher
            .send_message(message("a@example.com"), Some(SECRET))
            .await;
        let second = dispatcher
            .send_message(message("a@example.com"), Some(SECRET))
            .await;

        assert_eq!(first.unwrap(), 200);
        assert!(matches!(second, Err(DispatchError::Throttled)));
        assert_eq!(stub.sends.load(Ordering::SeqCst), 1);

        tokio::time::sleep(WINDOW + Duration::from_millis(1)).await;
        tokio::task::yield_now().await;

        let third = dispatcher
            .send_message(message("a@example.com"), Some(SECRET))
            .await;
        assert_eq!(third.unwrap(), 200);
    }

    #[tokio::test(start_paused = true)]
    async fn provider_status_is_passed_through() {
        let mut failing = StubProvider::new("Mock");
        failing.status = 401;
        let dispatcher = dispatcher(&[Arc::new(failing)], 5);

        let status = dispatcher
            .send_message(message("a@example.com"), Some(SECRET))
            .await
            .unwrap();

        assert_eq!(status, 401);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_send_times_out_as_transport_failure() {
        let mut slow = StubProvider::new("Mock");
        slow.delay = SEND_TIMEOUT * 3;
        let dispatcher = dispatcher(&[Arc::new(slow)], 5);

        let status = dispatcher
            .send_message(message("a@example.com"), Some(SECRET))
            .await
            .unwrap();

        assert_eq!(status, TRANSPORT_FAILURE);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_secret_accepts_missing_token() {
        let stub = Arc::new(StubProvider::new("Mock"));
        let mut registry = Registry::new();
        registry.register(Arc::clone(&stub) as Arc<dyn Provider>);
        registry.set_health("Mock", true);

        let dispatcher = Dispatcher::new(
            Arc::new(registry),
            Throttle::new(5, WINDOW),
            SharedSecret::default(),
            SEND_TIMEOUT,
        );

        let status = dispatcher
            .send_message(message("a@example.com"), None)
            .await
            .unwrap();
        assert_eq!(status, 200);
    }
}
