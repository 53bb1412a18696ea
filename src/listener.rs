use std::sync::Arc;

/// A listener attached to a [`LiveCell`](crate::LiveCell) subscription.
/// Supports both payload listeners (receive the delivered value) and
/// notify-only listeners (told that something changed, nothing more).
pub enum ChangeListener<T> {
    /// Receives the delivered value.
    Payload(Arc<dyn Fn(T) + Send + Sync + 'static>),
    /// Receives only the fact that a delivery happened.
    NotifyOnly(Arc<dyn Fn() + Send + Sync + 'static>),
}

impl<T> Clone for ChangeListener<T> {
    fn clone(&self) -> Self {
        match self {
            ChangeListener::Payload(callback) => ChangeListener::Payload(Arc::clone(callback)),
            ChangeListener::NotifyOnly(callback) => ChangeListener::NotifyOnly(Arc::clone(callback)),
        }
    }
}

impl<T> ChangeListener<T> {
    pub(crate) fn invoke(&self, value: T) {
        match self {
            ChangeListener::Payload(callback) => callback(value),
            ChangeListener::NotifyOnly(callback) => callback(),
        }
    }
}

/// Trait for types that can be converted into change listeners.
pub trait IntoChangeListener<T> {
    fn into_change_listener(self) -> ChangeListener<T>;
}

impl<F, T> IntoChangeListener<T> for F
where F: Fn(T) + Send + Sync + 'static
{
    fn into_change_listener(self) -> ChangeListener<T> { ChangeListener::Payload(Arc::new(self)) }
}

impl<T> IntoChangeListener<T> for ChangeListener<T> {
    fn into_change_listener(self) -> ChangeListener<T> { self }
}

impl<T> IntoChangeListener<T> for Arc<dyn Fn(T) + Send + Sync + 'static> {
    fn into_change_listener(self) -> ChangeListener<T> { ChangeListener::Payload(self) }
}

// Notify-only listeners work with any value type.
impl<T> IntoChangeListener<T> for Arc<dyn Fn() + Send + Sync + 'static> {
    fn into_change_listener(self) -> ChangeListener<T> { ChangeListener::NotifyOnly(self) }
}

impl<T> IntoChangeListener<T> for std::sync::mpsc::Sender<T>
where T: Send + Sync + 'static
{
    fn into_change_listener(self) -> ChangeListener<T> {
        ChangeListener::Payload(Arc::new(move |value| {
            let _ = self.send(value); // Receiver may be gone; deliveries are best-effort
        }))
    }
}

#[cfg(feature = "tokio")]
impl<T> IntoChangeListener<T> for tokio::sync::mpsc::UnboundedSender<T>
where T: Send + Sync + 'static
{
    fn into_change_listener(self) -> ChangeListener<T> {
        ChangeListener::Payload(Arc::new(move |value| {
            let _ = self.send(value);
        }))
    }
}
