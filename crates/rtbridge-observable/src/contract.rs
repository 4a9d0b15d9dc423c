//! Capability contracts shared by the observable adapters.

/// Linking of independently constructed observables into one logical entity.
///
/// Not supported by this bridge. The provided methods are the whole
/// implementation: both flags report `false` and linking does nothing.
pub trait Linkable {
    /// Always `false`.
    fn is_linkable(&self) -> bool {
        false
    }

    /// Always `false`.
    fn is_linked(&self) -> bool {
        false
    }

    /// No-op.
    fn link(&self, _other: &Self) {}

    /// No-op.
    fn unlink(&self) {}
}

/// Explicit release of listener registrations and remote handles.
pub trait Disposable {
    /// Release everything the adapter holds. Repeated calls do nothing.
    fn dispose(&self);

    /// Whether [`dispose`](Self::dispose) has run.
    fn is_disposed(&self) -> bool;
}
