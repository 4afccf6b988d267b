pub mod event;
pub mod reconcile;

pub use event::PaymentEvent;
pub use reconcile::PaymentReconciler;
