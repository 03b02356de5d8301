use std::sync::Arc;

use crate::config::Config;
use crate::services::{
    BookingService, Clock, CouponEvaluator, OccurrenceService, PaymentService,
    TransactionCoordinator,
};
use crate::store::{BookingStore, JsonPaymentStore};

/// Services shared by every handler.
pub struct AppState<S> {
    pub bookings: Arc<BookingService<S>>,
    pub payments: Arc<PaymentService<S>>,
    pub occurrences: Arc<OccurrenceService<S>>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            bookings: Arc::clone(&self.bookings),
            payments: Arc::clone(&self.payments),
            occurrences: Arc::clone(&self.occurrences),
        }
    }
}

impl<S: BookingStore> AppState<S> {
    pub fn new(
        store: Arc<S>,
        payment_store: Arc<JsonPaymentStore>,
        clock: Arc<dyn Clock>,
        config: &Config,
    ) -> Self {
        let coordinator = TransactionCoordinator::new(store, config.occurrence_lock_timeout);
        let coupons = CouponEvaluator::new(payment_store.clone(), Arc::clone(&clock));

        Self {
            bookings: Arc::new(BookingService::new(
                coordinator.clone(),
                Arc::clone(&clock),
                config.refund_policy(),
            )),
            payments: Arc::new(PaymentService::new(
                coordinator.clone(),
                payment_store,
                coupons,
                Arc::clone(&clock),
            )),
            occurrences: Arc::new(OccurrenceService::new(coordinator, clock)),
        }
    }
}
