//! Fan-out of Current Time updates to subscribed clients

use std::hash::Hash;
use std::sync::Arc;

use log::*;
use uuid::Uuid;

use cts_proto::ble::CURRENT_TIME;
use cts_proto::{TimeCodec, TimeEncoder, TimeSample};

use crate::registry::SubscriptionRegistry;
use crate::transport::Notification;

pub struct NotificationDispatcher<I, E = TimeCodec> {
    registry: Arc<SubscriptionRegistry<I>>,
    encoder: E,
    characteristic: Uuid,
}

impl<I, E> NotificationDispatcher<I, E>
where
    I: Eq + Hash + Clone,
    E: TimeEncoder,
{
    pub fn new(registry: Arc<SubscriptionRegistry<I>>, encoder: E) -> Self {
        Self {
            registry,
            encoder,
            characteristic: CURRENT_TIME,
        }
    }

    /// One notification per current subscriber, all carrying the same value.
    ///
    /// The subscriber set is copied first, so concurrent (un)subscribes only
    /// affect the next broadcast. Nothing is encoded when nobody listens.
    pub fn broadcast(&self, sample: &TimeSample) -> Vec<Notification<I>> {
        let subscribers = self.registry.snapshot_subscribers();
        if subscribers.is_empty() {
            info!("No subscribers registered");
            return Vec::new();
        }

        let value = self.encoder.exact_time(sample).to_bytes();

        info!("Sending update to {} subscribers", subscribers.len());
        subscribers
            .into_iter()
            .map(|client| Notification {
                client,
                characteristic: self.characteristic,
                value: value.to_vec(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cts_proto::{AdjustReason, ExactTime, FixedZone, LocalTimeInfo};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingEncoder {
        exact_time_calls: AtomicUsize,
        codec: TimeCodec<FixedZone>,
    }

    impl TimeEncoder for CountingEncoder {
        fn exact_time(&self, sample: &TimeSample) -> ExactTime {
            self.exact_time_calls.fetch_add(1, Ordering::SeqCst);
            self.codec.exact_time(sample)
        }

        fn local_time_info(&self, epoch_millis: i64) -> LocalTimeInfo {
            self.codec.local_time_info(epoch_millis)
        }
    }

    fn dispatcher() -> (
        NotificationDispatcher<u32, Arc<CountingEncoder>>,
        Arc<SubscriptionRegistry<u32>>,
        Arc<CountingEncoder>,
    ) {
        let registry = Arc::new(SubscriptionRegistry::new());
        let encoder = Arc::new(CountingEncoder::default());
        let dispatcher = NotificationDispatcher::new(registry.clone(), encoder.clone());
        (dispatcher, registry, encoder)
    }

    #[test]
    fn empty_broadcast_encodes_nothing() {
        let (dispatcher, _registry, encoder) = dispatcher();
        let sample = TimeSample::new(1_710_495_667_500, AdjustReason::NONE);
        assert!(dispatcher.broadcast(&sample).is_empty());
        assert_eq!(encoder.exact_time_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn one_encoding_per_broadcast() {
        let (dispatcher, registry, encoder) = dispatcher();
        for client in 1..=5 {
            registry.subscribe(client);
        }

        let sample = TimeSample::new(1_710_495_667_500, AdjustReason::TIMEZONE);
        let notifications = dispatcher.broadcast(&sample);
        assert_eq!(encoder.exact_time_calls.load(Ordering::SeqCst), 1);
        assert_eq!(notifications.len(), 5);

        let clients: HashSet<u32> = notifications.iter().map(|n| n.client).collect();
        assert_eq!(clients, HashSet::from([1, 2, 3, 4, 5]));

        let expected = TimeCodec::new(FixedZone::UTC).encode_exact_time(&sample).to_bytes();
        for notification in &notifications {
            assert_eq!(notification.characteristic, CURRENT_TIME);
            assert_eq!(notification.value, expected.to_vec());
            assert_eq!(notification.value[9], AdjustReason::TIMEZONE.bits());
        }
    }

    #[test]
    fn unsubscribed_clients_are_skipped() {
        let (dispatcher, registry, _encoder) = dispatcher();
        registry.subscribe(1);
        registry.subscribe(2);
        registry.unsubscribe(&1);

        let notifications = dispatcher.broadcast(&TimeSample::new(0, AdjustReason::NONE));
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].client, 2);
    }
}
