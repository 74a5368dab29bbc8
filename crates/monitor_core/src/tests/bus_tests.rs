use super::*;

use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tick {
    Refresh(u32),
}

#[test]
fn overflow_keeps_the_most_recent_events_in_order() {
    let bus = EventBus::new("ticks", 5);
    let mut receiver = bus.subscribe().expect("subscriber");

    let outcomes: Vec<_> = (0..10).map(|n| bus.publish(Tick::Refresh(n))).collect();
    assert!(outcomes[..5].iter().all(|o| *o == Published::Queued));
    assert!(outcomes[5..].iter().all(|o| *o == Published::DroppedOldest));
    assert_eq!(bus.dropped(), 5);

    let mut consumed = Vec::new();
    while let Some(event) = receiver.try_recv() {
        consumed.push(event);
    }
    assert_eq!(
        consumed,
        (5..10).map(Tick::Refresh).collect::<Vec<_>>(),
        "oldest five should have been dropped"
    );
}

#[test]
fn second_subscriber_is_rejected_until_first_is_dropped() {
    let bus: EventBus<Tick> = EventBus::new("ticks", 3);
    let first = bus.subscribe().expect("first subscriber");
    assert_eq!(
        bus.subscribe().err(),
        Some(BusError::AlreadySubscribed("ticks"))
    );

    drop(first);
    bus.subscribe().expect("subscribe after drop");
}

#[test]
fn zero_capacity_is_treated_as_one() {
    let bus = EventBus::new("ticks", 0);
    assert_eq!(bus.capacity(), 1);
    bus.publish(Tick::Refresh(1));
    assert_eq!(bus.publish(Tick::Refresh(2)), Published::DroppedOldest);
    assert_eq!(bus.pending(), 1);
}

#[tokio::test]
async fn receiver_waits_for_a_later_publish() {
    let bus = EventBus::new("ticks", 3);
    let mut receiver = bus.subscribe().expect("subscriber");

    let producer = bus.clone();
    let handle = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        producer.publish(Tick::Refresh(7));
    });

    let event = tokio::time::timeout(Duration::from_secs(5), receiver.recv())
        .await
        .expect("event before timeout");
    assert_eq!(event, Some(Tick::Refresh(7)));
    handle.await.expect("producer");
}

#[tokio::test]
async fn close_drains_pending_then_ends_stream() {
    let bus = EventBus::new("ticks", 3);
    let mut receiver = bus.subscribe().expect("subscriber");

    bus.publish(Tick::Refresh(1));
    bus.close();
    assert_eq!(bus.publish(Tick::Refresh(2)), Published::Closed);

    assert_eq!(receiver.recv().await, Some(Tick::Refresh(1)));
    assert_eq!(receiver.recv().await, None);
}

#[tokio::test]
async fn close_wakes_a_waiting_receiver() {
    let bus: EventBus<Tick> = EventBus::new("ticks", 3);
    let mut receiver = bus.subscribe().expect("subscriber");

    let waiter = tokio::spawn(async move { receiver.recv().await });
    tokio::task::yield_now().await;
    bus.close();

    let received = tokio::time::timeout(Duration::from_secs(5), waiter)
        .await
        .expect("woken")
        .expect("join");
    assert_eq!(received, None);
}
