use super::*;
use crate::adapters::MockQueue;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

const QUEUE_URL: &str = "https://sqs.local/000000000000/jobs";

fn start(queue: &Arc<MockQueue>) -> ListenSession {
    ListenSession::start(QUEUE_URL, queue.clone(), ReceiveSettings::default())
}

/// Poll `cond` until it holds or a second passes.
async fn eventually(cond: impl Fn() -> bool) -> bool {
    for _ in 0..100 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}

#[tokio::test]
async fn test_delivers_messages_in_order() {
    let queue = Arc::new(MockQueue::new());
    queue.push("first").await;
    queue.push("second").await;

    let bodies = Arc::new(Mutex::new(Vec::new()));
    let session = start(&queue);
    let seen = bodies.clone();
    session.on_message(move |message| {
        let seen = seen.clone();
        async move {
            seen.lock().unwrap().push(message.body().to_string());
            Ok::<(), HandlerError>(())
        }
    });

    assert!(eventually(|| bodies.lock().unwrap().len() == 2).await);
    assert_eq!(*bodies.lock().unwrap(), vec!["first", "second"]);
    session.stop();
}

#[tokio::test]
async fn test_delete_calls_adapter_once_per_message() {
    let queue = Arc::new(MockQueue::new());
    let id = queue.push("job").await;

    let handled = Arc::new(AtomicUsize::new(0));
    let session = start(&queue);
    let counter = handled.clone();
    session.on_message(move |message| {
        let counter = counter.clone();
        async move {
            message.delete().await?;
            message.delete().await?;
            assert!(message.is_deleted());
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<(), HandlerError>(())
        }
    });

    assert!(eventually(|| handled.load(Ordering::SeqCst) == 1).await);
    assert_eq!(queue.deleted().await, vec![format!("receipt-{}", id)]);
    assert!(session.is_active());
    session.stop();
}

#[tokio::test]
async fn test_no_receive_before_handler_registered() {
    let queue = Arc::new(MockQueue::new());
    let session = start(&queue);

    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(queue.receive_calls(), 0);
    assert!(session.is_active());
    session.stop();
}

#[tokio::test]
async fn test_stop_from_within_handler_ends_delivery() {
    let queue = Arc::new(MockQueue::new());
    for i in 0..3 {
        queue.push(format!("m{}", i)).await;
    }

    let handled = Arc::new(AtomicUsize::new(0));
    let session = start(&queue);
    let stop = session.stop_handle();
    let counter = handled.clone();
    session.on_message(move |_message| {
        let counter = counter.clone();
        let stop = stop.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            stop.stop();
            Ok::<(), HandlerError>(())
        }
    });

    assert_eq!(session.closed().await, None);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(handled.load(Ordering::SeqCst), 1);
    assert_eq!(session.state(), SessionState::Stopped);
}

#[tokio::test]
async fn test_stop_ceases_receive_calls() {
    let queue = Arc::new(MockQueue::new());
    let session = start(&queue);
    session.on_message(|_message| async { Ok::<(), HandlerError>(()) });

    assert!(eventually(|| queue.receive_calls() > 0).await);
    session.stop();

    // Let any in-flight receive finish.
    tokio::time::sleep(Duration::from_millis(30)).await;
    let after_stop = queue.receive_calls();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(queue.receive_calls(), after_stop);
}

#[tokio::test]
async fn test_no_delivery_after_stop() {
    let queue = Arc::new(MockQueue::new());
    let handled = Arc::new(AtomicUsize::new(0));
    let session = start(&queue);
    let counter = handled.clone();
    session.on_message(move |_message| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<(), HandlerError>(())
        }
    });

    session.stop();
    queue.push("late").await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(handled.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_receive_error_is_fatal() {
    let queue = Arc::new(MockQueue::new());
    queue
        .set_receive_failure(Some(AdapterError::Receive("access denied".to_string())))
        .await;

    let events = Arc::new(Mutex::new(Vec::new()));
    let session = start(&queue);
    let recorded = events.clone();
    session.on_error(move |event| recorded.lock().unwrap().push(event.clone()));
    session.on_message(|_message| async { Ok::<(), HandlerError>(()) });

    let err = session.closed().await;

    assert_eq!(err, Some(AdapterError::Receive("access denied".to_string())));
    assert_eq!(session.state(), SessionState::Stopped);
    assert_eq!(session.fatal_error(), err);
    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], SessionEvent::Fatal(AdapterError::Receive(_))));

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(queue.receive_calls(), 1);
}

#[tokio::test]
async fn test_handler_error_is_not_fatal() {
    let queue = Arc::new(MockQueue::new());
    queue.push("bad").await;
    queue.push("good").await;

    let events = Arc::new(Mutex::new(Vec::new()));
    let handled = Arc::new(AtomicUsize::new(0));
    let session = start(&queue);
    let recorded = events.clone();
    session.on_error(move |event| recorded.lock().unwrap().push(event.clone()));
    let counter = handled.clone();
    session.on_message(move |message| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            if message.body() == "bad" {
                return Err("cannot process".into());
            }
            message.delete().await?;
            Ok::<(), HandlerError>(())
        }
    });

    assert!(eventually(|| handled.load(Ordering::SeqCst) == 2).await);
    assert!(session.is_active());
    assert_eq!(queue.deleted().await.len(), 1);

    let events = events.lock().unwrap();
    assert!(matches!(
        &events[0],
        SessionEvent::ProcessingError { error, .. } if error == "cannot process"
    ));
    drop(events);
    session.stop();
}

#[tokio::test]
async fn test_delivery_is_sequential() {
    let queue = Arc::new(MockQueue::new());
    for i in 0..5 {
        queue.push(format!("m{}", i)).await;
    }

    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_in_flight = Arc::new(AtomicUsize::new(0));
    let handled = Arc::new(AtomicUsize::new(0));
    let session = start(&queue);
    let (current, max, done) = (in_flight.clone(), max_in_flight.clone(), handled.clone());
    session.on_message(move |_message| {
        let (current, max, done) = (current.clone(), max.clone(), done.clone());
        async move {
            let now = current.fetch_add(1, Ordering::SeqCst) + 1;
            max.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            current.fetch_sub(1, Ordering::SeqCst);
            done.fetch_add(1, Ordering::SeqCst);
            Ok::<(), HandlerError>(())
        }
    });

    assert!(eventually(|| handled.load(Ordering::SeqCst) == 5).await);
    assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
    session.stop();
}

#[tokio::test]
async fn test_delivery_continues_after_handles_dropped() {
    let queue = Arc::new(MockQueue::new());
    let handled = Arc::new(AtomicUsize::new(0));
    let stop = {
        let session = start(&queue);
        let counter = handled.clone();
        session.on_message(move |_message| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<(), HandlerError>(())
            }
        });
        session.stop_handle()
    };

    queue.push("m").await;

    assert!(eventually(|| handled.load(Ordering::SeqCst) == 1).await);
    assert!(stop.is_active());
    stop.stop();
}

#[tokio::test]
async fn test_handler_replacement_uses_latest() {
    let queue = Arc::new(MockQueue::new());
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));
    let session = start(&queue);

    let counter = first.clone();
    session.on_message(move |_message| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<(), HandlerError>(())
        }
    });
    let counter = second.clone();
    session.on_message(move |_message| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<(), HandlerError>(())
        }
    });

    queue.push("m").await;
    assert!(eventually(|| second.load(Ordering::SeqCst) == 1).await);
    assert_eq!(first.load(Ordering::SeqCst), 0);
    session.stop();
}
