use parking_lot::Mutex;
use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use synapsed_reactive::*;

fn recorder<T: Send + 'static>() -> (Arc<Mutex<Vec<T>>>, Arc<Mutex<Vec<T>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    (seen.clone(), seen)
}

#[test]
fn test_matching_subscriber_invoked_once() {
    let subject = Subject::new();
    let (seen, sink) = recorder();
    subject
        .subscribe(move |a: i64, b: String| sink.lock().push((a, b)))
        .unwrap();

    subject.next(values![5, "hi"]);

    assert_eq!(*seen.lock(), vec![(5, "hi".to_string())]);
}

#[test]
fn test_too_few_values_never_invoke() {
    let subject = Subject::new();
    let count = Arc::new(AtomicUsize::new(0));
    let hits = count.clone();
    subject
        .subscribe(move |_a: i64, _b: String| {
            hits.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    subject.next(values![5]);

    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_wrong_type_never_invokes() {
    let subject = Subject::new();
    let count = Arc::new(AtomicUsize::new(0));
    let hits = count.clone();
    subject
        .subscribe(move |_a: i64| {
            hits.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    subject.next(values!["hello"]);

    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_variadic_subscriber_receives_tail() {
    let subject = Subject::new();
    let (seen, sink) = recorder();
    subject
        .subscribe(move |prefix: String, nums: Variadic<i64>| {
            sink.lock().push((prefix, nums.into_inner()))
        })
        .unwrap();

    subject.next(values!["x", 1, 2, 3]);

    assert_eq!(*seen.lock(), vec![("x".to_string(), vec![1, 2, 3])]);
}

#[test]
fn test_nil_substitutes_zero_value() {
    let subject = Subject::new();
    let (seen, sink) = recorder();
    subject
        .subscribe(move |a: i64, b: String| sink.lock().push((a, b)))
        .unwrap();

    subject.next(values![Value::Nil, "hi"]);

    assert_eq!(*seen.lock(), vec![(0, "hi".to_string())]);
}

#[test]
fn test_nil_does_not_leak_between_subscribers() {
    let subject = Subject::new();
    let (ints, int_sink) = recorder();
    let (strings, string_sink) = recorder();
    subject
        .subscribe(move |a: i64| int_sink.lock().push(a))
        .unwrap();
    subject
        .subscribe(move |s: String| string_sink.lock().push(s))
        .unwrap();

    subject.next(values![Value::Nil]);

    assert_eq!(*ints.lock(), vec![0]);
    assert_eq!(*strings.lock(), vec![String::new()]);
}

#[test]
fn test_unsubscribe_stops_delivery() {
    let subject = Subject::new();
    let count = Arc::new(AtomicUsize::new(0));
    let hits = count.clone();
    let token = subject
        .subscribe(move |_: i64| {
            hits.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    subject.next(values![1]);
    subject.unsubscribe(token).unwrap();
    subject.next(values![2]);

    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(
        subject.unsubscribe(token),
        Err(ReactiveError::UnknownSubscription(token))
    );
}

#[test]
fn test_non_callback_is_rejected() {
    let subject = Subject::new();
    let value: Box<dyn Any + Send + Sync> = Box::new(42_i32);

    let result = subject.subscribe_any(value);

    assert!(matches!(result, Err(ReactiveError::InvalidCallback(_))));
    let token = result.unwrap_or_default();
    assert!(token.is_empty());
    assert!(matches!(
        subject.unsubscribe(token),
        Err(ReactiveError::UnknownSubscription(_))
    ));
    assert!(subject.is_empty());
}

#[test]
fn test_boxed_callback_is_accepted() {
    let subject = Subject::new();
    let count = Arc::new(AtomicUsize::new(0));
    let hits = count.clone();
    let callback = Callback::new(Signature::fixed(vec![ValueType::Int]), move |args| {
        assert_eq!(args.positional()[0].as_int(), Some(3));
        hits.fetch_add(1, Ordering::SeqCst);
    });

    let token = subject.subscribe_any(Box::new(callback)).unwrap();
    subject.next(values![3]);

    assert!(subject.contains(&token));
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_raw_callback_reads_every_kind() {
    let subject = Subject::new();
    let (seen, sink) = recorder();
    let signature = Signature::fixed(vec![
        ValueType::Bool,
        ValueType::Int,
        ValueType::Uint,
        ValueType::Float,
        ValueType::Str,
        ValueType::Bytes,
        ValueType::List,
    ]);
    let callback = Callback::new(signature, move |args| {
        let v = args.positional();
        sink.lock().push((
            v[0].as_bool(),
            v[1].as_int(),
            v[2].as_uint(),
            v[3].as_float(),
            v[4].as_str().map(str::to_string),
            v[5].as_bytes().map(<[u8]>::to_vec),
            v[6].as_list().map(<[Value]>::len),
        ));
        assert_eq!(v[0].as_int(), None);
        assert_eq!(v[4].as_bytes(), None);
    });
    subject.subscribe_callback(callback).unwrap();

    subject.next(values![
        true,
        -2,
        7u32,
        1.5,
        "s",
        vec![1u8, 2],
        values![Value::Nil, 1]
    ]);

    assert_eq!(
        *seen.lock(),
        vec![(
            Some(true),
            Some(-2),
            Some(7),
            Some(1.5),
            Some("s".to_string()),
            Some(vec![1, 2]),
            Some(2),
        )]
    );
}

#[test]
fn test_callback_may_subscribe_during_next() {
    let subject = Subject::new();
    let late_hits = Arc::new(AtomicUsize::new(0));

    let handle = subject.clone();
    let hits = late_hits.clone();
    subject
        .subscribe(move |_: i64| {
            let hits = hits.clone();
            handle
                .subscribe(move |_: i64| {
                    hits.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        })
        .unwrap();

    subject.next(values![1]);

    assert_eq!(subject.len(), 2);
    assert_eq!(late_hits.load(Ordering::SeqCst), 0);

    subject.next(values![2]);

    assert_eq!(subject.len(), 3);
    assert_eq!(late_hits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unsubscribe_racing_close_with_reentrant_drop() {
    let subject = Subject::new();
    let closer = {
        let subject = subject.clone();
        std::thread::spawn(move || {
            for _ in 0..500 {
                subject.close();
            }
        })
    };

    for _ in 0..500 {
        let pipeline = subject
            .pipe([middleware(|parent, child| {
                let child = child.clone();
                parent.subscribe(move |v: i64| child.next(values![v]))?;
                Ok(())
            })])
            .unwrap();
        let token = subject
            .subscribe(move || {
                let _ = pipeline.stages();
            })
            .unwrap();
        let _ = subject.unsubscribe(token);
    }

    closer.join().unwrap();
    subject.close();
    assert!(subject.is_empty());
}

#[test]
fn test_close_stops_all_subscribers() {
    let subject = Subject::new();
    let count = Arc::new(AtomicUsize::new(0));
    for _ in 0..10 {
        let hits = count.clone();
        subject
            .subscribe(move |_: Value| {
                hits.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
    }

    subject.next(values![1]);
    subject.close();
    subject.next(values![2]);
    subject.close();

    assert_eq!(count.load(Ordering::SeqCst), 10);
    assert!(subject.is_empty());
}

#[test]
fn test_subscribe_after_close_works() {
    let subject = Subject::new();
    subject.subscribe(|| {}).unwrap();
    subject.close();

    let (seen, sink) = recorder();
    subject.subscribe(move |b: bool| sink.lock().push(b)).unwrap();
    subject.next(values![true]);

    assert_eq!(*seen.lock(), vec![true]);
}

#[test]
fn test_mismatch_does_not_block_others() {
    let subject = Subject::new();
    let (seen, sink) = recorder();

    subject.subscribe(|_: bool, _: f64| {}).unwrap();
    subject.subscribe(|_: Custom<Vec<String>>| {}).unwrap();
    let first = sink.clone();
    subject
        .subscribe(move |a: i64| first.lock().push(format!("int {a}")))
        .unwrap();
    subject.subscribe(|_: u64| {}).unwrap();
    subject
        .subscribe(move |a: i64, s: String| sink.lock().push(format!("{a} {s}")))
        .unwrap();

    subject.next(values![4, "four"]);

    let mut seen = seen.lock().clone();
    seen.sort();
    assert_eq!(seen, vec!["4 four".to_string(), "int 4".to_string()]);
}

#[test]
fn test_custom_values_delivered() {
    #[derive(Debug, Clone, Default, PartialEq)]
    struct Order {
        id: u32,
        qty: u32,
    }

    let subject = Subject::new();
    let (seen, sink) = recorder();
    subject
        .subscribe(move |order: Custom<Order>, note: String| {
            sink.lock().push((order.into_inner(), note))
        })
        .unwrap();

    subject.next(values![Value::custom(Order { id: 7, qty: 2 }), "rush"]);
    subject.next(values![Value::Nil, "empty"]);

    assert_eq!(
        *seen.lock(),
        vec![
            (Order { id: 7, qty: 2 }, "rush".to_string()),
            (Order::default(), "empty".to_string()),
        ]
    );
}

#[test]
fn test_concurrent_subscribe_next_close() {
    let subject = Subject::new();
    let delivered = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let subject = subject.clone();
            let delivered = delivered.clone();
            std::thread::spawn(move || {
                for i in 0..200 {
                    let hits = delivered.clone();
                    let token = subject
                        .subscribe(move |_: i64| {
                            hits.fetch_add(1, Ordering::SeqCst);
                        })
                        .unwrap();
                    subject.next(values![i]);
                    let _ = subject.unsubscribe(token);
                    if worker == 0 && i % 50 == 0 {
                        subject.close();
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(delivered.load(Ordering::SeqCst) > 0);
    assert!(subject.is_empty());
}
