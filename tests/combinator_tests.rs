//! Integration tests for the promise combinators

mod common;
use common::{init_logging, reject_after, resolve_after};
use deferred::combinator::{all, promisify, reject, when, Callback};
use deferred::{Deferred, EventLoop, PromiseState, Resolvable, Settlement};
use std::rc::Rc;

mod when_and_reject {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_when_value_is_already_fulfilled() {
        let el = EventLoop::new();
        let p = when::<_, ()>(&el, Resolvable::Value("x"));
        assert_eq!(p.state(), PromiseState::Fulfilled);
        assert_eq!(p.settlement(), Some(Settlement::Fulfilled("x")));
    }

    #[test]
    fn test_when_promise_adopts_eventual_state() {
        init_logging();
        let el = EventLoop::new();
        let source = reject_after::<i32, String>(&el, 10, "late".to_string());
        let adopted = when::<i32, String>(&el, &source);
        assert!(!adopted.ptr_eq(&source));
        assert!(adopted.is_pending());

        el.flush().unwrap();
        assert_eq!(adopted.settlement(), Some(Settlement::Rejected("late".to_string())));
    }

    #[test]
    fn test_reject_is_already_rejected() {
        let el = EventLoop::new();
        let p = reject::<(), _>(&el, 404);
        assert_eq!(p.state(), PromiseState::Rejected);
    }
}

mod all_join {
    use super::*;
    use pretty_assertions::assert_eq;

    fn collect(el: &EventLoop, delays: &[u64]) -> Vec<usize> {
        let inputs: Vec<Resolvable<usize, ()>> = delays
            .iter()
            .enumerate()
            .map(|(i, &d)| Resolvable::Promise(resolve_after(el, d, i)))
            .collect();
        let joined = all(el, inputs);
        el.flush().unwrap();
        match joined.settlement() {
            Some(Settlement::Fulfilled(values)) => values,
            other => panic!("unexpected settlement {:?}", other),
        }
    }

    #[test]
    fn test_order_preserved_for_reverse_completion() {
        init_logging();
        let el = EventLoop::new();
        assert_eq!(collect(&el, &[50, 40, 30, 20, 10]), vec![0, 1, 2, 3, 4]);
        assert_eq!(el.now(), 50);
    }

    #[test]
    fn test_order_preserved_for_shuffled_completion() {
        let el = EventLoop::new();
        assert_eq!(collect(&el, &[7, 1, 9, 3, 3, 0, 12]), vec![0, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_mixed_values_and_promises() {
        let el = EventLoop::new();
        let joined = all(
            &el,
            vec![
                Resolvable::Value(1),
                Resolvable::Promise(resolve_after::<i32, ()>(&el, 5, 2)),
                Resolvable::Value(3),
            ],
        );
        assert!(joined.is_pending());
        el.flush().unwrap();
        assert_eq!(joined.settlement(), Some(Settlement::Fulfilled(vec![1, 2, 3])));
    }

    #[test]
    fn test_empty_input_fulfills_without_flush() {
        let el = EventLoop::new();
        let joined = all::<i32, ()>(&el, Vec::<Resolvable<i32, ()>>::new());
        assert_eq!(joined.settlement(), Some(Settlement::Fulfilled(vec![])));
    }

    #[test]
    fn test_rejection_at_any_index() {
        for failing in 0..4 {
            let el = EventLoop::new();
            let inputs: Vec<Resolvable<usize, String>> = (0..4)
                .map(|i| {
                    if i == failing {
                        Resolvable::Promise(reject_after(&el, 10 + i as u64, format!("bad {}", i)))
                    } else {
                        Resolvable::Promise(resolve_after(&el, 10 + i as u64, i))
                    }
                })
                .collect();
            let joined = all(&el, inputs);
            el.flush().unwrap();
            assert_eq!(
                joined.settlement(),
                Some(Settlement::Rejected(format!("bad {}", failing)))
            );
        }
    }

    #[test]
    fn test_first_rejection_wins() {
        let el = EventLoop::new();
        let joined = all(
            &el,
            vec![
                reject_after::<(), _>(&el, 20, "second"),
                reject_after::<(), _>(&el, 10, "first"),
            ],
        );
        el.flush().unwrap();
        assert_eq!(joined.settlement(), Some(Settlement::Rejected("first")));
    }

    #[test]
    fn test_rejection_settles_before_pending_inputs() {
        let el = EventLoop::new();
        let never = Deferred::<i32, &str>::new(&el);
        let joined = all(
            &el,
            vec![never.promise(), reject_after(&el, 1, "boom")],
        );
        el.flush().unwrap();
        assert_eq!(joined.settlement(), Some(Settlement::Rejected("boom")));
    }

    #[test]
    fn test_promise_for_sequence() {
        let el = EventLoop::new();
        let outer = Deferred::<Vec<Resolvable<i32, ()>>, ()>::new(&el);
        let joined = all(&el, outer.promise());

        el.set_timeout(5, {
            let el = el.clone();
            move || {
                outer.resolve(vec![
                    Resolvable::Value(1),
                    Resolvable::Promise(resolve_after(&el, 5, 2)),
                ]);
            }
        });
        el.flush().unwrap();
        assert_eq!(joined.settlement(), Some(Settlement::Fulfilled(vec![1, 2])));
        assert_eq!(el.now(), 10);
    }
}

mod callback_adapter {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Remote;

    impl Remote {
        fn call(&self, (status, payload): (&'static str, &'static str), done: Callback<&'static str, String>) {
            done(status, payload.to_string());
        }
    }

    #[test]
    fn test_success_status_resolves() {
        let el = EventLoop::new();
        let call = promisify(&el, Rc::new(Remote), Remote::call);
        let p = call(("success", "42"));
        assert_eq!(p.settlement(), Some(Settlement::Fulfilled("42".to_string())));
    }

    #[test]
    fn test_error_status_rejects() {
        let el = EventLoop::new();
        let call = promisify(&el, Rc::new(Remote), Remote::call);
        let p = call(("error", "boom"));
        assert_eq!(p.settlement(), Some(Settlement::Rejected("boom".to_string())));
    }

    #[test]
    fn test_wrapped_promises_join() {
        let el = EventLoop::new();
        let call = promisify(&el, Rc::new(Remote), Remote::call);
        let joined = all(&el, vec![call(("success", "a")), call(("success", "b"))]);
        el.flush().unwrap();
        assert_eq!(
            joined.settlement(),
            Some(Settlement::Fulfilled(vec!["a".to_string(), "b".to_string()]))
        );
    }
}
