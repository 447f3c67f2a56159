//! Property-based checks of the per-(element, observer) lifecycle.
//!
//! Random sequences of tree and class mutations are run against a watcher
//! with several observers, with the event loop settling at random points.
//! Afterwards:
//!
//! 1. `add` and `remove` strictly alternate per pair, starting with `add`
//! 2. `initialize` runs at most once per pair, before its first `add`
//! 3. Each observer's element list equals the pairs whose last event is `add`
//! 4. When every mutation is settled before the next one, those lists equal
//!    the attached elements that match

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use dom::{Document, NodeId};
use observer::{Change, Handlers, Initializer, Observer, Watcher};
use proptest::prelude::*;
use scheduler::EventLoop;
use selector_set::SelectorSet;

// ── Helpers ──────────────────────────────────────────────────────────

const SELECTORS: &[&str] = &[".a", ".b", "div .a", ".a:not(.b)"];
const POOL: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    Init,
    Add,
    Remove,
}

type Log = Rc<RefCell<Vec<(usize, Kind, NodeId)>>>;

fn logging_handlers(log: &Log, observer: usize) -> Handlers {
    let (i, a, r) = (log.clone(), log.clone(), log.clone());
    Handlers::new()
        .initialize(move |el| {
            i.borrow_mut().push((observer, Kind::Init, el));
            Ok(None)
        })
        .on_add(move |el| {
            a.borrow_mut().push((observer, Kind::Add, el));
            Ok(())
        })
        .on_remove(move |el| {
            r.borrow_mut().push((observer, Kind::Remove, el));
            Ok(())
        })
}

#[derive(Clone, Debug)]
enum Op {
    Append { child: usize, parent: Option<usize> },
    Detach(usize),
    Class { el: usize, class: &'static str, on: bool },
    Clear(usize),
    Settle,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..POOL, proptest::option::of(0..POOL)).prop_map(|(child, parent)| Op::Append { child, parent }),
        (0..POOL).prop_map(Op::Detach),
        (0..POOL, prop_oneof![Just("a"), Just("b")], any::<bool>())
            .prop_map(|(el, class, on)| Op::Class { el, class, on }),
        (0..POOL).prop_map(Op::Clear),
        Just(Op::Settle),
    ]
}

struct Harness {
    _watcher: Watcher,
    doc: Document,
    event_loop: EventLoop,
    body: NodeId,
    pool: Vec<NodeId>,
    observers: Vec<Observer>,
    log: Log,
}

impl Harness {
    fn new() -> Self {
        let doc = Document::new();
        let event_loop = EventLoop::new();
        let body = doc.body().unwrap();
        let watcher = Watcher::new(&doc, &event_loop, body).unwrap();
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let observers = SELECTORS
            .iter()
            .enumerate()
            .map(|(i, sel)| watcher.observe(sel, logging_handlers(&log, i)).unwrap())
            .collect();
        let pool = (0..POOL).map(|_| doc.create_element("div", &[])).collect();
        Self {
            _watcher: watcher,
            doc,
            event_loop,
            body,
            pool,
            observers,
            log,
        }
    }

    fn run(&self, op: &Op) {
        match *op {
            Op::Append { child, parent } => {
                let parent = parent.map_or(self.body, |p| self.pool[p]);
                self.doc.append_child(parent, self.pool[child]);
            }
            Op::Detach(el) => self.doc.remove(self.pool[el]),
            Op::Class { el, class, on } => self.doc.dom_mut().toggle_class(self.pool[el], class, on),
            Op::Clear(el) => self.doc.dom_mut().clear_children(self.pool[el]),
            Op::Settle => {
                self.event_loop.run_until_idle();
            }
        }
    }

    fn expected_matches(&self, observer: usize) -> Vec<NodeId> {
        let dom = self.doc.dom();
        let set: SelectorSet<()> = SelectorSet::new();
        let mut out: Vec<NodeId> = self
            .pool
            .iter()
            .copied()
            .filter(|&el| dom.is_inclusive_ancestor(self.body, el))
            .filter(|&el| set.matches_selector(&dom, el, SELECTORS[observer]).unwrap())
            .collect();
        out.sort();
        out
    }
}

fn check_alternation(log: &[(usize, Kind, NodeId)]) -> Result<HashMap<(usize, NodeId), Kind>, String> {
    let mut last: HashMap<(usize, NodeId), Kind> = HashMap::new();
    let mut inits: HashMap<(usize, NodeId), usize> = HashMap::new();
    for &(obs, kind, el) in log {
        let key = (obs, el);
        match kind {
            Kind::Init => {
                let n = inits.entry(key).or_default();
                *n += 1;
                if *n > 1 {
                    return Err(format!("initialize ran twice for {key:?}"));
                }
                if last.contains_key(&key) {
                    return Err(format!("initialize after add for {key:?}"));
                }
            }
            Kind::Add => {
                if last.get(&key) == Some(&Kind::Add) {
                    return Err(format!("double add for {key:?}"));
                }
                if !inits.contains_key(&key) {
                    return Err(format!("add before initialize for {key:?}"));
                }
                last.insert(key, Kind::Add);
            }
            Kind::Remove => {
                if last.get(&key) != Some(&Kind::Add) {
                    return Err(format!("remove without add for {key:?}"));
                }
                last.insert(key, Kind::Remove);
            }
        }
    }
    Ok(last)
}

// ═════════════════════════════════════════════════════════════════════════
// 1-3. Lifecycle invariants under random mutation
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn lifecycle_invariants(ops in proptest::collection::vec(arb_op(), 0..40)) {
        let h = Harness::new();
        for op in &ops {
            h.run(op);
        }
        h.event_loop.run_until_idle();

        let log = h.log.borrow().clone();
        let last = check_alternation(&log).map_err(|e| TestCaseError::fail(e))?;

        for (i, observer) in h.observers.iter().enumerate() {
            let mut from_log: Vec<NodeId> = last
                .iter()
                .filter(|&(&(obs, _), &kind)| obs == i && kind == Kind::Add)
                .map(|(&(_, el), _)| el)
                .collect();
            from_log.sort();
            let mut elements = observer.elements();
            elements.sort();
            prop_assert_eq!(elements, from_log);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Settled state mirrors the selectors
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn settled_state_matches_selectors(ops in proptest::collection::vec(arb_op(), 0..40)) {
        let h = Harness::new();
        for op in &ops {
            h.run(op);
            h.event_loop.run_until_idle();
        }

        let log = h.log.borrow().clone();
        check_alternation(&log).map_err(|e| TestCaseError::fail(e))?;
        for (i, observer) in h.observers.iter().enumerate() {
            let mut elements = observer.elements();
            elements.sort();
            prop_assert_eq!(elements, h.expected_matches(i), "selector {}", SELECTORS[i]);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Round trips never re-run initialize
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn reinsertion_never_reinitializes(cycles in 1usize..8) {
        let h = Harness::new();
        let el = h.pool[0];
        h.doc.dom_mut().toggle_class(el, "a", true);
        for _ in 0..cycles {
            h.doc.append_child(h.body, el);
            h.event_loop.run_until_idle();
            h.doc.remove(el);
            h.event_loop.run_until_idle();
        }
        let log = h.log.borrow();
        let count = |kind| log.iter().filter(|&&(obs, k, e)| obs == 0 && k == kind && e == el).count();
        prop_assert_eq!(count(Kind::Init), 1);
        prop_assert_eq!(count(Kind::Add), cycles);
        prop_assert_eq!(count(Kind::Remove), cycles);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// Idempotent apply
// ═════════════════════════════════════════════════════════════════════════

#[test]
fn duplicate_changes_fire_once() {
    let doc = Document::new();
    let event_loop = EventLoop::new();
    let body = doc.body().unwrap();
    let watcher = Watcher::new(&doc, &event_loop, body).unwrap();
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let observer = watcher.observe("p", logging_handlers(&log, 0)).unwrap();
    let p = doc.create_element("p", &[]);
    let id = observer.id();

    watcher.apply(vec![Change::Add(p, id), Change::Add(p, id)]);
    watcher.apply(vec![Change::Remove(p, id), Change::Remove(p, id)]);
    watcher.apply(vec![Change::RemoveSubtree(p)]);

    let kinds: Vec<Kind> = log.borrow().iter().map(|&(_, k, _)| k).collect();
    assert_eq!(kinds, vec![Kind::Init, Kind::Add, Kind::Remove]);
}

#[test]
fn initializer_hooks_wrap_observer_hooks() {
    let doc = Document::new();
    let event_loop = EventLoop::new();
    let body = doc.body().unwrap();
    let watcher = Watcher::new(&doc, &event_loop, body).unwrap();
    let order = Rc::new(RefCell::new(Vec::new()));

    let (o1, o2, o3, o4) = (order.clone(), order.clone(), order.clone(), order.clone());
    let handlers = Handlers::new()
        .initialize(move |_| {
            let (a, r) = (o1.clone(), o1.clone());
            Ok(Some(
                Initializer::new()
                    .on_add(move |_| {
                        a.borrow_mut().push("init add");
                        Ok(())
                    })
                    .on_remove(move |_| {
                        r.borrow_mut().push("init remove");
                        Ok(())
                    }),
            ))
        })
        .on_add(move |_| {
            o2.borrow_mut().push("add");
            Ok(())
        })
        .on_remove(move |_| {
            o3.borrow_mut().push("remove");
            Ok(())
        })
        .subscribe(move |_| {
            let teardown = o4.clone();
            Ok(observer::Subscription::new(move || teardown.borrow_mut().push("unsubscribe")))
        });
    watcher.observe("section", handlers).unwrap();

    let section = doc.create_element("section", &[]);
    doc.append_child(body, section);
    event_loop.run_until_idle();
    doc.remove(section);
    event_loop.run_until_idle();

    assert_eq!(
        *order.borrow(),
        vec!["init add", "add", "init remove", "remove", "unsubscribe"]
    );
}
