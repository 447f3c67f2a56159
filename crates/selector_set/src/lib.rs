//! Selector index.
//!
//! A [`SelectorSet`] maps selector strings to caller data and answers "which
//! registered selectors match this element" without testing every selector
//! against every element. Each complex selector is bucketed by the most
//! specific key of its subject compound (id, then class, then tag); only the
//! buckets an element can hit are tested.
//!
//! Results are always reported in registration order.

pub mod matching;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use css::{ComplexSelector, SelectorError, SelectorList, SimpleSelector, parse_selector_list};
use dom::{Dom, NodeId};
use thiserror::Error;

pub use matching::{matches_compound, matches_list, matches_selector};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SelectorSetError {
    #[error("invalid selector `{selector}`: {source}")]
    InvalidSelector {
        selector: String,
        #[source]
        source: SelectorError,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum IndexKey {
    Id(String),
    Class(String),
    Tag(String),
    Universal,
}

impl IndexKey {
    fn for_selector(selector: &ComplexSelector) -> IndexKey {
        let simples = &selector.subject().simples;
        let id = simples.iter().find_map(|s| match s {
            SimpleSelector::Id(id) => Some(IndexKey::Id(id.clone())),
            _ => None,
        });
        let class = || {
            simples.iter().find_map(|s| match s {
                SimpleSelector::Class(c) => Some(IndexKey::Class(c.clone())),
                _ => None,
            })
        };
        let tag = || {
            simples.iter().find_map(|s| match s {
                SimpleSelector::Type(t) => Some(IndexKey::Tag(t.clone())),
                _ => None,
            })
        };
        id.or_else(class).or_else(tag).unwrap_or(IndexKey::Universal)
    }
}

struct Entry<T> {
    selector: String,
    keys: Vec<IndexKey>,
    data: T,
}

/// A direct match of one registered selector.
#[derive(Debug)]
pub struct Match<'a, T> {
    pub selector: &'a str,
    pub data: &'a T,
}

/// All elements below a root matched by one registered selector.
#[derive(Debug)]
pub struct QueryMatch<'a, T> {
    pub selector: &'a str,
    pub data: &'a T,
    /// In document order.
    pub elements: Vec<NodeId>,
}

pub struct SelectorSet<T> {
    /// Keyed by registration sequence number.
    entries: BTreeMap<u64, Entry<T>>,
    buckets: HashMap<IndexKey, BTreeSet<u64>>,
    /// Parsed form of every registered selector string, with a use count.
    parsed: HashMap<String, (SelectorList, usize)>,
    next_seq: u64,
}

impl<T> Default for SelectorSet<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            buckets: HashMap::new(),
            parsed: HashMap::new(),
            next_seq: 0,
        }
    }
}

impl<T> SelectorSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Register `data` under `selector`. The same pair may be added more than
    /// once; each addition is a separate entry.
    pub fn add(&mut self, selector: &str, data: T) -> Result<(), SelectorSetError> {
        if !self.parsed.contains_key(selector) {
            let list = parse_selector_list(selector).map_err(|source| SelectorSetError::InvalidSelector {
                selector: selector.to_string(),
                source,
            })?;
            self.parsed.insert(selector.to_string(), (list, 0));
        }
        let Some((list, uses)) = self.parsed.get_mut(selector) else {
            return Ok(());
        };
        *uses += 1;

        let mut keys: Vec<IndexKey> = Vec::new();
        for complex in list.iter() {
            let key = IndexKey::for_selector(complex);
            if !keys.contains(&key) {
                keys.push(key);
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        for key in &keys {
            self.buckets.entry(key.clone()).or_default().insert(seq);
        }
        self.entries.insert(
            seq,
            Entry {
                selector: selector.to_string(),
                keys,
                data,
            },
        );
        Ok(())
    }

    /// Remove the earliest entry registered with exactly this selector and data.
    pub fn remove(&mut self, selector: &str, data: &T) -> bool
    where
        T: PartialEq,
    {
        let Some(seq) = self
            .entries
            .iter()
            .find(|(_, e)| e.selector == selector && e.data == *data)
            .map(|(&seq, _)| seq)
        else {
            return false;
        };
        let Some(entry) = self.entries.remove(&seq) else {
            return false;
        };
        for key in &entry.keys {
            if let Some(bucket) = self.buckets.get_mut(key) {
                bucket.remove(&seq);
                if bucket.is_empty() {
                    self.buckets.remove(key);
                }
            }
        }
        if let Some((_, uses)) = self.parsed.get_mut(selector) {
            *uses -= 1;
            if *uses == 0 {
                self.parsed.remove(selector);
            }
        }
        true
    }

    /// Registered entries whose selector matches `el` itself.
    pub fn matches(&self, dom: &Dom, el: NodeId) -> Vec<Match<'_, T>> {
        self.matching_seqs(dom, el)
            .into_iter()
            .filter_map(|seq| self.entries.get(&seq))
            .map(|e| Match {
                selector: &e.selector,
                data: &e.data,
            })
            .collect()
    }

    /// Every registered entry matched by some element strictly below `root`,
    /// with the matched elements. Entries without matches are left out.
    pub fn query_all(&self, dom: &Dom, root: NodeId) -> Vec<QueryMatch<'_, T>> {
        let mut by_seq: BTreeMap<u64, Vec<NodeId>> = BTreeMap::new();
        for el in dom.element_descendants(root) {
            for seq in self.matching_seqs(dom, el) {
                by_seq.entry(seq).or_default().push(el);
            }
        }
        by_seq
            .into_iter()
            .filter_map(|(seq, elements)| {
                let e = self.entries.get(&seq)?;
                Some(QueryMatch {
                    selector: &e.selector,
                    data: &e.data,
                    elements,
                })
            })
            .collect()
    }

    /// Test `el` against an arbitrary selector. Registered selectors reuse
    /// their parsed form.
    pub fn matches_selector(&self, dom: &Dom, el: NodeId, selector: &str) -> Result<bool, SelectorSetError> {
        if let Some((list, _)) = self.parsed.get(selector) {
            return Ok(matches_list(dom, el, list));
        }
        let list = parse_selector_list(selector).map_err(|source| SelectorSetError::InvalidSelector {
            selector: selector.to_string(),
            source,
        })?;
        Ok(matches_list(dom, el, &list))
    }

    pub fn selectors(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(|e| e.selector.as_str())
    }

    /// Sequence numbers of entries matching `el`, ascending.
    fn matching_seqs(&self, dom: &Dom, el: NodeId) -> Vec<u64> {
        let Some(elem) = dom.element(el) else {
            return Vec::new();
        };
        let mut candidates: BTreeSet<u64> = BTreeSet::new();
        let mut add_bucket = |key: IndexKey| {
            if let Some(bucket) = self.buckets.get(&key) {
                candidates.extend(bucket.iter().copied());
            }
        };
        if let Some(id) = &elem.id {
            add_bucket(IndexKey::Id(id.clone()));
        }
        for class in &elem.classes {
            add_bucket(IndexKey::Class(class.clone()));
        }
        add_bucket(IndexKey::Tag(elem.tag_name.to_ascii_lowercase()));
        add_bucket(IndexKey::Universal);

        candidates
            .into_iter()
            .filter(|seq| {
                self.entries
                    .get(seq)
                    .and_then(|e| self.parsed.get(&e.selector))
                    .is_some_and(|(list, _)| matches_list(dom, el, list))
            })
            .collect()
    }
}
