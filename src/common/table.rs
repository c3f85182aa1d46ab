//! The globals table: an open-addressed, linearly-probed hash map from
//! owned string keys to `Value`s, resized whenever its load factor
//! would exceed 0.75. String equality (and hashing) is byte-wise.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::common::value::Value;

const INITIAL_CAPACITY: usize = 8;
const MAX_LOAD_FACTOR: f64 = 0.75;

#[derive(Clone)]
enum Slot {
    Empty,
    /// A tombstone left by `remove`, so probing past a deleted entry
    /// still finds keys that were inserted after it.
    Tombstone,
    Occupied(String, Value),
}

pub struct Table {
    slots: Vec<Slot>,
    count: usize, // occupied, not counting tombstones
}

fn hash_str(s: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    s.as_bytes().hash(&mut hasher);
    hasher.finish()
}

impl Table {
    pub fn new() -> Table {
        Table { slots: vec![Slot::Empty; INITIAL_CAPACITY], count: 0 }
    }

    pub fn len(&self) -> usize { self.count }
    pub fn is_empty(&self) -> bool { self.count == 0 }

    /// Inserts or overwrites `key`. Returns `true` if this created a
    /// new binding (the key wasn't already present).
    pub fn set(&mut self, key: &str, value: Value) -> bool {
        if (self.count + 1) as f64 > self.slots.len() as f64 * MAX_LOAD_FACTOR {
            self.grow();
        }

        let index = self.find_slot(key);
        let is_new = !matches!(self.slots[index], Slot::Occupied(_, _));
        if matches!(self.slots[index], Slot::Empty) {
            self.count += 1;
        }
        self.slots[index] = Slot::Occupied(key.to_string(), value);
        is_new
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        let index = self.find_slot(key);
        match &self.slots[index] {
            Slot::Occupied(k, v) if k == key => Some(v),
            _ => None,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&mut self, key: &str) -> bool {
        let index = self.find_slot(key);
        match &self.slots[index] {
            Slot::Occupied(k, _) if k == key => {
                self.slots[index] = Slot::Tombstone;
                self.count -= 1;
                true
            }
            _ => false,
        }
    }

    /// Linear probe starting at `hash(key) % capacity`. Returns the
    /// index of the matching occupied slot, or -- if the key is
    /// absent -- the first empty-or-tombstone slot it would be
    /// inserted into.
    fn find_slot(&self, key: &str) -> usize {
        let capacity = self.slots.len();
        let mut index = (hash_str(key) as usize) % capacity;
        let mut first_tombstone = None;

        loop {
            match &self.slots[index] {
                Slot::Empty => return first_tombstone.unwrap_or(index),
                Slot::Tombstone => {
                    if first_tombstone.is_none() {
                        first_tombstone = Some(index);
                    }
                }
                Slot::Occupied(k, _) if k == key => return index,
                Slot::Occupied(_, _) => {}
            }
            index = (index + 1) % capacity;
        }
    }

    fn grow(&mut self) {
        let new_capacity = self.slots.len() * 2;
        let old_slots = std::mem::replace(&mut self.slots, vec![Slot::Empty; new_capacity]);
        self.count = 0;
        for slot in old_slots {
            if let Slot::Occupied(key, value) = slot {
                self.set(&key, value);
            }
        }
    }
}

impl Default for Table {
    fn default() -> Table { Table::new() }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn set_then_get() {
        let mut table = Table::new();
        table.set("x", Value::Number(1.0));
        assert_eq!(table.get("x"), Some(&Value::Number(1.0)));
    }

    #[test]
    fn missing_key() {
        let table = Table::new();
        assert_eq!(table.get("nope"), None);
    }

    #[test]
    fn overwrite() {
        let mut table = Table::new();
        assert!(table.set("x", Value::Number(1.0)));
        assert!(!table.set("x", Value::Number(2.0)));
        assert_eq!(table.get("x"), Some(&Value::Number(2.0)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn survives_resize() {
        let mut table = Table::new();
        for i in 0..200 {
            table.set(&format!("key{}", i), Value::Number(i as f64));
        }
        for i in 0..200 {
            assert_eq!(table.get(&format!("key{}", i)), Some(&Value::Number(i as f64)));
        }
    }

    #[test]
    fn remove_then_reinsert() {
        let mut table = Table::new();
        table.set("a", Value::Number(1.0));
        table.set("b", Value::Number(2.0));
        assert!(table.remove("a"));
        assert_eq!(table.get("a"), None);
        assert_eq!(table.get("b"), Some(&Value::Number(2.0)));
        table.set("a", Value::Number(3.0));
        assert_eq!(table.get("a"), Some(&Value::Number(3.0)));
    }

    mod props {
        use std::collections::HashMap;

        use proptest::prelude::*;

        use super::*;

        proptest! {
            // Replaying an arbitrary sequence of sets and removes against
            // both a `Table` and a `HashMap` (the latter never resizes by
            // our own logic, so it's a trustworthy oracle) must agree on
            // every key at the end, regardless of how many times the
            // table grew along the way.
            #[test]
            fn agrees_with_a_reference_map(
                ops in prop::collection::vec(
                    (0usize..12, any::<bool>(), any::<i64>()),
                    0..200,
                )
            ) {
                let mut table = Table::new();
                let mut oracle: HashMap<String, f64> = HashMap::new();

                for (key_id, is_set, value) in ops {
                    let key = format!("key{}", key_id);
                    if is_set {
                        table.set(&key, Value::Number(value as f64));
                        oracle.insert(key, value as f64);
                    } else {
                        table.remove(&key);
                        oracle.remove(&key);
                    }
                }

                for key_id in 0..12 {
                    let key = format!("key{}", key_id);
                    let expected = oracle.get(&key).copied();
                    let actual = table.get(&key).map(|v| match v {
                        Value::Number(n) => *n,
                        _ => panic!("unexpected value kind"),
                    });
                    prop_assert_eq!(actual, expected);
                }
                prop_assert_eq!(table.len(), oracle.len());
            }
        }
    }
}
