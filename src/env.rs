//! The three-role lexical environment (spec §3.4): `current`, `anon`,
//! and `global`. Values are kept behind `Rc` so that descending into a
//! nested scope — the common case, since every `map`/`zip` iteration and
//! every `bind` creates a child `Env` — never clones the JSON tree those
//! roles point at, only the input to the one role that actually changes.

use std::rc::Rc;

use serde_json::Value;

#[derive(Clone)]
pub struct Env {
    pub current: Rc<Value>,
    pub anon: Rc<Value>,
    pub global: Rc<Value>,
}

impl Env {
    /// The environment at program start: all three roles point at the
    /// input value (spec §3.4, "at program start, current = anon = global = input").
    pub fn root(input: Value) -> Self {
        let shared = Rc::new(input);
        Env {
            current: shared.clone(),
            anon: shared.clone(),
            global: shared,
        }
    }

    /// `bind source { … }`: rebinds `current` only (spec §3.4, §8 law 3).
    pub fn with_current(&self, value: Value) -> Self {
        Env {
            current: Rc::new(value),
            anon: self.anon.clone(),
            global: self.global.clone(),
        }
    }

    /// `map source { … }` for one element: `current` and `anon` both
    /// become the element.
    pub fn for_map_element(&self, element: Value) -> Self {
        let shared = Rc::new(element);
        Env {
            current: shared.clone(),
            anon: shared,
            global: self.global.clone(),
        }
    }

    /// `zip s0 … sN { … }` for one tuple: `anon` is the positional tuple,
    /// `current` is the left-to-right merge of its object members.
    pub fn for_zip_tuple(&self, tuple: Vec<Value>, merged_current: Value) -> Self {
        Env {
            current: Rc::new(merged_current),
            anon: Rc::new(Value::Array(tuple)),
            global: self.global.clone(),
        }
    }
}
