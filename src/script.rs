//! Conformance test scripts
//!
//! The behavioral contract of this interpreter is a script format: each
//! entry names an export, supplies literal typed argument values, and pins
//! the returned values exactly, bitwise per kind. Scripts are JSON and
//! deserialize with serde; `tests/scripts/` holds the suite and
//! `tests/conformance.rs` drives it against fixture modules.
//!
//! ```json
//! {
//!     "module": "numeric",
//!     "entries": [
//!         { "invoke": "div_s",
//!           "args": [ { "type": "i64", "value": "7" },
//!                     { "type": "i64", "value": "2" } ],
//!           "expect": [ { "type": "i64", "value": "3" } ] }
//!     ]
//! }
//! ```

use crate::runtime::{Instance, Value};
use serde::Deserialize;

/// A parsed conformance script.
#[derive(Debug, Deserialize)]
pub struct Script {
    /// Name of the fixture module the entries run against.
    pub module: String,
    pub entries: Vec<Entry>,
}

/// One script entry: invoke an export and pin its result, or pin a fault.
#[derive(Debug, Deserialize)]
pub struct Entry {
    /// Export name to invoke.
    pub invoke: String,
    #[serde(default)]
    pub args: Vec<Literal>,
    /// Expected results; empty means the invocation produces no value.
    #[serde(default)]
    pub expect: Vec<Literal>,
    /// When set, the invocation must fault and the fault's message must
    /// contain this substring. `expect` is ignored.
    #[serde(default)]
    pub fault: Option<String>,
}

/// A literal typed value, e.g. `{ "type": "i64", "value": "-807" }`.
#[derive(Debug, Deserialize)]
pub struct Literal {
    #[serde(rename = "type")]
    pub typ: String,
    pub value: String,
}

impl Literal {
    pub fn to_value(&self) -> Result<Value, String> {
        Value::from_strings(&self.typ, &self.value)
    }
}

/// Parse a script from JSON source.
pub fn parse(source: &str) -> Result<Script, String> {
    serde_json::from_str(source).map_err(|e| format!("malformed script: {e}"))
}

/// Run every entry of a script against an instance. The first divergence
/// aborts the run with a message naming the entry and the mismatch.
pub fn run(instance: &mut Instance<'_>, script: &Script) -> Result<(), String> {
    for (i, entry) in script.entries.iter().enumerate() {
        run_entry(instance, entry).map_err(|e| format!("entry {i} ({}): {e}", entry.invoke))?;
    }
    Ok(())
}

fn run_entry(instance: &mut Instance<'_>, entry: &Entry) -> Result<(), String> {
    let args = entry
        .args
        .iter()
        .map(Literal::to_value)
        .collect::<Result<Vec<_>, _>>()?;

    let result = instance.invoke(&entry.invoke, args);

    if let Some(want) = &entry.fault {
        return match result {
            Err(fault) if fault.to_string().contains(want) => Ok(()),
            Err(fault) => Err(format!("expected fault containing `{want}`, got `{fault}`")),
            Ok(v) => Err(format!("expected fault containing `{want}`, got result {v:?}")),
        };
    }

    let result = result.map_err(|fault| format!("unexpected fault: {fault}"))?;
    let expected = entry
        .expect
        .iter()
        .map(Literal::to_value)
        .collect::<Result<Vec<_>, _>>()?;

    match (&result, expected.as_slice()) {
        (None, []) => Ok(()),
        (Some(got), [want]) if got.same_bits(want) => Ok(()),
        (got, want) => Err(format!("expected {want:?}, got {got:?}")),
    }
}
