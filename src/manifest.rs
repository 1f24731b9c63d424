//! The variable manifest: a JSON document whose `info` object maps variable
//! names to `{ "address": .., "type": .., "mask": .. }`.
//!
//! Reading is lenient per entry (bad entries are skipped and reported) but
//! strict about the document itself: malformed JSON or a missing `info`
//! object fails the whole read.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::data_type::DataType;
use crate::error::{Error, Result};
use crate::variable::Variable;

/// Why an entry was left out of a loaded manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Malformed,
    MissingAddress,
    MissingType,
    InvalidType,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Malformed => "malformed",
            SkipReason::MissingAddress => "missing_address",
            SkipReason::MissingType => "missing_type",
            SkipReason::InvalidType => "invalid_type",
        }
    }
}

#[derive(Debug, Default)]
pub struct Manifest {
    pub variables: BTreeMap<String, Variable>,
    pub skipped: Vec<(String, SkipReason)>,
}

#[derive(Deserialize)]
struct Document {
    info: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
struct Entry {
    address: Option<Value>,
    #[serde(rename = "type")]
    ty: Option<String>,
    mask: Option<u64>,
}

#[derive(Serialize)]
struct DocumentOut<'a> {
    info: BTreeMap<&'a str, EntryOut>,
}

#[derive(Serialize)]
struct EntryOut {
    address: usize,
    #[serde(rename = "type")]
    ty: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    mask: Option<u64>,
}

/// Decimal or `0x`-prefixed hexadecimal.
fn parse_address(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => {
            let s = s.trim();
            match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                Some(hex) => usize::from_str_radix(hex, 16).ok(),
                None => s.parse().ok(),
            }
        }
        _ => None,
    }
}

fn parse_entry(value: Value) -> std::result::Result<Variable, SkipReason> {
    let entry: Entry = serde_json::from_value(value).map_err(|_| SkipReason::Malformed)?;
    let code = entry.ty.ok_or(SkipReason::MissingType)?;
    if code.len() < 3 {
        return Err(SkipReason::InvalidType);
    }
    let ty = DataType::new(&code).map_err(|_| SkipReason::InvalidType)?;
    let address = entry
        .address
        .as_ref()
        .and_then(parse_address)
        .ok_or(SkipReason::MissingAddress)?;
    let var = Variable::new(ty, address);
    Ok(match entry.mask {
        Some(mask) => var.with_mask(mask),
        None => var,
    })
}

impl Manifest {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let document: Document = serde_json::from_reader(reader)?;
        Self::from_document(document)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let document: Document = serde_json::from_str(json)?;
        Self::from_document(document)
    }

    fn from_document(document: Document) -> Result<Self> {
        let info = document.info.ok_or(Error::MissingInfo)?;
        let mut manifest = Manifest::default();
        for (name, value) in info {
            match parse_entry(value) {
                Ok(var) => {
                    manifest.variables.insert(name, var);
                }
                Err(reason) => manifest.skipped.push((name, reason)),
            }
        }
        Ok(manifest)
    }
}

/// Write `variables` as a manifest document, leaving out default masks.
pub fn write_variables<W: Write>(writer: W, variables: &BTreeMap<String, Variable>) -> Result<()> {
    let info = variables
        .iter()
        .map(|(name, var)| {
            let entry = EntryOut {
                address: var.address,
                ty: var.ty.to_string(),
                mask: (!var.is_default_mask()).then_some(var.mask),
            };
            (name.as_str(), entry)
        })
        .collect();
    serde_json::to_writer_pretty(writer, &DocumentOut { info })?;
    Ok(())
}
