use std::io::Read;

use serde::{Deserialize, Deserializer};

use super::InventoryImportError;

/// One bed line of the inventory export, validated field by field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InventoryRecord {
    pub(crate) line: u64,
    pub(crate) property_id: String,
    pub(crate) property_name: String,
    pub(crate) address: Option<String>,
    pub(crate) city: Option<String>,
    pub(crate) state: Option<String>,
    pub(crate) room_id: String,
    pub(crate) room_name: String,
    pub(crate) room_type: Option<String>,
    pub(crate) bed_id: String,
    pub(crate) bed_name: String,
    pub(crate) price: Option<u32>,
    pub(crate) tenant_id: Option<String>,
}

pub(crate) fn parse_records<R: Read>(reader: R) -> Result<Vec<InventoryRecord>, InventoryImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let mut records = Vec::new();

    for (index, result) in csv_reader.records().enumerate() {
        let raw = result?;
        let line = raw
            .position()
            .map(|position| position.line())
            .unwrap_or(index as u64 + 2);
        let row: InventoryRow = raw.deserialize(Some(&headers))?;
        records.push(row.validate(line)?);
    }

    Ok(records)
}

#[derive(Debug, Deserialize)]
struct InventoryRow {
    #[serde(default)]
    property_id: String,
    #[serde(default)]
    property_name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    address: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    city: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    state: Option<String>,
    #[serde(default)]
    room_id: String,
    #[serde(default)]
    room_name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    room_type: Option<String>,
    #[serde(default)]
    bed_id: String,
    #[serde(default)]
    bed_name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    price: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    tenant_id: Option<String>,
}

impl InventoryRow {
    fn validate(self, line: u64) -> Result<InventoryRecord, InventoryImportError> {
        for (field, value) in [
            ("property_id", &self.property_id),
            ("room_id", &self.room_id),
            ("bed_id", &self.bed_id),
        ] {
            if value.is_empty() {
                return Err(InventoryImportError::MissingField { line, field });
            }
        }

        let price = match self.price.as_deref() {
            Some(raw) => Some(
                parse_price(raw).ok_or_else(|| InventoryImportError::InvalidPrice {
                    line,
                    value: raw.to_string(),
                })?,
            ),
            None => None,
        };

        Ok(InventoryRecord {
            line,
            property_name: or_id(self.property_name, &self.property_id),
            room_name: or_id(self.room_name, &self.room_id),
            bed_name: or_id(self.bed_name, &self.bed_id),
            property_id: self.property_id,
            address: self.address,
            city: self.city,
            state: self.state,
            room_id: self.room_id,
            room_type: self.room_type,
            bed_id: self.bed_id,
            price,
            tenant_id: self.tenant_id,
        })
    }
}

fn or_id(name: String, id: &str) -> String {
    if name.is_empty() {
        id.to_string()
    } else {
        name
    }
}

/// Whole currency units; tolerates a leading `$`, thousands separators and a `.00` tail.
fn parse_price(raw: &str) -> Option<u32> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|ch| *ch != ',')
        .collect();
    let whole = match cleaned.split_once('.') {
        Some((whole, cents)) if cents.chars().all(|ch| ch == '0') => whole,
        Some(_) => return None,
        None => cleaned.as_str(),
    };
    whole.parse().ok()
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
