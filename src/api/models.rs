use super::lenient;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

pub const ACTIVE_STATUS: &str = "Active";

/// Identifiers arrive as JSON numbers from some endpoints and strings from others.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum RawId {
    Number(i64),
    Text(String),
    Other(Value),
}

impl RawId {
    pub fn into_id(self) -> Option<String> {
        match self {
            RawId::Number(n) => Some(n.to_string()),
            RawId::Text(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            RawId::Other(_) => None,
        }
    }
}

/// `images` is usually a JSON-encoded string, occasionally a real array.
/// Anything else lands in `Other` and yields no images.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum RawImages {
    Encoded(String),
    List(Vec<Value>),
    Other(Value),
}

/// Prices come back as decimal strings (`"15000.00"`) or plain numbers.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum RawPrice {
    Number(f64),
    Text(String),
    Other(Value),
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RawBusiness {
    pub id: Option<RawId>,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub name: Option<String>,
    #[serde(rename = "type", deserialize_with = "lenient::opt_text")]
    pub kind: Option<String>,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub description: Option<String>,
    pub images: Option<RawImages>,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub location_url: Option<String>,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub address: Option<String>,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub status: Option<String>,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub open_time: Option<String>,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub close_time: Option<String>,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub phone_number: Option<String>,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub document: Option<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub products: Vec<RawProduct>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RawProduct {
    pub id: Option<RawId>,
    pub umkm_id: Option<RawId>,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub description: Option<String>,
    pub price: Option<RawPrice>,
    #[serde(deserialize_with = "lenient::opt_text")]
    pub image: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Category {
    pub id: RawId,
    pub name: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("record is missing an identifier")]
    MissingId,
    #[error("record {id} is missing a name")]
    MissingName { id: String },
    #[error("product {id} has an unreadable price {raw:?}")]
    InvalidPrice { id: String, raw: String },
}

/// A business payload that passed validation. Strings are still raw upstream values.
#[derive(Debug, Clone)]
pub struct ValidBusiness {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub description: String,
    pub images: Option<RawImages>,
    pub location_url: Option<String>,
    pub address: String,
    pub status: Option<String>,
    pub open_time: Option<String>,
    pub close_time: Option<String>,
    pub phone_number: Option<String>,
    pub document: Option<String>,
    pub products: Vec<ValidProduct>,
}

#[derive(Debug, Clone)]
pub struct ValidProduct {
    pub id: String,
    pub business_id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub image: Option<String>,
}

impl RawBusiness {
    pub fn is_active(&self) -> bool {
        self.status.as_deref() == Some(ACTIVE_STATUS)
    }
}

/// Decodes list elements one by one so a single bad record does not sink the listing.
pub fn decode_records(values: Vec<serde_json::Value>) -> Vec<RawBusiness> {
    values
        .into_iter()
        .enumerate()
        .filter_map(|(i, v)| match serde_json::from_value::<RawBusiness>(v) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(index = i, error = %e, "skipping undecodable business record");
                None
            }
        })
        .collect()
}

impl TryFrom<RawBusiness> for ValidBusiness {
    type Error = SchemaError;

    fn try_from(raw: RawBusiness) -> Result<Self, Self::Error> {
        let id = raw.id.and_then(RawId::into_id).ok_or(SchemaError::MissingId)?;
        let name = non_empty(raw.name).ok_or_else(|| SchemaError::MissingName { id: id.clone() })?;

        // Products that fail validation drop out individually.
        let products = raw
            .products
            .into_iter()
            .filter_map(|p| match ValidProduct::validate(p, &id) {
                Ok(p) => Some(p),
                Err(e) => {
                    tracing::warn!(business = %id, error = %e, "skipping invalid product");
                    None
                }
            })
            .collect();

        Ok(Self {
            id,
            name,
            kind: raw.kind.unwrap_or_default(),
            description: raw.description.unwrap_or_default(),
            images: raw.images,
            location_url: non_empty(raw.location_url),
            address: raw.address.unwrap_or_default(),
            status: raw.status,
            open_time: non_empty(raw.open_time),
            close_time: non_empty(raw.close_time),
            phone_number: non_empty(raw.phone_number),
            document: non_empty(raw.document),
            products,
        })
    }
}

impl ValidProduct {
    fn validate(raw: RawProduct, owner: &str) -> Result<Self, SchemaError> {
        let id = raw.id.and_then(RawId::into_id).ok_or(SchemaError::MissingId)?;
        let name = non_empty(raw.name).ok_or_else(|| SchemaError::MissingName { id: id.clone() })?;
        let price = match raw.price {
            None => 0.0,
            Some(RawPrice::Number(n)) => n,
            Some(RawPrice::Text(s)) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| SchemaError::InvalidPrice { id: id.clone(), raw: s.clone() })?,
            Some(RawPrice::Other(v)) => return Err(SchemaError::InvalidPrice { id, raw: v.to_string() }),
        };

        Ok(Self {
            id,
            business_id: raw
                .umkm_id
                .and_then(RawId::into_id)
                .unwrap_or_else(|| owner.to_string()),
            name,
            description: raw.description.unwrap_or_default(),
            price,
            image: non_empty(raw.image),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
