use serde::{Deserialize, Serialize};

/// Display-ready business. Every image URL here has been through the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub address: String,
    pub phone: Option<String>,
    pub location_url: Option<String>,
    pub opening_time: String,
    pub closing_time: String,
    pub status: Option<String>,
    pub cover_image: String,
    pub images: Vec<String>,
    pub document: Option<String>,
    pub products: Vec<ProductRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: String,
    pub business_id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub image: String,
}

impl BusinessRecord {
    pub fn hours(&self) -> String {
        format!("{} - {}", self.opening_time, self.closing_time)
    }
}
