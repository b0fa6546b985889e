use super::model::{BusinessRecord, ProductRecord};
use super::normalize::{PLACEHOLDER_IMAGE, Normalizer, format_time};
use crate::api::client::{ApiClient, ApiError};
use crate::api::models::{Category, RawBusiness, ValidBusiness};
use indexmap::{IndexMap, IndexSet};
use tracing::{error, info, warn};

/// Result of loading a single business for the detail view.
#[derive(Debug, Clone, PartialEq)]
pub enum DetailOutcome {
    Loaded(Box<BusinessRecord>),
    /// Not publishable; the caller sends the user back home.
    Inactive,
    InvalidId,
    Failed(String),
}

/// Keeps publishable records in upstream order and normalizes them.
pub fn assemble(raw: Vec<RawBusiness>, normalizer: &Normalizer) -> Vec<BusinessRecord> {
    let total = raw.len();
    let mut records: IndexMap<String, BusinessRecord> = IndexMap::with_capacity(total);

    for business in raw.into_iter().filter(RawBusiness::is_active) {
        let valid = match ValidBusiness::try_from(business) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "skipping invalid business record");
                continue;
            }
        };
        if records.contains_key(&valid.id) {
            warn!(id = %valid.id, "duplicate business id in listing, keeping the first");
            continue;
        }
        let record = to_record(valid, normalizer);
        records.insert(record.id.clone(), record);
    }

    info!(total, published = records.len(), "listing assembled");
    records.into_values().collect()
}

pub fn to_record(valid: ValidBusiness, normalizer: &Normalizer) -> BusinessRecord {
    let images = normalizer.image_list(valid.images.as_ref());
    let cover_image = images
        .first()
        .cloned()
        .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string());

    let products = valid
        .products
        .into_iter()
        .map(|p| ProductRecord {
            image: normalizer.image_url(p.image.as_deref().unwrap_or_default()),
            id: p.id,
            business_id: p.business_id,
            name: p.name,
            description: p.description,
            price: p.price,
        })
        .collect();

    BusinessRecord {
        id: valid.id,
        name: valid.name,
        kind: valid.kind,
        description: valid.description,
        address: valid.address,
        phone: valid.phone_number,
        location_url: valid.location_url,
        opening_time: format_time(valid.open_time.as_deref()),
        closing_time: format_time(valid.close_time.as_deref()),
        status: valid.status,
        cover_image,
        images,
        document: valid.document,
        products,
    }
}

/// Fetches and assembles the listing. Failures are logged and yield an empty list.
pub async fn load_listing(client: &ApiClient, normalizer: &Normalizer) -> Vec<BusinessRecord> {
    match client.fetch_businesses().await {
        Ok(raw) => assemble(raw, normalizer),
        Err(e) => {
            error!(error = %e, "failed to fetch businesses");
            Vec::new()
        }
    }
}

pub async fn load_detail(client: &ApiClient, normalizer: &Normalizer, id: &str) -> DetailOutcome {
    let id = id.trim();
    if !is_valid_id(id) {
        return DetailOutcome::InvalidId;
    }

    match client.fetch_business(id).await {
        Ok(raw) => detail_from_raw(raw, normalizer),
        Err(e) => {
            error!(id, error = %e, "failed to fetch business detail");
            DetailOutcome::Failed(e.to_string())
        }
    }
}

pub fn detail_from_raw(raw: RawBusiness, normalizer: &Normalizer) -> DetailOutcome {
    if !raw.is_active() {
        info!(status = ?raw.status, "business is not active, redirecting home");
        return DetailOutcome::Inactive;
    }
    match ValidBusiness::try_from(raw) {
        Ok(valid) => DetailOutcome::Loaded(Box::new(to_record(valid, normalizer))),
        Err(e) => {
            warn!(error = %e, "invalid business detail payload");
            DetailOutcome::Failed(ApiError::from(e).to_string())
        }
    }
}

/// Identifiers are path segments; anything that would change the request path is refused.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Category names from the API, or the distinct listing types when that fetch failed.
pub fn category_choices(
    fetched: Result<Vec<Category>, ApiError>,
    listing: &[BusinessRecord],
) -> Vec<String> {
    let names: Vec<String> = match fetched {
        Ok(categories) => categories.into_iter().map(|c| c.name).collect(),
        Err(e) => {
            warn!(error = %e, "failed to fetch categories, deriving from listing");
            listing.iter().map(|b| b.kind.clone()).collect()
        }
    };

    let unique: IndexSet<String> = names
        .into_iter()
        .filter(|name| !name.trim().is_empty())
        .collect();
    unique.into_iter().collect()
}

pub async fn load_categories(client: &ApiClient, listing: &[BusinessRecord]) -> Vec<String> {
    category_choices(client.fetch_categories().await, listing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::decode_records;
    use crate::listing::normalize::UNKNOWN_TIME;
    use serde_json::json;

    const BASE: &str = "https://api.example.com";

    fn raw_list(value: serde_json::Value) -> Vec<RawBusiness> {
        serde_json::from_value(value).unwrap()
    }

    fn business(id: u32, name: &str, status: &str) -> serde_json::Value {
        json!({"id": id, "name": name, "type": "Food", "status": status})
    }

    #[test]
    fn only_active_records_survive_in_upstream_order() {
        let raw = raw_list(json!([
            business(3, "Warung C", "Active"),
            business(1, "Warung A", "Inactive"),
            {"id": 2, "name": "Warung B"},
            business(4, "Warung D", "Active"),
            business(5, "Warung E", "active"),
        ]));

        let listing = assemble(raw, &Normalizer::new(BASE));
        let ids: Vec<&str> = listing.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, ["3", "4"]);
        assert!(listing.iter().all(|b| b.status.as_deref() == Some("Active")));
    }

    #[test]
    fn cover_image_and_hours_are_normalized() {
        let raw = raw_list(json!([{
            "id": 1,
            "name": "Batik Sari",
            "type": "Textiles",
            "status": "Active",
            "images": "[\"storage/storage/umkm_images/a.png\"]",
            "open_time": "09:00:00",
            "close_time": "18:00:00",
            "phone_number": "0812",
        }]));

        let listing = assemble(raw, &Normalizer::new(BASE));
        let record = &listing[0];
        assert_eq!(record.cover_image, "https://api.example.com/storage/umkm_images/a.png");
        assert_eq!(record.opening_time, "09:00");
        assert_eq!(record.closing_time, "18:00");
        assert_eq!(record.hours(), "09:00 - 18:00");
        assert_eq!(record.phone.as_deref(), Some("0812"));
    }

    #[test]
    fn malformed_images_fall_back_per_record() {
        let raw = raw_list(json!([
            {"id": 1, "name": "Broken", "status": "Active", "images": "[oops"},
            {"id": 2, "name": "Fine", "status": "Active", "images": "[\"umkm_images/x.png\"]"},
            {"id": 3, "name": "None", "status": "Active"},
        ]));

        let listing = assemble(raw, &Normalizer::new(BASE));
        assert_eq!(listing.len(), 3);
        assert_eq!(listing[0].cover_image, PLACEHOLDER_IMAGE);
        assert!(listing[0].images.is_empty());
        assert_eq!(listing[1].cover_image, "https://api.example.com/storage/umkm_images/x.png");
        assert_eq!(listing[2].cover_image, PLACEHOLDER_IMAGE);
        assert_eq!(listing[2].opening_time, UNKNOWN_TIME);
    }

    #[test]
    fn oddly_typed_fields_keep_the_record_listed() {
        let values = vec![
            json!({"id": 1, "name": "Mixed images", "status": "Active", "images": ["umkm_images/a.png", null]}),
            json!({"id": 2, "name": "Numeric images", "status": "Active", "images": 7}),
            json!({"id": 3, "name": "Numeric phone", "status": "Active", "phone_number": 812345}),
        ];

        let listing = assemble(decode_records(values), &Normalizer::new(BASE));
        let ids: Vec<&str> = listing.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3"]);
        assert_eq!(listing[0].cover_image, "https://api.example.com/storage/umkm_images/a.png");
        assert_eq!(listing[0].images.len(), 1);
        assert_eq!(listing[1].cover_image, PLACEHOLDER_IMAGE);
        assert_eq!(listing[2].cover_image, PLACEHOLDER_IMAGE);
        assert_eq!(listing[2].phone.as_deref(), Some("812345"));
    }

    #[test]
    fn invalid_and_duplicate_records_are_skipped() {
        let raw = raw_list(json!([
            {"name": "No id", "status": "Active"},
            business(1, "First", "Active"),
            business(1, "Second", "Active"),
        ]));

        let listing = assemble(raw, &Normalizer::new(BASE));
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].name, "First");
    }

    #[test]
    fn detail_normalizes_products_and_redirects_inactive() {
        let n = Normalizer::new(BASE);
        let raw: RawBusiness = serde_json::from_value(json!({
            "id": 9,
            "name": "Kopi Kita",
            "status": "Active",
            "products": [
                {"id": 1, "umkm_id": 9, "name": "Latte", "price": "18000.00",
                 "image": "storage/storage/product_images/latte.png"},
                {"id": 2, "umkm_id": 9, "name": "Tubruk", "price": 12000, "image": null}
            ]
        }))
        .unwrap();

        let DetailOutcome::Loaded(record) = detail_from_raw(raw, &n) else {
            panic!("expected a loaded record");
        };
        assert_eq!(
            record.products[0].image,
            "https://api.example.com/storage/product_images/latte.png"
        );
        assert_eq!(record.products[1].image, PLACEHOLDER_IMAGE);

        let inactive: RawBusiness =
            serde_json::from_value(business(9, "Kopi Kita", "Suspended")).unwrap();
        assert_eq!(detail_from_raw(inactive, &n), DetailOutcome::Inactive);
    }

    #[test]
    fn identifiers_that_would_alter_the_path_are_invalid() {
        assert!(is_valid_id("42"));
        assert!(is_valid_id("umkm-42_a"));
        assert!(!is_valid_id(""));
        assert!(!is_valid_id("../admin"));
        assert!(!is_valid_id("4?x=1"));
    }

    #[test]
    fn categories_fall_back_to_listing_types() {
        let listing = assemble(
            raw_list(json!([
                {"id": 1, "name": "A", "type": "Food", "status": "Active"},
                {"id": 2, "name": "B", "type": "Textiles", "status": "Active"},
                {"id": 3, "name": "C", "type": "Food", "status": "Active"},
                {"id": 4, "name": "D", "status": "Active"},
            ])),
            &Normalizer::new(BASE),
        );

        let fallback = category_choices(Err(ApiError::Status(500)), &listing);
        assert_eq!(fallback, ["Food", "Textiles"]);

        let fetched = vec![
            serde_json::from_value::<Category>(json!({"id": 1, "name": "Jewelry"})).unwrap(),
        ];
        assert_eq!(category_choices(Ok(fetched), &listing), ["Jewelry"]);
    }
}
