use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Branding settings of an organization. `logo_object_key` is only ever written by
/// the finalization path, after the object has been confirmed in storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SettingsRecord {
    pub owner_id: Uuid,
    pub public_name: String,
    pub website: Option<String>,
    pub description: Option<String>,
    pub brand_color: Option<String>,
    pub show_stats_in_job_descriptions: bool,
    pub logo_object_key: Option<String>,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

impl SettingsRecord {
    pub fn new(owner_id: Uuid, public_name: impl Into<String>) -> Self {
        Self {
            owner_id,
            public_name: public_name.into(),
            website: None,
            description: None,
            brand_color: None,
            show_stats_in_job_descriptions: false,
            logo_object_key: None,
            version: 0,
            updated_at: Utc::now(),
        }
    }
}

/// Field changes applied in one atomic save.
///
/// `logo_object_key` is `Some` only when a finalized upload is part of the save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsChanges {
    pub public_name: Option<String>,
    pub website: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub brand_color: Option<Option<String>>,
    pub show_stats_in_job_descriptions: Option<bool>,
    pub logo_object_key: Option<String>,
}

impl SettingsChanges {
    pub fn logo_only(object_key: impl Into<String>) -> Self {
        Self {
            logo_object_key: Some(object_key.into()),
            ..Default::default()
        }
    }

    /// Produce the record that results from applying these changes.
    ///
    /// `version` and `updated_at` are left to the repository.
    pub fn apply_to(&self, record: &SettingsRecord) -> SettingsRecord {
        let mut next = record.clone();
        if let Some(ref name) = self.public_name {
            next.public_name = name.clone();
        }
        if let Some(ref website) = self.website {
            next.website = website.clone();
        }
        if let Some(ref description) = self.description {
            next.description = description.clone();
        }
        if let Some(ref color) = self.brand_color {
            next.brand_color = color.clone();
        }
        if let Some(flag) = self.show_stats_in_job_descriptions {
            next.show_stats_in_job_descriptions = flag;
        }
        if let Some(ref key) = self.logo_object_key {
            next.logo_object_key = Some(key.clone());
        }
        next
    }

    /// True when applying the changes would leave the record as it is.
    pub fn is_noop_for(&self, record: &SettingsRecord) -> bool {
        let next = self.apply_to(record);
        next.public_name == record.public_name
            && next.website == record.website
            && next.description == record.description
            && next.brand_color == record.brand_color
            && next.show_stats_in_job_descriptions == record.show_stats_in_job_descriptions
            && next.logo_object_key == record.logo_object_key
    }
}

fn validate_brand_color(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Ok(());
    }
    let hex = value.strip_prefix('#').unwrap_or("");
    if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(ValidationError::new("brand_color"))
    }
}

fn validate_website(value: &str) -> Result<(), ValidationError> {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"))
        .ok_or_else(|| ValidationError::new("website"))?;
    let host = rest.split(['/', '?', '#']).next().unwrap_or("");
    if host.is_empty() || host.contains(char::is_whitespace) {
        return Err(ValidationError::new("website"));
    }
    Ok(())
}

/// Save of the customization form: the plain fields plus an optional finalized logo.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct SettingsUpdateRequest {
    /// May be empty; organizations without a public name show none
    #[validate(length(max = 255, message = "Public name must be at most 255 characters"))]
    pub public_name: String,
    #[validate(custom(function = "validate_website", message = "Website must be a URL"))]
    pub website: String,
    #[serde(default)]
    pub description: Option<String>,
    /// `#rrggbb`; an empty string clears the color
    #[serde(default)]
    #[validate(custom(function = "validate_brand_color", message = "Invalid brand color"))]
    pub brand_color: Option<String>,
    #[serde(default)]
    pub show_stats_in_job_descriptions: bool,
    /// Object key returned by a ticket whose transfer has completed
    #[serde(default)]
    pub logo_key: Option<String>,
}

impl SettingsUpdateRequest {
    /// Split into the logo key (if any) and the plain field changes.
    pub fn into_changes(self) -> SettingsChanges {
        let brand_color = self.brand_color.filter(|c| !c.is_empty());
        SettingsChanges {
            public_name: Some(self.public_name),
            website: Some(Some(self.website)),
            description: Some(self.description),
            brand_color: Some(brand_color),
            show_stats_in_job_descriptions: Some(self.show_stats_in_job_descriptions),
            logo_object_key: self.logo_key,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FinalizeLogoRequest {
    pub object_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct SettingsResponse {
    pub owner_id: Uuid,
    pub public_name: String,
    pub website: Option<String>,
    pub description: Option<String>,
    pub brand_color: Option<String>,
    pub show_stats_in_job_descriptions: bool,
    pub logo_object_key: Option<String>,
    /// Resolved URL of the current logo, if any
    pub logo_url: Option<String>,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

impl SettingsResponse {
    pub fn from_record(record: SettingsRecord, logo_url: Option<String>) -> Self {
        Self {
            owner_id: record.owner_id,
            public_name: record.public_name,
            website: record.website,
            description: record.description,
            brand_color: record.brand_color,
            show_stats_in_job_descriptions: record.show_stats_in_job_descriptions,
            logo_object_key: record.logo_object_key,
            logo_url,
            version: record.version,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FinalizeLogoResponse {
    pub settings: SettingsResponse,
    /// Previous logo key, now unreferenced and left for external cleanup
    pub superseded_object_key: Option<String>,
}
