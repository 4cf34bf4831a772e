//! Manifest row schema.

use serde::{Deserialize, Serialize};

/// Manifest column order. Must stay in sync with [`AttachmentRecord`] and
/// with the SOQL field list the extractor selects: bulk result pages are
/// appended to the manifest verbatim, under this header.
pub const MANIFEST_FIELDS: [&str; 14] = [
    "Id",
    "ParentId",
    "Name",
    "IsPrivate",
    "ContentType",
    "BodyLength",
    "OwnerId",
    "CreatedDate",
    "CreatedById",
    "LastModifiedDate",
    "LastModifiedById",
    "SystemModstamp",
    "Description",
    "IsPartnerShared",
];

/// Columns of the completed-downloads results file.
pub const RESULTS_FIELDS: [&str; 3] = ["Id", "ParentId", "SavedPath"];

/// The SELECT list for the attachment extraction query.
pub fn soql_field_list() -> String {
    MANIFEST_FIELDS.join(", ")
}

/// One manifest row. Timestamps are carried as the opaque strings the
/// source emitted; the pipeline orders by file position, never by parsing
/// them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentRecord {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "ParentId")]
    pub parent_id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "IsPrivate")]
    pub is_private: bool,
    #[serde(rename = "ContentType")]
    pub content_type: String,
    #[serde(rename = "BodyLength")]
    pub body_length: u64,
    #[serde(rename = "OwnerId")]
    pub owner_id: String,
    #[serde(rename = "CreatedDate")]
    pub created_date: String,
    #[serde(rename = "CreatedById")]
    pub created_by_id: String,
    #[serde(rename = "LastModifiedDate")]
    pub last_modified_date: String,
    #[serde(rename = "LastModifiedById")]
    pub last_modified_by_id: String,
    #[serde(rename = "SystemModstamp")]
    pub system_modstamp: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "IsPartnerShared")]
    pub is_partner_shared: bool,
}
