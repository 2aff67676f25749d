use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One audited HTTP call to the downstream customer API.
///
/// `(lead_id, attempt_no)` is unique (enforced by `database::ensure_indexes`)
/// and attempt numbers are 1-based and strictly increasing per lead.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "delivery_attempt")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(indexed)]
    pub lead_id: i64,

    pub attempt_no: i32,

    pub requested_at: DateTimeUtc,

    /// HTTP status of the downstream response, when one was received.
    pub response_status: Option<i32>,

    #[sea_orm(column_type = "Text", nullable)]
    pub response_body: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,

    pub success: bool,

    #[sea_orm(belongs_to, from = "lead_id", to = "id", on_delete = "Cascade")]
    pub lead: HasOne<super::lead::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
