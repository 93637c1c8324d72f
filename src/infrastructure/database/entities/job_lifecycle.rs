// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "job_lifecycles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub job_id: Uuid,
    pub provider_job_id: Option<String>,
    pub job_class: String,
    pub queue: String,
    pub status: String,
    pub last_transition_at: ChronoDateTimeWithTimeZone,
    pub queued_at: Option<ChronoDateTimeWithTimeZone>,
    pub started_at: Option<ChronoDateTimeWithTimeZone>,
    pub completed_at: Option<ChronoDateTimeWithTimeZone>,
    pub failed_at: Option<ChronoDateTimeWithTimeZone>,
    pub discarded_at: Option<ChronoDateTimeWithTimeZone>,
    pub removed_at: Option<ChronoDateTimeWithTimeZone>,
    pub error_class: Option<String>,
    pub error_message: Option<String>,
    pub account_id: Option<Uuid>,
    pub entity_id: Option<Uuid>,
    pub related_type: Option<String>,
    pub related_id: Option<Uuid>,
    pub metadata: Json,
    pub created_at: ChronoDateTimeWithTimeZone,
    pub updated_at: ChronoDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
