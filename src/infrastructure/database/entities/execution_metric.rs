// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "execution_metrics")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub queue: String,
    pub job_class: String,
    pub status: String,
    pub queue_wait_ms: Option<i64>,
    pub processing_duration_ms: Option<i64>,
    pub total_time_ms: Option<i64>,
    pub retry_count: i32,
    pub account_id: Option<Uuid>,
    pub entity_id: Option<Uuid>,
    pub recorded_at: ChronoDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
