// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "issues")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub fingerprint: String,
    pub issue_type: String,
    pub source: String,
    pub severity: String,
    pub status: String,
    pub title: String,
    pub details: Option<String>,
    pub occurrences: i64,
    pub first_seen_at: ChronoDateTimeWithTimeZone,
    pub last_seen_at: ChronoDateTimeWithTimeZone,
    pub resolved_at: Option<ChronoDateTimeWithTimeZone>,
    pub resolution_notes: Option<String>,
    pub account_id: Option<Uuid>,
    pub entity_id: Option<Uuid>,
    pub metadata: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
