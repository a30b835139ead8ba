use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One telemetry sample. `uid` is not a foreign key: devices may report for
/// uids that were never registered, and node deletion prunes dependents
/// itself.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "readings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub uid: String,
    pub owner: Option<String>,
    pub datetime: DateTimeWithTimeZone,
    pub pressure: Option<f64>,
    pub humidity: Option<f64>,
    pub co2: Option<f64>,
    pub temperature: Option<f64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::nodes::Entity",
        from = "Column::Uid",
        to = "super::nodes::Column::Uid"
    )]
    Node,
}

impl Related<super::nodes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Node.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
