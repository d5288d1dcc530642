use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A produce listing. `(farmer_id, name)` is unique: a farmer cannot list
/// two products under the same name.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    #[serde(skip_deserializing)]
    pub id: i32,
    pub farmer_id: i32,
    pub name: String,
    /// Path relative to the serving root, e.g. `static/images/tomato.jpg`.
    pub image: String,
    pub cost: Decimal,
    pub quantity: i32,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::farmer::Entity",
        from = "Column::FarmerId",
        to = "super::farmer::Column::Id"
    )]
    Farmer,
    #[sea_orm(has_many = "super::order::Entity")]
    Order,
}

impl Related<super::farmer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Farmer.def()
    }
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
