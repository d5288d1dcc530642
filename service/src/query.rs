use ::entity::{customer, farmer, order, product};
use sea_orm::prelude::{DateTime, Decimal};
use sea_orm::*;
use serde::Serialize;

use crate::{ServiceError, ServiceResult};

pub struct Query;

/// One row of the farmer's incoming-orders page: an order joined with the
/// ordered product and the ordering customer.
#[derive(Debug, Clone, PartialEq, FromQueryResult, Serialize)]
pub struct FarmerOrder {
    pub id: i32,
    pub product_name: String,
    pub cost: Decimal,
    pub ordered_quantity: i32,
    pub ordered_date: DateTime,
    pub customer_name: String,
}

impl Query {
    pub async fn find_farmer_by_id(db: &DbConn, id: i32) -> ServiceResult<Option<farmer::Model>> {
        Ok(farmer::Entity::find_by_id(id).one(db).await?)
    }

    pub async fn find_customer_by_id(
        db: &DbConn,
        id: i32,
    ) -> ServiceResult<Option<customer::Model>> {
        Ok(customer::Entity::find_by_id(id).one(db).await?)
    }

    pub async fn find_product_by_id(
        db: &DbConn,
        id: i32,
    ) -> ServiceResult<Option<product::Model>> {
        Ok(product::Entity::find_by_id(id).one(db).await?)
    }

    /// Verifies farmer credentials against the stored bcrypt hash. A missing
    /// account and a wrong password are indistinguishable to the caller.
    pub async fn authenticate_farmer(
        db: &DbConn,
        email: &str,
        password: &str,
    ) -> ServiceResult<farmer::Model> {
        let farmer = farmer::Entity::find()
            .filter(farmer::Column::Email.eq(email))
            .one(db)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        if bcrypt::verify(password, &farmer.password_hash)? {
            Ok(farmer)
        } else {
            Err(ServiceError::InvalidCredentials)
        }
    }

    pub async fn authenticate_customer(
        db: &DbConn,
        email: &str,
        password: &str,
    ) -> ServiceResult<customer::Model> {
        let customer = customer::Entity::find()
            .filter(customer::Column::Email.eq(email))
            .one(db)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        if bcrypt::verify(password, &customer.password_hash)? {
            Ok(customer)
        } else {
            Err(ServiceError::InvalidCredentials)
        }
    }

    /// Listings owned by one farmer, for the farmer dashboard.
    pub async fn products_of_farmer(
        db: &DbConn,
        farmer_id: i32,
    ) -> ServiceResult<Vec<product::Model>> {
        Ok(product::Entity::find()
            .filter(product::Column::FarmerId.eq(farmer_id))
            .order_by_asc(product::Column::Id)
            .all(db)
            .await?)
    }

    /// Every listing, for the customer catalog.
    pub async fn all_products(db: &DbConn) -> ServiceResult<Vec<product::Model>> {
        Ok(product::Entity::find()
            .order_by_asc(product::Column::Id)
            .all(db)
            .await?)
    }

    /// Orders whose product is owned by `farmer_id`, joined through the
    /// product and customer tables. Flat read; no pagination.
    pub async fn orders_for_farmer(
        db: &DbConn,
        farmer_id: i32,
    ) -> ServiceResult<Vec<FarmerOrder>> {
        Ok(order::Entity::find()
            .join(JoinType::InnerJoin, order::Relation::Product.def())
            .join(JoinType::InnerJoin, order::Relation::Customer.def())
            .filter(product::Column::FarmerId.eq(farmer_id))
            .select_only()
            .column(order::Column::Id)
            .column_as(product::Column::Name, "product_name")
            .column(product::Column::Cost)
            .column(order::Column::OrderedQuantity)
            .column(order::Column::OrderedDate)
            .column_as(customer::Column::Name, "customer_name")
            .order_by_asc(order::Column::Id)
            .into_model::<FarmerOrder>()
            .all(db)
            .await?)
    }
}
