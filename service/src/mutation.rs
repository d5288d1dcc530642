use ::entity::{customer, farmer, order, product};
use sea_orm::prelude::Decimal;
use sea_orm::*;

use crate::{ServiceError, ServiceResult};

pub struct Mutation;

/// Farmer signup form, already parsed and typed by the caller.
#[derive(Debug, Clone)]
pub struct NewFarmer {
    pub name: String,
    pub mobile_no: String,
    pub district: String,
    pub village: String,
    pub city: String,
    pub state: String,
    pub acres_owned: Decimal,
    pub annual_income: Decimal,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub name: String,
    pub email: String,
    pub phone_no: String,
    pub address: String,
    pub password: String,
}

/// Field updates for an existing listing. `image` is `None` when no new
/// valid upload was supplied, in which case the stored path is retained.
#[derive(Debug, Clone)]
pub struct ProductChanges {
    pub name: String,
    pub cost: Decimal,
    pub quantity: i32,
    pub image: Option<String>,
}

fn on_unique_violation(err: DbErr, mapped: ServiceError) -> ServiceError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => mapped,
        _ => ServiceError::Db(err),
    }
}

impl Mutation {
    /// Creates a farmer account. Email uniqueness is enforced by the unique
    /// column constraint, so concurrent signups cannot both succeed.
    pub async fn register_farmer(db: &DbConn, form: NewFarmer) -> ServiceResult<farmer::Model> {
        let password_hash = bcrypt::hash(&form.password, bcrypt::DEFAULT_COST)?;

        farmer::ActiveModel {
            id: NotSet,
            name: Set(form.name),
            mobile_no: Set(form.mobile_no),
            district: Set(form.district),
            village: Set(form.village),
            city: Set(form.city),
            state: Set(form.state),
            acres_owned: Set(form.acres_owned),
            annual_income: Set(form.annual_income),
            email: Set(form.email),
            password_hash: Set(password_hash),
        }
        .insert(db)
        .await
        .map_err(|e| on_unique_violation(e, ServiceError::DuplicateEmail))
    }

    /// Creates a customer account. All five fields must be non-blank; the
    /// password is stored as a bcrypt hash.
    pub async fn register_customer(
        db: &DbConn,
        form: NewCustomer,
    ) -> ServiceResult<customer::Model> {
        let blank = [
            &form.name,
            &form.email,
            &form.phone_no,
            &form.address,
            &form.password,
        ]
        .iter()
        .any(|f| f.trim().is_empty());
        if blank {
            return Err(ServiceError::Validation("all fields are required"));
        }

        let password_hash = bcrypt::hash(&form.password, bcrypt::DEFAULT_COST)?;

        customer::ActiveModel {
            id: NotSet,
            name: Set(form.name),
            email: Set(form.email),
            phone_no: Set(form.phone_no),
            address: Set(form.address),
            password_hash: Set(password_hash),
        }
        .insert(db)
        .await
        .map_err(|e| on_unique_violation(e, ServiceError::DuplicateEmail))
    }

    pub async fn create_product(
        db: &DbConn,
        farmer_id: i32,
        name: String,
        cost: Decimal,
        quantity: i32,
        image: String,
    ) -> ServiceResult<product::Model> {
        product::ActiveModel {
            farmer_id: Set(farmer_id),
            name: Set(name),
            image: Set(image),
            cost: Set(cost),
            quantity: Set(quantity),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(|e| on_unique_violation(e, ServiceError::DuplicateListing))
    }

    /// Updates a listing after resolving it and checking ownership. A missing
    /// product and a product owned by someone else are distinct errors even
    /// though the page shows the same notice for both.
    pub async fn update_product(
        db: &DbConn,
        farmer_id: i32,
        product_id: i32,
        changes: ProductChanges,
    ) -> ServiceResult<product::Model> {
        let product = Self::owned_product(db, farmer_id, product_id).await?;

        let mut active: product::ActiveModel = product.into();
        active.name = Set(changes.name);
        active.cost = Set(changes.cost);
        active.quantity = Set(changes.quantity);
        if let Some(image) = changes.image {
            active.image = Set(image);
        }

        active
            .update(db)
            .await
            .map_err(|e| on_unique_violation(e, ServiceError::DuplicateListing))
    }

    /// Hard-deletes a listing. The restrict foreign key on orders blocks
    /// deletion of a product that has been ordered.
    pub async fn delete_product(
        db: &DbConn,
        farmer_id: i32,
        product_id: i32,
    ) -> ServiceResult<()> {
        let product = Self::owned_product(db, farmer_id, product_id).await?;

        let active: product::ActiveModel = product.into();
        active.delete(db).await.map_err(|e| match e.sql_err() {
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => ServiceError::HasOrders,
            _ => ServiceError::Db(e),
        })?;
        Ok(())
    }

    /// Insert contract for external collaborators; there is no customer-facing
    /// route that reaches this.
    pub async fn create_order(
        db: &DbConn,
        product_id: i32,
        customer_id: i32,
        ordered_quantity: i32,
    ) -> ServiceResult<order::Model> {
        order::ActiveModel {
            product_id: Set(product_id),
            customer_id: Set(customer_id),
            ordered_quantity: Set(ordered_quantity),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
                ServiceError::NotFound("product or customer")
            }
            _ => ServiceError::Db(e),
        })
    }

    async fn owned_product(
        db: &DbConn,
        farmer_id: i32,
        product_id: i32,
    ) -> ServiceResult<product::Model> {
        let product = product::Entity::find_by_id(product_id)
            .one(db)
            .await?
            .ok_or(ServiceError::NotFound("product"))?;
        if product.farmer_id != farmer_id {
            return Err(ServiceError::Forbidden);
        }
        Ok(product)
    }
}
