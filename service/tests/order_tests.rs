use agrimarket_service::{Mutation, NewCustomer, NewFarmer, Query, ServiceError};
use migration::{Migrator, MigratorTrait};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;

async fn setup() -> DatabaseConnection {
    let db = sea_orm::Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
}

async fn register_farmer(db: &DatabaseConnection, email: &str) -> i32 {
    Mutation::register_farmer(
        db,
        NewFarmer {
            name: "Ravi".to_owned(),
            mobile_no: "9876543210".to_owned(),
            district: "Thanjavur".to_owned(),
            village: "Orathanadu".to_owned(),
            city: "Thanjavur".to_owned(),
            state: "Tamil Nadu".to_owned(),
            acres_owned: Decimal::new(550, 2),
            annual_income: Decimal::new(12000000, 2),
            email: email.to_owned(),
            password: "pw1".to_owned(),
        },
    )
    .await
    .unwrap()
    .id
}

async fn register_customer(db: &DatabaseConnection, email: &str) -> i32 {
    Mutation::register_customer(
        db,
        NewCustomer {
            name: "Anita".to_owned(),
            email: email.to_owned(),
            phone_no: "9123456780".to_owned(),
            address: "12 Market Road".to_owned(),
            password: "pw-customer".to_owned(),
        },
    )
    .await
    .unwrap()
    .id
}

async fn add_product(db: &DatabaseConnection, farmer_id: i32, name: &str) -> i32 {
    Mutation::create_product(
        db,
        farmer_id,
        name.to_owned(),
        Decimal::new(1050, 2),
        20,
        format!("static/images/{}.jpg", name.to_lowercase()),
    )
    .await
    .unwrap()
    .id
}

#[tokio::test]
async fn farmers_see_only_orders_for_their_own_products() {
    let db = setup().await;

    let a = register_farmer(&db, "a@x.com").await;
    let b = register_farmer(&db, "b@x.com").await;
    let customer_id = register_customer(&db, "c@x.com").await;

    let tomato = add_product(&db, a, "Tomato").await;
    let onion = add_product(&db, b, "Onion").await;

    Mutation::create_order(&db, tomato, customer_id, 3).await.unwrap();
    Mutation::create_order(&db, tomato, customer_id, 5).await.unwrap();
    Mutation::create_order(&db, onion, customer_id, 7).await.unwrap();

    let orders = Query::orders_for_farmer(&db, a).await.unwrap();
    assert_eq!(orders.len(), 2);
    assert!(orders.iter().all(|o| o.product_name == "Tomato"));
    assert_eq!(orders[0].ordered_quantity, 3);
    assert_eq!(orders[1].ordered_quantity, 5);
    assert_eq!(orders[0].customer_name, "Anita");
    assert_eq!(orders[0].cost, Decimal::new(1050, 2));

    let orders = Query::orders_for_farmer(&db, b).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].product_name, "Onion");
    assert_eq!(orders[0].ordered_quantity, 7);
}

#[tokio::test]
async fn ordering_a_missing_product_fails() {
    let db = setup().await;
    let customer_id = register_customer(&db, "c@x.com").await;

    let err = Mutation::create_order(&db, 424242, customer_id, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn products_with_orders_cannot_be_deleted() {
    let db = setup().await;

    let farmer_id = register_farmer(&db, "f@x.com").await;
    let customer_id = register_customer(&db, "c@x.com").await;
    let tomato = add_product(&db, farmer_id, "Tomato").await;

    Mutation::create_order(&db, tomato, customer_id, 2).await.unwrap();

    let err = Mutation::delete_product(&db, farmer_id, tomato)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::HasOrders));

    // The listing is still there.
    assert!(Query::find_product_by_id(&db, tomato)
        .await
        .unwrap()
        .is_some());
}
