use agrimarket_service::{Mutation, NewFarmer, ProductChanges, Query, ServiceError};
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

#[tokio::test]
async fn signup_login_add_list_flow() {
    let db = setup().await;

    let farmer_id = register_farmer(&db, "f@x.com").await;
    let authed = Query::authenticate_farmer(&db, "f@x.com", "pw1")
        .await
        .unwrap();
    assert_eq!(authed.id, farmer_id);

    Mutation::create_product(
        &db,
        farmer_id,
        "Tomato".to_owned(),
        Decimal::new(1050, 2),
        20,
        "static/images/tomato.jpg".to_owned(),
    )
    .await
    .unwrap();

    let products = Query::products_of_farmer(&db, farmer_id).await.unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].name, "Tomato");
    assert_eq!(products[0].cost, Decimal::new(1050, 2));
    assert_eq!(products[0].quantity, 20);
    assert_eq!(products[0].image, "static/images/tomato.jpg");
}

#[tokio::test]
async fn listing_names_are_unique_per_farmer() {
    let db = setup().await;

    let a = register_farmer(&db, "a@x.com").await;
    let b = register_farmer(&db, "b@x.com").await;

    Mutation::create_product(
        &db,
        a,
        "Tomato".to_owned(),
        Decimal::new(1000, 2),
        5,
        "static/images/t.png".to_owned(),
    )
    .await
    .unwrap();

    // Same farmer, same name: rejected.
    let err = Mutation::create_product(
        &db,
        a,
        "Tomato".to_owned(),
        Decimal::new(1200, 2),
        8,
        "static/images/t2.png".to_owned(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::DuplicateListing));

    // Different farmer, same name: fine.
    Mutation::create_product(
        &db,
        b,
        "Tomato".to_owned(),
        Decimal::new(900, 2),
        3,
        "static/images/t3.png".to_owned(),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn only_the_owner_may_edit_or_delete() {
    let db = setup().await;

    let a = register_farmer(&db, "a@x.com").await;
    let b = register_farmer(&db, "b@x.com").await;

    let product = Mutation::create_product(
        &db,
        a,
        "Onion".to_owned(),
        Decimal::new(800, 2),
        40,
        "static/images/onion.png".to_owned(),
    )
    .await
    .unwrap();

    let changes = ProductChanges {
        name: "Red Onion".to_owned(),
        cost: Decimal::new(900, 2),
        quantity: 35,
        image: None,
    };

    let err = Mutation::update_product(&db, b, product.id, changes.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden));

    let err = Mutation::delete_product(&db, b, product.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden));

    // The listing is unchanged after the forbidden attempts.
    let unchanged = Query::find_product_by_id(&db, product.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(unchanged, product);

    // A product that does not exist is NotFound, not Forbidden.
    let err = Mutation::update_product(&db, a, 9999, changes)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    // The owner can do both.
    Mutation::update_product(
        &db,
        a,
        product.id,
        ProductChanges {
            name: "Red Onion".to_owned(),
            cost: Decimal::new(900, 2),
            quantity: 35,
            image: None,
        },
    )
    .await
    .unwrap();
    Mutation::delete_product(&db, a, product.id).await.unwrap();
    assert!(Query::find_product_by_id(&db, product.id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn update_without_new_image_keeps_the_old_path() {
    let db = setup().await;
    let farmer_id = register_farmer(&db, "f@x.com").await;

    let product = Mutation::create_product(
        &db,
        farmer_id,
        "Carrot".to_owned(),
        Decimal::new(600, 2),
        15,
        "static/images/carrot.jpg".to_owned(),
    )
    .await
    .unwrap();

    let updated = Mutation::update_product(
        &db,
        farmer_id,
        product.id,
        ProductChanges {
            name: "Carrot".to_owned(),
            cost: Decimal::new(650, 2),
            quantity: 10,
            image: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(updated.image, "static/images/carrot.jpg");

    let updated = Mutation::update_product(
        &db,
        farmer_id,
        product.id,
        ProductChanges {
            name: "Carrot".to_owned(),
            cost: Decimal::new(650, 2),
            quantity: 10,
            image: Some("static/images/carrot2.jpg".to_owned()),
        },
    )
    .await
    .unwrap();
    assert_eq!(updated.image, "static/images/carrot2.jpg");
}

#[tokio::test]
async fn renaming_onto_an_existing_listing_is_rejected() {
    let db = setup().await;
    let farmer_id = register_farmer(&db, "f@x.com").await;

    Mutation::create_product(
        &db,
        farmer_id,
        "Tomato".to_owned(),
        Decimal::new(1000, 2),
        5,
        "static/images/t.png".to_owned(),
    )
    .await
    .unwrap();
    let second = Mutation::create_product(
        &db,
        farmer_id,
        "Potato".to_owned(),
        Decimal::new(700, 2),
        50,
        "static/images/p.png".to_owned(),
    )
    .await
    .unwrap();

    let err = Mutation::update_product(
        &db,
        farmer_id,
        second.id,
        ProductChanges {
            name: "Tomato".to_owned(),
            cost: Decimal::new(700, 2),
            quantity: 50,
            image: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::DuplicateListing));
}
