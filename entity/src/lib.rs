pub mod customer;
pub mod farmer;
pub mod order;
pub mod product;
