use sea_orm::DbErr;
use thiserror::Error;

/// Domain errors surfaced to the request boundary. None of these are fatal;
/// the api layer converts each into a flash notice plus a redirect.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("email already registered")]
    DuplicateEmail,

    #[error("a listing with this name already exists")]
    DuplicateListing,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("not permitted")]
    Forbidden,

    #[error("{0}")]
    Validation(&'static str),

    #[error("listing has existing orders")]
    HasOrders,

    #[error(transparent)]
    Db(#[from] DbErr),

    #[error("password hashing failed")]
    Hash(#[from] bcrypt::BcryptError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
