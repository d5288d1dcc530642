use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tower_cookies::{Cookie, Cookies};

const FLASH_COOKIE_NAME: &str = "_flash";

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct FlashData {
    pub kind: String,
    pub message: String,
}

impl FlashData {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: "success".to_owned(),
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: "error".to_owned(),
            message: message.into(),
        }
    }
}

#[derive(Deserialize)]
struct ValuedMessage<T> {
    #[serde(rename = "_")]
    value: T,
}

#[derive(Serialize)]
struct ValuedMessageRef<'a, T> {
    #[serde(rename = "_")]
    value: &'a T,
}

/// Reads and consumes the flash cookie; the notice is shown once.
pub fn get_flash_cookie<T>(cookies: &Cookies) -> Option<T>
where
    T: DeserializeOwned,
{
    cookies.get(FLASH_COOKIE_NAME).and_then(|flash_cookie| {
        let ValuedMessage::<T> { value } = serde_json::from_str(flash_cookie.value()).ok()?;
        let mut removal = Cookie::new(FLASH_COOKIE_NAME, "");
        removal.set_path("/");
        cookies.remove(removal);
        Some(value)
    })
}

pub type FlashResponse = (StatusCode, HeaderMap);

/// Sets a flash cookie and answers with a see-other redirect to `location`.
pub fn flash_redirect<T>(cookies: &Cookies, data: T, location: &str) -> FlashResponse
where
    T: Serialize,
{
    let valued_message_ref = ValuedMessageRef { value: &data };

    if let Ok(json) = serde_json::to_string(&valued_message_ref) {
        let mut cookie = Cookie::new(FLASH_COOKIE_NAME, json);
        cookie.set_path("/");
        cookies.add(cookie);
    }

    let mut header = HeaderMap::new();
    let location =
        HeaderValue::from_str(location).unwrap_or_else(|_| HeaderValue::from_static("/"));
    header.insert(header::LOCATION, location);

    (StatusCode::SEE_OTHER, header)
}
