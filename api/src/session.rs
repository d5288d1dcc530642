use serde::{Deserialize, Serialize};
use tower_cookies::{Cookie, Cookies, Key};

const SESSION_COOKIE_NAME: &str = "session";

/// Per-client authenticated identities, carried in a private (encrypted)
/// cookie. The two fields are independent; holding both at once is allowed.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Session {
    pub farmer_id: Option<i32>,
    pub customer_id: Option<i32>,
}

impl Session {
    pub fn load(cookies: &Cookies, key: &Key) -> Self {
        cookies
            .private(key)
            .get(SESSION_COOKIE_NAME)
            .and_then(|cookie| serde_json::from_str(cookie.value()).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, cookies: &Cookies, key: &Key) {
        if let Ok(value) = serde_json::to_string(self) {
            let mut cookie = Cookie::new(SESSION_COOKIE_NAME, value);
            cookie.set_path("/");
            cookie.set_http_only(true);
            cookies.private(key).add(cookie);
        }
    }

    pub fn clear(cookies: &Cookies) {
        let mut cookie = Cookie::new(SESSION_COOKIE_NAME, "");
        cookie.set_path("/");
        cookies.remove(cookie);
    }
}
