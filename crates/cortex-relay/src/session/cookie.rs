use std::time::Duration;

/// Attributes of the session cookie that carries a `TokenCodec` token.
#[derive(Debug, Clone)]
pub struct SessionCookie {
    name: String,
    max_age: Duration,
}

impl SessionCookie {
    pub fn new(name: impl Into<String>, max_age: Duration) -> Self {
        Self {
            name: name.into(),
            max_age,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// `Set-Cookie` value installing `token`, living exactly as long as the
    /// token's verification window.
    pub fn issue(&self, token: &str) -> String {
        format!(
            "{}={}; Max-Age={}; Path=/; HttpOnly; SameSite=Lax",
            self.name,
            token,
            self.max_age.as_secs()
        )
    }

    /// `Set-Cookie` value that makes the client drop the session.
    pub fn clear(&self) -> String {
        format!("{}=; Max-Age=0; Path=/; HttpOnly; SameSite=Lax", self.name)
    }
}

/// Find the value of cookie `name` in a `Cookie` request header.
///
/// Empty values are treated as absent.
pub fn extract<'a>(cookie_header: &'a str, name: &str) -> Option<&'a str> {
    cookie_header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().trim_matches('"'))
        .filter(|value| !value.is_empty())
}
