use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

/// Return the session id carried by `jar`, issuing a new session cookie when
/// there is none. The returned jar must be part of the response.
pub fn ensure_session(jar: CookieJar, cookie_name: &str) -> (CookieJar, String) {
    if let Some(id) = jar
        .get(cookie_name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
    {
        return (jar, id);
    }

    let id = uuid::Uuid::new_v4().simple().to_string();
    let cookie = Cookie::build((cookie_name.to_string(), id.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    (jar.add(cookie), id)
}
