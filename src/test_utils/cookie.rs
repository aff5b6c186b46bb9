use axum::{
    http::{HeaderValue, header::SET_COOKIE},
    response::IntoResponse,
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};

use crate::session::{Session, set_session_cookie};

/// Build a `Cookie` request header carrying `session`, encrypted with `key`.
#[track_caller]
pub(crate) fn session_cookie_header(key: &Key, session: &Session) -> HeaderValue {
    let jar = set_session_cookie(PrivateCookieJar::new(key.clone()), session)
        .expect("Could not set session cookie");
    let response = jar.into_response();
    let set_cookie = response
        .headers()
        .get(SET_COOKIE)
        .expect("Headers missing set-cookie")
        .to_str()
        .expect("Could not convert to str");

    // Keep only "name=value", dropping attributes such as "HttpOnly".
    let name_value = set_cookie
        .split(';')
        .next()
        .expect("set-cookie header is empty");

    HeaderValue::from_str(name_value).expect("Invalid cookie header value")
}
