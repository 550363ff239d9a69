//! Client key extraction from request metadata.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request};
use axum::http::header::USER_AGENT;
use brickgate_service::client_key;

/// Counter key for the current request, cached in request extensions.
#[derive(Debug, Clone)]
pub struct ClientKey(pub String);

/// Returns the client key, deriving it from headers if no earlier layer did.
pub fn client_key(req: &Request) -> String {
    if let Some(ClientKey(key)) = req.extensions().get::<ClientKey>() {
        return key.clone();
    }

    let headers = req.headers();
    let forwarded_for = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok());
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip());
    let user_agent = headers.get(USER_AGENT).and_then(|v| v.to_str().ok());

    let ip = client_key::client_ip(forwarded_for, peer);
    client_key::derive(&ip, user_agent)
}

/// Derives the client key once and stores it for later layers.
pub fn attach_client_key(req: &mut Request) -> String {
    let key = client_key(req);
    req.extensions_mut().insert(ClientKey(key.clone()));
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn uses_forwarded_for_over_peer() {
        let mut req = Request::builder()
            .header("x-forwarded-for", "1.2.3.4, 172.16.0.1")
            .body(Body::empty())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo("127.0.0.1:9000".parse::<SocketAddr>().unwrap()));
        assert_eq!(client_key(&req), "1.2.3.4");
    }

    #[test]
    fn falls_back_to_peer_address() {
        let mut req = Request::builder().body(Body::empty()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo("10.1.1.1:40000".parse::<SocketAddr>().unwrap()));
        assert_eq!(client_key(&req), "10.1.1.1");
    }

    #[test]
    fn mobile_agents_are_bucketed() {
        let req = Request::builder()
            .header("x-forwarded-for", "1.2.3.4")
            .header(USER_AGENT, "Mozilla/5.0 (Linux; Android 14; Pixel 8) Mobile")
            .body(Body::empty())
            .unwrap();
        assert!(client_key(&req).starts_with("1.2.3.4-mobile-"));
    }

    #[test]
    fn attached_key_is_reused() {
        let mut req = Request::builder()
            .header("x-forwarded-for", "1.2.3.4")
            .body(Body::empty())
            .unwrap();
        attach_client_key(&mut req);
        req.headers_mut()
            .insert("x-forwarded-for", "9.9.9.9".parse().unwrap());
        assert_eq!(client_key(&req), "1.2.3.4");
    }
}
