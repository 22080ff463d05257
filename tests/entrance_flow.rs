//! Secret entrance behaviour over a real connection.

use panel_gate::settings::keys;

mod common;

use common::{client, start_panel};

#[tokio::test]
async fn test_entrance_mints_cookie_that_unlocks_ui() {
    let panel = start_panel(&[(keys::SECURITY_ENTRANCE, "/k3y5ecr3")]).await;
    let http = client();

    let res = http.get(panel.url("/login")).send().await.unwrap();
    assert_eq!(res.status(), 404);
    let page = res.text().await.unwrap();
    assert!(page.contains("panelctl user-info"));
    assert!(!page.contains("k3y5ecr3"));

    let res = http.get(panel.url("/k3y5ecr3")).send().await.unwrap();
    assert_eq!(res.status(), 302);
    assert_eq!(res.headers()["location"], "/login");
    let cookie = res.headers()["set-cookie"].to_str().unwrap().to_string();
    let pair = cookie.split(';').next().unwrap().to_string();
    assert!(pair.starts_with("sessionkey="));

    let res = http
        .get(panel.url("/login"))
        .header("cookie", &pair)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
}

#[tokio::test]
async fn test_api_is_never_gated_and_root_entrance_is_open() {
    let panel = start_panel(&[(keys::SECURITY_ENTRANCE, "/k3y5ecr3")]).await;
    let http = client();

    let res = http.get(panel.url("/api/v1/health")).send().await.unwrap();
    assert_eq!(res.status(), 200);

    let res = http.get(panel.url("/api/v1/missing")).send().await.unwrap();
    assert_eq!(res.status(), 404);
    assert!(res.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("application/json"));

    panel.state.cache.set(keys::SECURITY_ENTRANCE, "/");
    let res = http.get(panel.url("/login")).send().await.unwrap();
    assert_eq!(res.status(), 200);
}
