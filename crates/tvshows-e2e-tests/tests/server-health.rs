use tracing_test::traced_test;

#[tokio::test]
#[traced_test]
async fn test_health() {
    let (args, _guard, client) = tvshows_e2e_tests::prepare_env("server-health").await.unwrap();

    let response = client
        .get(args.base_url.join("health").unwrap())
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "OK");

    let response = client
        .get(args.base_url.join("tv-shows").unwrap())
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let page: serde_json::Value = response.json().await.unwrap();
    assert_eq!(page["tv-shows"], serde_json::json!([]));

    let response = client
        .get(args.base_url.join("api-docs/openapi.json").unwrap())
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let docs: serde_json::Value = response.json().await.unwrap();
    assert!(docs["paths"].get("/tv-shows/{id}").is_some());
    assert!(docs["paths"].get("/tv-shows/statistics").is_some());
}
