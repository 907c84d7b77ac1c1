use serde_json::{Value, json};
use time::OffsetDateTime;
use tracing::info;
use tracing_test::traced_test;
use tvshows_e2e_tests::{FAILING_QUERY, extend_url, import_show, parse_stamp, prepare_env};

fn names(page: &Value) -> Vec<&str> {
    page["tv-shows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect()
}

#[tokio::test]
#[traced_test]
async fn test_import_get_delete() {
    let (args, _guard, client) = prepare_env("test_import_get_delete").await.unwrap();
    let base_url = args.base_url.clone();
    let api_url = base_url.join("tv-shows").unwrap();

    let before = OffsetDateTime::now_utc();
    let scrubs = import_show(&client, &base_url, "Scrubs").await.unwrap();
    info!("Imported: {scrubs:#?}");
    assert_eq!(scrubs["id"], 72);
    assert_eq!(scrubs["tvmaze-id"], 72);
    assert_eq!(
        scrubs["_links"]["self"]["href"],
        format!("{}tv-shows/72", base_url)
    );
    let stamp = parse_stamp(scrubs["last-update"].as_str().unwrap()).unwrap();
    let after = OffsetDateTime::now_utc();
    assert!(stamp >= before - time::Duration::seconds(1));
    assert!(stamp <= after);

    let er = import_show(&client, &base_url, "er").await.unwrap();
    assert_eq!(er["id"], 59);

    let mut list_url = api_url.clone();
    list_url.set_query(Some("order_by=%2Bname&filter=id,name"));
    let response = client.get(list_url).send().await.unwrap();
    assert!(response.status().is_success());
    let page: Value = response.json().await.unwrap();
    assert_eq!(
        page["tv-shows"],
        json!([{"id": 59, "name": "ER"}, {"id": 72, "name": "Scrubs"}])
    );
    assert_eq!(page["page"], 1);
    assert!(page["_links"]["self"]["href"].is_string());
    assert!(page["_links"].get("next").is_none());
    assert!(page["_links"].get("previous").is_none());

    let record_url = extend_url(&api_url, 72);
    let response = client.get(record_url.clone()).send().await.unwrap();
    assert!(response.status().is_success());
    let record: Value = response.json().await.unwrap();
    assert_eq!(record["id"], 72);
    assert_eq!(record["name"], "Scrubs");
    assert_eq!(record["genres"], json!(["Comedy", "Medical"]));
    assert_eq!(record["schedule"], json!({"time": "21:00", "days": ["Thursday"]}));
    assert_eq!(record["network"]["name"], "NBC");
    assert_eq!(
        record["_links"]["previous"]["href"],
        format!("{}tv-shows/59", base_url)
    );
    assert!(record["_links"].get("next").is_none());

    let response = client.get(extend_url(&api_url, 59)).send().await.unwrap();
    let record: Value = response.json().await.unwrap();
    assert!(record["_links"].get("previous").is_none());
    assert_eq!(
        record["_links"]["next"]["href"],
        format!("{}tv-shows/72", base_url)
    );

    let response = client.delete(record_url.clone()).send().await.unwrap();
    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body,
        json!({"message": "The TV show with id 72 was removed from the database", "id": 72})
    );

    let response = client.get(record_url.clone()).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Show with id 72 does not exist");

    let response = client.delete(record_url).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let response = client.get(extend_url(&api_url, "abc")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["message"].is_string());

    let response = client.get(api_url).send().await.unwrap();
    let page: Value = response.json().await.unwrap();
    assert_eq!(names(&page), vec!["ER"]);
}

#[tokio::test]
#[traced_test]
async fn test_import_errors() {
    let (args, _guard, client) = prepare_env("test_import_errors").await.unwrap();
    let base_url = args.base_url.clone();
    let import_url = base_url.join("tv-shows/import").unwrap();

    import_show(&client, &base_url, "Scrubs").await.unwrap();

    let post = async |name: Option<&str>| {
        let mut request = client.post(import_url.clone());
        if let Some(name) = name {
            request = request.query(&[("name", name)]);
        }
        let response = request.send().await.unwrap();
        let status = response.status().as_u16();
        let body: Value = response.json().await.unwrap();
        info!("Import {name:?}: {status} {body}");
        (status, body)
    };

    let (status, body) = post(Some("SCRUBS")).await;
    assert_eq!(status, 404);
    assert_eq!(body["message"], "Show SCRUBS already exists in the database.");

    let (status, body) = post(Some("Scrub")).await;
    assert_eq!(status, 404);
    assert_eq!(body["message"], "Show Scrub does not exist.");

    let (status, _) = post(None).await;
    assert_eq!(status, 400);

    let (status, _) = post(Some(FAILING_QUERY)).await;
    assert_eq!(status, 502);

    let response = client.get(base_url.join("tv-shows").unwrap()).send().await.unwrap();
    let page: Value = response.json().await.unwrap();
    assert_eq!(names(&page), vec!["Scrubs"]);
}

#[tokio::test]
#[traced_test]
async fn test_patch() {
    let (args, _guard, client) = prepare_env("test_patch").await.unwrap();
    let base_url = args.base_url.clone();
    let api_url = base_url.join("tv-shows").unwrap();
    let imported = import_show(&client, &base_url, "House").await.unwrap();
    let imported_at = parse_stamp(imported["last-update"].as_str().unwrap()).unwrap();
    let record_url = extend_url(&api_url, 83);

    let patch = async |body: Value| {
        let response = client
            .patch(record_url.clone())
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        let body: Value = response.json().await.unwrap();
        (status, body)
    };

    let (status, body) = patch(json!({"id": 1, "name": "Dr. House"})).await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "id and tvmaze-id cannot be changed");

    let (status, _) = patch(json!({"genres": "Drama"})).await;
    assert_eq!(status, 400);
    let (status, _) = patch(json!({"schedule": {"time": "20:00", "channel": 4}})).await;
    assert_eq!(status, 400);
    let (status, _) = patch(json!({"runtime": -1})).await;
    assert_eq!(status, 400);

    let record: Value = client
        .get(record_url.clone())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(record["name"], "House");
    assert_eq!(record["last-update"], imported["last-update"]);

    let (status, body) = patch(json!({
        "name": "House M.D.",
        "runtime": 44,
        "rating": {"average": 9.0},
        "network": {"id": 4, "name": "FOX", "country": {"code": "US"}}
    }))
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["id"], 83);
    assert_eq!(
        body["_links"]["self"]["href"],
        format!("{}tv-shows/83", base_url)
    );
    let patched_at = parse_stamp(body["last-update"].as_str().unwrap()).unwrap();
    assert!(patched_at >= imported_at);

    let record: Value = client
        .get(record_url.clone())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(record["name"], "House M.D.");
    assert_eq!(record["runtime"], 44);
    assert_eq!(record["rating"], json!({"average": 9.0}));
    assert_eq!(record["network"]["country"]["code"], "US");
    assert_eq!(record["genres"], json!(["Drama", "Mystery", "Medical"]));
    assert_eq!(record["last-update"], body["last-update"]);

    for key in ["genres", "schedule", "rating", "name"] {
        let (status, body) = patch(json!({ key: null })).await;
        assert_eq!(status, 400);
        assert_eq!(body["message"], format!("{key} cannot be null"));
    }

    let (status, _) = patch(json!({"runtime": null, "summary": null, "network": null})).await;
    assert_eq!(status, 200);
    let record: Value = client
        .get(record_url.clone())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(record["runtime"].is_null());
    assert!(record["summary"].is_null());
    assert!(record["network"].is_null());
    assert_eq!(record["name"], "House M.D.");
    assert_eq!(record["language"], "English");

    let response = client
        .patch(record_url.clone())
        .header("content-type", "application/json")
        .body("{\"name\": ")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["message"].is_string());

    let response = client
        .patch(record_url.clone())
        .body("name=House")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["message"].is_string());

    let response = client
        .patch(extend_url(&api_url, 9999))
        .json(&json!({"name": "Nobody"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
#[traced_test]
async fn test_concurrent_patches() {
    let (args, _guard, client) = prepare_env("test_concurrent_patches").await.unwrap();
    let base_url = args.base_url.clone();
    let api_url = base_url.join("tv-shows").unwrap();
    for name in ["ER", "Scrubs", "House"] {
        import_show(&client, &base_url, name).await.unwrap();
    }

    let requests = [(59, 61), (72, 31), (83, 62)].map(|(id, runtime)| {
        let client = client.clone();
        let url = extend_url(&api_url, id);
        tokio::spawn(async move {
            client
                .patch(url)
                .json(&json!({ "runtime": runtime }))
                .send()
                .await
                .unwrap()
                .status()
        })
    });
    for request in requests {
        assert!(request.await.unwrap().is_success());
    }

    let mut list_url = api_url.clone();
    list_url.set_query(Some("filter=id,runtime"));
    let page: Value = client
        .get(list_url)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        page["tv-shows"],
        json!([
            {"id": 59, "runtime": 61},
            {"id": 72, "runtime": 31},
            {"id": 83, "runtime": 62}
        ])
    );
}

#[tokio::test]
#[traced_test]
async fn test_listing() {
    let (args, _guard, client) = prepare_env("test_listing").await.unwrap();
    let base_url = args.base_url.clone();
    let api_url = base_url.join("tv-shows").unwrap();
    for name in ["Scrubs", "ER", "House", "Kaiji", "Scrubs: Interns"] {
        import_show(&client, &base_url, name).await.unwrap();
    }

    let get = async |query: &str| {
        let mut url = api_url.clone();
        url.set_query(Some(query));
        let response = client.get(url).send().await.unwrap();
        let status = response.status().as_u16();
        let body: Value = response.json().await.unwrap();
        info!("GET {query}: {status} {body}");
        (status, body)
    };

    let (status, page) = get("").await;
    assert_eq!(status, 200);
    assert_eq!(
        names(&page),
        vec!["ER", "Scrubs", "House", "Kaiji", "Scrubs: Interns"]
    );
    assert_eq!(page["page_size"], 100);

    let (_, page) = get("order_by=-rating-average,%2Bname&filter=name,rating").await;
    assert_eq!(
        names(&page),
        vec!["House", "Scrubs", "ER", "Kaiji", "Scrubs: Interns"]
    );
    assert_eq!(
        page["tv-shows"][0].as_object().unwrap().keys().collect::<Vec<_>>(),
        vec!["name", "rating"]
    );

    let (_, page) = get("order_by=%2Bruntime,-name&page_size=10").await;
    assert_eq!(
        names(&page),
        vec!["Scrubs: Interns", "Kaiji", "Scrubs", "House", "ER"]
    );

    let (status, page) = get("page=1&page_size=2").await;
    assert_eq!(status, 200);
    assert_eq!(names(&page), vec!["House", "Kaiji"]);
    assert!(page["_links"].get("previous").is_none());
    let next = page["_links"]["next"]["href"].as_str().unwrap();
    assert!(next.contains("page=2"));
    assert!(next.contains("page_size=2"));

    let (status, page) = get("page=2&page_size=2").await;
    assert_eq!(status, 200);
    assert_eq!(names(&page), vec!["Scrubs: Interns"]);
    assert!(page["_links"].get("next").is_none());
    assert!(page["_links"]["previous"]["href"]
        .as_str()
        .unwrap()
        .contains("page=1"));

    let (status, body) = get("page=3&page_size=2").await;
    assert_eq!(status, 404);
    assert_eq!(
        body["message"],
        "Database has a total of 5 records; max pages is 3"
    );

    let (status, body) = get("order_by=name").await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "order_by must begin with + or -; n found");

    let (status, body) = get("order_by=-weight").await;
    assert_eq!(status, 400);
    assert_eq!(
        body["message"],
        "order_by must be either id,name,runtime,premiered, or rating-average; got weight"
    );

    let (status, body) = get("page=0").await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Page must be positive number; got 0");

    let (status, body) = get("page=abc").await;
    assert_eq!(status, 400);
    assert!(body["message"].as_str().unwrap().contains("query string"));

    let (status, page) = get("page=1&page_size=50000").await;
    assert_eq!(status, 200);
    assert_eq!(page["tv-shows"].as_array().unwrap().len(), 5);

    let (status, body) = get("filter=id,score").await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "filter must be in the DB; got score");
}
