use ptar_infra::{StoreConfig, Warehouse};
use reqwest::StatusCode;
use serde_json::{Value, json};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
    _dir: tempfile::TempDir,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, over a throwaway database file and an ephemeral port.
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let config = StoreConfig::file(dir.path().join("inventario_ptar.db"));
        let warehouse = Warehouse::open(&config).await.expect("failed to open warehouse");

        let app = ptar_api::app::build_app(warehouse);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            handle,
            _dir: dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn create_material(client: &reqwest::Client, srv: &TestServer, body: Value) -> Value {
    let res = client
        .post(srv.url("/materials"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json().await.unwrap()
}

async fn get_json(client: &reqwest::Client, url: String) -> Value {
    let res = client.get(url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    res.json().await.unwrap()
}

async fn next_code(client: &reqwest::Client, srv: &TestServer, category: &str) -> String {
    let res = client
        .get(srv.url("/materials/next-code"))
        .query(&[("category", category)])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    body["code"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_reports_wal_and_integrity() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let body = get_json(&client, srv.url("/health")).await;
    assert_eq!(body["healthy"], true);
    assert_eq!(body["journal_mode"].as_str().unwrap().to_lowercase(), "wal");
}

#[tokio::test]
async fn material_lifecycle_with_stock_movements() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let created = create_material(
        &client,
        &srv,
        json!({
            "code": "FON-001",
            "name": "Válvula 2\"",
            "category": "Fontanería",
            "unit": "pieza",
            "initial_quantity": 10.0,
            "reorder_threshold": 5.0,
        }),
    )
    .await;
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["status"], "STOCK_NORMAL");

    let res = client
        .post(srv.url("/movements/exit"))
        .json(&json!({ "material_id": id, "amount": 3.0, "destination": "Planta" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .post(srv.url("/movements/exit"))
        .json(&json!({ "material_id": id, "amount": 3.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let material = get_json(&client, srv.url(&format!("/materials/{id}"))).await;
    assert_eq!(material["current_quantity"], 4.0);
    assert_eq!(material["status"], "STOCK_BAJO");

    // Overdraw is refused and leaves stock untouched.
    let res = client
        .post(srv.url("/movements/exit"))
        .json(&json!({ "material_id": id, "amount": 10.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "insufficient_stock");

    let material = get_json(&client, srv.url(&format!("/materials/{id}"))).await;
    assert_eq!(material["current_quantity"], 4.0);

    let ledger = get_json(&client, srv.url(&format!("/movements?material_id={id}"))).await;
    let kinds: Vec<&str> = ledger
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["ENTRY", "EXIT", "EXIT"]);
}

#[tokio::test]
async fn duplicate_code_is_a_conflict() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    create_material(&client, &srv, json!({ "code": "FON-001", "name": "Codo" })).await;

    let res = client
        .post(srv.url("/materials"))
        .json(&json!({ "code": "FON-001", "name": "Otro" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "duplicate_code");
}

#[tokio::test]
async fn loan_return_round_trip() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let created = create_material(
        &client,
        &srv,
        json!({ "code": "HER-001", "name": "Llave", "category": "Herramientas", "initial_quantity": 4.0 }),
    )
    .await;
    let id = created["id"].as_i64().unwrap();

    let res = client
        .post(srv.url("/loans"))
        .json(&json!({ "material_id": id, "amount": 2.0, "borrower": "Juan", "area": "Mantenimiento" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let loan: Value = res.json().await.unwrap();
    let loan_id = loan["id"].as_i64().unwrap();
    assert_eq!(loan["status"], "OPEN");

    let open = get_json(&client, srv.url("/loans?status=open")).await;
    assert_eq!(open.as_array().unwrap().len(), 1);
    assert_eq!(open[0]["material_code"], "HER-001");

    let res = client
        .post(srv.url(&format!("/loans/{loan_id}/return")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let returned: Value = res.json().await.unwrap();
    assert_eq!(returned["status"], "RETURNED");

    let res = client
        .post(srv.url(&format!("/loans/{loan_id}/return")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let material = get_json(&client, srv.url(&format!("/materials/{id}"))).await;
    assert_eq!(material["current_quantity"], 4.0);

    let res = client
        .post(srv.url("/loans"))
        .json(&json!({ "material_id": id, "amount": 1.0, "borrower": "Rosa", "area": "Laboratorio" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let open = get_json(&client, srv.url("/loans?status=open")).await;
    assert_eq!(open.as_array().unwrap().len(), 1);
    assert_eq!(open[0]["borrower"], "Rosa");
    let returned = get_json(&client, srv.url("/loans?status=returned")).await;
    assert_eq!(returned.as_array().unwrap().len(), 1);
    assert_eq!(returned[0]["id"].as_i64(), Some(loan_id));
    assert_eq!(returned[0]["status"], "RETURNED");
    let all = get_json(&client, srv.url("/loans?status=all")).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let res = client.get(srv.url("/loans?status=lent")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn decimal_amounts_balance_exactly() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let created = create_material(
        &client,
        &srv,
        json!({ "code": "LIM-001", "name": "Cloro", "unit": "litro" }),
    )
    .await;
    let id = created["id"].as_i64().unwrap();

    for amount in [0.7, 0.1] {
        let res = client
            .post(srv.url("/movements/entry"))
            .json(&json!({ "material_id": id, "amount": amount, "origin": "Compra" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let res = client
        .post(srv.url("/movements/exit"))
        .json(&json!({ "material_id": id, "amount": 0.8 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let material = get_json(&client, srv.url(&format!("/materials/{id}"))).await;
    assert_eq!(material["current_quantity"], 0.0);
    assert_eq!(material["status"], "SIN_STOCK");
}

#[tokio::test]
async fn deployments_statistics_and_reports() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let created = create_material(
        &client,
        &srv,
        json!({ "code": "ELE-001", "name": "Cable", "category": "Eléctrico", "initial_quantity": 8.0, "reorder_threshold": 2.0 }),
    )
    .await;
    let id = created["id"].as_i64().unwrap();

    let res = client
        .post(srv.url("/deployments"))
        .json(&json!({ "material_id": id, "amount": 6.0, "equipment": "Bomba 3" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let deployment: Value = res.json().await.unwrap();

    let stats = get_json(&client, srv.url("/statistics")).await;
    assert_eq!(stats["total_materials"], 1);
    assert_eq!(stats["low_stock"], 1);
    assert_eq!(stats["deployments"], 1);

    let report = get_json(&client, srv.url("/reports/low-stock")).await;
    assert_eq!(report["name"], "low_stock");
    assert_eq!(report["rows"].as_array().unwrap().len(), 1);

    let res = client
        .delete(srv.url(&format!("/deployments/{}", deployment["id"])))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let material = get_json(&client, srv.url(&format!("/materials/{id}"))).await;
    assert_eq!(material["current_quantity"], 2.0);

    let res = client.get(srv.url("/reports/payroll")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn next_code_and_archive() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let next = next_code(&client, &srv, "Fontanería y Ferretería").await;
    assert_eq!(next, "FON-001");

    let created = create_material(&client, &srv, json!({ "code": "FON-001", "name": "Codo" })).await;
    let id = created["id"].as_i64().unwrap();

    let next = next_code(&client, &srv, "Fontanería y Ferretería").await;
    assert_eq!(next, "FON-002");

    let next = next_code(&client, &srv, "Sin categoría").await;
    assert_eq!(next, "MAT-001");

    let res = client
        .delete(srv.url(&format!("/materials/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .get(srv.url(&format!("/materials/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client.get(srv.url("/materials/abc")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
