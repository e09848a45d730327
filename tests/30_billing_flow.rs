mod common;

use anyhow::Result;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

struct Api<'a> {
    server: &'a common::TestServer,
    client: Client,
    token: String,
}

impl Api<'_> {
    async fn send(&self, method: reqwest::Method, path: &str, body: Option<Value>) -> Result<(StatusCode, Value)> {
        let mut req = self
            .client
            .request(method, self.server.url(path))
            .bearer_auth(&self.token);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let res = req.send().await?;
        let status = res.status();
        let text = res.text().await?;
        let body = if text.is_empty() { Value::Null } else { serde_json::from_str(&text)? };
        Ok((status, body))
    }

    async fn get(&self, path: &str) -> Result<Value> {
        let (status, body) = self.send(reqwest::Method::GET, path, None).await?;
        anyhow::ensure!(status == StatusCode::OK, "GET {} -> {}: {}", path, status, body);
        Ok(body["data"].clone())
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value> {
        let (status, body) = self.send(reqwest::Method::POST, path, Some(body)).await?;
        anyhow::ensure!(status == StatusCode::CREATED, "POST {} -> {}: {}", path, status, body);
        Ok(body["data"].clone())
    }
}

#[tokio::test]
async fn track_time_and_bill_a_client() -> Result<()> {
    let server = common::ensure_server().await?;
    if !common::database_available(server).await {
        eprintln!("skipping: database unavailable");
        return Ok(());
    }
    let client = Client::new();
    let token = common::register_and_login(server, &client, "billing").await?;
    let api = Api { server, client, token };

    // Empty profile renders as an empty object
    assert_eq!(api.get("/api/profile").await?, json!({}));
    let (status, profile) = api
        .send(
            reqwest::Method::PUT,
            "/api/profile",
            Some(json!({ "hourly_rate": "100", "pix_key": "ana@example.com", "city": "Recife" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["data"]["hourly_rate"], "100.00");

    let acme = api.post("/api/clients", json!({ "name": "Acme Ltda" })).await?;
    let project = api
        .post(
            "/api/projects",
            json!({ "client_id": acme["id"], "title": "Website", "billing_type": "hourly" }),
        )
        .await?;
    assert_eq!(project["status"], "Proposta");
    assert_eq!(project["client_name"], "Acme Ltda");

    let task = api
        .post("/api/tasks", json!({ "project_id": project["id"], "title": "Layout" }))
        .await?;
    assert_eq!(task["status"], "todo");

    let (status, _) = api
        .send(
            reqwest::Method::PATCH,
            &format!("/api/tasks/{}/status", task["id"]),
            Some(json!({ "status": "doing" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    let project = api.get(&format!("/api/projects/{}", project["id"])).await?;
    assert_eq!(project["status"], "Em Andamento");

    let first = api
        .post(
            "/api/time-entries",
            json!({ "task_id": task["id"], "start_time": "2024-04-20T09:00:00Z", "duration_seconds": 3600 }),
        )
        .await?;
    let second = api
        .post(
            "/api/time-entries",
            json!({ "task_id": task["id"], "start_time": "2024-04-21T09:00:00Z", "duration_seconds": 1800, "notes": "review" }),
        )
        .await?;
    let unbilled = api.get("/api/time-entries?billed=false").await?;
    assert_eq!(unbilled.as_array().map(Vec::len), Some(2));

    let created = api
        .post("/api/invoices", json!({ "time_entry_ids": [first["id"], second["id"]] }))
        .await?;
    let invoice = &created["invoice"];
    assert_eq!(invoice["amount"], "150.00");
    assert_eq!(invoice["status"], "pending");
    assert_eq!(invoice["client_name"], "Acme Ltda");
    assert!(invoice["invoice_number"].as_str().unwrap_or_default().starts_with("INV-"));
    let invoice_id = invoice["id"].as_i64().unwrap_or_default();

    // Billed entries can't be billed again or deleted
    let (status, _) = api
        .send(reqwest::Method::POST, "/api/invoices", Some(json!({ "time_entry_ids": [first["id"]] })))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = api
        .send(reqwest::Method::DELETE, &format!("/api/time-entries/{}", first["id"]), None)
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let detail = api.get(&format!("/api/invoices/{}", invoice_id)).await?;
    assert_eq!(detail["items"].as_array().map(Vec::len), Some(2));

    let pix = api.get(&format!("/api/invoices/{}/pix", invoice_id)).await?;
    let payload = pix["payload"].as_str().unwrap_or_default();
    assert!(payload.contains("0115ana@example.com"));
    assert!(payload.contains("5406150.00"));

    let res = api
        .client
        .get(server.url(&format!("/api/invoices/{}/document", invoice_id)))
        .bearer_auth(&api.token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let document = res.text().await?;
    assert!(document.contains("**Acme Ltda**"));
    assert!(document.contains("## Pix"));

    let summary = api.get("/api/inicio").await?;
    assert_eq!(summary["totalProjects"], 1);
    assert_eq!(summary["totalClients"], 1);
    assert_eq!(summary["totalValuePending"], "150.00");

    // Cancelling releases the entries and is final
    let (status, canceled) = api
        .send(
            reqwest::Method::PATCH,
            &format!("/api/invoices/{}/status", invoice_id),
            Some(json!({ "status": "canceled" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(canceled["data"]["status"], "canceled");
    let unbilled = api.get("/api/time-entries?billed=false").await?;
    assert_eq!(unbilled.as_array().map(Vec::len), Some(2));

    let (status, _) = api
        .send(
            reqwest::Method::PATCH,
            &format!("/api/invoices/{}/status", invoice_id),
            Some(json!({ "status": "paid" })),
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    // A client with invoices can't be deleted
    let (status, _) = api
        .send(reqwest::Method::DELETE, &format!("/api/clients/{}", acme["id"]), None)
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    Ok(())
}

#[tokio::test]
async fn users_only_see_their_own_data() -> Result<()> {
    let server = common::ensure_server().await?;
    if !common::database_available(server).await {
        eprintln!("skipping: database unavailable");
        return Ok(());
    }
    let client = Client::new();
    let owner = Api {
        server,
        client: client.clone(),
        token: common::register_and_login(server, &client, "owner").await?,
    };
    let other = Api {
        server,
        client: client.clone(),
        token: common::register_and_login(server, &client, "other").await?,
    };

    let acme = owner.post("/api/clients", json!({ "name": "Acme" })).await?;

    let (status, _) = other
        .send(reqwest::Method::GET, &format!("/api/clients/{}", acme["id"]), None)
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(other.get("/api/clients").await?, json!([]));

    let (status, _) = other
        .send(
            reqwest::Method::POST,
            "/api/projects",
            Some(json!({ "client_id": acme["id"], "title": "Stolen", "billing_type": "fixed" })),
        )
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn task_changes_drive_project_status() -> Result<()> {
    let server = common::ensure_server().await?;
    if !common::database_available(server).await {
        eprintln!("skipping: database unavailable");
        return Ok(());
    }
    let client = Client::new();
    let token = common::register_and_login(server, &client, "status").await?;
    let api = Api { server, client, token };

    let acme = api.post("/api/clients", json!({ "name": "Acme" })).await?;
    let site = api
        .post("/api/projects", json!({ "client_id": acme["id"], "title": "Site", "billing_type": "hourly" }))
        .await?;
    let app = api
        .post("/api/projects", json!({ "client_id": acme["id"], "title": "App", "billing_type": "hourly" }))
        .await?;

    let task = api
        .post(
            "/api/tasks",
            json!({ "project_id": site["id"], "title": "Layout", "status": "doing" }),
        )
        .await?;
    assert_eq!(api.get(&format!("/api/projects/{}", site["id"])).await?["status"], "Em Andamento");

    // Moving the only task empties the old project and starts the new one
    let (status, moved) = api
        .send(
            reqwest::Method::PUT,
            &format!("/api/tasks/{}", task["id"]),
            Some(json!({ "project_id": app["id"] })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["data"]["project_id"], app["id"]);
    assert_eq!(api.get(&format!("/api/projects/{}", site["id"])).await?["status"], "Proposta");
    assert_eq!(api.get(&format!("/api/projects/{}", app["id"])).await?["status"], "Em Andamento");

    // Deleting the last task puts the project back to Proposta
    let (status, _) = api
        .send(reqwest::Method::DELETE, &format!("/api/tasks/{}", task["id"]), None)
        .await?;
    assert!(status.is_success(), "delete task -> {}", status);
    assert_eq!(api.get(&format!("/api/projects/{}", app["id"])).await?["status"], "Proposta");

    // Unknown statuses are rejected rather than stored
    let (status, body) = api
        .send(
            reqwest::Method::PUT,
            &format!("/api/projects/{}", app["id"]),
            Some(json!({ "status": "Arquivado" })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(api.get(&format!("/api/projects/{}", app["id"])).await?["status"], "Proposta");

    Ok(())
}

#[tokio::test]
async fn invoices_bill_only_eligible_entries_of_one_client() -> Result<()> {
    let server = common::ensure_server().await?;
    if !common::database_available(server).await {
        eprintln!("skipping: database unavailable");
        return Ok(());
    }
    let client = Client::new();
    let token = common::register_and_login(server, &client, "partial").await?;
    let api = Api { server, client, token };

    api.send(reqwest::Method::PUT, "/api/profile", Some(json!({ "hourly_rate": "80" })))
        .await?;

    let mut entries = Vec::new();
    for name in ["Acme", "Globex"] {
        let customer = api.post("/api/clients", json!({ "name": name })).await?;
        let project = api
            .post(
                "/api/projects",
                json!({ "client_id": customer["id"], "title": "Work", "billing_type": "hourly" }),
            )
            .await?;
        let task = api
            .post("/api/tasks", json!({ "project_id": project["id"], "title": "Build" }))
            .await?;
        for day in ["2024-04-20", "2024-04-21"] {
            let entry = api
                .post(
                    "/api/time-entries",
                    json!({ "task_id": task["id"], "start_time": format!("{}T09:00:00Z", day), "duration_seconds": 3600 }),
                )
                .await?;
            entries.push(entry["id"].clone());
        }
    }
    let (acme_first, acme_second, globex_first) = (&entries[0], &entries[1], &entries[2]);

    // Entries from two clients can't share an invoice
    let (status, body) = api
        .send(
            reqwest::Method::POST,
            "/api/invoices",
            Some(json!({ "time_entry_ids": [acme_first, globex_first] })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    api.post("/api/invoices", json!({ "time_entry_ids": [acme_first] }))
        .await?;

    // Unknown and already billed ids are skipped
    let created = api
        .post(
            "/api/invoices",
            json!({ "time_entry_ids": [acme_second, 999_999_999, acme_first] }),
        )
        .await?;
    assert_eq!(created["time_entry_ids"], json!([acme_second]));
    assert_eq!(created["invoice"]["amount"], "80.00");

    Ok(())
}
