// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use bihin_api::Client;
use bihin_tui::{ApiCall, ApiOutcome, AppRuntime, InternalEvent};
use std::sync::mpsc::Sender;
use std::thread;

/// Runs every request on its own worker thread so the UI keeps drawing while
/// the API answers.
pub struct ApiRuntime {
    client: Client,
}

impl ApiRuntime {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl AppRuntime for ApiRuntime {
    fn perform(&mut self, call: ApiCall) -> ApiOutcome {
        call.perform(&self.client)
    }

    fn spawn(&mut self, mount: u64, call: ApiCall, tx: Sender<InternalEvent>) -> Result<()> {
        let client = self.client.clone();
        thread::Builder::new()
            .name("bihin-api".to_owned())
            .spawn(move || {
                let outcome = call.perform(&client);
                if tx.send(InternalEvent::Api { mount, outcome }).is_err() {
                    tracing::debug!(mount, "ui gone before api response");
                }
            })
            .context("spawn api worker")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ApiRuntime;
    use anyhow::{Result, anyhow};
    use bihin_api::Client;
    use bihin_app::{
        ApiRequest, Category, CategoryId, CategoryInput, Operation, SubmitTicket, ViewCommand,
    };
    use bihin_tui::{ApiCall, ApiOutcome, AppRuntime, InternalEvent};
    use std::io::Read;
    use std::sync::mpsc;
    use std::thread::{self, JoinHandle};
    use std::time::Duration;
    use tiny_http::{Header, Response, Server};

    fn serve_once(status: u16, body: &'static str) -> Result<(String, JoinHandle<String>)> {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let addr = format!("http://{}/api/", server.server_addr());
        let handle = thread::spawn(move || {
            let mut request = server.recv().expect("request expected");
            let mut sent = String::new();
            request
                .as_reader()
                .read_to_string(&mut sent)
                .expect("request body should read");
            let url = request.url().to_owned();
            let response = Response::from_string(body)
                .with_status_code(status)
                .with_header(
                    Header::from_bytes("Content-Type", "application/json")
                        .expect("valid content type header"),
                );
            request.respond(response).expect("response should succeed");
            url
        });
        Ok((addr, handle))
    }

    #[test]
    fn spawn_delivers_outcome_tagged_with_mount() -> Result<()> {
        let (addr, handle) = serve_once(200, r#"[{"id":1,"name":"電子機器"}]"#)?;
        let mut runtime = ApiRuntime::new(Client::new(&addr, Duration::from_secs(1))?);
        let (tx, rx) = mpsc::channel();

        runtime.spawn(7, ApiCall::Categories(ApiRequest::LoadAll), tx)?;
        let event = rx.recv_timeout(Duration::from_secs(5))?;

        assert_eq!(
            event,
            InternalEvent::Api {
                mount: 7,
                outcome: ApiOutcome::Categories(ViewCommand::Loaded(vec![Category {
                    id: Some(CategoryId::new(1)),
                    name: "電子機器".to_owned(),
                    description: None,
                }])),
            }
        );
        assert_eq!(handle.join().expect("server thread should join"), "/api/categories/");
        Ok(())
    }

    #[test]
    fn server_rejection_becomes_submit_failure() -> Result<()> {
        let (addr, handle) = serve_once(400, r#"{"name":["This field is required."]}"#)?;
        let mut runtime = ApiRuntime::new(Client::new(&addr, Duration::from_secs(1))?);

        let ticket = SubmitTicket::new(5);
        let outcome = runtime.perform(ApiCall::Categories(ApiRequest::Create(
            ticket,
            CategoryInput {
                name: "x".to_owned(),
                description: None,
            },
        )));

        assert_eq!(
            outcome,
            ApiOutcome::Categories(ViewCommand::SubmitFailed(ticket, Operation::Create))
        );
        handle.join().expect("server thread should join");
        Ok(())
    }

    #[test]
    fn unreachable_api_fails_load() -> Result<()> {
        let mut runtime =
            ApiRuntime::new(Client::new("http://127.0.0.1:1/api/", Duration::from_millis(50))?);

        let outcome = runtime.perform(ApiCall::Equipment(ApiRequest::LoadAll));
        assert_eq!(
            outcome,
            ApiOutcome::Equipment(ViewCommand::LoadFailed("failed to fetch equipment"))
        );
        Ok(())
    }
}
