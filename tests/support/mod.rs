//! In-process stand-in for the remote game service. Replies are scripted per
//! `METHOD path`; every request is recorded with its JSON body.

use actix_web::{
    App,
    HttpRequest,
    HttpResponse,
    HttpServer,
    dev::ServerHandle,
    http::StatusCode,
    web,
};
use serde_json::{
    Value,
    json,
};
use std::{
    collections::{
        HashMap,
        VecDeque,
    },
    net::TcpListener,
    sync::Mutex,
    thread::JoinHandle,
};

#[derive(Clone, Debug, PartialEq)]
pub struct RecordedRequest {
    pub route: String,
    pub body: Option<Value>,
}

enum Scripted {
    Json(StatusCode, Value),
    Raw(StatusCode, String),
}

#[derive(Default)]
struct ServiceState {
    requests: Mutex<Vec<RecordedRequest>>,
    replies: Mutex<HashMap<String, VecDeque<Scripted>>>,
}

pub struct FakeService {
    base_url: String,
    state: web::Data<ServiceState>,
    server_handle: ServerHandle,
    server_thread: Option<JoinHandle<()>>,
}

impl FakeService {
    pub async fn start() -> Self {
        let state = web::Data::new(ServiceState::default());
        let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let address = listener.local_addr().unwrap();
        let base_url = format!("http://{address}");

        let server_state = state.clone();
        let server = HttpServer::new(move || {
            App::new()
                .app_data(server_state.clone())
                .default_service(web::to(handle_any))
        })
        .workers(1)
        .listen(listener)
        .unwrap()
        .run();

        let server_handle = server.handle();
        let server_thread = std::thread::spawn(move || {
            let sys = actix_web::rt::System::new();
            let _ = sys.block_on(server);
        });

        Self {
            base_url,
            state,
            server_handle,
            server_thread: Some(server_thread),
        }
    }

    /// Service root, without the `/api` prefix.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn reply(&self, route: &str, status: u16, body: Value) -> &Self {
        self.push(route, Scripted::Json(status_code(status), body))
    }

    pub fn reply_raw(&self, route: &str, status: u16, body: &str) -> &Self {
        self.push(route, Scripted::Raw(status_code(status), body.to_string()))
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    fn push(&self, route: &str, reply: Scripted) -> &Self {
        self.state
            .replies
            .lock()
            .unwrap()
            .entry(route.to_string())
            .or_default()
            .push_back(reply);
        self
    }
}

impl Drop for FakeService {
    fn drop(&mut self) {
        let _ = self.server_handle.stop(true);
        if let Some(thread) = self.server_thread.take() {
            let _ = thread.join();
        }
    }
}

fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap()
}

async fn handle_any(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<ServiceState>,
) -> HttpResponse {
    let route = format!("{} {}", req.method(), req.path());
    let body = serde_json::from_slice(&body).ok();
    state.requests.lock().unwrap().push(RecordedRequest {
        route: route.clone(),
        body,
    });
    let reply = state
        .replies
        .lock()
        .unwrap()
        .get_mut(&route)
        .and_then(VecDeque::pop_front);
    match reply {
        Some(Scripted::Json(status, body)) => HttpResponse::build(status).json(body),
        Some(Scripted::Raw(status, body)) => HttpResponse::build(status)
            .content_type("text/plain")
            .body(body),
        None => HttpResponse::NotFound()
            .json(json!({ "detail": format!("no reply scripted for {route}") })),
    }
}

pub fn snapshot_json(
    id: &str,
    rolls_used: u8,
    values: [u8; 5],
    held: [bool; 5],
    ones: Option<u32>,
) -> Value {
    let total = ones.unwrap_or(0);
    json!({
        "id": id,
        "players": [{
            "id": "p1",
            "name": "Player 1",
            "scorecard": {
                "ones": ones, "twos": null, "threes": null, "fours": null,
                "fives": null, "sixes": null, "three_of_a_kind": null,
                "four_of_a_kind": null, "full_house": null,
                "small_straight": null, "large_straight": null,
                "yahtzee": null, "chance": null,
                "upper_subtotal": total, "upper_bonus": 0, "upper_total": total,
                "lower_total": 0, "grand_total": total
            },
            "is_active": true
        }],
        "current_player": 0,
        "dice": { "values": values, "held": held },
        "rolls_remaining": 3 - rolls_used,
        "rolls_used": rolls_used,
        "turn_number": 1,
        "game_mode": "single",
        "game_over": false,
        "winner": null,
        "created_at": "2025-03-01T10:00:00.000000"
    })
}
