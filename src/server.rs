use crate::router::{self, Reply, Router};
use actix_web::{
    http::{header::ContentType, Method, StatusCode},
    web, App, HttpRequest, HttpResponse, HttpServer,
};
use std::collections::HashMap;

/// Serves the router over HTTP until the server is shut down.
pub async fn run_server(listen: &str, router: Router) -> std::io::Result<()> {
    let router = web::Data::new(router);
    HttpServer::new(move || {
        App::new()
            .app_data(router.clone())
            .default_service(web::route().to(dispatch_handler))
    })
    .bind(listen)?
    .run()
    .await
}

async fn dispatch_handler(request: HttpRequest, router: web::Data<Router>) -> HttpResponse {
    if request.method() != Method::GET {
        return to_response(router::error_reply(
            router::ERROR_NOT_IMPLEMENTED,
            StatusCode::NOT_IMPLEMENTED,
        ));
    }
    let query = web::Query::<HashMap<String, String>>::from_query(request.query_string())
        .map(web::Query::into_inner)
        .unwrap_or_default();
    to_response(router.dispatch(request.path(), &query).await)
}

fn to_response(reply: Reply) -> HttpResponse {
    HttpResponse::build(reply.status)
        .content_type(ContentType::json())
        .body(reply.body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::{AppConfig, ShutterConfig};
    use crate::gpio::testing::LineRecorder;
    use crate::registry::ShutterRegistry;
    use actix_web::test;
    use serde_json::{json, Value};

    fn test_router() -> Router {
        let recorder = LineRecorder::default();
        let config = AppConfig {
            listen: String::from("127.0.0.1:0"),
            up_time: 0,
            down_time: 0,
            flip_time: 0,
            shutters: vec![ShutterConfig {
                name: String::from("living"),
                gpio_up: String::from("17"),
                gpio_down: String::from("27"),
            }],
        };
        let registry =
            ShutterRegistry::build(&config, |spec| Ok(Box::new(recorder.line(spec)))).unwrap();
        Router::new(&registry)
    }

    macro_rules! test_app {
        () => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(test_router()))
                    .default_service(web::route().to(dispatch_handler)),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn move_request_round_trips() {
        let app = test_app!();
        let request = test::TestRequest::get()
            .uri("/living/move?position=50")
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body, json!({"name": "living", "position": 50.0}));
    }

    #[actix_web::test]
    async fn unknown_object_maps_to_404() {
        let app = test_app!();
        let request = test::TestRequest::get().uri("/kitchen/").to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body, json!({"error": "invalid_object"}));
    }

    #[actix_web::test]
    async fn non_get_methods_are_not_implemented() {
        let app = test_app!();
        let request = test::TestRequest::post()
            .uri("/living/move?position=50")
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body, json!({"error": "not_implemented"}));
    }

    #[actix_web::test]
    async fn garbled_query_string_is_an_invalid_argument() {
        let app = test_app!();
        let request = test::TestRequest::get()
            .uri("/living/move?position")
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["error"], json!("invalid_argument"));
    }
}
