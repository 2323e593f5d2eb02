//! Web UI route table.

mod answer_handlers;
mod auth_handlers;
mod question_handlers;
mod utils;

use axum::{
    response::Redirect,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::api::AppState;

/// Create the web UI router
///
/// `/questions/:key` is a slug for GET and a numeric id for everything else;
/// a single route keeps both from colliding in the router.
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(|| async { Redirect::to("/questions") }))
        .route(
            "/login",
            get(auth_handlers::login_page).post(auth_handlers::login_submit),
        )
        .route(
            "/register",
            get(auth_handlers::register_page).post(auth_handlers::register_submit),
        )
        .route("/logout", post(auth_handlers::logout))
        .route(
            "/questions",
            get(question_handlers::index).post(question_handlers::store),
        )
        .route("/questions/create", get(question_handlers::create))
        .route(
            "/questions/:key",
            get(question_handlers::show)
                .put(question_handlers::update)
                .patch(question_handlers::update)
                .delete(question_handlers::destroy)
                .post(question_handlers::method_override),
        )
        .route("/questions/:key/edit", get(question_handlers::edit))
        .route("/questions/:key/answers", post(answer_handlers::store))
        .route("/answers/:key/accept", post(answer_handlers::accept))
        .route(
            "/answers/:key",
            axum::routing::delete(answer_handlers::destroy).post(answer_handlers::method_override),
        )
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        response::Response,
        Router,
    };
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::api::auth::csrf_token_for;
    use crate::api::AppState;
    use crate::config::Config;
    use crate::db::entities::{question, user};
    use crate::db::test_database;
    use crate::forms::{AnswerInput, QuestionInput, RegisterInput};

    struct TestApp {
        _dir: TempDir,
        state: Arc<AppState>,
        router: Router,
    }

    struct Visitor {
        user: user::Model,
        cookie: String,
        csrf: String,
    }

    async fn test_app() -> TestApp {
        let (dir, db) = test_database().await;
        let state = Arc::new(AppState::new(db, Config::default()));
        TestApp {
            router: crate::app(state.clone()),
            state,
            _dir: dir,
        }
    }

    impl TestApp {
        async fn sign_in(&self, username: &str) -> Visitor {
            let input = RegisterInput::new(
                username,
                &format!("{}@example.com", username),
                "correct-horse",
                "correct-horse",
            );
            let user = self.state.auth.register(&input).await.unwrap();
            let session = self
                .state
                .auth
                .authenticate(username, "correct-horse")
                .await
                .unwrap();
            Visitor {
                user,
                cookie: format!("qa_session={}", session.token),
                csrf: csrf_token_for(&session.token),
            }
        }

        async fn ask(&self, visitor: &Visitor, title: &str) -> question::Model {
            self.state
                .questions
                .create(&visitor.user, &QuestionInput::new(title, "Some details about it."))
                .await
                .unwrap()
        }

        async fn send(&self, request: Request<Body>) -> Response {
            self.router.clone().oneshot(request).await.unwrap()
        }

        async fn get(&self, uri: &str, visitor: Option<&Visitor>) -> Response {
            let mut builder = Request::builder().uri(uri);
            if let Some(v) = visitor {
                builder = builder.header(header::COOKIE, &v.cookie);
            }
            self.send(builder.body(Body::empty()).unwrap()).await
        }

        async fn submit(
            &self,
            method: Method,
            uri: &str,
            visitor: Option<&Visitor>,
            fields: &[(&str, &str)],
        ) -> Response {
            let mut builder = Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
            if let Some(v) = visitor {
                builder = builder.header(header::COOKIE, &v.cookie);
            }
            let body = serde_urlencoded::to_string(fields).unwrap();
            self.send(builder.body(Body::from(body)).unwrap()).await
        }
    }

    fn location(response: &Response) -> &str {
        response.headers()[header::LOCATION].to_str().unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_index_lists_questions() {
        let app = test_app().await;
        let alice = app.sign_in("alice").await;
        app.ask(&alice, "How do I borrow twice?").await;

        let response = app.get("/questions", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("How do I borrow twice?"));
        assert!(html.contains("unanswered"));

        let root = app.get("/", None).await;
        assert_eq!(location(&root), "/questions");
    }

    #[tokio::test]
    async fn test_show_by_slug_counts_views() {
        let app = test_app().await;
        let alice = app.sign_in("alice").await;
        let q = app.ask(&alice, "Pinning futures safely").await;

        let response = app.get(&format!("/questions/{}", q.slug), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("1 views"));

        let missing = app.get("/questions/no-such-question", None).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_question_titled_create_is_reachable() {
        let app = test_app().await;
        let alice = app.sign_in("alice").await;
        let q = app.ask(&alice, "Create").await;
        assert_ne!(q.slug, "create");

        let response = app.get(&format!("/questions/{}", q.slug), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Create"));
        assert_eq!(app.state.questions.find(q.id).await.unwrap().unwrap().views, 1);

        let form = app.get("/questions/create", Some(&alice)).await;
        assert_eq!(form.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_page_far_past_the_end() {
        let app = test_app().await;
        let alice = app.sign_in("alice").await;
        app.ask(&alice, "Only question here").await;

        let response = app.get("/questions?page=18446744073709551615", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!body_text(response).await.contains("Only question here"));

        let response = app.get("/api/questions?page=18446744073709551615", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["total"], 1);
        assert_eq!(json["questions"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_guest_is_sent_to_login() {
        let app = test_app().await;

        let response = app.get("/questions/create", None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(location(&response).starts_with("/login"));

        let response = app
            .submit(
                Method::POST,
                "/questions",
                None,
                &[("title", "A valid title"), ("body", "A valid body")],
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(location(&response).starts_with("/login"));
    }

    #[tokio::test]
    async fn test_store_question() {
        let app = test_app().await;
        let alice = app.sign_in("alice").await;

        let response = app
            .submit(
                Method::POST,
                "/questions",
                Some(&alice),
                &[
                    ("title", "What is a trait object?"),
                    ("body", "And when should I use dyn?"),
                    ("csrf_token", alice.csrf.as_str()),
                ],
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(location(&response).starts_with("/questions?success="));

        let stored = app
            .state
            .questions
            .find_by_slug("what-is-a-trait-object")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.user_id, alice.user.id);
    }

    #[tokio::test]
    async fn test_invalid_question_is_rejected() {
        let app = test_app().await;
        let alice = app.sign_in("alice").await;

        let response = app
            .submit(
                Method::POST,
                "/questions",
                Some(&alice),
                &[("title", "Why"), ("body", ""), ("csrf_token", alice.csrf.as_str())],
            )
            .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let html = body_text(response).await;
        assert!(html.contains("between 5 and 255"));
        assert!(html.contains("The body field is required."));

        let page = app.state.questions.latest_page(1, 10).await.unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_csrf_token_required() {
        let app = test_app().await;
        let alice = app.sign_in("alice").await;

        let response = app
            .submit(
                Method::POST,
                "/questions",
                Some(&alice),
                &[("title", "A valid title"), ("body", "A valid body"), ("csrf_token", "forged")],
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(app.state.questions.latest_page(1, 10).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_update_via_method_override() {
        let app = test_app().await;
        let alice = app.sign_in("alice").await;
        let bob = app.sign_in("bob").await;
        let q = app.ask(&alice, "Original title here").await;
        let uri = format!("/questions/{}", q.id);

        let edit = app.get(&format!("{}/edit", uri), Some(&bob)).await;
        assert_eq!(edit.status(), StatusCode::FORBIDDEN);

        let response = app
            .submit(
                Method::POST,
                &uri,
                Some(&alice),
                &[
                    ("_method", "PUT"),
                    ("title", "Renamed title here"),
                    ("body", "Updated body text"),
                    ("csrf_token", alice.csrf.as_str()),
                ],
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let updated = app.state.questions.find(q.id).await.unwrap().unwrap();
        assert_eq!(updated.title, "Renamed title here");
        assert_eq!(updated.slug, "renamed-title-here");
    }

    #[tokio::test]
    async fn test_delete_rules() {
        let app = test_app().await;
        let alice = app.sign_in("alice").await;
        let bob = app.sign_in("bob").await;
        let answered = app.ask(&alice, "Answered question").await;
        let lonely = app.ask(&alice, "Lonely question").await;
        app.state
            .questions
            .add_answer(&answered, &bob.user, &AnswerInput::new("Here is an answer."))
            .await
            .unwrap();

        // someone else's question
        let response = app
            .submit(
                Method::DELETE,
                &format!("/questions/{}", lonely.id),
                Some(&bob),
                &[("csrf_token", bob.csrf.as_str())],
            )
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // own question, but it has an answer
        let response = app
            .submit(
                Method::POST,
                &format!("/questions/{}", answered.id),
                Some(&alice),
                &[("_method", "DELETE"), ("csrf_token", alice.csrf.as_str())],
            )
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(app.state.questions.find(answered.id).await.unwrap().is_some());

        let response = app
            .submit(
                Method::POST,
                &format!("/questions/{}", lonely.id),
                Some(&alice),
                &[("_method", "DELETE"), ("csrf_token", alice.csrf.as_str())],
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(app.state.questions.find(lonely.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_answer_flow() {
        let app = test_app().await;
        let alice = app.sign_in("alice").await;
        let bob = app.sign_in("bob").await;
        let q = app.ask(&alice, "Which collection to use?").await;

        let response = app
            .submit(
                Method::POST,
                &format!("/questions/{}/answers", q.id),
                Some(&bob),
                &[("body", "no"), ("csrf_token", bob.csrf.as_str())],
            )
            .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = app
            .submit(
                Method::POST,
                &format!("/questions/{}/answers", q.id),
                Some(&bob),
                &[("body", "A BTreeMap keeps keys sorted."), ("csrf_token", bob.csrf.as_str())],
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(location(&response).starts_with(&format!("/questions/{}?success=", q.slug)));

        let answers = app.state.questions.answers_for(q.id).await.unwrap();
        assert_eq!(answers.len(), 1);
        let answer_id = answers[0].0.id;
        let accept_uri = format!("/answers/{}/accept", answer_id);

        let response = app
            .submit(Method::POST, &accept_uri, Some(&bob), &[("csrf_token", bob.csrf.as_str())])
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .submit(Method::POST, &accept_uri, Some(&alice), &[("csrf_token", alice.csrf.as_str())])
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let accepted = app.state.questions.find(q.id).await.unwrap().unwrap();
        assert_eq!(accepted.best_answer_id, Some(answer_id));

        let response = app
            .submit(
                Method::POST,
                &format!("/answers/{}", answer_id),
                Some(&alice),
                &[("_method", "DELETE"), ("csrf_token", alice.csrf.as_str())],
            )
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .submit(
                Method::DELETE,
                &format!("/answers/{}", answer_id),
                Some(&bob),
                &[("csrf_token", bob.csrf.as_str())],
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cleared = app.state.questions.find(q.id).await.unwrap().unwrap();
        assert_eq!(cleared.best_answer_id, None);
    }

    #[tokio::test]
    async fn test_register_login_logout() {
        let app = test_app().await;

        let response = app
            .submit(
                Method::POST,
                "/register",
                None,
                &[
                    ("username", "carol"),
                    ("email", "carol@example.com"),
                    ("password", "long-enough"),
                    ("password_confirmation", "long-enough"),
                ],
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(location(&response).starts_with("/login?message="));

        let response = app
            .submit(
                Method::POST,
                "/register",
                None,
                &[
                    ("username", "carol"),
                    ("email", "other@example.com"),
                    ("password", "long-enough"),
                    ("password_confirmation", "long-enough"),
                ],
            )
            .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_text(response).await.contains("already taken"));

        let response = app
            .submit(
                Method::POST,
                "/login",
                None,
                &[("username", "carol"), ("password", "wrong-password")],
            )
            .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = app
            .submit(
                Method::POST,
                "/login",
                None,
                &[("username", "carol"), ("password", "long-enough")],
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("qa_session="));
        assert!(cookie.contains("HttpOnly"));

        let token = cookie
            .trim_start_matches("qa_session=")
            .split(';')
            .next()
            .unwrap()
            .to_string();
        let carol = Visitor {
            user: app.state.auth.user_for_token(&token).await.unwrap().unwrap(),
            cookie: format!("qa_session={}", token),
            csrf: csrf_token_for(&token),
        };
        assert_eq!(carol.user.username, "carol");

        let response = app
            .submit(Method::POST, "/logout", Some(&carol), &[("csrf_token", carol.csrf.as_str())])
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(app.state.auth.user_for_token(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_json_api() {
        let app = test_app().await;
        let alice = app.sign_in("alice").await;
        let q = app.ask(&alice, "Is unsafe ever fine?").await;

        let response = app.get("/api/questions", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["total"], 1);
        assert_eq!(json["questions"][0]["status"], "unanswered");

        let response = app.get(&format!("/api/questions/{}", q.slug), None).await;
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["author"], "alice");
        assert_eq!(json["answers"].as_array().unwrap().len(), 0);

        let response = app.get("/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
