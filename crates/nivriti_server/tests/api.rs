/*
 * SPDX-FileCopyrightText: 2026 Nivriti Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use nivriti_core::StoryDb;
use nivriti_server::{router, AppState, ServerConfig};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

const ADMIN: &str = "admin-secret-token";

struct Harness {
    _dir: TempDir,
    app: Router,
}

fn harness_with(allow_self_register: bool) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let cfg = ServerConfig {
        bind: "127.0.0.1:0".parse().unwrap(),
        db_path: dir.path().join("nivriti.db"),
        db_busy_timeout_ms: 5_000,
        db_synchronous: "NORMAL".to_string(),
        admin_token: Some(ADMIN.to_string()),
        allow_self_register,
        max_body_bytes: 64 * 1024,
    };
    let db = StoryDb::open_with(&cfg.db_path, cfg.db_options()).unwrap();
    Harness {
        _dir: dir,
        app: router(AppState::new(cfg, db)),
    }
}

fn harness() -> Harness {
    harness_with(true)
}

fn token(name: &str) -> String {
    format!("{name}-session-token-0001")
}

impl Harness {
    async fn call(&self, method: &str, uri: &str, bearer: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(t) = bearer {
            req = req.header("Authorization", format!("Bearer {t}"));
        }
        let req = match body {
            Some(v) => req
                .header("content-type", "application/json")
                .body(Body::from(v.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let resp = self.app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }

    async fn register(&self, name: &str) -> String {
        let (status, body) = self
            .call("POST", "/register", None, Some(json!({"username": name, "token": token(name)})))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        token(name)
    }

    async fn story(&self, owner: &str, story_type: &str) -> String {
        let (status, body) = self
            .call(
                "POST",
                "/stories",
                Some(owner),
                Some(json!({"title": "The Long Monsoon", "storyType": story_type})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    async fn chapter(&self, owner: &str, story: &str, title: &str) -> String {
        let (status, body) = self
            .call(
                "POST",
                &format!("/stories/{story}/chapters"),
                Some(owner),
                Some(json!({"title": title, "content": "..."})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    async fn published_story(&self, owner: &str) -> String {
        let story = self.story(owner, "single").await;
        let (status, _) = self
            .call("POST", &format!("/stories/{story}/publish"), Some(owner), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        story
    }
}

#[tokio::test]
async fn healthz_and_request_id() {
    let h = harness();
    let req = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
    let resp = h.app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let id = resp.headers().get("x-request-id").unwrap().to_str().unwrap();
    assert!(id.starts_with("req-"));
    assert_eq!(resp.headers().get("x-content-type-options").unwrap(), "nosniff");

    let req = Request::builder()
        .uri("/healthz")
        .header("x-request-id", "abc-123")
        .body(Body::empty())
        .unwrap();
    let resp = h.app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.headers().get("x-request-id").unwrap(), "abc-123");
}

#[tokio::test]
async fn mutations_require_a_session() {
    let h = harness();
    let alice = h.register("alice").await;
    let story = h.published_story(&alice).await;

    for (method, uri) in [
        ("POST", format!("/stories/{story}/like")),
        ("POST", format!("/stories/{story}/bookmark")),
        ("POST", "/users/alice/follow".to_string()),
        ("GET", "/todos".to_string()),
        ("GET", "/me/bookmarks".to_string()),
    ] {
        let (status, body) = h.call(method, &uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert_eq!(body["error"], "Authentication required");
    }

    let (status, _) = h
        .call("POST", &format!("/stories/{story}/like"), Some("not-a-real-token-at-all"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_rejects_duplicates_and_bad_input() {
    let h = harness();
    h.register("alice").await;
    let (status, _) = h
        .call("POST", "/register", None, Some(json!({"username": "alice", "token": token("alice2")})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = h
        .call("POST", "/register", None, Some(json!({"username": "Bad Name", "token": token("x")})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, body) = h
        .call("POST", "/register", None, Some(json!({"username": "bob"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn closed_registration_needs_admin_token() {
    let h = harness_with(false);
    let req = json!({"username": "alice", "token": token("alice")});
    let (status, _) = h.call("POST", "/register", None, Some(req.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = h.call("POST", "/register", Some(ADMIN), Some(req)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], "alice");
}

#[tokio::test]
async fn like_toggles_and_counts() {
    let h = harness();
    let alice = h.register("alice").await;
    let bob = h.register("bob").await;
    let story = h.published_story(&alice).await;

    let (status, body) = h.call("POST", &format!("/stories/{story}/like"), Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["liked"], true);
    assert_eq!(body["likeCount"], 1);
    assert_eq!(body["message"], "Story liked");

    let (_, body) = h.call("POST", &format!("/stories/{story}/like"), Some(&alice), None).await;
    assert_eq!(body["likeCount"], 2);

    let (_, body) = h.call("POST", &format!("/stories/{story}/like"), Some(&bob), None).await;
    assert_eq!(body["liked"], false);
    assert_eq!(body["likeCount"], 1);

    let (_, view) = h.call("GET", &format!("/stories/{story}"), Some(&alice), None).await;
    assert_eq!(view["likeCount"], 1);
    assert_eq!(view["liked"], true);

    let (status, _) = h.call("POST", "/stories/missing/like", Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn drafts_are_hidden_from_others() {
    let h = harness();
    let alice = h.register("alice").await;
    let bob = h.register("bob").await;
    let draft = h.story(&alice, "single").await;

    let (status, _) = h.call("GET", &format!("/stories/{draft}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = h.call("POST", &format!("/stories/{draft}/like"), Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = h.call("GET", &format!("/stories/{draft}"), Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isPublished"], false);
}

#[tokio::test]
async fn bookmark_toggle_and_listing() {
    let h = harness();
    let alice = h.register("alice").await;
    let bob = h.register("bob").await;
    let story = h.published_story(&alice).await;

    let (_, body) = h.call("POST", &format!("/stories/{story}/bookmark"), Some(&bob), None).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["bookmarked"], true);
    let (_, list) = h.call("GET", "/me/bookmarks", Some(&bob), None).await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (_, body) = h.call("POST", &format!("/stories/{story}/bookmark"), Some(&bob), None).await;
    assert_eq!(body["bookmarked"], false);
    let (_, list) = h.call("GET", "/me/bookmarks", Some(&bob), None).await;
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn follow_updates_counts_and_rejects_self() {
    let h = harness();
    let alice = h.register("alice").await;
    let bob = h.register("bob").await;

    let (status, body) = h.call("POST", "/users/alice/follow", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["following"], true);
    assert_eq!(body["followerCount"], 1);

    let (_, profile) = h.call("GET", "/users/bob", None, None).await;
    assert_eq!(profile["followingCount"], 1);

    let (status, body) = h.call("POST", "/users/alice/follow", Some(&alice), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = h.call("POST", "/users/nobody/follow", Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = h.call("POST", "/users/alice/follow", Some(&bob), None).await;
    assert_eq!(body["following"], false);
    assert_eq!(body["followerCount"], 0);
}

#[tokio::test]
async fn reorder_requires_exact_set_and_ownership() {
    let h = harness();
    let alice = h.register("alice").await;
    let bob = h.register("bob").await;
    let story = h.story(&alice, "multi").await;
    let a = h.chapter(&alice, &story, "One").await;
    let b = h.chapter(&alice, &story, "Two").await;
    let c = h.chapter(&alice, &story, "Three").await;
    let uri = format!("/stories/{story}/chapters/reorder");

    let (status, _) = h
        .call("POST", &uri, Some(&alice), Some(json!({"chapterIds": [a, b]})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = h
        .call("POST", &uri, Some(&alice), Some(json!({"chapterIds": [a, a, b]})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = h
        .call("POST", &uri, Some(&bob), Some(json!({"chapterIds": [c, b, a]})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = h
        .call("POST", &uri, Some(&alice), Some(json!({"chapterIds": [c, a, b]})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Chapters reordered successfully");
    let order: Vec<&str> = body["chapters"]
        .as_array()
        .unwrap()
        .iter()
        .map(|ch| ch["id"].as_str().unwrap())
        .collect();
    assert_eq!(order, vec![c.as_str(), a.as_str(), b.as_str()]);
}

#[tokio::test]
async fn publish_multi_story_needs_a_chapter() {
    let h = harness();
    let alice = h.register("alice").await;
    let story = h.story(&alice, "multi").await;
    let uri = format!("/stories/{story}/publish");

    let (status, body) = h.call("POST", &uri, Some(&alice), Some(json!({"publish": true}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    h.chapter(&alice, &story, "One").await;
    let (status, body) = h
        .call("POST", &uri, Some(&alice), Some(json!({"publishChapters": true})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isPublished"], true);
    assert_eq!(body["storyId"], story.as_str());

    let (_, chapters) = h.call("GET", &format!("/stories/{story}/chapters"), None, None).await;
    assert_eq!(chapters.as_array().unwrap().len(), 1);

    let (_, body) = h.call("POST", &uri, Some(&alice), Some(json!({"publish": false}))).await;
    assert_eq!(body["isPublished"], false);
    let (status, _) = h.call("GET", &format!("/stories/{story}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bulk_actions_apply_to_listed_chapters() {
    let h = harness();
    let alice = h.register("alice").await;
    let bob = h.register("bob").await;
    let story = h.story(&alice, "multi").await;
    let a = h.chapter(&alice, &story, "One").await;
    let b = h.chapter(&alice, &story, "Two").await;
    let c = h.chapter(&alice, &story, "Three").await;
    let uri = format!("/stories/{story}/chapters/bulk");

    let (status, _) = h
        .call("POST", &uri, Some(&bob), Some(json!({"action": "publish"})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = h
        .call("POST", &uri, Some(&alice), Some(json!({"action": "publish", "chapterIds": []})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = h
        .call("POST", &uri, Some(&alice), Some(json!({"action": "setPublished"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = h
        .call("POST", &uri, Some(&alice), Some(json!({"action": "explode"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = h
        .call("POST", &uri, Some(&alice), Some(json!({"action": "publish", "chapterIds": [a, c]})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["affected"], 2);

    let (_, public) = h.call("GET", &format!("/stories/{story}/chapters"), None, None).await;
    let ids: Vec<&str> = public.as_array().unwrap().iter().map(|ch| ch["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec![a.as_str(), c.as_str()]);

    let (status, body) = h
        .call("POST", &uri, Some(&alice), Some(json!({"action": "delete", "chapterIds": [a]})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["affected"], 1);
    let (_, all) = h.call("GET", &format!("/stories/{story}/chapters"), Some(&alice), None).await;
    let order: Vec<(String, i64)> = all
        .as_array()
        .unwrap()
        .iter()
        .map(|ch| (ch["id"].as_str().unwrap().to_string(), ch["orderIndex"].as_i64().unwrap()))
        .collect();
    assert_eq!(order, vec![(b, 0), (c, 1)]);
}

#[tokio::test]
async fn comments_and_comment_likes() {
    let h = harness();
    let alice = h.register("alice").await;
    let bob = h.register("bob").await;
    let story = h.published_story(&alice).await;

    let (status, comment) = h
        .call(
            "POST",
            &format!("/stories/{story}/comments"),
            Some(&bob),
            Some(json!({"content": "Beautiful opening"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let comment_id = comment["id"].as_str().unwrap().to_string();

    let (_, body) = h.call("POST", &format!("/comments/{comment_id}/like"), Some(&alice), None).await;
    assert_eq!(body["liked"], true);
    assert_eq!(body["likeCount"], 1);

    let (_, list) = h.call("GET", &format!("/stories/{story}/comments"), None, None).await;
    assert_eq!(list[0]["likeCount"], 1);

    let (status, body) = h.call("DELETE", &format!("/comments/{comment_id}"), Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Comment deleted");
    let (_, view) = h.call("GET", &format!("/stories/{story}"), None, None).await;
    assert_eq!(view["commentCount"], 0);
}

#[tokio::test]
async fn todos_crud_is_per_user() {
    let h = harness();
    let alice = h.register("alice").await;
    let bob = h.register("bob").await;

    let (status, todo) = h
        .call("POST", "/todos", Some(&alice), Some(json!({"title": "Draft chapter 4", "description": "twist"})))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = todo["id"].as_str().unwrap().to_string();
    let uri = format!("/todos/{id}");

    let (status, _) = h.call("PUT", &uri, Some(&bob), Some(json!({"completed": true}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, todo) = h
        .call("PUT", &uri, Some(&alice), Some(json!({"completed": true, "description": null})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(todo["completed"], true);
    assert_eq!(todo["description"], Value::Null);
    assert_eq!(todo["title"], "Draft chapter 4");

    let (_, list) = h.call("GET", "/todos", Some(&bob), None).await;
    assert!(list.as_array().unwrap().is_empty());

    let (status, body) = h.call("DELETE", &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Todo deleted");
    let (status, _) = h.call("DELETE", &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sign_out_revokes_the_token() {
    let h = harness();
    let alice = h.register("alice").await;
    let (status, _) = h.call("DELETE", "/sessions/current", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = h.call("GET", "/todos", Some(&alice), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn reconcile_is_admin_only() {
    let h = harness();
    let alice = h.register("alice").await;
    let (status, _) = h.call("POST", "/admin/reconcile", Some(&alice), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, body) = h.call("POST", "/admin/reconcile", Some(ADMIN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["corrected"], 0);
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let h = harness();
    let (status, body) = h.call("GET", "/nope", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not found");
}

#[tokio::test]
async fn wrong_method_is_json_405() {
    let h = harness();
    let req = Request::builder().method("DELETE").uri("/todos").body(Body::empty()).unwrap();
    let resp = h.app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    let allow = resp.headers().get("allow").unwrap().to_str().unwrap().to_string();
    assert!(allow.contains("GET") && allow.contains("POST"), "{allow}");
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "Method not allowed");

    let (status, body) = h.call("GET", "/stories/abc/like", None, None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"], "Method not allowed");
}
