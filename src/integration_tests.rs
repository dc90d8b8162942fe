// ABOUTME: Integration tests for API endpoints
// ABOUTME: Exercises auth, toggle conflict semantics, and the download contract

#[cfg(test)]
mod tests {
    use super::super::*;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{Value, json};
    use serial_test::serial;
    use std::sync::Arc;
    use tempfile::TempDir;
    use uuid::Uuid;

    async fn create_test_app() -> (TestServer, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
        let storage = Arc::new(Storage::connect(&db_url).await.unwrap());
        let sessions = SessionStore::new();

        let state = AppState { storage, sessions };

        let mut server = TestServer::new(build_router(state)).unwrap();
        server.do_save_cookies();
        (server, temp_dir)
    }

    async fn register(server: &TestServer, username: &str) -> Value {
        let response = server
            .post("/register")
            .json(&json!({
                "email": format!("{}@example.com", username),
                "username": username,
                "first_name": "Test",
                "last_name": "User",
                "password": "correct horse battery staple",
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json()
    }

    async fn login(server: &TestServer, username: &str) {
        let response = server
            .post("/login")
            .json(&json!({
                "email": format!("{}@example.com", username),
                "password": "correct horse battery staple",
            }))
            .await;
        response.assert_status_ok();
    }

    async fn create_ingredient(server: &TestServer, name: &str, unit: &str) -> Uuid {
        let response = server
            .post("/ingredients")
            .json(&json!({ "name": name, "unit": unit }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        body["id"].as_str().unwrap().parse().unwrap()
    }

    async fn create_recipe(server: &TestServer, name: &str, lines: &[(Uuid, i32)]) -> Uuid {
        let ingredients: Vec<Value> = lines
            .iter()
            .map(|(id, quantity)| json!({ "ingredient_id": id, "quantity": quantity }))
            .collect();
        let response = server
            .post("/recipes")
            .json(&json!({
                "name": name,
                "description": "test recipe",
                "cooking_time": 30,
                "ingredients": ingredients,
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        body["id"].as_str().unwrap().parse().unwrap()
    }

    #[tokio::test]
    #[serial]
    async fn test_register_and_login_flow() {
        let (server, _temp_dir) = create_test_app().await;

        let user = register(&server, "alice").await;
        assert_eq!(user["username"], "alice");
        assert_eq!(user["is_subscribed"], false);

        login(&server, "alice").await;

        let response = server.get("/cart").await;
        response.assert_status_ok();
        let cart: Value = response.json();
        assert_eq!(cart.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    #[serial]
    async fn test_register_duplicate_email_conflict() {
        let (server, _temp_dir) = create_test_app().await;

        register(&server, "alice").await;

        let response = server
            .post("/register")
            .json(&json!({
                "email": "alice@example.com",
                "username": "alice2",
                "first_name": "Test",
                "last_name": "User",
                "password": "correct horse battery staple",
            }))
            .await;
        response.assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    #[serial]
    async fn test_login_wrong_password_rejected() {
        let (server, _temp_dir) = create_test_app().await;

        register(&server, "alice").await;

        let response = server
            .post("/login")
            .json(&json!({
                "email": "alice@example.com",
                "password": "wrong",
            }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    #[serial]
    async fn test_protected_endpoints_require_auth() {
        let (server, _temp_dir) = create_test_app().await;

        for path in ["/cart", "/favorites", "/subscriptions", "/cart/download"] {
            let response = server.get(path).await;
            response.assert_status(StatusCode::UNAUTHORIZED);
        }

        let response = server
            .post("/recipes")
            .json(&json!({
                "name": "x",
                "description": "x",
                "cooking_time": 5,
                "ingredients": [],
            }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    #[serial]
    async fn test_recipe_validation() {
        let (server, _temp_dir) = create_test_app().await;

        register(&server, "cook").await;
        login(&server, "cook").await;

        let sugar = create_ingredient(&server, "Sugar", "g").await;

        // Empty ingredient list
        let response = server
            .post("/recipes")
            .json(&json!({
                "name": "Nothing",
                "description": "empty",
                "cooking_time": 5,
                "ingredients": [],
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        // Quantity out of bounds
        let response = server
            .post("/recipes")
            .json(&json!({
                "name": "Too much",
                "description": "x",
                "cooking_time": 5,
                "ingredients": [{ "ingredient_id": sugar, "quantity": 32001 }],
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        // Unknown ingredient
        let response = server
            .post("/recipes")
            .json(&json!({
                "name": "Ghost",
                "description": "x",
                "cooking_time": 5,
                "ingredients": [{ "ingredient_id": Uuid::new_v4(), "quantity": 10 }],
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        // Repeated ingredient
        let response = server
            .post("/recipes")
            .json(&json!({
                "name": "Double sugar",
                "description": "x",
                "cooking_time": 5,
                "ingredients": [
                    { "ingredient_id": sugar, "quantity": 10 },
                    { "ingredient_id": sugar, "quantity": 20 },
                ],
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    #[serial]
    async fn test_only_author_may_edit() {
        let (server, _temp_dir) = create_test_app().await;

        register(&server, "author").await;
        login(&server, "author").await;
        let sugar = create_ingredient(&server, "Sugar", "g").await;
        let recipe_id = create_recipe(&server, "Cake", &[(sugar, 100)]).await;

        register(&server, "intruder").await;
        login(&server, "intruder").await;

        let response = server
            .put(&format!("/recipes/{}", recipe_id))
            .json(&json!({
                "name": "Hijacked",
                "description": "x",
                "cooking_time": 1,
                "ingredients": [{ "ingredient_id": sugar, "quantity": 1 }],
            }))
            .await;
        response.assert_status(StatusCode::FORBIDDEN);

        let response = server.delete(&format!("/recipes/{}", recipe_id)).await;
        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    #[serial]
    async fn test_favorite_toggle_conflicts() {
        let (server, _temp_dir) = create_test_app().await;

        register(&server, "fan").await;
        login(&server, "fan").await;
        let sugar = create_ingredient(&server, "Sugar", "g").await;
        let recipe_id = create_recipe(&server, "Cake", &[(sugar, 100)]).await;

        let path = format!("/recipes/{}/favorite", recipe_id);

        server.post(&path).await.assert_status(StatusCode::CREATED);
        server.post(&path).await.assert_status(StatusCode::CONFLICT);

        server.delete(&path).await.assert_status_ok();
        server.delete(&path).await.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    #[serial]
    async fn test_cart_toggle_conflicts() {
        let (server, _temp_dir) = create_test_app().await;

        register(&server, "shopper").await;
        login(&server, "shopper").await;
        let sugar = create_ingredient(&server, "Sugar", "g").await;
        let recipe_id = create_recipe(&server, "Cake", &[(sugar, 100)]).await;

        let path = format!("/recipes/{}/cart", recipe_id);

        server.post(&path).await.assert_status(StatusCode::CREATED);
        server.post(&path).await.assert_status(StatusCode::CONFLICT);

        server.delete(&path).await.assert_status_ok();
        server.delete(&path).await.assert_status(StatusCode::NOT_FOUND);

        // Adding to the cart of an unknown recipe is a 404, not a 500
        let response = server
            .post(&format!("/recipes/{}/cart", Uuid::new_v4()))
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    #[serial]
    async fn test_download_shopping_list() {
        let (server, _temp_dir) = create_test_app().await;

        register(&server, "shopper").await;
        login(&server, "shopper").await;

        let sugar = create_ingredient(&server, "Sugar", "g").await;
        let eggs = create_ingredient(&server, "Eggs", "pcs").await;

        let cake = create_recipe(&server, "Cake", &[(sugar, 100), (eggs, 2)]).await;
        let candy = create_recipe(&server, "Candy", &[(sugar, 50)]).await;

        server
            .post(&format!("/recipes/{}/cart", cake))
            .await
            .assert_status(StatusCode::CREATED);
        server
            .post(&format!("/recipes/{}/cart", candy))
            .await
            .assert_status(StatusCode::CREATED);

        let response = server.get("/cart/download").await;
        response.assert_status_ok();
        assert_eq!(response.header("content-type"), "text/plain");
        assert_eq!(
            response.header("content-disposition"),
            "attachment; filename=\"shopping_list.txt\""
        );
        assert_eq!(response.text(), "Eggs (pcs) — 2\nSugar (g) — 150");
    }

    #[tokio::test]
    #[serial]
    async fn test_download_merges_duplicate_ingredient_rows() {
        let (server, _temp_dir) = create_test_app().await;

        register(&server, "shopper").await;
        login(&server, "shopper").await;

        // Two distinct ingredient rows sharing (name, unit)
        let salt_a = create_ingredient(&server, "Salt", "g").await;
        let salt_b = create_ingredient(&server, "Salt", "g").await;
        assert_ne!(salt_a, salt_b);

        let soup = create_recipe(&server, "Soup", &[(salt_a, 5)]).await;
        let broth = create_recipe(&server, "Broth", &[(salt_b, 7)]).await;

        server
            .post(&format!("/recipes/{}/cart", soup))
            .await
            .assert_status(StatusCode::CREATED);
        server
            .post(&format!("/recipes/{}/cart", broth))
            .await
            .assert_status(StatusCode::CREATED);

        let response = server.get("/cart/download").await;
        response.assert_status_ok();
        assert_eq!(response.text(), "Salt (g) — 12");
    }

    #[tokio::test]
    #[serial]
    async fn test_download_empty_cart() {
        let (server, _temp_dir) = create_test_app().await;

        register(&server, "shopper").await;
        login(&server, "shopper").await;

        let response = server.get("/cart/download").await;
        response.assert_status_ok();
        assert_eq!(response.header("content-type"), "text/plain");
        assert_eq!(
            response.header("content-disposition"),
            "attachment; filename=\"shopping_list.txt\""
        );
        assert_eq!(response.text(), "");
    }

    #[tokio::test]
    #[serial]
    async fn test_download_is_deterministic() {
        let (server, _temp_dir) = create_test_app().await;

        register(&server, "shopper").await;
        login(&server, "shopper").await;

        let flour = create_ingredient(&server, "Flour", "g").await;
        let eggs = create_ingredient(&server, "Eggs", "pcs").await;
        let bread = create_recipe(&server, "Bread", &[(flour, 500), (eggs, 1)]).await;

        server
            .post(&format!("/recipes/{}/cart", bread))
            .await
            .assert_status(StatusCode::CREATED);

        let first = server.get("/cart/download").await.text();
        let second = server.get("/cart/download").await.text();
        assert_eq!(first, second);
    }

    #[tokio::test]
    #[serial]
    async fn test_follow_flow() {
        let (server, _temp_dir) = create_test_app().await;

        let author = register(&server, "author").await;
        let author_id = author["id"].as_str().unwrap().to_string();
        let reader = register(&server, "reader").await;
        let reader_id = reader["id"].as_str().unwrap().to_string();

        login(&server, "reader").await;

        let path = format!("/users/{}/follow", author_id);
        server.post(&path).await.assert_status(StatusCode::CREATED);
        server.post(&path).await.assert_status(StatusCode::CONFLICT);

        // Self-follow is rejected outright
        let response = server.post(&format!("/users/{}/follow", reader_id)).await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let response = server.get("/subscriptions").await;
        response.assert_status_ok();
        let subscriptions: Value = response.json();
        assert_eq!(subscriptions.as_array().unwrap().len(), 1);
        assert_eq!(subscriptions[0]["username"], "author");
        assert_eq!(subscriptions[0]["is_subscribed"], true);

        server.delete(&path).await.assert_status_ok();
        server.delete(&path).await.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    #[serial]
    async fn test_recipe_listing_marks_viewer_state() {
        let (server, _temp_dir) = create_test_app().await;

        register(&server, "cook").await;
        login(&server, "cook").await;

        let sugar = create_ingredient(&server, "Sugar", "g").await;
        let cake = create_recipe(&server, "Cake", &[(sugar, 100)]).await;
        let pie = create_recipe(&server, "Pie", &[(sugar, 50)]).await;

        server
            .post(&format!("/recipes/{}/favorite", cake))
            .await
            .assert_status(StatusCode::CREATED);
        server
            .post(&format!("/recipes/{}/cart", pie))
            .await
            .assert_status(StatusCode::CREATED);

        let response = server.get("/recipes").await;
        response.assert_status_ok();
        let recipes: Value = response.json();
        let list = recipes.as_array().unwrap();
        assert_eq!(list.len(), 2);

        for entry in list {
            if entry["name"] == "Cake" {
                assert_eq!(entry["is_favorited"], true);
                assert_eq!(entry["is_in_cart"], false);
            } else {
                assert_eq!(entry["is_favorited"], false);
                assert_eq!(entry["is_in_cart"], true);
            }
        }
    }

    #[tokio::test]
    #[serial]
    async fn test_set_password_flow() {
        let (server, _temp_dir) = create_test_app().await;

        register(&server, "alice").await;
        login(&server, "alice").await;

        // Wrong current password
        let response = server
            .post("/set_password")
            .json(&json!({
                "old_password": "wrong",
                "new_password": "a new password entirely",
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let response = server
            .post("/set_password")
            .json(&json!({
                "old_password": "correct horse battery staple",
                "new_password": "a new password entirely",
            }))
            .await;
        response.assert_status_ok();

        // Old credentials no longer work
        let response = server
            .post("/login")
            .json(&json!({
                "email": "alice@example.com",
                "password": "correct horse battery staple",
            }))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);

        let response = server
            .post("/login")
            .json(&json!({
                "email": "alice@example.com",
                "password": "a new password entirely",
            }))
            .await;
        response.assert_status_ok();
    }
}
