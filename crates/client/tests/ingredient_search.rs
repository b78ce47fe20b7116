//! Ingredient search against a mock recipe API.

use rust_decimal::Decimal;
use secrecy::SecretString;
use url::Url;
use vendor_connect_client::config::IngredientConfig;
use vendor_connect_client::ingredients::{IngredientClient, IngredientError};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> IngredientClient {
    IngredientClient::new(&IngredientConfig {
        base_url: Url::parse(&server.uri()).expect("mock server uri"),
        api_key: SecretString::from("test-key"),
    })
}

#[tokio::test]
async fn search_maps_first_recipe_ingredients() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/recipes/complexSearch"))
        .and(query_param("query", "pav bhaji"))
        .and(query_param("apiKey", "test-key"))
        .and(query_param("number", "1"))
        .and(query_param("fillIngredients", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [{
                "id": 715415,
                "title": "Pav Bhaji",
                "extendedIngredients": [
                    { "id": 11352, "name": "potato", "amount": 2.0, "unit": "large",
                      "image": "potatoes-yukon-gold.png" },
                    { "id": 11282, "name": "onion", "unit": "" }
                ]
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ingredients = client_for(&server)
        .search_dish_ingredients("pav bhaji")
        .await
        .expect("search");

    assert_eq!(ingredients.len(), 2);

    let potato = ingredients.first().expect("potato");
    assert_eq!(potato.name, "potato");
    assert_eq!(potato.amount, Decimal::new(2, 0));
    assert_eq!(potato.unit, "large");
    assert_eq!(potato.image.as_deref(), Some("potatoes-yukon-gold.png"));

    // Missing amount and empty unit fall back to defaults.
    let onion = ingredients.get(1).expect("onion");
    assert_eq!(onion.amount, Decimal::ONE);
    assert_eq!(onion.unit, "piece");
}

#[tokio::test]
async fn search_with_no_results_returns_empty_list() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/recipes/complexSearch"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "results": [] })),
        )
        .mount(&server)
        .await;

    let ingredients = client_for(&server)
        .search_dish_ingredients("nonexistent dish")
        .await
        .expect("search");

    assert!(ingredients.is_empty());
}

#[tokio::test]
async fn search_surfaces_api_errors_with_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/recipes/complexSearch"))
        .respond_with(ResponseTemplate::new(402).set_body_string("quota exceeded"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .search_dish_ingredients("anything")
        .await
        .expect_err("quota error");

    match err {
        IngredientError::Api { status, message } => {
            assert_eq!(status, 402);
            assert_eq!(message, "quota exceeded");
        }
        IngredientError::Http(_) => panic!("expected an API error"),
    }
}
