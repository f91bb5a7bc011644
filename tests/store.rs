//! Database behavior. These need a live Postgres behind `DATABASE_URL`:
//! `cargo test -- --ignored`.

use foodgram_sdk::{
    actions::{self, RecipeFilter},
    error::ApiError,
    jwt::SessionData,
    schema::{Id, NewIngredient, RecipeList, User},
    shopping_list::render,
    validator::{IngredientAmount, RecipeDraft, Registration},
};
use sqlx::PgPool;

async fn user(name: &str, pool: &PgPool) -> User {
    actions::register_user(
        Registration {
            email: format!("{name}@example.com"),
            username: name.to_string(),
            first_name: "Test".into(),
            last_name: "User".into(),
            password: "password123".into(),
        },
        pool,
    )
    .await
    .unwrap()
}

async fn ingredient(name: &str, unit: &str, pool: &PgPool) -> Id {
    actions::import_ingredients(
        vec![NewIngredient {
            name: name.into(),
            measurement_unit: unit.into(),
        }],
        pool,
    )
    .await
    .unwrap();

    let row: (Id,) = sqlx::query_as("SELECT id FROM ingredients WHERE name = $1")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap();
    row.0
}

async fn tag_id(slug: &str, pool: &PgPool) -> Id {
    actions::list_tags(pool)
        .await
        .unwrap()
        .into_iter()
        .find(|t| t.slug == slug)
        .map(|t| t.id)
        .unwrap()
}

fn draft(name: &str, parts: Vec<IngredientAmount>, tags: Vec<Id>) -> RecipeDraft {
    RecipeDraft {
        name: name.into(),
        text: "Mix everything.".into(),
        cooking_time: 15,
        image: None,
        ingredients: parts,
        tags,
    }
}

async fn count(table: &str, recipe_id: Id, pool: &PgPool) -> i64 {
    let row: (i64,) = sqlx::query_as(&format!(
        "SELECT COUNT(*) FROM {table} WHERE recipe_id = $1"
    ))
    .bind(recipe_id)
    .fetch_one(pool)
    .await
    .unwrap();
    row.0
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn favoriting_twice_is_a_conflict(pool: PgPool) {
    let cook = user("cook", &pool).await;
    let flour = ingredient("Flour", "g", &pool).await;
    let breakfast = tag_id("breakfast", &pool).await;
    let recipe = actions::create_recipe(
        cook.id,
        &draft("Bread", vec![IngredientAmount { id: flour, amount: 500 }], vec![breakfast]),
        &pool,
    )
    .await
    .unwrap();

    actions::add_to_list(RecipeList::Favorites, recipe, cook.id, &pool)
        .await
        .unwrap();
    let second = actions::add_to_list(RecipeList::Favorites, recipe, cook.id, &pool).await;

    assert!(matches!(second, Err(ApiError::Conflict(_))));
    assert_eq!(count("favorites", recipe, &pool).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn deleting_a_recipe_cascades_to_its_rows_only(pool: PgPool) {
    let cook = user("cook", &pool).await;
    let flour = ingredient("Flour", "g", &pool).await;
    let lunch = tag_id("lunch", &pool).await;
    let parts = vec![IngredientAmount { id: flour, amount: 100 }];

    let doomed = actions::create_recipe(cook.id, &draft("Doomed", parts.clone(), vec![lunch]), &pool)
        .await
        .unwrap();
    let kept = actions::create_recipe(cook.id, &draft("Kept", parts, vec![lunch]), &pool)
        .await
        .unwrap();

    for recipe in [doomed, kept] {
        for list in [RecipeList::Favorites, RecipeList::ShoppingCart] {
            actions::add_to_list(list, recipe, cook.id, &pool).await.unwrap();
        }
    }

    actions::delete_recipe(doomed, &pool).await.unwrap();

    for table in ["favorites", "shopping_cart", "recipe_ingredients", "recipe_tags"] {
        assert_eq!(count(table, doomed, &pool).await, 0, "{table}");
        assert_eq!(count(table, kept, &pool).await, 1, "{table}");
    }
    assert!(actions::get_recipe(doomed, &pool).await.unwrap().is_none());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn failed_writes_leave_nothing_behind(pool: PgPool) {
    let cook = user("cook", &pool).await;
    let flour = ingredient("Flour", "g", &pool).await;
    let dinner = tag_id("dinner", &pool).await;

    let result = actions::create_recipe(
        cook.id,
        &draft(
            "Broken",
            vec![
                IngredientAmount { id: flour, amount: 100 },
                IngredientAmount { id: flour + 1000, amount: 1 },
            ],
            vec![dinner],
        ),
        &pool,
    )
    .await;
    assert!(result.is_err());

    let recipes: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(recipes.0, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn shopping_list_sums_shared_ingredients(pool: PgPool) {
    let cook = user("cook", &pool).await;
    let flour = ingredient("Flour", "g", &pool).await;
    let milk = ingredient("Milk", "ml", &pool).await;
    let breakfast = tag_id("breakfast", &pool).await;

    let pancakes = actions::create_recipe(
        cook.id,
        &draft(
            "Pancakes",
            vec![
                IngredientAmount { id: flour, amount: 100 },
                IngredientAmount { id: milk, amount: 200 },
            ],
            vec![breakfast],
        ),
        &pool,
    )
    .await
    .unwrap();
    let crepes = actions::create_recipe(
        cook.id,
        &draft("Crepes", vec![IngredientAmount { id: flour, amount: 50 }], vec![breakfast]),
        &pool,
    )
    .await
    .unwrap();

    assert!(matches!(
        actions::shopping_list(cook.id, &pool).await,
        Err(ApiError::EmptyCart)
    ));

    for recipe in [pancakes, crepes] {
        actions::add_to_list(RecipeList::ShoppingCart, recipe, cook.id, &pool)
            .await
            .unwrap();
    }

    let lines = actions::shopping_list(cook.id, &pool).await.unwrap();
    assert_eq!(
        render(&lines),
        "Shopping list\n\n1. Flour (g) - 150\n2. Milk (ml) - 200\n"
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn subscriptions_reject_self_and_duplicates(pool: PgPool) {
    let reader = user("reader", &pool).await;
    let author = user("author", &pool).await;

    assert!(matches!(
        actions::subscribe(reader.id, reader.id, &pool).await,
        Err(ApiError::BadRequest(_))
    ));

    actions::subscribe(reader.id, author.id, &pool).await.unwrap();
    assert!(matches!(
        actions::subscribe(reader.id, author.id, &pool).await,
        Err(ApiError::Conflict(_))
    ));

    let views = actions::user_views(&[author.clone()], Some(reader.id), &pool)
        .await
        .unwrap();
    assert!(views[0].is_subscribed);

    actions::unsubscribe(reader.id, author.id, &pool).await.unwrap();
    assert!(matches!(
        actions::unsubscribe(reader.id, author.id, &pool).await,
        Err(ApiError::BadRequest(_))
    ));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn listing_filters_by_tag_and_favorites(pool: PgPool) {
    let cook = user("cook", &pool).await;
    let flour = ingredient("Flour", "g", &pool).await;
    let breakfast = tag_id("breakfast", &pool).await;
    let dinner = tag_id("dinner", &pool).await;
    let parts = vec![IngredientAmount { id: flour, amount: 10 }];

    let porridge = actions::create_recipe(cook.id, &draft("Porridge", parts.clone(), vec![breakfast]), &pool)
        .await
        .unwrap();
    let stew = actions::create_recipe(cook.id, &draft("Stew", parts, vec![dinner]), &pool)
        .await
        .unwrap();
    actions::add_to_list(RecipeList::Favorites, stew, cook.id, &pool)
        .await
        .unwrap();

    let by_tag = RecipeFilter {
        tags: vec!["breakfast".into()],
        ..RecipeFilter::default()
    };
    let found = actions::fetch_recipes(&by_tag, None, &pool).await.unwrap();
    assert_eq!(found.iter().map(|r| r.id).collect::<Vec<_>>(), vec![porridge]);

    let favorites = RecipeFilter {
        is_favorited: true,
        ..RecipeFilter::default()
    };
    let found = actions::fetch_recipes(&favorites, Some(cook.id), &pool).await.unwrap();
    assert_eq!(found.iter().map(|r| r.id).collect::<Vec<_>>(), vec![stew]);

    // anonymous viewers get the unfiltered listing, newest first
    let found = actions::fetch_recipes(&favorites, None, &pool).await.unwrap();
    assert_eq!(found.iter().map(|r| r.id).collect::<Vec<_>>(), vec![stew, porridge]);

    let views = actions::recipe_views(found, Some(cook.id), &pool).await.unwrap();
    assert!(views[0].is_favorited);
    assert!(!views[1].is_favorited);
    assert_eq!(views[0].ingredients[0].amount, 10);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn updating_replaces_ingredients_and_tags(pool: PgPool) {
    let cook = user("cook", &pool).await;
    let flour = ingredient("Flour", "g", &pool).await;
    let sugar = ingredient("Sugar", "g", &pool).await;
    let breakfast = tag_id("breakfast", &pool).await;
    let dinner = tag_id("dinner", &pool).await;

    let recipe = actions::create_recipe(
        cook.id,
        &draft("Cake", vec![IngredientAmount { id: flour, amount: 300 }], vec![breakfast]),
        &pool,
    )
    .await
    .unwrap();

    actions::update_recipe(
        recipe,
        &draft("Cake", vec![IngredientAmount { id: sugar, amount: 7 }], vec![dinner]),
        &pool,
    )
    .await
    .unwrap();

    let parts: Vec<(Id, i32)> = sqlx::query_as(
        "SELECT ingredient_id, amount FROM recipe_ingredients WHERE recipe_id = $1",
    )
    .bind(recipe)
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(parts, vec![(sugar, 7)]);

    let tags: Vec<(Id,)> = sqlx::query_as("SELECT tag_id FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe)
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(tags, vec![(dinner,)]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn only_the_author_may_change_a_recipe(pool: PgPool) {
    let cook = user("cook", &pool).await;
    let guest = user("guest", &pool).await;
    let flour = ingredient("Flour", "g", &pool).await;
    let lunch = tag_id("lunch", &pool).await;

    let recipe = actions::create_recipe(
        cook.id,
        &draft("Pie", vec![IngredientAmount { id: flour, amount: 250 }], vec![lunch]),
        &pool,
    )
    .await
    .unwrap();

    let session = |user: &User| SessionData {
        user_id: user.id,
        email: user.email.clone(),
    };

    assert!(matches!(
        actions::get_recipe_mut(recipe, &session(&guest), &pool).await,
        Err(ApiError::Forbidden)
    ));
    assert_eq!(
        actions::get_recipe_mut(recipe, &session(&cook), &pool)
            .await
            .unwrap()
            .id,
        recipe
    );
    assert!(matches!(
        actions::get_recipe_mut(recipe + 1, &session(&cook), &pool).await,
        Err(ApiError::NotFound(_))
    ));
}
