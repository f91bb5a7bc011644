use std::collections::HashSet;

use crate::{
    error::{ApiError, QueryError, QueryErrorKind, ValidationErrors},
    form::Form,
    jwt::SessionData,
    projection::{assemble, RecipeRows, RecipeView, ViewerContext},
    schema::{Id, Recipe, RecipeList},
    validator::{referenced_ids, RecipeDraft, ValidationContext},
};

use sqlx::{Pool, Postgres, QueryBuilder};

use super::{
    following_ids, get_users_by_ids, known_ingredient_ids, known_tag_ids, list_membership,
    list_recipe_parts, list_recipe_tags, replace_recipe_parts, replace_recipe_tags,
};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecipeFilter {
    pub author: Option<Id>,
    pub tags: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

fn flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => Some(true),
        "0" | "false" | "" => Some(false),
        _ => None,
    }
}

impl RecipeFilter {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Result<Self, ValidationErrors> {
        let mut filter = RecipeFilter::default();
        let mut errors = ValidationErrors::new();

        for (key, value) in pairs {
            match key.as_str() {
                "author" => match value.trim().parse::<Id>() {
                    Ok(id) => filter.author = Some(id),
                    Err(_) => errors.add("author", "A valid integer is required."),
                },
                "tags" => {
                    let slug = value.trim();
                    if !slug.is_empty() && !filter.tags.iter().any(|t| t == slug) {
                        filter.tags.push(slug.to_string());
                    }
                }
                "is_favorited" => match flag(&value) {
                    Some(v) => filter.is_favorited = v,
                    None => errors.add("is_favorited", "Expected 0 or 1."),
                },
                "is_in_shopping_cart" => match flag(&value) {
                    Some(v) => filter.is_in_shopping_cart = v,
                    None => errors.add("is_in_shopping_cart", "Expected 0 or 1."),
                },
                _ => {}
            }
        }

        errors.finish(filter)
    }
}

pub async fn fetch_recipes(
    filter: &RecipeFilter,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Recipe>, ApiError> {
    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT r.* FROM recipes r WHERE TRUE");

    if let Some(author) = filter.author {
        query_builder.push(" AND r.author_id = ").push_bind(author);
    }
    if !filter.tags.is_empty() {
        query_builder
            .push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt JOIN tags t ON t.id = rt.tag_id \
                 WHERE rt.recipe_id = r.id AND t.slug = ANY(",
            )
            .push_bind(filter.tags.clone())
            .push("))");
    }
    if let Some(viewer) = viewer {
        for (enabled, list) in [
            (filter.is_favorited, RecipeList::Favorites),
            (filter.is_in_shopping_cart, RecipeList::ShoppingCart),
        ] {
            if enabled {
                query_builder
                    .push(format!(
                        " AND EXISTS (SELECT 1 FROM {} l WHERE l.recipe_id = r.id AND l.user_id = ",
                        list.table()
                    ))
                    .push_bind(viewer)
                    .push(")");
            }
        }
    }
    query_builder.push(" ORDER BY r.created_at DESC, r.id DESC");

    let rows: Vec<Recipe> = query_builder
        .build_query_as::<Recipe>()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn get_recipe(id: Id, pool: &Pool<Postgres>) -> Result<Option<Recipe>, ApiError> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

/// Loads a recipe the session is allowed to change: 404 when it does not
/// exist, 403 when the caller is not its author.
pub async fn get_recipe_mut(
    id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, ApiError> {
    match get_recipe(id, pool).await? {
        Some(recipe) if recipe.author_id == session.user_id => Ok(recipe),
        Some(_) => Err(ApiError::Forbidden),
        None => Err(ApiError::not_found("Recipe")),
    }
}

async fn recipe_name_taken(
    name: &str,
    exclude: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<bool, ApiError> {
    let row: (bool,) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM recipes WHERE LOWER(name) = LOWER($1) AND id IS DISTINCT FROM $2)",
    )
    .bind(name.trim())
    .bind(exclude)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row.0)
}

/// Resolves the database facts a recipe payload refers to. `exclude` is the
/// recipe being edited, so it does not clash with its own name.
pub async fn validation_context(
    form: &Form,
    exclude: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<ValidationContext, ApiError> {
    let referenced = referenced_ids(form);

    let name_taken = match &referenced.name {
        Some(name) if !name.trim().is_empty() => recipe_name_taken(name, exclude, pool).await?,
        _ => false,
    };

    Ok(ValidationContext {
        ingredient_ids: known_ingredient_ids(&referenced.ingredients, pool).await?,
        tag_ids: known_tag_ids(&referenced.tags, pool).await?,
        name_taken,
    })
}

fn name_conflict(e: sqlx::Error) -> ApiError {
    match QueryError::from(e) {
        e if e.kind() == QueryErrorKind::UniqueViolation => ApiError::Validation(
            ValidationErrors::single("name", "A recipe with this name already exists."),
        ),
        e => e.into(),
    }
}

pub async fn create_recipe(
    author_id: Id,
    draft: &RecipeDraft,
    pool: &Pool<Postgres>,
) -> Result<Id, ApiError> {
    let mut tx = pool.begin().await.map_err(QueryError::from)?;

    let id: (Id,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, text, cooking_time, image)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(author_id)
    .bind(&draft.name)
    .bind(&draft.text)
    .bind(draft.cooking_time)
    .bind(&draft.image)
    .fetch_one(&mut *tx)
    .await
    .map_err(name_conflict)?;

    replace_recipe_parts(id.0, &draft.ingredients, &mut tx).await?;
    replace_recipe_tags(id.0, &draft.tags, &mut tx).await?;

    tx.commit().await.map_err(QueryError::from)?;

    log::info!("User {author_id} created recipe {}", id.0);

    Ok(id.0)
}

pub async fn update_recipe(id: Id, draft: &RecipeDraft, pool: &Pool<Postgres>) -> Result<(), ApiError> {
    let mut tx = pool.begin().await.map_err(QueryError::from)?;

    let result = sqlx::query(
        "UPDATE recipes SET name = $1, text = $2, cooking_time = $3, image = $4 WHERE id = $5",
    )
    .bind(&draft.name)
    .bind(&draft.text)
    .bind(draft.cooking_time)
    .bind(&draft.image)
    .bind(id)
    .execute(&mut *tx)
    .await
    .map_err(name_conflict)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Recipe"));
    }

    replace_recipe_parts(id, &draft.ingredients, &mut tx).await?;
    replace_recipe_tags(id, &draft.tags, &mut tx).await?;

    tx.commit().await.map_err(QueryError::from)?;

    Ok(())
}

pub async fn delete_recipe(id: Id, pool: &Pool<Postgres>) -> Result<(), ApiError> {
    let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Recipe"));
    }

    log::info!("Deleted recipe {id}");

    Ok(())
}

pub async fn load_recipe_rows(recipes: Vec<Recipe>, pool: &Pool<Postgres>) -> Result<RecipeRows, ApiError> {
    let recipe_ids: Vec<Id> = recipes.iter().map(|r| r.id).collect();

    let mut seen = HashSet::new();
    let author_ids: Vec<Id> = recipes
        .iter()
        .map(|r| r.author_id)
        .filter(|id| seen.insert(*id))
        .collect();

    Ok(RecipeRows {
        authors: get_users_by_ids(&author_ids, pool).await?,
        tags: list_recipe_tags(&recipe_ids, pool).await?,
        parts: list_recipe_parts(&recipe_ids, pool).await?,
        recipes,
    })
}

pub async fn viewer_context(viewer: Option<Id>, pool: &Pool<Postgres>) -> Result<ViewerContext, ApiError> {
    let Some(user_id) = viewer else {
        return Ok(ViewerContext::anonymous());
    };

    Ok(ViewerContext {
        favorites: list_membership(user_id, RecipeList::Favorites, pool).await?,
        shopping_cart: list_membership(user_id, RecipeList::ShoppingCart, pool).await?,
        following: following_ids(user_id, pool).await?,
    })
}

pub async fn recipe_views(
    recipes: Vec<Recipe>,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeView>, ApiError> {
    let context = viewer_context(viewer, pool).await?;
    let rows = load_recipe_rows(recipes, pool).await?;

    Ok(assemble(rows, &context))
}

pub async fn recipe_view(id: Id, viewer: Option<Id>, pool: &Pool<Postgres>) -> Result<RecipeView, ApiError> {
    let recipe = get_recipe(id, pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Recipe"))?;

    recipe_views(vec![recipe], viewer, pool)
        .await?
        .pop()
        .ok_or_else(|| ApiError::Internal(format!("Recipe {id} could not be assembled")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_query_is_an_unfiltered_listing() {
        assert_eq!(RecipeFilter::from_pairs(vec![]), Ok(RecipeFilter::default()));
    }

    #[test]
    fn reads_repeated_tags_and_flags() {
        let filter = RecipeFilter::from_pairs(pairs(&[
            ("tags", "breakfast"),
            ("tags", "lunch"),
            ("tags", "breakfast"),
            ("author", "4"),
            ("is_favorited", "1"),
            ("is_in_shopping_cart", "0"),
            ("page", "2"),
        ]))
        .unwrap();

        assert_eq!(filter.tags, vec!["breakfast", "lunch"]);
        assert_eq!(filter.author, Some(4));
        assert!(filter.is_favorited);
        assert!(!filter.is_in_shopping_cart);
    }

    #[test]
    fn malformed_values_are_reported_per_key() {
        let errors =
            RecipeFilter::from_pairs(pairs(&[("author", "me"), ("is_favorited", "yes")]))
                .unwrap_err();

        assert_eq!(
            errors.fields().collect::<Vec<_>>(),
            vec!["author", "is_favorited"]
        );
    }
}
