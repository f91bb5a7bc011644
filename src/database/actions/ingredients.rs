use std::collections::HashSet;

use crate::{
    constants::{MAX_LEN_INGREDIENT_NAME, MAX_LEN_MEASUREMENT_UNIT},
    error::{ApiError, QueryError},
    schema::{Id, Ingredient, NewIngredient, RecipePart},
    validator::IngredientAmount,
};

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

const IMPORT_CHUNK: usize = 1000;

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn is_importable(ingredient: &NewIngredient) -> bool {
    let name = ingredient.name.trim();
    let unit = ingredient.measurement_unit.trim();

    !name.is_empty()
        && !unit.is_empty()
        && name.chars().count() <= MAX_LEN_INGREDIENT_NAME
        && unit.chars().count() <= MAX_LEN_MEASUREMENT_UNIT
}

pub async fn search_ingredients(
    prefix: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, ApiError> {
    let pattern = format!("{}%", escape_like(prefix.unwrap_or("").trim()));

    let list: Vec<Ingredient> =
        sqlx::query_as("SELECT * FROM ingredients WHERE name ILIKE $1 ORDER BY name, id")
            .bind(pattern)
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(list)
}

pub async fn get_ingredient(id: Id, pool: &Pool<Postgres>) -> Result<Option<Ingredient>, ApiError> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn known_ingredient_ids(
    ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<HashSet<Id>, ApiError> {
    if ids.is_empty() {
        return Ok(HashSet::new());
    }

    let rows: Vec<(Id,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|r| r.0).collect())
}

pub async fn list_recipe_parts(
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipePart>, ApiError> {
    if recipe_ids.is_empty() {
        return Ok(vec![]);
    }

    let parts: Vec<RecipePart> = sqlx::query_as(
        "
        SELECT ri.recipe_id, ri.ingredient_id, i.name, i.measurement_unit, ri.amount
        FROM recipe_ingredients ri
        JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ANY($1)
        ORDER BY ri.id
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(parts)
}

pub async fn replace_recipe_parts(
    recipe_id: Id,
    parts: &[IngredientAmount],
    conn: &mut PgConnection,
) -> Result<(), ApiError> {
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    if parts.is_empty() {
        return Ok(());
    }

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");

    query_builder.push_values(parts.iter().take(65535 / 3), |mut b, part| {
        b.push_bind(recipe_id)
            .push_bind(part.id)
            .push_bind(part.amount);
    });

    query_builder
        .build()
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

/// Bulk-loads catalog entries, skipping names that already exist and
/// entries that are blank or too long. Returns how many rows were inserted.
pub async fn import_ingredients(
    ingredients: Vec<NewIngredient>,
    pool: &Pool<Postgres>,
) -> Result<u64, ApiError> {
    let total = ingredients.len();
    let (ingredients, skipped): (Vec<NewIngredient>, Vec<NewIngredient>) =
        ingredients.into_iter().partition(is_importable);

    for ingredient in &skipped {
        log::warn!("Skipping ingredient {:?}", ingredient.name);
    }

    let mut inserted = 0;

    for chunk in ingredients.chunks(IMPORT_CHUNK) {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO ingredients (name, measurement_unit) ");

        query_builder.push_values(chunk, |mut b, ingredient| {
            b.push_bind(ingredient.name.trim())
                .push_bind(ingredient.measurement_unit.trim());
        });
        query_builder.push(" ON CONFLICT DO NOTHING");

        let result = query_builder
            .build()
            .execute(pool)
            .await
            .map_err(QueryError::from)?;

        inserted += result.rows_affected();
    }

    log::info!("Imported {inserted} of {total} ingredients");

    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new(name: &str, unit: &str) -> NewIngredient {
        NewIngredient {
            name: name.into(),
            measurement_unit: unit.into(),
        }
    }

    #[test]
    fn blank_or_oversized_entries_are_not_imported() {
        assert!(is_importable(&new("flour", "g")));
        assert!(!is_importable(&new("  ", "g")));
        assert!(!is_importable(&new("flour", "")));
        assert!(!is_importable(&new(&"x".repeat(MAX_LEN_INGREDIENT_NAME + 1), "g")));
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("sug"), "sug");
        assert_eq!(escape_like("100%_pure\\"), "100\\%\\_pure\\\\");
    }
}
