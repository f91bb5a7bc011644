use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::schema::{Id, LinkedRecipeTag, Recipe, RecipePart, Tag, User};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserView {
    pub email: String,
    pub id: Id,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub avatar: Option<String>,
}

impl UserView {
    pub fn project(user: &User, is_subscribed: bool) -> Self {
        Self {
            email: user.email.to_owned(),
            id: user.id,
            username: user.username.to_owned(),
            first_name: user.first_name.to_owned(),
            last_name: user.last_name.to_owned(),
            is_subscribed,
            avatar: user.avatar.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedUser {
    pub email: String,
    pub id: Id,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&User> for CreatedUser {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.to_owned(),
            id: user.id,
            username: user.username.to_owned(),
            first_name: user.first_name.to_owned(),
            last_name: user.last_name.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeIngredientView {
    pub id: Id,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

impl From<RecipePart> for RecipeIngredientView {
    fn from(part: RecipePart) -> Self {
        Self {
            id: part.ingredient_id,
            name: part.name,
            measurement_unit: part.measurement_unit,
            amount: part.amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeView {
    pub id: Id,
    pub tags: Vec<Tag>,
    pub author: UserView,
    pub ingredients: Vec<RecipeIngredientView>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: Option<String>,
    pub text: String,
    pub cooking_time: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeMinified {
    pub id: Id,
    pub name: String,
    pub image: Option<String>,
    pub cooking_time: i32,
}

impl From<&Recipe> for RecipeMinified {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name.to_owned(),
            image: recipe.image.to_owned(),
            cooking_time: recipe.cooking_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub user: UserView,
    pub recipes: Vec<RecipeMinified>,
    pub recipes_count: usize,
}

impl SubscriptionView {
    /// `recipes` must already be in display order; only the first
    /// `recipes_limit` are kept but all of them are counted.
    pub fn project(user: &User, recipes: &[Recipe], recipes_limit: Option<usize>) -> Self {
        let shown = recipes_limit.unwrap_or(recipes.len());

        Self {
            user: UserView::project(user, true),
            recipes: recipes.iter().take(shown).map(RecipeMinified::from).collect(),
            recipes_count: recipes.len(),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct ViewerContext {
    pub favorites: HashSet<Id>,
    pub shopping_cart: HashSet<Id>,
    pub following: HashSet<Id>,
}

impl ViewerContext {
    pub fn anonymous() -> Self {
        Self::default()
    }
}

#[derive(Debug, Default, Clone)]
pub struct RecipeRows {
    pub recipes: Vec<Recipe>,
    pub authors: Vec<User>,
    pub tags: Vec<LinkedRecipeTag>,
    pub parts: Vec<RecipePart>,
}

fn group_by_recipe<T, K>(rows: Vec<T>, key: K) -> HashMap<Id, Vec<T>>
where
    K: Fn(&T) -> Id,
{
    let mut grouped: HashMap<Id, Vec<T>> = HashMap::new();
    rows.into_iter()
        .for_each(|row| grouped.entry(key(&row)).or_default().push(row));
    grouped
}

pub fn assemble(rows: RecipeRows, viewer: &ViewerContext) -> Vec<RecipeView> {
    let authors: HashMap<Id, User> = rows.authors.into_iter().map(|u| (u.id, u)).collect();
    let mut tags = group_by_recipe(rows.tags, |t| t.recipe_id);
    let mut parts = group_by_recipe(rows.parts, |p| p.recipe_id);

    rows.recipes
        .into_iter()
        .filter_map(|recipe| {
            let Some(author) = authors.get(&recipe.author_id) else {
                log::warn!("Recipe {} has no author row", recipe.id);
                return None;
            };

            Some(RecipeView {
                id: recipe.id,
                tags: tags
                    .remove(&recipe.id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(Tag::from)
                    .collect(),
                author: UserView::project(author, viewer.following.contains(&author.id)),
                ingredients: parts
                    .remove(&recipe.id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(RecipeIngredientView::from)
                    .collect(),
                is_favorited: viewer.favorites.contains(&recipe.id),
                is_in_shopping_cart: viewer.shopping_cart.contains(&recipe.id),
                name: recipe.name,
                image: recipe.image,
                text: recipe.text,
                cooking_time: recipe.cooking_time,
            })
        })
        .collect()
}
