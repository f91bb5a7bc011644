use std::collections::HashSet;

use serde_json::Value;

use crate::constants::{
    MAX_COOKING_TIME, MAX_INGREDIENT_AMOUNT, MAX_LEN_EMAIL, MAX_LEN_RECIPE_NAME,
    MAX_LEN_USER_INFO, MIN_COOKING_TIME, MIN_INGREDIENT_AMOUNT, MIN_LEN_PASSWORD,
};

use super::{
    error::ValidationErrors,
    form::{integer, Form},
    schema::{Id, Recipe},
};

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngredientAmount {
    pub id: Id,
    pub amount: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeDraft {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image: Option<String>,
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<Id>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReferencedIds {
    pub name: Option<String>,
    pub ingredients: Vec<Id>,
    pub tags: Vec<Id>,
}

#[derive(Debug, Default, Clone)]
pub struct ValidationContext {
    pub ingredient_ids: HashSet<Id>,
    pub tag_ids: HashSet<Id>,
    pub name_taken: bool,
}

fn as_id(value: &Value) -> Option<Id> {
    integer(value).ok().and_then(|v| Id::try_from(v).ok())
}

pub fn referenced_ids(form: &Form) -> ReferencedIds {
    let ingredients = form
        .get_list("ingredients")
        .ok()
        .flatten()
        .unwrap_or_default()
        .iter()
        .filter_map(|item| item.get("id").and_then(as_id))
        .collect();

    let tags = form
        .get_list("tags")
        .ok()
        .flatten()
        .unwrap_or_default()
        .iter()
        .filter_map(as_id)
        .collect();

    ReferencedIds {
        name: form.get_str("name").ok().flatten(),
        ingredients,
        tags,
    }
}

fn required_text(
    form: &Form,
    key: &str,
    fallback: Option<&str>,
    max_len: Option<usize>,
    errors: &mut ValidationErrors,
) -> Option<String> {
    read_text(form, key, fallback, max_len, true, errors)
}

fn required_password(form: &Form, errors: &mut ValidationErrors) -> Option<String> {
    read_text(form, "password", None, None, false, errors)
}

fn read_text(
    form: &Form,
    key: &str,
    fallback: Option<&str>,
    max_len: Option<usize>,
    trim: bool,
    errors: &mut ValidationErrors,
) -> Option<String> {
    let value = match form.get_str(key) {
        Ok(Some(value)) if trim => value.trim().to_string(),
        Ok(Some(value)) => value,
        Ok(None) => match fallback {
            Some(stored) => return Some(stored.to_string()),
            None => {
                errors.add(key, REQUIRED);
                return None;
            }
        },
        Err(e) => {
            errors.add(key, e.info());
            return None;
        }
    };

    if value.trim().is_empty() {
        errors.add(key, BLANK);
        return None;
    }
    if let Some(max_len) = max_len {
        if value.chars().count() > max_len {
            errors.add(
                key,
                format!("Ensure this field has no more than {max_len} characters."),
            );
            return None;
        }
    }

    Some(value)
}

fn cooking_time(form: &Form, fallback: Option<i32>, errors: &mut ValidationErrors) -> Option<i32> {
    match form.get_integer("cooking_time") {
        Ok(Some(value)) if (MIN_COOKING_TIME..=MAX_COOKING_TIME).contains(&value) => {
            i32::try_from(value).ok()
        }
        Ok(Some(_)) => {
            errors.add(
                "cooking_time",
                format!(
                    "Cooking time must be between {MIN_COOKING_TIME} and {MAX_COOKING_TIME} minutes."
                ),
            );
            None
        }
        Ok(None) => {
            if fallback.is_none() {
                errors.add("cooking_time", REQUIRED);
            }
            fallback
        }
        Err(e) => {
            errors.add("cooking_time", e.info());
            None
        }
    }
}

fn is_image_data_url(value: &str) -> bool {
    value.starts_with("data:image/") && value.contains(";base64,")
}

/// `Some(None)` clears the image, `None` means the field was invalid.
fn image(form: &Form, fallback: Option<&Recipe>, errors: &mut ValidationErrors) -> Option<Option<String>> {
    match form.get_str("image") {
        Ok(Some(value)) if value.is_empty() => Some(None),
        Ok(Some(value)) if is_image_data_url(&value) => Some(Some(value)),
        Ok(Some(_)) => {
            errors.add("image", "Upload a valid image.");
            None
        }
        Ok(None) => Some(fallback.and_then(|recipe| recipe.image.clone())),
        Err(e) => {
            errors.add("image", e.info());
            None
        }
    }
}

fn ingredients(
    form: &Form,
    known: &HashSet<Id>,
    errors: &mut ValidationErrors,
) -> Vec<IngredientAmount> {
    const FIELD: &str = "ingredients";

    let items = match form.get_list(FIELD) {
        Ok(Some(items)) => items,
        Ok(None) => {
            errors.add(FIELD, REQUIRED);
            return vec![];
        }
        Err(e) => {
            errors.add(FIELD, e.info());
            return vec![];
        }
    };
    if items.is_empty() {
        errors.add(FIELD, "At least one ingredient is required.");
        return vec![];
    }

    let mut seen = HashSet::new();
    let mut parts = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        if !item.is_object() {
            errors.add(FIELD, format!("Item {index}: expected an object with id and amount."));
            continue;
        }

        let id = match item.get("id") {
            None | Some(Value::Null) => {
                errors.add(FIELD, format!("Item {index}: id is required."));
                None
            }
            Some(value) => match as_id(value) {
                Some(id) if !known.contains(&id) => {
                    errors.add(FIELD, format!("Ingredient {id} does not exist."));
                    None
                }
                Some(id) if !seen.insert(id) => {
                    errors.add(FIELD, format!("Ingredient {id} is listed more than once."));
                    None
                }
                Some(id) => Some(id),
                None => {
                    errors.add(FIELD, format!("Item {index}: id must be an integer."));
                    None
                }
            },
        };

        let amount = match item.get("amount").map(integer) {
            None => {
                errors.add(FIELD, format!("Item {index}: amount is required."));
                None
            }
            Some(Ok(amount)) if (MIN_INGREDIENT_AMOUNT..=MAX_INGREDIENT_AMOUNT).contains(&amount) => {
                i32::try_from(amount).ok()
            }
            Some(Ok(amount)) if amount < MIN_INGREDIENT_AMOUNT => {
                errors.add(
                    FIELD,
                    format!("Item {index}: amount must be a positive integer, got {amount}."),
                );
                None
            }
            Some(Ok(amount)) => {
                errors.add(
                    FIELD,
                    format!("Item {index}: amount {amount} is too large."),
                );
                None
            }
            Some(Err(e)) => {
                errors.add(FIELD, format!("Item {index}: {}", e.info()));
                None
            }
        };

        if let (Some(id), Some(amount)) = (id, amount) {
            parts.push(IngredientAmount { id, amount });
        }
    }

    parts
}

fn tags(form: &Form, known: &HashSet<Id>, errors: &mut ValidationErrors) -> Vec<Id> {
    const FIELD: &str = "tags";

    let items = match form.get_list(FIELD) {
        Ok(Some(items)) => items,
        Ok(None) => {
            errors.add(FIELD, REQUIRED);
            return vec![];
        }
        Err(e) => {
            errors.add(FIELD, e.info());
            return vec![];
        }
    };
    if items.is_empty() {
        errors.add(FIELD, "At least one tag is required.");
        return vec![];
    }

    let mut seen = HashSet::new();
    let mut ids = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        match as_id(item) {
            Some(id) if !known.contains(&id) => {
                errors.add(FIELD, format!("Tag {id} does not exist."));
            }
            Some(id) if !seen.insert(id) => {
                errors.add(FIELD, format!("Tag {id} is listed more than once."));
            }
            Some(id) => ids.push(id),
            None => errors.add(FIELD, format!("Item {index}: tag id must be an integer.")),
        }
    }

    ids
}

/// Checks a recipe payload. With `existing` set (an update), omitted scalar
/// fields keep their stored values; ingredients and tags are always required
/// because an update replaces them wholesale.
pub fn validate_recipe(
    form: &Form,
    context: &ValidationContext,
    existing: Option<&Recipe>,
) -> Result<RecipeDraft, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let name = required_text(
        form,
        "name",
        existing.map(|r| r.name.as_str()),
        Some(MAX_LEN_RECIPE_NAME),
        &mut errors,
    );
    if name.is_some() && context.name_taken {
        errors.add("name", "A recipe with this name already exists.");
    }
    let text = required_text(form, "text", existing.map(|r| r.text.as_str()), None, &mut errors);
    let cooking_time = cooking_time(form, existing.map(|r| r.cooking_time), &mut errors);
    let image = image(form, existing, &mut errors);
    let ingredients = ingredients(form, &context.ingredient_ids, &mut errors);
    let tags = tags(form, &context.tag_ids, &mut errors);

    match (name, text, cooking_time, image) {
        (Some(name), Some(text), Some(cooking_time), Some(image)) if errors.is_empty() => {
            Ok(RecipeDraft {
                name,
                text,
                cooking_time,
                image,
                ingredients,
                tags,
            })
        }
        _ => Err(errors),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

fn is_valid_username(username: &str) -> bool {
    username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-'))
}

fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

pub fn validate_registration(form: &Form) -> Result<Registration, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let email = required_text(form, "email", None, Some(MAX_LEN_EMAIL), &mut errors);
    if let Some(email) = &email {
        if !is_valid_email(email) {
            errors.add("email", "Enter a valid email address.");
        }
    }

    let username = required_text(form, "username", None, Some(MAX_LEN_USER_INFO), &mut errors);
    if let Some(username) = &username {
        if !is_valid_username(username) {
            errors.add(
                "username",
                "Enter a valid username. It may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }
    }

    let first_name = required_text(form, "first_name", None, Some(MAX_LEN_USER_INFO), &mut errors);
    let last_name = required_text(form, "last_name", None, Some(MAX_LEN_USER_INFO), &mut errors);

    let password = required_password(form, &mut errors);
    if let Some(password) = &password {
        if password.chars().count() < MIN_LEN_PASSWORD {
            errors.add(
                "password",
                format!("This password is too short. It must contain at least {MIN_LEN_PASSWORD} characters."),
            );
        }
    }

    match (email, username, first_name, last_name, password) {
        (Some(email), Some(username), Some(first_name), Some(last_name), Some(password))
            if errors.is_empty() =>
        {
            Ok(Registration {
                email: email.to_lowercase(),
                username,
                first_name,
                last_name,
                password,
            })
        }
        _ => Err(errors),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

pub fn validate_credentials(form: &Form) -> Result<Credentials, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let email = required_text(form, "email", None, Some(MAX_LEN_EMAIL), &mut errors);
    let password = required_password(form, &mut errors);

    match (email, password) {
        (Some(email), Some(password)) => Ok(Credentials {
            email: email.trim().to_lowercase(),
            password,
        }),
        _ => Err(errors),
    }
}

pub fn validate_avatar(form: &Form) -> Result<String, ValidationErrors> {
    match form.get_str("avatar") {
        Ok(Some(value)) if is_image_data_url(&value) => Ok(value),
        Ok(Some(_)) => Err(ValidationErrors::single("avatar", "Upload a valid image.")),
        Ok(None) => Err(ValidationErrors::single("avatar", REQUIRED)),
        Err(e) => Err(ValidationErrors::single("avatar", e.info())),
    }
}
