pub const MAX_LEN_RECIPE_NAME: usize = 256;
pub const MAX_LEN_INGREDIENT_NAME: usize = 128;
pub const MAX_LEN_MEASUREMENT_UNIT: usize = 64;
pub const MAX_LEN_USER_INFO: usize = 150;
pub const MAX_LEN_EMAIL: usize = 254;
pub const MIN_LEN_PASSWORD: usize = 8;

pub const MIN_COOKING_TIME: i64 = 1;
pub const MAX_COOKING_TIME: i64 = 1440;

pub const MIN_INGREDIENT_AMOUNT: i64 = 1;
pub const MAX_INGREDIENT_AMOUNT: i64 = i32::MAX as i64;

/// Digit order of the short-link codec. Changing it breaks every issued link.
pub const SHORT_LINK_ALPHABET: &[u8; 62] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

pub const SHOPPING_LIST_FILENAME: &str = "shopping_list.txt";

pub const MAX_BODY_BYTES: u64 = 10 * 1024 * 1024;
