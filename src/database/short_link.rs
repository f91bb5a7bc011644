use std::fmt::{self, Display};

use crate::constants::SHORT_LINK_ALPHABET;

use super::schema::Id;

/*
Short links

recipe id   code
0, -1       invalid
1           1
61          Z
62          10
3844        100
*/

const BASE: u64 = SHORT_LINK_ALPHABET.len() as u64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShortLinkError {
    #[error("Empty short link")]
    Empty,
    #[error("Invalid character {0:?} in short link")]
    InvalidCharacter(char),
    #[error("Short link has leading zeros")]
    LeadingZero,
    #[error("Short link is out of range")]
    Overflow,
    #[error("{0} is not a recipe id")]
    NotARecipeId(Id),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShortLink {
    code: String,
}

impl ShortLink {
    pub fn encode(recipe_id: Id) -> Result<Self, ShortLinkError> {
        let mut value = match u32::try_from(recipe_id) {
            Ok(value) if value > 0 => u64::from(value),
            _ => return Err(ShortLinkError::NotARecipeId(recipe_id)),
        };

        let mut digits = Vec::new();
        while value > 0 {
            digits.push(SHORT_LINK_ALPHABET[(value % BASE) as usize]);
            value /= BASE;
        }
        digits.reverse();

        Ok(Self {
            code: digits.into_iter().map(char::from).collect(),
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn recipe_id(&self) -> Result<Id, ShortLinkError> {
        decode(&self.code)
    }

    pub fn url(&self, base_url: &str) -> String {
        format!("{}/s/{}", base_url.trim_end_matches('/'), self.code)
    }
}

fn digit_value(c: char) -> Result<u64, ShortLinkError> {
    SHORT_LINK_ALPHABET
        .iter()
        .position(|&d| d as char == c)
        .map(|p| p as u64)
        .ok_or(ShortLinkError::InvalidCharacter(c))
}

pub fn decode(code: &str) -> Result<Id, ShortLinkError> {
    if code.is_empty() {
        return Err(ShortLinkError::Empty);
    }
    if code.starts_with(SHORT_LINK_ALPHABET[0] as char) {
        return Err(ShortLinkError::LeadingZero);
    }

    let mut value: u64 = 0;
    for c in code.chars() {
        let digit = digit_value(c)?;
        value = value
            .checked_mul(BASE)
            .and_then(|v| v.checked_add(digit))
            .ok_or(ShortLinkError::Overflow)?;
    }

    Id::try_from(value).map_err(|_e| ShortLinkError::Overflow)
}

impl TryFrom<String> for ShortLink {
    type Error = ShortLinkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        decode(&value)?;
        Ok(Self { code: value })
    }
}

impl From<ShortLink> for String {
    fn from(value: ShortLink) -> Self {
        value.code
    }
}

impl Display for ShortLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes() {
        assert_eq!(ShortLink::encode(1).unwrap().code(), "1");
        assert_eq!(ShortLink::encode(10).unwrap().code(), "a");
        assert_eq!(ShortLink::encode(61).unwrap().code(), "Z");
        assert_eq!(ShortLink::encode(62).unwrap().code(), "10");
        assert_eq!(ShortLink::encode(3844).unwrap().code(), "100");
    }

    #[test]
    fn decoding_reverses_encoding() {
        let ids = (1..5000).chain([
            123_456,
            987_654_321,
            Id::MAX - 1,
            Id::MAX,
        ]);
        for id in ids {
            let link = ShortLink::encode(id).unwrap();
            assert_eq!(link.recipe_id(), Ok(id), "round trip of {id} via {link}");
        }
    }

    #[test]
    fn non_positive_ids_have_no_code() {
        for id in [0, -5, Id::MIN] {
            assert_eq!(ShortLink::encode(id), Err(ShortLinkError::NotARecipeId(id)));
        }
        assert_ne!(ShortLink::encode(5), ShortLink::encode(-5));
    }

    #[test]
    fn rejects_malformed_codes() {
        assert_eq!(decode(""), Err(ShortLinkError::Empty));
        assert_eq!(decode("ab-c"), Err(ShortLinkError::InvalidCharacter('-')));
        assert_eq!(decode("é"), Err(ShortLinkError::InvalidCharacter('é')));
        assert_eq!(decode("01"), Err(ShortLinkError::LeadingZero));
        assert_eq!(decode("0"), Err(ShortLinkError::LeadingZero));
        assert_eq!(decode("ZZZZZZZZZZZZ"), Err(ShortLinkError::Overflow));
        // fits in u64 but not in a recipe id
        assert_eq!(decode("ZZZZZZ"), Err(ShortLinkError::Overflow));
    }

    #[test]
    fn try_from_validates() {
        assert!(ShortLink::try_from(String::from("1a")).is_ok());
        assert!(ShortLink::try_from(String::from("1 a")).is_err());
    }

    #[test]
    fn url_joins_base_without_double_slash() {
        let link = ShortLink::encode(62).unwrap();
        assert_eq!(link.url("https://food.example/"), "https://food.example/s/10");
        assert_eq!(link.url("https://food.example"), "https://food.example/s/10");
    }
}
