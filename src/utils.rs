use std::borrow::Cow;

/// Players are keyed case-insensitively, so `Alice` and `alice` share a deck.
pub fn normalize_username(input: &str) -> Cow<str> {
    if input.chars().any(char::is_uppercase) {
        Cow::Owned(input.to_lowercase())
    } else {
        Cow::Borrowed(input)
    }
}
