//! Owner text assembly and normalisation ahead of keyword extraction.

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::models::{Place, User};

/// Maximum number of characters sent to the extractor.
pub const MAX_TEXT_CHARS: usize = 2000;

static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex must compile"));
static SYMBOL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s가-힣]").expect("symbol regex must compile"));

/// Trim, collapse whitespace, blank out symbols and cap the length.
pub fn preprocess(text: &str) -> String {
    let collapsed = WHITESPACE_RE.replace_all(text.trim(), " ");
    let cleaned = SYMBOL_RE.replace_all(&collapsed, " ");
    cleaned.chars().take(MAX_TEXT_CHARS).collect()
}

/// Describe a user from their profile and the categories they bookmark.
pub fn user_profile_text(user: &User, bookmarked_categories: &[String]) -> String {
    let mut parts = Vec::new();

    if let Some(mbti) = user.mbti_code() {
        parts.push(format!("MBTI personality type: {mbti}"));
    }
    if let Some(age_range) = non_blank(user.age_range.as_deref()) {
        parts.push(format!("Age range: {age_range}"));
    }
    if let Some(transportation) = non_blank(user.transportation.as_deref()) {
        parts.push(format!("Preferred transportation: {transportation}"));
    }
    if let Some(preferences) = non_blank(user.preferences.as_deref()) {
        parts.push(format!("Preferences: {preferences}"));
    }

    let mut categories: Vec<&str> = Vec::new();
    for category in bookmarked_categories.iter().map(|c| c.trim()) {
        if !category.is_empty() && !categories.contains(&category) && categories.len() < 10 {
            categories.push(category);
        }
    }
    if !categories.is_empty() {
        parts.push(format!("Bookmarked place types: {}", categories.join(", ")));
    }

    if parts.is_empty() {
        format!(
            "User with {} preferences",
            user.mbti_code().unwrap_or_else(|| "unknown".to_string())
        )
    } else {
        parts.join(". ")
    }
}

/// Describe a place from its catalog attributes.
pub fn place_description_text(place: &Place) -> String {
    let mut parts = vec![format!("Place name: {}", place.name)];

    if let Some(category) = non_blank(place.category.as_deref()) {
        parts.push(format!("Category: {category}"));
    }
    if let Some(description) = non_blank(place.description.as_deref()) {
        parts.push(format!("Description: {description}"));
    }
    if let Some(location) = non_blank(place.location.as_deref()) {
        parts.push(format!("Location: {location}"));
    }
    if !place.amenities.is_empty() {
        parts.push(format!("Amenities: {}", place.amenities.join(", ")));
    }
    if !place.tags.is_empty() {
        parts.push(format!("Tags: {}", place.tags.join(", ")));
    }
    if let Some(hours) = non_blank(place.opening_hours.as_deref()) {
        parts.push(format!("Operating hours: {hours}"));
    }
    if place.rating > 0.0 {
        parts.push(format!(
            "Rating: {:.1}/5.0 with {} reviews",
            place.rating, place.review_count
        ));
    }

    parts.join(". ")
}

/// Hex SHA-256 digest of a prompt.
pub fn prompt_hash(prompt: &str) -> String {
    format!("{:x}", Sha256::digest(prompt.as_bytes()))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
