//! Built-in keyword catalog shared by user and place vectors.
//!
//! Vector position `i` holds the keyword with id `i + 1`.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum KeywordCategory {
    FoodDrink,
    Atmosphere,
    Amenity,
    Activity,
    Space,
    Social,
    Value,
    Time,
    Accessibility,
    Style,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeywordDefinition {
    pub id: u32,
    pub keyword: &'static str,
    pub definition: &'static str,
    pub category: KeywordCategory,
    pub weight_boost: f64,
}

use KeywordCategory::*;

#[rustfmt::skip]
const KEYWORDS: &[(&str, &str, KeywordCategory, f64)] = &[
    ("specialty_coffee", "Carefully sourced or hand-brewed coffee", FoodDrink, 1.2),
    ("dessert_bakery", "Cakes, pastries or fresh bread", FoodDrink, 1.1),
    ("brunch", "Late breakfast and brunch menus", FoodDrink, 1.0),
    ("local_cuisine", "Regional or traditional dishes", FoodDrink, 1.1),
    ("fine_dining", "Upscale, course-style dining", FoodDrink, 1.0),
    ("craft_beer", "Small-batch or draft beer selection", FoodDrink, 1.0),
    ("wine_bar", "Curated wine list", FoodDrink, 1.0),
    ("tea_house", "Traditional or specialty tea", FoodDrink, 1.0),
    ("vegan_friendly", "Plant-based options available", FoodDrink, 1.1),
    ("street_food", "Casual snacks and market food", FoodDrink, 1.0),
    ("quiet_space", "Low noise, good for focus or rest", Atmosphere, 1.1),
    ("cozy", "Warm, comfortable and homely feel", Atmosphere, 1.0),
    ("lively", "Energetic and busy atmosphere", Atmosphere, 1.0),
    ("romantic", "Intimate mood suited to couples", Atmosphere, 1.0),
    ("calm_healing", "Relaxing place to recharge", Atmosphere, 1.1),
    ("trendy", "Currently popular and fashionable", Atmosphere, 1.0),
    ("nostalgic", "Retro or old-town charm", Atmosphere, 1.0),
    ("artistic_vibe", "Art, design or creative feel", Atmosphere, 1.0),
    ("nature_view", "Views of greenery, mountains or sea", Atmosphere, 1.1),
    ("night_view", "Attractive scenery after dark", Atmosphere, 1.0),
    ("free_wifi", "Reliable wireless internet", Amenity, 1.0),
    ("power_outlets", "Plenty of charging spots", Amenity, 1.0),
    ("parking", "Parking available on site or nearby", Amenity, 1.0),
    ("pet_friendly", "Pets are welcome", Amenity, 1.1),
    ("kids_friendly", "Suitable for children", Amenity, 1.0),
    ("outdoor_seating", "Seats outside or on a patio", Amenity, 1.0),
    ("reservation", "Accepts bookings", Amenity, 1.0),
    ("group_seating", "Tables for larger groups", Amenity, 1.0),
    ("clean_restroom", "Well kept facilities", Amenity, 1.0),
    ("takeout", "Food or drinks to go", Amenity, 1.0),
    ("study_work", "Good for studying or remote work", Activity, 1.1),
    ("reading", "Suited to reading a book", Activity, 1.0),
    ("photo_spot", "Photogenic interior or scenery", Activity, 1.0),
    ("live_music", "Performances or live sets", Activity, 1.0),
    ("exhibition", "Art or cultural exhibitions", Activity, 1.0),
    ("shopping_fun", "Browsing shops and goods", Activity, 1.0),
    ("walking_trail", "Paths for strolling", Activity, 1.0),
    ("workshop_class", "Hands-on classes or workshops", Activity, 1.0),
    ("games_play", "Board games, arcades or play areas", Activity, 1.0),
    ("sports_activity", "Exercise or sports facilities", Activity, 1.0),
    ("spacious", "Large, uncrowded interior", Space, 1.0),
    ("rooftop", "Rooftop seating or deck", Space, 1.0),
    ("hidden_gem", "Lesser-known local favourite", Space, 1.1),
    ("large_windows", "Bright space with big windows", Space, 1.0),
    ("private_room", "Separate rooms for privacy", Space, 1.0),
    ("terrace", "Terrace or balcony", Space, 1.0),
    ("waterfront", "By a river, lake or the sea", Space, 1.0),
    ("garden", "Garden or green courtyard", Space, 1.0),
    ("indoor_space", "Fully indoor, weather independent", Space, 1.0),
    ("small_intimate", "Small room with few seats", Space, 1.0),
    ("solo_friendly", "Comfortable to visit alone", Social, 1.0),
    ("date_spot", "Popular for dates", Social, 1.0),
    ("friends_gathering", "Good for meeting friends", Social, 1.0),
    ("family_outing", "Good for a family visit", Social, 1.0),
    ("business_meeting", "Suitable for work meetings", Social, 1.0),
    ("community", "Regulars and local community feel", Social, 1.0),
    ("conversation_friendly", "Easy to talk without shouting", Social, 1.0),
    ("celebration", "Good for birthdays and parties", Social, 1.0),
    ("pet_owners", "Popular with people bringing pets", Social, 1.0),
    ("tourist_popular", "Well known to visitors", Social, 1.0),
    ("budget_friendly", "Low prices", Value, 1.0),
    ("premium", "High-end products or service", Value, 1.0),
    ("generous_portions", "Large servings", Value, 1.0),
    ("good_value", "Quality matches the price", Value, 1.0),
    ("free_entry", "No admission fee", Value, 1.0),
    ("discounts", "Deals, coupons or happy hours", Value, 1.0),
    ("loyalty_program", "Stamps or membership benefits", Value, 1.0),
    ("signature_menu", "A well-known signature item", Value, 1.1),
    ("seasonal_menu", "Menu that changes by season", Value, 1.0),
    ("healthy_options", "Light or healthy choices", Value, 1.0),
    ("morning_open", "Opens early in the morning", Time, 1.0),
    ("late_night", "Open late at night", Time, 1.0),
    ("weekend_brunch", "Weekend brunch favourite", Time, 1.0),
    ("all_day", "Open throughout the day", Time, 1.0),
    ("sunset_time", "Best visited around sunset", Time, 1.0),
    ("lunch_spot", "Popular at lunchtime", Time, 1.0),
    ("dinner_spot", "Popular for dinner", Time, 1.0),
    ("quick_visit", "Fine for a short stop", Time, 1.0),
    ("long_stay", "Comfortable for staying hours", Time, 1.0),
    ("open_24h", "Open around the clock", Time, 1.0),
    ("near_station", "Close to a subway or train station", Accessibility, 1.0),
    ("wheelchair_access", "Step-free access", Accessibility, 1.0),
    ("easy_to_find", "Easy to locate", Accessibility, 1.0),
    ("walkable", "Within walking distance of other spots", Accessibility, 1.0),
    ("bike_friendly", "Bike racks or cycling routes", Accessibility, 1.0),
    ("central_location", "In a busy central district", Accessibility, 1.0),
    ("drive_through", "Order without leaving the car", Accessibility, 1.0),
    ("elevator", "Elevator available", Accessibility, 1.0),
    ("quiet_neighborhood", "Located on a calm street", Accessibility, 1.0),
    ("multilingual_staff", "Staff speak several languages", Accessibility, 1.0),
    ("minimalist", "Clean, minimal interior", Style, 1.0),
    ("vintage", "Vintage furniture or decor", Style, 1.0),
    ("modern_design", "Contemporary architecture", Style, 1.0),
    ("traditional_korean", "Hanok or traditional Korean style", Style, 1.1),
    ("industrial", "Exposed brick, concrete or metal", Style, 1.0),
    ("instagrammable", "Designed to be photographed", Style, 1.0),
    ("eco_friendly", "Sustainable practices", Style, 1.0),
    ("luxury_interior", "Lavish decor", Style, 1.0),
    ("unique_concept", "Unusual theme or concept", Style, 1.1),
    ("bookstore_cafe", "Books to browse alongside drinks", Style, 1.0),
];

/// Synonym groups for rule-based matching: (keyword, score, phrases).
#[rustfmt::skip]
const SYNONYMS: &[(&str, f64, &[&str])] = &[
    ("specialty_coffee", 0.7, &["coffee", "espresso", "latte", "커피", "원두"]),
    ("dessert_bakery", 0.7, &["cake", "bakery", "pastry", "dessert", "디저트", "빵", "케이크"]),
    ("brunch", 0.7, &["brunch", "breakfast", "브런치"]),
    ("local_cuisine", 0.6, &["traditional food", "local", "한식", "향토"]),
    ("fine_dining", 0.7, &["course", "omakase", "fine dining", "파인다이닝"]),
    ("craft_beer", 0.7, &["beer", "brewery", "맥주"]),
    ("wine_bar", 0.7, &["wine", "와인"]),
    ("tea_house", 0.7, &["tea", "찻집", "전통차"]),
    ("vegan_friendly", 0.8, &["vegan", "vegetarian", "비건", "채식"]),
    ("quiet_space", 0.8, &["quiet", "peaceful", "study", "조용"]),
    ("cozy", 0.6, &["cozy", "warm", "아늑"]),
    ("lively", 0.6, &["lively", "busy", "energetic", "활기"]),
    ("romantic", 0.7, &["romantic", "couple", "로맨틱"]),
    ("calm_healing", 0.7, &["healing", "relax", "힐링", "휴식"]),
    ("trendy", 0.6, &["trendy", "hot place", "핫플", "감성"]),
    ("nature_view", 0.7, &["mountain", "forest", "ocean", "view", "자연", "숲"]),
    ("night_view", 0.8, &["night view", "야경"]),
    ("free_wifi", 0.9, &["wifi", "internet", "connection", "와이파이"]),
    ("power_outlets", 0.7, &["outlet", "charging", "콘센트"]),
    ("parking", 0.8, &["parking", "주차"]),
    ("pet_friendly", 0.8, &["pet", "dog", "애견", "반려"]),
    ("kids_friendly", 0.7, &["kids", "children", "아이", "키즈"]),
    ("outdoor_seating", 0.7, &["patio", "outdoor seat", "야외석"]),
    ("study_work", 0.7, &["work", "laptop", "study", "공부", "작업"]),
    ("reading", 0.7, &["book", "reading", "독서", "책"]),
    ("photo_spot", 0.7, &["photo", "picture", "사진"]),
    ("live_music", 0.8, &["live", "concert", "jazz", "공연"]),
    ("exhibition", 0.8, &["exhibition", "gallery", "전시"]),
    ("shopping_fun", 0.7, &["shopping", "shop", "mall", "쇼핑"]),
    ("walking_trail", 0.7, &["walk", "trail", "산책"]),
    ("rooftop", 0.8, &["rooftop", "루프탑", "옥상"]),
    ("garden", 0.7, &["garden", "정원"]),
    ("waterfront", 0.7, &["river", "lake", "beach", "한강", "바다"]),
    ("solo_friendly", 0.6, &["alone", "solo", "혼자"]),
    ("date_spot", 0.7, &["date", "데이트"]),
    ("friends_gathering", 0.6, &["friends", "친구"]),
    ("family_outing", 0.7, &["family", "가족"]),
    ("budget_friendly", 0.7, &["cheap", "affordable", "저렴", "가성비"]),
    ("late_night", 0.7, &["late night", "midnight", "새벽", "심야"]),
    ("open_24h", 0.9, &["24 hours", "24시간", "24h"]),
    ("near_station", 0.7, &["station", "subway", "역"]),
    ("traditional_korean", 0.8, &["hanok", "한옥"]),
    ("bookstore_cafe", 0.8, &["bookstore", "서점", "북카페"]),
];

/// Padding keywords per place category, in priority order.
#[rustfmt::skip]
const CATEGORY_DEFAULTS: &[(&str, &[&str])] = &[
    ("cafe", &[
        "specialty_coffee", "dessert_bakery", "cozy", "quiet_space", "free_wifi",
        "power_outlets", "study_work", "reading", "large_windows", "solo_friendly",
        "conversation_friendly", "photo_spot", "instagrammable", "all_day", "long_stay",
    ]),
    ("restaurant", &[
        "local_cuisine", "signature_menu", "generous_portions", "good_value", "fine_dining",
        "family_outing", "friends_gathering", "reservation", "group_seating", "dinner_spot",
        "lunch_spot", "date_spot", "parking", "lively", "celebration",
    ]),
    ("bar", &[
        "craft_beer", "wine_bar", "late_night", "lively", "night_view",
        "friends_gathering", "date_spot", "live_music", "romantic", "dinner_spot",
        "conversation_friendly", "celebration", "trendy", "rooftop", "small_intimate",
    ]),
    ("park", &[
        "nature_view", "walking_trail", "calm_healing", "pet_friendly", "kids_friendly",
        "family_outing", "free_entry", "garden", "spacious", "photo_spot",
        "bike_friendly", "outdoor_seating", "sunset_time", "walkable", "sports_activity",
    ]),
    ("museum", &[
        "exhibition", "artistic_vibe", "quiet_space", "photo_spot", "indoor_space",
        "family_outing", "tourist_popular", "workshop_class", "wheelchair_access", "elevator",
        "multilingual_staff", "central_location", "solo_friendly", "unique_concept", "modern_design",
    ]),
    ("shopping", &[
        "shopping_fun", "trendy", "indoor_space", "central_location", "near_station",
        "discounts", "parking", "elevator", "friends_gathering", "tourist_popular",
        "modern_design", "all_day", "takeout", "clean_restroom", "easy_to_find",
    ]),
    ("default", &[
        "cozy", "good_value", "easy_to_find", "near_station", "friends_gathering",
        "solo_friendly", "photo_spot", "conversation_friendly", "walkable", "all_day",
        "hidden_gem", "clean_restroom", "budget_friendly", "quick_visit", "central_location",
    ]),
];

pub struct KeywordCatalog {
    keywords: Vec<KeywordDefinition>,
    by_name: HashMap<&'static str, usize>,
}

impl KeywordCatalog {
    /// The shared built-in catalog.
    pub fn builtin() -> &'static KeywordCatalog {
        static CATALOG: OnceLock<KeywordCatalog> = OnceLock::new();
        CATALOG.get_or_init(|| {
            let keywords: Vec<KeywordDefinition> = KEYWORDS
                .iter()
                .enumerate()
                .map(|(i, (keyword, definition, category, weight_boost))| KeywordDefinition {
                    id: i as u32 + 1,
                    keyword: *keyword,
                    definition: *definition,
                    category: *category,
                    weight_boost: *weight_boost,
                })
                .collect();
            let by_name = keywords
                .iter()
                .enumerate()
                .map(|(i, k)| (k.keyword, i))
                .collect();
            KeywordCatalog { keywords, by_name }
        })
    }

    /// Number of keywords, which is also the vector dimension.
    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeywordDefinition> {
        self.keywords.iter()
    }

    pub fn get(&self, id: u32) -> Option<&KeywordDefinition> {
        id.checked_sub(1)
            .and_then(|index| self.keywords.get(index as usize))
    }

    /// Look up a keyword by name, tolerating case, spaces and hyphens.
    pub fn find(&self, name: &str) -> Option<&KeywordDefinition> {
        let normalized = name.trim().to_lowercase().replace([' ', '-'], "_");
        self.by_name
            .get(normalized.as_str())
            .map(|&index| &self.keywords[index])
    }

    pub fn synonyms(&self, keyword: &str) -> Option<(f64, &'static [&'static str])> {
        SYNONYMS
            .iter()
            .find(|(name, _, _)| *name == keyword)
            .map(|(_, score, phrases)| (*score, *phrases))
    }

    /// Padding keywords for a place category, falling back to a generic list.
    pub fn category_defaults(&self, category: Option<&str>) -> Vec<&KeywordDefinition> {
        let key = category.map(default_group).unwrap_or("default");
        CATEGORY_DEFAULTS
            .iter()
            .find(|(group, _)| *group == key)
            .map(|(_, names)| names.iter().filter_map(|name| self.find(name)).collect())
            .unwrap_or_default()
    }
}

fn default_group(category: &str) -> &'static str {
    let category = category.trim().to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| category.contains(n));

    if has(&["카페", "cafe", "coffee", "커피"]) {
        "cafe"
    } else if has(&["bar", "pub", "술집", "주점"]) || category == "바" {
        "bar"
    } else if has(&["레스토랑", "restaurant", "음식", "식당", "food"]) {
        "restaurant"
    } else if has(&["공원", "park"]) {
        "park"
    } else if has(&["박물관", "미술관", "museum", "gallery"]) {
        "museum"
    } else if has(&["쇼핑", "shopping", "mall", "백화점"]) {
        "shopping"
    } else {
        "default"
    }
}
